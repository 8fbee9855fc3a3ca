//! Object storage port

use async_trait::async_trait;

use crate::domain::result::Result;

/// File storage with public URLs
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload an object, replacing any existing one when `upsert` is set
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<()>;

    /// Public URL of a stored object
    fn public_url(&self, bucket: &str, path: &str) -> Result<String>;
}
