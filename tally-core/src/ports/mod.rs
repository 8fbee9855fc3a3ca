//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces to the backend-as-a-service. Services depend
//! only on these traits; the hosted client and the local demo backend both
//! implement all three.

mod auth;
mod storage;
mod table;

pub use auth::{AuthProvider, OAuthProvider, SignUpResponse, UserChanges};
pub use storage::ObjectStorage;
pub use table::{decode_rows, first_row, Filter, FilterOp, Order, TableQuery, TableStore};

/// A complete backend: auth, tables and object storage behind one handle
pub trait Backend: AuthProvider + TableStore + ObjectStorage {
    /// Backend name (e.g., "supabase", "local")
    fn name(&self) -> &str;

    /// Whether this backend works offline with seeded demo data
    fn is_demo(&self) -> bool {
        false
    }
}
