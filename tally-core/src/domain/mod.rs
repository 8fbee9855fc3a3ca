//! Core domain entities
//!
//! Records, drafts and form rules. Pure data structures with validation
//! logic - no I/O.

mod budget;
mod category;
pub mod forms;
pub mod money;
mod profile;
pub mod result;
mod transaction;
mod user;
pub mod validation;

pub use budget::{Budget, BudgetDraft, BudgetPeriod, BudgetProgress};
pub use category::Category;
pub use profile::{
    image_content_type, ProfileForm, ProfileUpdate, Theme, UserProfile, AVATAR_BUCKET,
    DEFAULT_CURRENCY, DEFAULT_LANGUAGE, MAX_AVATAR_BYTES,
};
pub use transaction::{Transaction, TransactionDraft, TransactionInput, TransactionKind};
pub use user::{Session, User, UserMetadata};
