//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod analytics;
mod auth;
pub mod budget;
mod category;
mod demo;
pub mod logging;
pub mod migration;
mod profile;
pub mod session;
mod transaction;

pub use analytics::{AnalyticsService, CategorySpending, MonthlyTrend, Summary};
pub use auth::{AuthService, CurrentUser, Pkce};
pub use budget::BudgetService;
pub use category::CategoryService;
pub use demo::DemoService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use profile::{fetch_profile, ProfileService};
pub use session::{AuthEvent, SessionManager};
pub use transaction::TransactionService;
