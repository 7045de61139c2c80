// Public API
pub use errors::StatsError;
pub use handlers::user_dashboard;
pub use models::{DashboardEntry, UserDashboard};
pub use repository::{InMemoryStatsRepository, StatsRepository, StatsSink};

// Internal modules
mod errors;
mod handlers;
pub mod models;
pub mod repository;
