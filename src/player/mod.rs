// Public API
pub use handlers::connected_users;
pub use models::Player;
pub use presence::PresenceTracker;

// Internal modules
mod handlers;
pub mod models;
mod presence;
