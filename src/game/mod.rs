// Public API
pub use handlers::list_rooms;
pub use registry::{is_reserved_room_id, single_player_key, RoomRegistry, RoomSummary};
pub use session::GameSession;
pub use state::{ChoiceView, GameView, Phase, RoundView};

// Internal modules
mod handlers;
mod registry;
mod session;
mod state;
