/// Dialog state machine over the stores, generator, and dispatcher
pub mod controller;
/// Inbound event contract and callback payload parsing
pub mod event;
/// Actor-per-chat event routing
pub mod router;
/// Conversation, intent, and result types
pub mod state;
/// In-memory per-chat stores
pub mod store;
/// User-facing copy and keyboard layouts
pub mod views;

pub use controller::DialogController;
pub use router::ChatRouter;
