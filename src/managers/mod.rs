// Managers Module
//
// Focused manager classes extracted from the coach handle.
//
// - BroadcastChannelManager: Tokio broadcast channels for UI observations

pub mod broadcast_manager;

pub use broadcast_manager::BroadcastChannelManager;
