//! End-to-end flows across the player, the node client and persistence

pub mod playback_flow;
pub mod saved_queue_flow;
