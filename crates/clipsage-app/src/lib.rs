//! ClipSage application layer: one instance of every state container,
//! sharing a backend gateway, a notification center and a change bus.

pub mod state;

pub use state::AppState;
