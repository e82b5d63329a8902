//! Video player container.
//!
//! Holds the single playback session shown in the player modal: which video,
//! which chunk, and the time range to play.

pub mod store;

pub use store::{Phase, PlayOptions, PlayerState, VideoPlayerStore};
