//! Chat container: a conversation with the backend about a set of clips
//! attached from search results.
//!
//! Sending is optimistic: the user turn shows up immediately and is rolled
//! back if the backend call fails.

pub mod store;
pub mod types;

pub use store::{ChatState, ChatStore};
pub use types::{ChatMessage, Role};
