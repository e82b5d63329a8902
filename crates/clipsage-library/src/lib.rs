//! Library container. Owns the local copy of the backend's video catalog.

pub mod store;

pub use store::{LibraryState, LibraryStore};
