//! Search container: the current query, its results, and the baseline
//! search options applied to every call.

pub mod store;

pub use store::{SearchState, SearchStore};
