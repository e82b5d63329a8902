//! Notification center: short-lived user-facing messages ("toasts") that
//! every container raises to surface the outcome of an operation.

pub mod center;
pub mod types;

pub use center::NotificationCenter;
pub use types::{Severity, Toast};
