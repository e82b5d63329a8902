//! The `loading` / `error` pair every container carries.

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::Error;
use crate::events::Notifier;

/// Snapshot of a container's operation status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Shared status cell. Overlapping operations are not fenced: the last one to
/// finish decides the final `loading` / `error` values.
pub struct StatusCell {
    inner: RwLock<OpStatus>,
    notifier: Notifier,
}

impl StatusCell {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            inner: RwLock::new(OpStatus::default()),
            notifier,
        }
    }

    pub fn snapshot(&self) -> OpStatus {
        self.inner.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    /// Mark an operation as started. `loading` drops back to false when the
    /// returned guard is dropped, whichever way the operation exits.
    pub fn begin(&self) -> InFlight<'_> {
        {
            let mut status = self.inner.write();
            status.loading = true;
            status.error = None;
        }
        self.notifier.notify("status");
        InFlight { cell: self }
    }

    /// Record a failure message.
    pub fn fail(&self, err: &Error) {
        self.inner.write().error = Some(err.to_string());
        self.notifier.notify("status");
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
        self.notifier.notify("status");
    }

    pub fn reset(&self) {
        *self.inner.write() = OpStatus::default();
        self.notifier.notify("status");
    }
}

/// Guard returned by [`StatusCell::begin`].
#[must_use = "loading is cleared as soon as the guard is dropped"]
pub struct InFlight<'a> {
    cell: &'a StatusCell,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cell.inner.write().loading = false;
        self.cell.notifier.notify("status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChangeBus, StoreKind};

    fn cell() -> StatusCell {
        StatusCell::new(ChangeBus::new(16).notifier(StoreKind::Library))
    }

    #[test]
    fn test_guard_clears_loading_but_keeps_error() {
        let status = cell();
        {
            let _guard = status.begin();
            assert!(status.is_loading());
            status.fail(&Error::Backend("boom".into()));
        }
        assert!(!status.is_loading());
        assert_eq!(status.error().as_deref(), Some("boom"));
    }

    #[test]
    fn test_begin_clears_previous_error() {
        let status = cell();
        status.fail(&Error::Backend("old".into()));
        let guard = status.begin();
        assert!(status.error().is_none());
        drop(guard);
        assert_eq!(status.snapshot(), OpStatus::default());
    }

    #[test]
    fn test_guard_runs_on_early_return() {
        fn failing(status: &StatusCell) -> Result<(), Error> {
            let _guard = status.begin();
            Err(Error::Disconnected)
        }
        let status = cell();
        assert!(failing(&status).is_err());
        assert!(!status.is_loading());
    }
}
