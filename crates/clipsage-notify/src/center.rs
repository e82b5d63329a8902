//! Toast list with timer-driven expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clipsage_core::config::DEFAULT_TOAST_MS;
use clipsage_core::ids::now_millis;
use clipsage_core::{IdGenerator, Notifier};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::{Severity, Toast};

#[derive(Default)]
struct Board {
    toasts: Vec<Toast>,
    /// Pending expiry timers by toast id.
    timers: HashMap<String, JoinHandle<()>>,
}

/// Shared notification center.
///
/// Expiry timers run on the ambient tokio runtime. Outside a runtime toasts
/// still work but never expire on their own.
pub struct NotificationCenter {
    board: Arc<RwLock<Board>>,
    ids: IdGenerator,
    default_lifetime_ms: i64,
    notifier: Notifier,
}

impl NotificationCenter {
    pub fn new(notifier: Notifier) -> Self {
        Self::with_default_lifetime(notifier, DEFAULT_TOAST_MS)
    }

    pub fn with_default_lifetime(notifier: Notifier, default_lifetime_ms: i64) -> Self {
        Self {
            board: Arc::new(RwLock::new(Board::default())),
            ids: IdGenerator::new("toast"),
            default_lifetime_ms,
            notifier,
        }
    }

    /// Current toasts, oldest first.
    pub fn toasts(&self) -> Vec<Toast> {
        self.board.read().toasts.clone()
    }

    pub fn len(&self) -> usize {
        self.board.read().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a toast and schedule its expiry. Returns the toast id.
    pub fn show(&self, message: impl Into<String>, severity: Severity, lifetime_ms: i64) -> String {
        let id = self.ids.next_id();
        let toast = Toast {
            id: id.clone(),
            message: message.into(),
            severity,
            duration: lifetime_ms,
            created_at: now_millis(),
        };
        debug!("Toast {} [{}]: {}", id, severity, toast.message);

        {
            // Hold the board while spawning so the timer cannot fire before
            // its handle is registered.
            let mut board = self.board.write();
            board.toasts.push(toast);
            if lifetime_ms > 0 {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let handle = runtime.spawn(expire_after(
                            self.board.clone(),
                            self.notifier.clone(),
                            id.clone(),
                            Duration::from_millis(lifetime_ms as u64),
                        ));
                        board.timers.insert(id.clone(), handle);
                    }
                    Err(_) => warn!("No async runtime, toast {} will not expire", id),
                }
            }
        }

        self.notifier.notify("toasts");
        id
    }

    /// Remove a toast and cancel its timer. Unknown ids are ignored.
    pub fn dismiss(&self, id: &str) {
        let removed = {
            let mut board = self.board.write();
            if let Some(timer) = board.timers.remove(id) {
                timer.abort();
            }
            let before = board.toasts.len();
            board.toasts.retain(|t| t.id != id);
            board.toasts.len() != before
        };
        if removed {
            self.notifier.notify("toasts");
        }
    }

    pub fn dismiss_all(&self) {
        {
            let mut board = self.board.write();
            for (_, timer) in board.timers.drain() {
                timer.abort();
            }
            board.toasts.clear();
        }
        self.notifier.notify("toasts");
    }

    pub fn success(&self, message: impl Into<String>, lifetime_ms: Option<i64>) -> String {
        self.show(message, Severity::Success, self.lifetime(lifetime_ms))
    }

    pub fn error(&self, message: impl Into<String>, lifetime_ms: Option<i64>) -> String {
        self.show(message, Severity::Error, self.lifetime(lifetime_ms))
    }

    pub fn info(&self, message: impl Into<String>, lifetime_ms: Option<i64>) -> String {
        self.show(message, Severity::Info, self.lifetime(lifetime_ms))
    }

    pub fn warning(&self, message: impl Into<String>, lifetime_ms: Option<i64>) -> String {
        self.show(message, Severity::Warning, self.lifetime(lifetime_ms))
    }

    fn lifetime(&self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(self.default_lifetime_ms)
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        for (_, timer) in self.board.write().timers.drain() {
            timer.abort();
        }
    }
}

async fn expire_after(board: Arc<RwLock<Board>>, notifier: Notifier, id: String, after: Duration) {
    tokio::time::sleep(after).await;
    let removed = {
        let mut board = board.write();
        board.timers.remove(&id);
        let before = board.toasts.len();
        board.toasts.retain(|t| t.id != id);
        board.toasts.len() != before
    };
    if removed {
        debug!("Toast {} expired", id);
        notifier.notify("toasts");
    }
}
