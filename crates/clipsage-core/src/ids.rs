//! Process-unique identifiers for locally created records.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generates `<prefix>-<counter>-<unix millis>` ids.
///
/// The counter keeps ids distinct within one millisecond, the timestamp keeps
/// them distinct across generators that restart from zero.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: &'static str,
    counter: AtomicU64,
}

impl IdGenerator {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", self.prefix, n, now_millis())
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_in_tight_loop() {
        let ids = IdGenerator::new("msg");
        let seen: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_id_shape() {
        let ids = IdGenerator::new("toast");
        let id = ids.next_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "toast");
        assert_eq!(parts[1], "0");
        assert!(parts[2].parse::<i64>().is_ok());
    }
}
