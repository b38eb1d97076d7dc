//! Monotonic timestamps and session id generation.
//!
//! Wall time and id generation are behind a trait for the same reason
//! network detection and task spawning are: tests need a deterministic
//! substitute for what is otherwise nondeterministic.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Source of timestamps and session identifiers.
pub trait Clock: Send + Sync {
    /// Current time as Unix milliseconds.
    fn now_millis(&self) -> u64;

    /// Current time as an ISO-8601 string with millisecond precision.
    fn now_iso(&self) -> String;

    /// Generates a new session id.
    fn new_session_id(&self) -> Uuid;
}

/// Real-time clock backed by the system clock and random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn now_iso(&self) -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn new_session_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Fixed clock for tests: every call returns the same instant and a
/// caller-supplied sequence of ids.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::{Clock, Uuid};
    use parking_lot::Mutex;

    pub struct FixedClock {
        millis: u64,
        iso: String,
        ids: Mutex<Vec<Uuid>>,
    }

    impl FixedClock {
        pub fn new(millis: u64, iso: impl Into<String>, ids: Vec<Uuid>) -> Self {
            Self {
                millis,
                iso: iso.into(),
                ids: Mutex::new(ids),
            }
        }
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.millis
        }

        fn now_iso(&self) -> String {
            self.iso.clone()
        }

        fn new_session_id(&self) -> Uuid {
            self.ids.lock().pop().unwrap_or_else(Uuid::nil)
        }
    }
}
