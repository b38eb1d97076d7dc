//! Process lifecycle abstraction.
//!
//! This module provides a [`Lifecycle`] trait for controlling process-level
//! actions (shutdown with a specific exit code). The orchestrator depends on
//! the trait rather than calling `std::process::exit` directly so tests can
//! observe a shutdown request instead of killing the test process.

/// Trait for process lifecycle operations.
pub trait Lifecycle: Send + Sync {
    /// Requests process shutdown with the given exit code.
    ///
    /// Per the error taxonomy, only configuration errors and provider init
    /// failures should request a non-zero code; a clean drain requests 0.
    fn request_shutdown(&self, exit_code: i32);
}

/// Process lifecycle for the standalone server binary.
///
/// Calling `request_shutdown` here is the last thing the process does after
/// the orchestrator has run its teardown path; it is not a substitute for
/// the graceful drain itself.
pub struct ProcessLifecycle;

impl Lifecycle for ProcessLifecycle {
    fn request_shutdown(&self, exit_code: i32) {
        log::info!("[Lifecycle] Shutdown requested (exit code {})", exit_code);
        std::process::exit(exit_code);
    }
}

/// No-op lifecycle for tests or embedded use.
///
/// Records the last requested exit code instead of exiting the process.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::Lifecycle;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct RecordingLifecycle {
        pub last_exit_code: Mutex<Option<i32>>,
    }

    impl Lifecycle for RecordingLifecycle {
        fn request_shutdown(&self, exit_code: i32) {
            *self.last_exit_code.lock() = Some(exit_code);
        }
    }
}
