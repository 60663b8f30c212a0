//! Shutdown signalling for the monitor loop.
//!
//! A `ShutdownToken` is a cloneable cancellation flag. The CLI installs a
//! Ctrl+C / SIGTERM handler that cancels it; the monitor loop and the
//! mitigator poll it at every suspension point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CpuPulseError, Result};

/// How often a sleeping task re-checks the token.
pub const POLL_GRANULARITY: Duration = Duration::from_millis(100);

const MIN_GRANULARITY: Duration = Duration::from_millis(1);

/// Cancellation token shared between the monitor and whoever stops it.
///
/// # Example
///
/// ```ignore
/// let token = ShutdownToken::install()?;
///
/// while !token.is_cancelled() {
///     do_work();
///     if !token.sleep(interval) {
///         break;
///     }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    cancelled: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token and registers a Ctrl+C / SIGTERM handler that cancels it.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already registered for this process.
    pub fn install() -> Result<Self> {
        let token = Self::new();
        let handler_token = token.clone();

        ctrlc::set_handler(move || {
            handler_token.cancel();
        })
        .map_err(|e| CpuPulseError::SignalHandler(e.to_string()))?;

        Ok(token)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early if the token is cancelled.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.sleep_with_granularity(duration, POLL_GRANULARITY)
    }

    fn sleep_with_granularity(&self, duration: Duration, granularity: Duration) -> bool {
        let granularity = granularity.max(MIN_GRANULARITY);
        // No deadline if it cannot be represented; only cancellation ends it
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_cancelled() {
                return false;
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    granularity.min(deadline - now)
                }
                None => granularity,
            };
            std::thread::sleep(step);
        }
    }
}
