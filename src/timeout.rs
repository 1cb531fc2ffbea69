//! # Deadline Guard
//!
//! Bounds the wall-clock time of a blocking operation.
//!
//! A [`Deadline`] owns a watchdog task that cancels a [`CancellationToken`]
//! when the configured number of seconds has elapsed. Code running under the
//! guard either checks it between steps ([`Deadline::check`]) or races its
//! own awaits against [`Deadline::expired`]; [`with_deadline`] does the latter
//! for an arbitrary future.
//!
//! The watchdog is aborted when the guard is dropped or disarmed, whatever the
//! guarded operation returned, so an expiry can never fire into code that runs
//! after the guard's scope. Guards are plain values: any number can be active
//! at the same time.
//!
//! ```no_run
//! use caapf_e2e::timeout::with_deadline;
//!
//! # async fn example() -> caapf_e2e::Result<()> {
//! with_deadline(30, "waiting for the cluster", async {
//!     // ... poll something ...
//!     Ok(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{HarnessError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Scoped time box around an operation
///
/// Must be created inside a Tokio runtime; the watchdog is a spawned task.
#[derive(Debug)]
pub struct Deadline {
    seconds: i64,
    message: String,
    token: CancellationToken,
    watchdog: Option<JoinHandle<()>>,
}

impl Deadline {
    /// Arm a deadline `seconds` from now.
    ///
    /// Zero or negative durations are already expired: the first
    /// [`check`](Self::check) fails instead of waiting.
    pub fn start(seconds: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let token = CancellationToken::new();

        let watchdog = match u64::try_from(seconds) {
            Ok(secs) if secs > 0 => {
                let expiry = token.clone();
                let msg = message.clone();
                Some(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    warn!(seconds = secs, "Deadline expired: {}", msg);
                    expiry.cancel();
                }))
            }
            _ => {
                token.cancel();
                None
            }
        };

        Self {
            seconds,
            message,
            token,
            watchdog,
        }
    }

    #[must_use]
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True while the watchdog is still pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.watchdog
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Fail with [`HarnessError::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(self.exceeded());
        }
        Ok(())
    }

    /// The error this guard reports on expiry.
    #[must_use]
    pub fn exceeded(&self) -> HarnessError {
        HarnessError::DeadlineExceeded {
            message: self.message.clone(),
            seconds: self.seconds,
        }
    }

    /// Resolves when the deadline expires.
    pub async fn expired(&self) {
        self.token.cancelled().await;
    }

    /// A token cancelled at expiry, for handing to code that does not own the guard.
    ///
    /// Disarming the guard stops the watchdog, so a child token taken before
    /// that is never cancelled afterwards.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Leave the guarded scope explicitly.
    pub fn disarm(mut self) {
        self.stop_watchdog();
    }

    fn stop_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            handle.abort();
            debug!(seconds = self.seconds, "Deadline disarmed: {}", self.message);
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.stop_watchdog();
    }
}

/// Run `operation` under a fresh [`Deadline`].
///
/// The operation is interrupted at its next await point once the deadline
/// expires, and the guard is torn down before this returns on every path.
pub async fn with_deadline<T, F>(seconds: i64, message: impl Into<String>, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let deadline = Deadline::start(seconds, message);
    deadline.check()?;

    let result = tokio::select! {
        biased;
        () = deadline.expired() => Err(deadline.exceeded()),
        result = operation => result,
    };

    deadline.disarm();
    result
}
