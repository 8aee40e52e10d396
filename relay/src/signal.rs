//! Graceful shutdown signal handling.
//!
//! [`Shutdown`] listens for SIGTERM/SIGINT on Unix (Ctrl+C on Windows) and
//! trips a [`CancellationToken`] that the HTTP server consumes as its
//! graceful-shutdown trigger.

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Handle over the signal watcher task and its cancellation root.
#[allow(missing_debug_implementations)]
pub struct Shutdown {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Shutdown {
    /// Registers the OS signal listeners and spawns the watcher task.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    pub fn install() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let trigger = token.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tracker.spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => trigger.cancel(),
                    _ = sigint.recv() => trigger.cancel(),
                }
            });
        }

        #[cfg(not(unix))]
        tracker.spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            trigger.cancel();
        });

        tracker.close();
        Ok(Self { token, tracker })
    }

    /// A token that resolves once a shutdown signal arrives.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the watcher task to wind down. Call after cancellation.
    pub async fn drain(&self) {
        self.tracker.wait().await;
    }
}
