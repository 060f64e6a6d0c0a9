use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::warn;

/// Quiescence window used when none is configured.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(50);

/// Trailing-edge debounce for render notifications.
///
/// Every [`schedule`](Self::schedule) aborts the pending timer and arms a new one, so
/// a burst of updates produces a single notification once the stream has been quiet
/// for `window`. The pending timer is aborted on [`cancel`](Self::cancel) and on drop.
///
/// Timers are tokio tasks. Outside a runtime nothing is armed and the notification
/// is dropped.
#[derive(Debug)]
pub struct UpdateThrottle {
    window: Duration,
    pending: Option<AbortHandle>,
}

impl UpdateThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replaces any pending notification with `notify`, fired after the window.
    pub fn schedule<F>(&mut self, notify: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime; dropping render notification");
            return;
        };
        let window = self.window;
        let handle = runtime.spawn(async move {
            sleep(window).await;
            notify();
        })
        .abort_handle();
        self.pending = Some(handle);
    }

    /// Drops the pending notification. Returns whether one was still armed.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let armed = !handle.is_finished();
                handle.abort();
                armed
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for UpdateThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_WINDOW)
    }
}

impl Drop for UpdateThrottle {
    fn drop(&mut self) {
        self.cancel();
    }
}
