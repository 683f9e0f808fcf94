//! Cancellable handles for the wizard's timed work.

use std::future::Future;

use tokio::task::JoinHandle;

/// A spawned task tied to one wizard step.
///
/// Cancelling or dropping the handle aborts the task, so replacing the
/// schedule on a step change stops whatever the previous step armed.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `future` on the current tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: Some(tokio::spawn(future)),
        }
    }

    /// Abort the task if it is still running.
    pub fn cancel(mut self) {
        self.abort();
    }

    /// Give up the handle without aborting.
    ///
    /// Used by a task that is about to replace its own schedule: aborting
    /// itself would cut off the work it is still doing.
    pub fn detach(mut self) {
        self.handle.take();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.abort();
    }
}
