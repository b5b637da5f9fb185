//! Shared periodic scheduler.
//!
//! Components register their recurring work through [`Scheduler::every`]
//! instead of starting timers on construction, so the owning process decides
//! when ticks begin and tests can drive time manually.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Process-wide recurring-timer facility.
#[derive(Default)]
pub struct Scheduler {
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` every `period`, starting one period from now.
    ///
    /// Ticks of the same task never overlap: a tick that is still running when
    /// the next one is due delays it.
    pub fn every<F, Fut>(&self, name: &'static str, period: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!(task = name, "Scheduler tick");
                task().await;
            }
        });

        info!(task = name, period_ms = period.as_millis() as u64, "Scheduled periodic task");
        self.handles.lock().push((name, handle));
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of registered tasks, in registration order.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.handles.lock().iter().map(|(name, _)| *name).collect()
    }

    /// Abort every registered task and wait until each has stopped.
    ///
    /// A tick cancelled mid-run has dropped its future, and with it any guard
    /// it held, by the time this returns.
    pub async fn shutdown(&self) {
        let handles = self.abort_all();
        let count = handles.len();

        for (name, handle) in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(task = name, error = %e, "Periodic task panicked");
                }
            }
        }

        if count > 0 {
            info!(tasks = count, "Scheduler stopped");
        }
    }

    fn abort_all(&self) -> Vec<(&'static str, JoinHandle<()>)> {
        let handles = std::mem::take(&mut *self.handles.lock());
        for (_, handle) in &handles {
            handle.abort();
        }
        handles
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.abort_all();
    }
}
