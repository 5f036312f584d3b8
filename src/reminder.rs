use crate::engine::AudioOutput;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A reminder waiting to be spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderJob {
    pub minutes: f64,
    pub text: String,
}

impl ReminderJob {
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.minutes * 60.0).unwrap_or(Duration::ZERO)
    }

    pub fn announcement(&self) -> String {
        format!("Reminder: {}", self.text)
    }
}

/// Fires reminders from detached tasks on the runtime.
///
/// Jobs cannot be cancelled and do not survive a restart.
#[derive(Clone)]
pub struct ReminderScheduler {
    output: Arc<dyn AudioOutput>,
    started: Arc<AtomicUsize>,
}

impl ReminderScheduler {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self {
            output,
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns as soon as the timer task is spawned.
    pub fn schedule(&self, job: ReminderJob) {
        let output = self.output.clone();
        let delay = job.delay();
        tracing::info!("Reminder set for {:?}: '{}'", delay, job.text);
        self.started.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = output.speak(&job.announcement()).await {
                tracing::warn!("Failed to deliver reminder '{}': {}", job.text, e);
            }
        });
    }

    /// Number of reminder tasks started since launch.
    pub fn scheduled_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}
