use crate::ear::Ear;
use crate::engine::AudioOutput;
use crate::handlers::{Dispatched, Dispatcher};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub const MSG_GREETING: &str = "Hello! I'm Ramu, your personal assistant. What can I do for you?";
pub const MSG_CRITICAL: &str =
    "I've encountered a critical error. Restarting my listening process.";

/// Result of one listen-and-handle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(Dispatched),
    /// A handler failed or panicked and the loop recovered.
    Recovered,
}

/// The outer run loop: capture, dispatch, repeat.
pub struct Assistant {
    ear: Arc<Ear>,
    dispatcher: Dispatcher,
    output: Arc<dyn AudioOutput>,
    recovery_delay: Duration,
}

impl Assistant {
    pub fn new(
        ear: Arc<Ear>,
        dispatcher: Dispatcher,
        output: Arc<dyn AudioOutput>,
        recovery_delay: Duration,
    ) -> Self {
        Self {
            ear,
            dispatcher,
            output,
            recovery_delay,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn greet(&self) {
        if let Err(e) = self.output.speak(MSG_GREETING).await {
            tracing::warn!("Could not speak greeting: {}", e);
        }
    }

    /// Greets once, then handles commands until the process is killed.
    pub async fn run(&self) {
        self.greet().await;
        loop {
            self.run_cycle().await;
        }
    }

    /// Runs one cycle; errors and panics from handlers never escape.
    pub async fn run_cycle(&self) -> CycleOutcome {
        match AssertUnwindSafe(self.step()).catch_unwind().await {
            Ok(Ok(dispatched)) => CycleOutcome::Completed(dispatched),
            Ok(Err(e)) => {
                tracing::error!("An unexpected error occurred in the main loop: {:#}", e);
                self.recover().await;
                CycleOutcome::Recovered
            }
            Err(panic) => {
                tracing::error!(
                    "Command handler panicked in the main loop: {}",
                    panic_message(panic.as_ref())
                );
                self.recover().await;
                CycleOutcome::Recovered
            }
        }
    }

    async fn step(&self) -> anyhow::Result<Dispatched> {
        let utterance = self.ear.capture().await;
        self.dispatcher.dispatch(&utterance).await
    }

    async fn recover(&self) {
        if let Err(e) = self.output.speak(MSG_CRITICAL).await {
            tracing::warn!("Could not announce restart: {}", e);
        }
        tokio::time::sleep(self.recovery_delay).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
