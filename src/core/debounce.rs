//! Trailing-edge debounce of judge edits
//!
//! Every judge edit re-arms a single timer. When the window passes with no
//! further edits, one round is triggered, provided the judge has moved off
//! the defaults (non-empty feedback or any score other than 5).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::session::JudgeEvent;

use super::orchestrator::TurnOrchestrator;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Owns the debounce task. Dropping it cancels any pending trigger.
pub struct JudgeInputDebouncer {
    task: JoinHandle<()>,
}

impl JudgeInputDebouncer {
    /// Start consuming judge edits for `orchestrator`'s session
    pub fn spawn(
        window: Duration,
        events: mpsc::UnboundedReceiver<JudgeEvent>,
        orchestrator: Arc<TurnOrchestrator>,
    ) -> Self {
        let task = tokio::spawn(debounce_loop(window, events, orchestrator));
        Self { task }
    }
}

impl Drop for JudgeInputDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    window: Duration,
    mut events: mpsc::UnboundedReceiver<JudgeEvent>,
    orchestrator: Arc<TurnOrchestrator>,
) {
    let session_id = orchestrator.session().id();
    let timer = time::sleep(window);
    tokio::pin!(timer);
    let mut armed = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    match event {
                        JudgeEvent::Feedback => {
                            tracing::trace!(session = %session_id, "Feedback edited")
                        }
                        JudgeEvent::Score(category, value) => {
                            tracing::trace!(session = %session_id, %category, value, "Score edited")
                        }
                    }
                    timer.as_mut().reset(Instant::now() + window);
                    armed = true;
                }
                None => break,
            },
            _ = &mut timer, if armed => {
                armed = false;
                if !orchestrator.session().judge_input_active().await {
                    tracing::debug!(session = %session_id, "Judge input at defaults, not regenerating");
                    continue;
                }
                // In-flight rounds outlive the debouncer
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator.run_round().await;
                });
            }
        }
    }

    tracing::debug!(session = %session_id, "Judge input channel closed");
}
