//! Turn orchestration
//!
//! `run_round` is the only way new dialogue enters a session:
//! 1. Take the generation gate, or skip the trigger if a round is running
//! 2. Snapshot characters, log and judge input
//! 3. Ask the generation service for one reply per character
//! 4. Append both replies, character1 first
//! 5. On failure, log and leave the session untouched
//!
//! The gate permit is dropped on every path out of `run_round`.

use std::sync::Arc;
use std::time::Duration;

use crate::generation::{GenerationError, GenerationService};
use crate::session::Session;

use super::gate::GenerationGate;

#[derive(Debug)]
pub enum RoundOutcome {
    /// Both replies appended; carries the new log length
    Completed { log_len: usize },
    /// Another round was already in flight
    Skipped,
    Failed(GenerationError),
}

pub struct TurnOrchestrator {
    session: Arc<Session>,
    generator: Arc<dyn GenerationService>,
    gate: GenerationGate,
    timeout: Duration,
}

impl TurnOrchestrator {
    /// Build an orchestrator with its own gate. `timeout` bounds each generation call.
    pub fn new(
        session: Arc<Session>,
        generator: Arc<dyn GenerationService>,
        timeout: Duration,
    ) -> Self {
        Self {
            session,
            generator,
            gate: GenerationGate::new(),
            timeout,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Whether a round is waiting on the generation service
    pub fn is_generating(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Run one round: snapshot the session, ask for both replies and append them.
    ///
    /// Skips when another round holds the gate. On failure or timeout the
    /// session is left as it was. The gate is released on every path.
    pub async fn run_round(&self) -> RoundOutcome {
        let Some(permit) = self.gate.try_acquire() else {
            tracing::debug!(session = %self.session.id(), "Round already in flight, skipping trigger");
            return RoundOutcome::Skipped;
        };

        let request = self.session.generation_request().await;
        let round = request.conversation.rounds() + 1;
        tracing::info!(session = %self.session.id(), round, "Requesting dialogue");

        let result = match tokio::time::timeout(self.timeout, self.generator.generate(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::TimedOut(self.timeout)),
        };

        let outcome = match result {
            Ok(response) => {
                let log_len = self
                    .session
                    .append_round_result(response.character1_response, response.character2_response)
                    .await;
                tracing::info!(session = %self.session.id(), round, log_len, "Round appended");
                RoundOutcome::Completed { log_len }
            }
            Err(e) => {
                tracing::error!(session = %self.session.id(), round, error = %e, "Error generating response");
                RoundOutcome::Failed(e)
            }
        };

        permit.release();
        outcome
    }
}
