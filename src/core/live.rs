//! A running session: state, orchestrator and debouncer wired together

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::conversation::{CharacterError, CharacterRoster};
use crate::generation::GenerationService;
use crate::session::Session;

use super::debounce::JudgeInputDebouncer;
use super::orchestrator::{RoundOutcome, TurnOrchestrator};

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub debounce: Duration,
    pub generation_timeout: Duration,
}

/// Lives as long as the judge is watching. Dropping it ends the session and
/// cancels any pending debounce timer.
pub struct LiveSession {
    orchestrator: Arc<TurnOrchestrator>,
    _debouncer: JudgeInputDebouncer,
}

impl LiveSession {
    /// Start a session from a stored roster and kick off the opening round.
    ///
    /// A missing or partial roster fails before anything is generated.
    pub fn start(
        roster: Option<CharacterRoster>,
        generator: Arc<dyn GenerationService>,
        settings: SessionSettings,
    ) -> Result<Self, CharacterError> {
        let roster = roster.ok_or_else(|| {
            CharacterError::MissingCharacterPair(CharacterRoster::new().missing_slots())
        })?;
        let characters = roster.into_pair()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session::new(characters, tx));
        let orchestrator = Arc::new(TurnOrchestrator::new(
            session,
            generator,
            settings.generation_timeout,
        ));
        let debouncer = JudgeInputDebouncer::spawn(settings.debounce, rx, orchestrator.clone());

        tracing::info!(session = %orchestrator.session().id(), "Session started");

        // The opening exchange is not subject to the judge-input guard
        let opening = orchestrator.clone();
        tokio::spawn(async move {
            match opening.run_round().await {
                RoundOutcome::Completed { log_len } => {
                    tracing::debug!(log_len, "Opening exchange ready")
                }
                RoundOutcome::Failed(e) => {
                    tracing::warn!(error = %e, "Opening exchange failed, waiting for judge input")
                }
                RoundOutcome::Skipped => {}
            }
        });

        Ok(Self {
            orchestrator,
            _debouncer: debouncer,
        })
    }

    pub fn id(&self) -> Uuid {
        self.orchestrator.session().id()
    }

    pub fn session(&self) -> &Arc<Session> {
        self.orchestrator.session()
    }

    pub fn is_generating(&self) -> bool {
        self.orchestrator.is_generating()
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        tracing::info!(session = %self.id(), "Session ended");
    }
}
