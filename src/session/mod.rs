//! Session state and the judge edit channel
//!
//! `SessionState` is plain data with synchronous mutators. `Session` is the
//! shared, lock-protected handle the orchestrator and the HTTP layer hold;
//! every judge edit that changes the state is published on an mpsc channel
//! for the debouncer to consume.

mod scores;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::conversation::{CharacterPair, ConversationLog};
use crate::generation::GenerationRequest;

pub use scores::{JudgeScores, ScoreCategory, MAX_SCORE, MIN_SCORE};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(
        "Score for {category} must be between {min} and {max}, got {value}",
        min = MIN_SCORE,
        max = MAX_SCORE
    )]
    ScoreOutOfRange { category: ScoreCategory, value: i64 },

    #[error("Unknown score category: {0}")]
    UnknownCategory(String),
}

/// A judge edit that changed the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeEvent {
    Feedback,
    Score(ScoreCategory, u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    characters: CharacterPair,
    log: ConversationLog,
    feedback: String,
    scores: JudgeScores,
}

impl SessionState {
    pub fn new(characters: CharacterPair) -> Self {
        Self {
            characters,
            log: ConversationLog::new(),
            feedback: String::new(),
            scores: JudgeScores::default(),
        }
    }

    pub fn characters(&self) -> &CharacterPair {
        &self.characters
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn scores(&self) -> &JudgeScores {
        &self.scores
    }

    /// Append one generated round. Texts are stored verbatim, empty included.
    pub fn append_round_result(&mut self, reply1: String, reply2: String) {
        self.log.push_round(&self.characters, reply1, reply2);
    }

    /// Returns whether the feedback changed
    pub fn set_feedback(&mut self, text: String) -> bool {
        if self.feedback == text {
            return false;
        }
        self.feedback = text;
        true
    }

    /// Returns whether the score changed; out-of-range values are rejected
    pub fn set_score(&mut self, category: ScoreCategory, value: i64) -> Result<bool, SessionError> {
        self.scores.set(category, value)
    }

    /// Whether the judge has steered away from the untouched defaults
    pub fn judge_input_active(&self) -> bool {
        !self.feedback.is_empty() || !self.scores.is_default()
    }

    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest {
            characters: self.characters.clone(),
            conversation: self.log.clone(),
            judge_feedback: self.feedback.clone(),
            judge_scores: self.scores,
        }
    }
}

/// Shared handle to a live session's state
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: RwLock<SessionState>,
    judge_events: mpsc::UnboundedSender<JudgeEvent>,
}

impl Session {
    pub fn new(characters: CharacterPair, judge_events: mpsc::UnboundedSender<JudgeEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RwLock::new(SessionState::new(characters)),
            judge_events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn set_feedback(&self, text: impl Into<String>) {
        let changed = self.state.write().await.set_feedback(text.into());
        if changed {
            self.publish(JudgeEvent::Feedback);
        }
    }

    pub async fn set_score(&self, category: ScoreCategory, value: i64) -> Result<(), SessionError> {
        let changed = self.state.write().await.set_score(category, value)?;
        if changed {
            self.publish(JudgeEvent::Score(category, value as u8));
        }
        Ok(())
    }

    /// Append a round and return the new log length
    pub async fn append_round_result(&self, reply1: String, reply2: String) -> usize {
        let mut state = self.state.write().await;
        state.append_round_result(reply1, reply2);
        state.log().len()
    }

    pub async fn generation_request(&self) -> GenerationRequest {
        self.state.read().await.generation_request()
    }

    pub async fn judge_input_active(&self) -> bool {
        self.state.read().await.judge_input_active()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    fn publish(&self, event: JudgeEvent) {
        if self.judge_events.send(event).is_err() {
            tracing::debug!(session = %self.id, "Judge edit after debouncer shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Character, CharacterSlot};

    fn pair() -> CharacterPair {
        CharacterPair {
            character1: Character::new("Sam", "curious", "chess").unwrap(),
            character2: Character::new("Lee", "dry wit", "baking").unwrap(),
        }
    }

    #[test]
    fn test_new_state_defaults() {
        let state = SessionState::new(pair());
        assert!(state.log().is_empty());
        assert_eq!(state.feedback(), "");
        assert!(state.scores().is_default());
        assert!(!state.judge_input_active());
    }

    #[test]
    fn test_append_round_result() {
        let mut state = SessionState::new(pair());
        state.append_round_result("one".into(), "two".into());
        state.append_round_result(String::new(), String::new());

        let utterances = state.log().utterances();
        assert_eq!(utterances.len(), 4);
        assert_eq!(utterances[0].sender, "Sam");
        assert_eq!(utterances[1].sender, "Lee");
        assert_eq!(utterances[2].slot, CharacterSlot::Character1);
        assert_eq!(utterances[3].text, "");
    }

    #[test]
    fn test_judge_input_active() {
        let mut state = SessionState::new(pair());
        assert!(state.set_feedback("more banter".into()));
        assert!(!state.set_feedback("more banter".into()));
        assert!(state.judge_input_active());

        state.set_feedback(String::new());
        assert!(!state.judge_input_active());

        state.set_score(ScoreCategory::Engagement, 7).unwrap();
        assert!(state.judge_input_active());
        state.set_score(ScoreCategory::Engagement, 5).unwrap();
        assert!(!state.judge_input_active());
    }

    #[test]
    fn test_rejected_score_leaves_state_untouched() {
        let mut state = SessionState::new(pair());
        let before = state.clone();
        assert!(state.set_score(ScoreCategory::Chemistry, 42).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_generation_request_is_a_snapshot() {
        let mut state = SessionState::new(pair());
        state.set_feedback("be bolder".into());
        let request = state.generation_request();

        state.append_round_result("a".into(), "b".into());
        state.set_feedback("calm down".into());

        assert!(request.conversation.is_empty());
        assert_eq!(request.judge_feedback, "be bolder");
    }

    #[tokio::test]
    async fn test_session_publishes_only_changes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new(pair(), tx);

        session.set_feedback("flirt more").await;
        session.set_feedback("flirt more").await;
        session.set_score(ScoreCategory::Chemistry, 8).await.unwrap();
        session.set_score(ScoreCategory::Chemistry, 8).await.unwrap();
        assert!(session.set_score(ScoreCategory::Chemistry, 0).await.is_err());

        assert_eq!(rx.recv().await, Some(JudgeEvent::Feedback));
        assert_eq!(
            rx.recv().await,
            Some(JudgeEvent::Score(ScoreCategory::Chemistry, 8))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_session_edits_survive_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let session = Session::new(pair(), tx);
        session.set_feedback("still works").await;
        assert_eq!(session.snapshot().await.feedback(), "still works");
    }
}
