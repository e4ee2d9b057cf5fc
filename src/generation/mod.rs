//! Generation service integration
//!
//! The dialogue backend is an opaque request/response service: it receives
//! the characters, the conversation so far and the judge's input, and
//! answers with one reply per character.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::{CharacterPair, ConversationLog};
use crate::session::JudgeScores;

pub use http::HttpGenerationClient;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Generation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Everything the generation service sees for one round
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub characters: CharacterPair,
    pub conversation: ConversationLog,
    pub judge_feedback: String,
    pub judge_scores: JudgeScores,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub character1_response: String,
    pub character2_response: String,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, GenerationError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_field_order_is_irrelevant() {
        let response: GenerationResponse = serde_json::from_str(
            r#"{"character2Response": "second", "character1Response": "first"}"#,
        )
        .unwrap();
        assert_eq!(response.character1_response, "first");
        assert_eq!(response.character2_response, "second");
    }

    #[test]
    fn test_response_missing_field_is_rejected() {
        let parsed = serde_json::from_str::<GenerationResponse>(r#"{"character1Response": "x"}"#);
        assert!(parsed.is_err());
    }
}
