//! JSON-over-HTTP generation client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{GenerationError, GenerationRequest, GenerationResponse, GenerationService};

pub struct HttpGenerationClient {
    client: Client,
    base_url: String,
}

impl HttpGenerationClient {
    /// Create a client for the service at `base_url`; `timeout` applies per request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/generate-response", self.base_url)
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::InvalidResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            GenerationError::InvalidResponse(format!(
                "Failed to parse response: {} - Body: {}",
                e, body
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::conversation::{Character, CharacterPair, ConversationLog};
    use crate::session::JudgeScores;

    fn request() -> GenerationRequest {
        GenerationRequest {
            characters: CharacterPair {
                character1: Character::new("Sam", "curious", "chess").unwrap(),
                character2: Character::new("Lee", "dry wit", "baking").unwrap(),
            },
            conversation: ConversationLog::new(),
            judge_feedback: "more jokes".into(),
            judge_scores: JudgeScores::default(),
        }
    }

    fn client(server: &MockServer) -> HttpGenerationClient {
        HttpGenerationClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-response"))
            .and(body_partial_json(json!({
                "characters": {"character1": {"name": "Sam"}, "character2": {"name": "Lee"}},
                "conversation": [],
                "judgeFeedback": "more jokes",
                "judgeScores": {"chemistry": 5, "engagement": 5, "authenticity": 5}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "character1Response": "Hi, I'm Sam.",
                "character2Response": "Lee. Charmed."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).generate(&request()).await.unwrap();
        assert_eq!(response.character1_response, "Hi, I'm Sam.");
        assert_eq!(response.character2_response, "Lee. Charmed.");
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-response"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_generate_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate-response"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reply": "only one"
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }
}
