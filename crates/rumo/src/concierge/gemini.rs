use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ConciergeError, TextGenerator};
use crate::{config::ClientConfig, error::RumoError};

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, RumoError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or(ConciergeError::MissingApiKey)?;
        Ok(Self {
            client: config.http_client()?,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.gemini_url.trim_end_matches('/'),
                config.gemini_model
            ),
            api_key,
        })
    }
}

impl TextGenerator for GeminiClient {
    #[instrument(name = "Gemini generate", level = "debug", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, ConciergeError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConciergeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = response.json().await?;
        let text = reply.into_text().ok_or(ConciergeError::EmptyResponse)?;
        debug!(chars = text.len(), "Gemini replied");
        Ok(text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate.
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>) -> ClientConfig {
        ClientConfig {
            gemini_url: "http://localhost:9000/v1beta/".to_string(),
            gemini_model: "test-model".to_string(),
            gemini_api_key: key.map(ToString::to_string),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiClient::new(&config(None)),
            Err(RumoError::Concierge(ConciergeError::MissingApiKey))
        ));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(&config(Some("k"))).unwrap();
        assert_eq!(
            client.endpoint,
            "http://localhost:9000/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "oi" }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"contents": [{"parts": [{"text": "oi"}]}]})
        );
    }

    #[test]
    fn test_response_text() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "primeiro"}, {"text": "segundo"}], "role": "model"}},
                {"content": {"parts": [{"text": "outro"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 10}
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("primeiro"));

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(blocked.into_text().is_none());
    }
}
