//! Google Gemini backend for listing content generation.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use kiez_core::{Error, RawSuggestion, Result};

use crate::generator::{build_prompt, parse_model_output, ListingContentBackend};

/// Default Gemini model for listing generation.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini-based listing content backend.
pub struct GeminiBackend {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            api_key,
            client: reqwest::Client::new(),
            timeout_secs: 60,
        }
    }

    /// Create from environment variables.
    /// Returns None if GOOGLE_GEMINI_API_KEY is not set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_GEMINI_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        let model = std::env::var("GEMINI_MODEL")
            .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        Some(Self::new(api_key, model))
    }

    /// Override the API base URL (tests point this at a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String, // base64 encoded
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl ListingContentBackend for GeminiBackend {
    async fn generate(
        &self,
        image_data: &[u8],
        mime_type: &str,
        language: &str,
    ) -> Result<RawSuggestion> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_data);
        let prompt = build_prompt(language);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: image_b64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 1000,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "Gemini API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("Failed to parse Gemini response: {}", e)))?;

        let text = result
            .candidates
            .and_then(|mut c| {
                if c.is_empty() {
                    None
                } else {
                    c.remove(0).content.parts.into_iter().find_map(|p| p.text)
                }
            })
            .ok_or_else(|| Error::Generation("No content generated by Gemini API".into()))?;

        tracing::debug!(
            subsystem = "inference",
            component = "gemini",
            op = "generate",
            response_len = text.len(),
            "Model output received"
        );
        Ok(parse_model_output(&text))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }] }
            }]
        })
    }

    #[test]
    fn test_backend_construction() {
        let backend = GeminiBackend::new("key".into(), DEFAULT_GEMINI_MODEL.into());
        assert_eq!(backend.model_name(), "gemini-2.0-flash-exp");
        assert_eq!(backend.timeout_secs, 60);
    }

    #[test]
    fn test_from_env_requires_key() {
        std::env::remove_var("GOOGLE_GEMINI_API_KEY");
        assert!(GeminiBackend::from_env().is_none());
    }

    #[tokio::test]
    async fn test_generate_parses_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash-exp:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "temperature": 0.7, "maxOutputTokens": 1000 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(
                r#"{"title": "Red Bicycle", "description": "A city bike.", "category": "sports"}"#,
            )))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".into(), DEFAULT_GEMINI_MODEL.into())
            .with_base_url(server.uri());
        let suggestion = backend.generate(b"fake-image", "image/png", "en").await.unwrap();

        assert_eq!(suggestion.title, "Red Bicycle");
        assert_eq!(suggestion.category.as_deref(), Some("sports"));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_prose_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response(
                "Title: Red Bicycle\nA sturdy city bike with a basket.",
            )))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".into(), DEFAULT_GEMINI_MODEL.into())
            .with_base_url(server.uri());
        let suggestion = backend.generate(b"fake-image", "image/png", "en").await.unwrap();

        assert_eq!(suggestion.title, "Red Bicycle");
        assert_eq!(suggestion.description, "A sturdy city bike with a basket.");
    }

    #[tokio::test]
    async fn test_generate_error_on_api_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".into(), DEFAULT_GEMINI_MODEL.into())
            .with_base_url(server.uri());
        let err = backend.generate(b"img", "image/png", "en").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn test_generate_error_on_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key".into(), DEFAULT_GEMINI_MODEL.into())
            .with_base_url(server.uri());
        let err = backend.generate(b"img", "image/png", "en").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
