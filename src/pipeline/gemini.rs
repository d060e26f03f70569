//! Gemini HTTP client for multimodal receipt reading.
//!
//! The `VisionClient` trait is the seam between the extraction logic and the
//! network: the production impl talks to the Google Generative Language API,
//! the mock lives beside it for tests. The client is constructed once at
//! process start and injected; nothing here is a module-level global.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum GeminiError {
    /// The API credential is absent. Surfaced before any network traffic so
    /// operators can tell a deployment problem from a flaky model reply.
    #[error("chave GEMINI_API_KEY não configurada no servidor")]
    MissingApiKey,

    #[error("não foi possível conectar ao serviço Gemini: {0}")]
    Connection(String),

    #[error("Gemini API retornou status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("resposta do Gemini em formato inesperado: {0}")]
    ResponseShape(String),
}

/// Seam for the one outbound multimodal generation call.
pub trait VisionClient: Send + Sync {
    /// Send `prompt` plus one base64-encoded image and return the model's
    /// raw text reply.
    fn generate_with_image(
        &self,
        prompt: &str,
        mime_type: &str,
        image_base64: &str,
    ) -> Result<String, GeminiError>;
}

// ──────────────────────────────────────────────
// GeminiClient
// ──────────────────────────────────────────────

pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.gemini_base_url,
            &config.gemini_model,
            config.gemini_api_key.clone(),
            config.gemini_timeout_secs,
        )
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inline_data")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mime_type")]
    mime_type: &'a str,
    data: &'a str,
}

/// Deterministic extraction: temperature 0.
#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
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

impl VisionClient for GeminiClient {
    fn generate_with_image(
        &self,
        prompt: &str,
        mime_type: &str,
        image_base64: &str,
    ) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: image_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GeminiError::Connection(e.to_string())
                } else {
                    GeminiError::Connection(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| GeminiError::ResponseShape(e.to_string()))?;

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::ResponseShape(
                "resposta sem candidatos de texto".into(),
            ));
        }

        Ok(text)
    }
}

// ──────────────────────────────────────────────
// MockVisionClient (testing)
// ──────────────────────────────────────────────

/// Mock vision client returning a canned reply and counting calls.
pub struct MockVisionClient {
    reply: Result<String, fn() -> GeminiError>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockVisionClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(make_error: fn() -> GeminiError) -> Self {
        Self {
            reply: Err(make_error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl VisionClient for MockVisionClient {
    fn generate_with_image(
        &self,
        _prompt: &str,
        _mime_type: &str,
        _image_base64: &str,
    ) -> Result<String, GeminiError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_fails_before_any_network_call() {
        // Unroutable base URL: if the client attempted the request, the
        // error would be Connection, not MissingApiKey.
        let client = GeminiClient::new("http://127.0.0.1:1", "gemini-1.5-flash", None, 1);
        let err = client
            .generate_with_image("prompt", "image/jpeg", "aGVsbG8=")
            .unwrap_err();
        assert!(matches!(err, GeminiError::MissingApiKey));
    }

    #[test]
    fn request_body_shape_matches_api() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "leia" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "QUJD",
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "leia");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn response_parsing_joins_text_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"valor\""},{"text":": 10}"}]}}]}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(text, "{\"valor\": 10}");
    }

    #[test]
    fn mock_counts_calls() {
        let mock = MockVisionClient::new("ok");
        assert_eq!(mock.call_count(), 0);
        mock.generate_with_image("p", "image/jpeg", "x").unwrap();
        mock.generate_with_image("p", "image/jpeg", "x").unwrap();
        assert_eq!(mock.call_count(), 2);
    }
}
