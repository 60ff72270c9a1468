//! Remote generation client for the expert system.
//!
//! Thin boundary around the generative-language HTTP API: prompt text plus
//! attachments in, one raw text blob out. No retry or timeout logic lives
//! here; a failed call surfaces once as a `GenerationError`.

use crate::config::GenerationConfig;
use crate::llm::prompts::SYSTEM_INSTRUCTION;
use crate::messages::{Attachment, GenerationMode};
use crate::{EngenheiroError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Shown instead of an empty model reply, mirroring the rest of the UI text
const EMPTY_RESPONSE_TEXT: &str =
    "Não foi possível gerar uma resposta técnica. Verifique os dados de entrada.";

/// Boundary trait for response generation, so the session can be driven by
/// a mock in tests.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send a prompt with attachments and return the raw response text
    async fn generate(
        &self,
        prompt: &str,
        attachments: &[Attachment],
        mode: GenerationMode,
    ) -> Result<String>;
}

/// HTTP client for the Gemini generateContent endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(EngenheiroError::ConfigError("API key is missing".into()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    fn model_for(&self, mode: GenerationMode) -> &str {
        match mode {
            GenerationMode::Thinking => &self.config.thinking_model,
            GenerationMode::Plain | GenerationMode::Search => &self.config.model,
        }
    }

    fn build_request(
        &self,
        prompt: &str,
        attachments: &[Attachment],
        mode: GenerationMode,
    ) -> Value {
        // Attachments first (images/pdfs), then the text prompt
        let mut parts: Vec<Value> = attachments
            .iter()
            .map(|att| {
                json!({
                    "inlineData": {
                        "mimeType": att.mime_type,
                        "data": att.data,
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": prompt }));

        let mut request = json!({
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            },
        });

        match mode {
            GenerationMode::Plain => {}
            GenerationMode::Thinking => {
                request["generationConfig"]["thinkingConfig"] =
                    json!({ "thinkingBudget": self.config.thinking_budget });
            }
            GenerationMode::Search => {
                request["tools"] = json!([{ "googleSearch": {} }]);
            }
        }

        request
    }

    /// Concatenated text of the first candidate's parts
    fn response_text(body: &Value) -> String {
        body["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// Web-grounding citations, appended as extra markdown after the
    /// sectioned report. Parsed as an unlabeled section downstream, so
    /// they always render.
    fn citations(body: &Value) -> Option<String> {
        let chunks = body["candidates"][0]["groundingMetadata"]["groundingChunks"].as_array()?;

        let lines: Vec<String> = chunks
            .iter()
            .filter_map(|chunk| {
                let web = chunk.get("web")?;
                let uri = web["uri"].as_str()?;
                let title = web["title"].as_str().unwrap_or(uri);
                Some(format!("- [{}]({})", title, uri))
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(format!("\n\n**Fontes consultadas:**\n{}", lines.join("\n")))
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        attachments: &[Attachment],
        mode: GenerationMode,
    ) -> Result<String> {
        let model = self.model_for(mode);
        let url = format!("{}/{}:generateContent?key={}", API_BASE, model, self.config.api_key);
        let request = self.build_request(prompt, attachments, mode);

        debug!(model, ?mode, attachments = attachments.len(), "sending generation request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngenheiroError::GenerationError(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| EngenheiroError::GenerationError(e.to_string()))?;

        if !status.is_success() {
            let detail = body["error"]["message"]
                .as_str()
                .unwrap_or("Erro de comunicação com o sistema especialista.")
                .to_string();
            warn!(%status, "generation request failed: {}", detail);
            return Err(EngenheiroError::GenerationError(detail));
        }

        let mut text = Self::response_text(&body);
        if text.is_empty() {
            return Ok(EMPTY_RESPONSE_TEXT.to_string());
        }

        if mode == GenerationMode::Search {
            if let Some(citations) = Self::citations(&body) {
                text.push_str(&citations);
            }
        }

        Ok(text)
    }
}

type ScriptedReply = std::result::Result<String, String>;

/// Scripted client for unit and integration tests. Replies are consumed
/// in order; the last one repeats for any further calls.
pub struct MockGenerationClient {
    replies: parking_lot::Mutex<Vec<ScriptedReply>>,
}

impl MockGenerationClient {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(vec![Ok(text.into())]),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(vec![Err(message.into())]),
        }
    }

    pub fn sequence(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(
                texts.into_iter().map(|text| Ok(text.into())).collect(),
            ),
        }
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(
        &self,
        _prompt: &str,
        _attachments: &[Attachment],
        _mode: GenerationMode,
    ) -> Result<String> {
        let mut replies = self.replies.lock();
        let reply = if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies
                .first()
                .cloned()
                .unwrap_or_else(|| Err("no scripted reply".into()))
        };

        match reply {
            Ok(text) => Ok(text),
            Err(message) => Err(EngenheiroError::GenerationError(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(GenerationConfig {
            api_key: "test-key".into(),
            ..GenerationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        assert!(matches!(
            GeminiClient::new(GenerationConfig::default()).err(),
            Some(EngenheiroError::ConfigError(_))
        ));
    }

    #[test]
    fn test_request_shape_attachments_before_text() {
        let att = Attachment::from_bytes("application/pdf", b"%PDF", Some("wps.pdf".into())).unwrap();
        let request = client().build_request("analisar WPS", &[att], GenerationMode::Plain);

        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["text"], "analisar WPS");
        assert!(request.get("tools").is_none());
    }

    #[test]
    fn test_search_mode_adds_tool() {
        let request = client().build_request("NBR 6118", &[], GenerationMode::Search);
        assert!(request["tools"][0].get("googleSearch").is_some());
    }

    #[test]
    fn test_thinking_mode_sets_budget() {
        let request = client().build_request("calcular", &[], GenerationMode::Thinking);
        assert!(request["generationConfig"]["thinkingConfig"]["thinkingBudget"].is_number());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "## 1." }, { "text": " ok" }] }
            }]
        });
        assert_eq!(GeminiClient::response_text(&body), "## 1. ok");
    }

    #[test]
    fn test_citations_formatting() {
        let body = json!({
            "candidates": [{
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "Norma A" } },
                        { "retrieved": {} }
                    ]
                }
            }]
        });
        let citations = GeminiClient::citations(&body).unwrap();
        assert!(citations.contains("[Norma A](https://a.example)"));
        assert!(citations.starts_with("\n\n**Fontes consultadas:**"));
    }

    #[tokio::test]
    async fn test_mock_client() {
        let ok = MockGenerationClient::replying("texto");
        assert_eq!(ok.generate("p", &[], GenerationMode::Plain).await.unwrap(), "texto");

        let err = MockGenerationClient::failing("offline")
            .generate("p", &[], GenerationMode::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, EngenheiroError::GenerationError(_)));
    }
}
