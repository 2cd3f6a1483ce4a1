//! Gemini `generateContent` client.

use crate::gateway::{GatewayError, ModelPrompt, ReplyModel};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub(crate) struct GeminiConfig {
    pub(crate) api_key: String,
    pub(crate) api_base: String,
    pub(crate) model: String,
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: u32,
}

pub(crate) struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub(crate) fn new(cfg: GeminiConfig) -> Result<Self> {
        // no explicit timeout: the transport default applies
        let client = Client::builder()
            .build()
            .context("could not build HTTP client")?;
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            cfg.api_base.trim_end_matches('/'),
            cfg.model
        );
        Ok(Self {
            client,
            endpoint,
            api_key: cfg.api_key,
            model: cfg.model,
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        })
    }

    fn to_request(&self, prompt: &ModelPrompt) -> GenerateRequest {
        let mut parts: Vec<Part> = prompt
            .inline_parts
            .iter()
            .map(|p| Part::Inline {
                inline_data: InlineData {
                    mime_type: p.mime_type.clone(),
                    data: p.data.clone(),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: prompt.text.clone(),
        });

        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompt.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Joins the text parts of the first candidate. `None` when there is nothing to say.
fn reply_text(resp: GenerateResponse) -> Option<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        tracing::warn!(%reason, "prompt was blocked");
    }
    let candidate = resp.candidates.into_iter().next()?;
    if let Some(reason) = &candidate.finish_reason {
        if reason != "STOP" {
            tracing::debug!(%reason, "candidate finished early");
        }
    }
    let text: String = candidate
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl ReplyModel for GeminiClient {
    async fn generate(&self, prompt: &ModelPrompt) -> Result<Option<String>, GatewayError> {
        let body = self.to_request(prompt);
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("reading body: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(GatewayError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&raw).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(reply_text(parsed))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InlinePart;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            api_base: "https://example.test/".into(),
            model: "gemini-2.5-flash".into(),
            temperature: 0.7,
            max_output_tokens: 2000,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(
            client().endpoint,
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_puts_files_before_text() {
        let prompt = ModelPrompt {
            system_instruction: "be cute".into(),
            inline_parts: vec![InlinePart {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            }],
            text: "User: hi\nPet:".into(),
        };
        let v = serde_json::to_value(client().to_request(&prompt)).unwrap();
        assert_eq!(
            v,
            json!({
                "systemInstruction": { "parts": [{ "text": "be cute" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                        { "text": "User: hi\nPet:" }
                    ]
                }],
                "generationConfig": { "temperature": 0.7f32, "maxOutputTokens": 2000 }
            })
        );
    }

    #[test]
    fn reply_joins_candidate_text_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "friend ✨" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 3 }
        }))
        .unwrap();
        assert_eq!(reply_text(resp).as_deref(), Some("Hi friend ✨"));
    }

    #[test]
    fn blocked_or_empty_reply_is_none() {
        let blocked: GenerateResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(reply_text(blocked), None);

        let no_parts: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert_eq!(reply_text(no_parts), None);
    }
}
