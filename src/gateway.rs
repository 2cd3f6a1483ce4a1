//! Remote response gateway.
//!
//! Turns a chat turn into one request for a hosted model and always hands
//! back something the pet can say. Failures are logged and replaced by one
//! of two fixed lines in the pet's voice.

use crate::conversation::CONTEXT_TURNS;
use crate::model::{Attachment, Message, Role, UserMode};
use crate::persona;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

pub(crate) const EMPTY_REPLY_FALLBACK: &str =
    "(?_?) (I couldn't read that... maybe it's too hard for me?)";
pub(crate) const NETWORK_ERROR_FALLBACK: &str = "Ouch... my head hurts... (Network Error) (T_T)";
pub(crate) const ATTACHMENT_PLACEHOLDER: &str = "(Please analyze this file)";
const BLANK_PLACEHOLDER: &str = "...";

#[derive(Debug, Error)]
pub(crate) enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// One outgoing chat turn, captured at send time.
#[derive(Clone, Debug)]
pub(crate) struct ReplyRequest {
    /// Turns preceding this one.
    pub(crate) history: Vec<Message>,
    pub(crate) text: String,
    pub(crate) mode: UserMode,
    pub(crate) attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct InlinePart {
    pub(crate) mime_type: String,
    pub(crate) data: String,
}

/// Provider-neutral request: persona, typed file parts, then dialogue text.
#[derive(Clone, Debug)]
pub(crate) struct ModelPrompt {
    pub(crate) system_instruction: String,
    pub(crate) inline_parts: Vec<InlinePart>,
    pub(crate) text: String,
}

#[async_trait]
pub(crate) trait ReplyModel: Send + Sync {
    /// `Ok(None)` means the service answered but produced no usable text.
    async fn generate(&self, prompt: &ModelPrompt) -> Result<Option<String>, GatewayError>;

    fn model_id(&self) -> &str;
}

pub(crate) fn effective_user_text(text: &str, has_attachments: bool) -> &str {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        trimmed
    } else if has_attachments {
        ATTACHMENT_PLACEHOLDER
    } else {
        BLANK_PLACEHOLDER
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Model => "Pet",
    }
}

fn dialogue(history: &[Message], user_text: &str) -> String {
    let start = history.len().saturating_sub(CONTEXT_TURNS);
    let mut out = String::new();
    for msg in &history[start..] {
        out.push_str(speaker(msg.role));
        out.push_str(": ");
        out.push_str(&msg.text);
        out.push('\n');
    }
    out.push_str("User: ");
    out.push_str(user_text);
    out.push_str("\nPet:");
    out
}

pub(crate) fn build_prompt(request: &ReplyRequest) -> ModelPrompt {
    let has_attachments = !request.attachments.is_empty();
    let inline_parts = request
        .attachments
        .iter()
        .filter_map(|a| {
            a.base64_payload().map(|data| InlinePart {
                mime_type: a.mime_type.clone(),
                data: data.to_string(),
            })
        })
        .collect();

    ModelPrompt {
        system_instruction: persona::instruction(request.mode, has_attachments),
        inline_parts,
        text: dialogue(
            &request.history,
            effective_user_text(&request.text, has_attachments),
        ),
    }
}

#[derive(Clone)]
pub(crate) struct Gateway {
    model: Arc<dyn ReplyModel>,
}

impl Gateway {
    pub(crate) fn new(model: Arc<dyn ReplyModel>) -> Self {
        Self { model }
    }

    /// One remote call, no retries. Never fails.
    pub(crate) async fn respond(&self, request: &ReplyRequest) -> String {
        let prompt = build_prompt(request);
        let start = Instant::now();
        let result = self.model.generate(&prompt).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Some(text)) if !text.is_empty() => {
                tracing::info!(
                    model = %self.model.model_id(),
                    mode = %request.mode,
                    attachments = prompt.inline_parts.len(),
                    duration_ms,
                    "reply received"
                );
                text
            }
            Ok(_) => {
                tracing::warn!(
                    model = %self.model.model_id(),
                    duration_ms,
                    "reply was empty or blocked"
                );
                EMPTY_REPLY_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model.model_id(),
                    duration_ms,
                    error = %e,
                    "reply request failed"
                );
                NETWORK_ERROR_FALLBACK.to_string()
            }
        }
    }
}
