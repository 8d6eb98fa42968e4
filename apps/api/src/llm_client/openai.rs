//! OpenAI chat-completions wire format.
//!
//! Spoken by OpenAI itself and by every OpenAI-compatible endpoint we target:
//! Ollama's `/v1`, Groq's `/openai/v1` and Gemini's `/v1beta/openai`.

use reqwest::Response;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmError, Provider};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

impl<'a> ChatRequest<'a> {
    pub fn new(model: &'a str, messages: &'a [ChatMessage]) -> Self {
        Self { model, messages }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

pub(super) async fn read_completion(
    provider: Provider,
    response: Response,
) -> Result<String, LlmError> {
    let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::Parse {
        provider,
        message: e.to_string(),
    })?;
    Ok(parsed.into_text())
}
