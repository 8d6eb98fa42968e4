//! Anthropic Messages API wire format.
//!
//! System messages are not part of the `messages` array here; they are folded
//! into the top-level `system` field.

use reqwest::Response;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmError, Provider, Role};

/// Messages API requires an explicit output budget.
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    pub fn new(model: &'a str, messages: &'a [ChatMessage]) -> Self {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let messages = messages
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => return None,
                };
                Some(AnthropicMessage {
                    role,
                    content: &m.content,
                })
            })
            .collect();

        Self {
            model,
            max_tokens: MAX_TOKENS,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
        }
    }

    /// One-token request used as a connection test; the API has no cheaper
    /// authenticated endpoint.
    pub fn probe(model: &'a str) -> Self {
        Self {
            model,
            max_tokens: 1,
            system: None,
            messages: vec![AnthropicMessage {
                role: "user",
                content: "ping",
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first text block.
    fn into_text(self) -> String {
        self.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .unwrap_or_default()
    }
}

pub(super) async fn read_completion(
    provider: Provider,
    response: Response,
) -> Result<String, LlmError> {
    let parsed: MessagesResponse = response.json().await.map_err(|e| LlmError::Parse {
        provider,
        message: e.to_string(),
    })?;
    Ok(parsed.into_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_messages_are_folded() {
        let messages = vec![
            ChatMessage::system("rule one"),
            ChatMessage::user("hi"),
            ChatMessage {
                role: Role::Assistant,
                content: "hello".into(),
            },
            ChatMessage::system("rule two"),
        ];
        let body = serde_json::to_value(MessagesRequest::new("claude-3-haiku-20240307", &messages)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-3-haiku-20240307",
                "max_tokens": 4096,
                "system": "rule one\n\nrule two",
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"}
                ]
            })
        );
    }

    #[test]
    fn test_no_system_field_without_system_messages() {
        let messages = vec![ChatMessage::user("hi")];
        let body = serde_json::to_value(MessagesRequest::new("m", &messages)).unwrap();
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_probe_is_one_token() {
        let body = serde_json::to_value(MessagesRequest::probe("m")).unwrap();
        assert_eq!(body["max_tokens"], 1);
    }

    #[test]
    fn test_text_block_extraction() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use","id":"t"},{"type":"text","text":"answer"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_text(), "answer");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(empty.into_text(), "");
    }
}
