//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::message::ChatMessage;
use crate::ChatModel;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// A [`ChatModel`] over any OpenAI-compatible `/chat/completions` endpoint.
///
/// # Configuration
///
/// Explicit construction via [`new`](OpenAiChatModel::new), or from the
/// environment via [`from_env`](OpenAiChatModel::from_env):
///
/// - `CREW_LLM_API_KEY` — required.
/// - `CREW_LLM_MODEL` — required.
/// - `CREW_LLM_BASE_URL` — optional, defaults to the OpenAI API.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChatModel {
    /// Create a client for the given model with the default base URL.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
        }
    }

    /// Create a client for an OpenAI-compatible deployment.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let mut client = Self::new(api_key, model);
        client.base_url = base_url.into();
        client
    }

    /// Build a client from `CREW_LLM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Unavailable`] when the key or model is unset —
    /// the caller decides whether that is fatal for its code path.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CREW_LLM_API_KEY")
            .map_err(|_| ModelError::Unavailable("CREW_LLM_API_KEY not set".into()))?;
        let model = std::env::var("CREW_LLM_MODEL")
            .map_err(|_| ModelError::Unavailable("CREW_LLM_MODEL not set".into()))?;
        let mut client = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("CREW_LLM_BASE_URL") {
            client.base_url = base_url;
        }
        Ok(client)
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(model = %self.model, message_count = messages.len(), "chat completion request");

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model: &self.model, messages })
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "completion request failed");
                ModelError::Request { model: self.model.clone(), message: e.to_string() }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(model = %self.model, %status, "completion API error");
            return Err(ModelError::Request {
                model: self.model.clone(),
                message: format!("API returned {status}: {body}"),
            });
        }

        let parsed: CompletionResponse =
            response.json().await.map_err(|e| ModelError::MalformedResponse {
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::MalformedResponse {
                model: self.model.clone(),
                message: "response contained no choices".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn request_serializes_with_lowercase_roles() {
        let messages =
            vec![ChatMessage::system("classify"), ChatMessage::user("some text")];
        let request = CompletionRequest { model: "gpt-4o-mini", messages: &messages };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["model"], "gpt-4o-mini");
    }

    #[test]
    fn response_parsing_takes_first_choice_content() {
        let body = r#"{"choices":[{"message":{"content":"{\"verdict\":\"allow\"}"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"verdict\":\"allow\"}")
        );
    }

    #[test]
    fn roles_round_trip() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let json = serde_json::to_string(&role).unwrap();
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(role, back);
        }
    }
}
