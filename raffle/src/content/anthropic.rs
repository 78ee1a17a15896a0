//! Themed copy generated through the Anthropic Messages API

use super::{ContentProvider, ThemeContent, ThemeResult};
use crate::error::ContentError;
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Messages API base URL
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Instruction sent with every request
pub const THEME_PROMPT: &str = "Generate a catchy, exciting title, a short description \
(2 sentences), and 3 bullet point highlights for a digital raffle where the prize is a \
high-end Tech Setup (MacBook + Monitor). Language: Portuguese (Brazil). Answer with only \
a JSON object of the form {\"title\": string, \"description\": string, \
\"prizeHighlights\": [string, string, string]}.";

const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Content provider backed by an Anthropic model.
///
/// Without an API key every request is reported as unavailable.
#[derive(Clone)]
pub struct AnthropicContentProvider {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl AnthropicContentProvider {
    /// Creates a provider against the public API
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Overrides the API base URL
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Requests themed copy
    ///
    /// # Errors
    ///
    /// Returns [`ContentError`] when the key is missing, the request fails,
    /// the API answers with an error, or the answer is not the expected JSON.
    pub async fn request_theme(&self) -> Result<ThemeContent, ContentError> {
        let api_key = self.api_key.as_deref().ok_or(ContentError::MissingApiKey)?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: THEME_PROMPT,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ContentError::RequestFailed(e.to_string()))?;

        let body = match response.status() {
            StatusCode::OK => response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| ContentError::ResponseParseFailed(e.to_string()))?,
            StatusCode::TOO_MANY_REQUESTS => return Err(ContentError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(ContentError::Unauthorized),
            status => {
                let message = response.text().await.unwrap_or_default();
                return Err(ContentError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            },
        };

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        parse_theme(&text)
    }
}

impl std::fmt::Debug for AnthropicContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicContentProvider")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ContentProvider for AnthropicContentProvider {
    fn generate(&self) -> BoxFuture<'_, ThemeResult> {
        Box::pin(async move {
            match self.request_theme().await {
                Ok(theme) => {
                    tracing::info!(title = %theme.title, "Generated themed copy");
                    ThemeResult::Content(theme)
                },
                Err(ContentError::MissingApiKey) => {
                    tracing::warn!("ANTHROPIC_API_KEY not set, using default copy");
                    ThemeResult::Unavailable
                },
                Err(e) => {
                    tracing::error!(error = %e, "Themed copy generation failed");
                    ThemeResult::Unavailable
                },
            }
        })
    }
}

/// Parses the model's answer, tolerating a Markdown code fence around it
fn parse_theme(text: &str) -> Result<ThemeContent, ContentError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ContentError::EmptyResponse);
    }

    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(json).map_err(|e| ContentError::ResponseParseFailed(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const THEME_JSON: &str = r#"{"title":"Setup dos Sonhos","description":"Concorra agora. Boa sorte!","prizeHighlights":["MacBook Pro","Monitor 4K","Entrega grátis"]}"#;

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": DEFAULT_MODEL,
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 40}
        })
    }

    fn provider_for(server: &MockServer) -> AnthropicContentProvider {
        AnthropicContentProvider::new(Some("test-key".to_string())).with_api_url(server.uri())
    }

    #[test]
    fn parse_accepts_fenced_json() {
        let theme = parse_theme(&format!("```json\n{THEME_JSON}\n```")).unwrap();
        assert_eq!(theme.title, "Setup dos Sonhos");
        assert_eq!(theme.prize_highlights.len(), 3);
    }

    #[test]
    fn parse_rejects_empty_and_prose() {
        assert!(matches!(parse_theme("  "), Err(ContentError::EmptyResponse)));
        assert!(matches!(
            parse_theme("Sorry, I cannot help."),
            Err(ContentError::ResponseParseFailed(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let provider = AnthropicContentProvider::new(None);
        assert_eq!(provider.generate().await, ThemeResult::Unavailable);
        assert!(matches!(
            AnthropicContentProvider::new(Some(String::new())).request_theme().await,
            Err(ContentError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn successful_reply_becomes_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(THEME_JSON)))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider_for(&server).generate().await;
        let ThemeResult::Content(theme) = result else {
            unreachable!("expected themed content, got {result:?}");
        };
        assert_eq!(theme.prize_highlights[0], "MacBook Pro");
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(matches!(
            provider.request_theme().await,
            Err(ContentError::ApiError { status: 500, .. })
        ));
        assert_eq!(provider.generate().await, ThemeResult::Unavailable);
    }

    #[tokio::test]
    async fn rate_limit_and_malformed_text_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("{\"title\": 3}")))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(matches!(provider.request_theme().await, Err(ContentError::RateLimited)));
        assert!(matches!(
            provider.request_theme().await,
            Err(ContentError::ResponseParseFailed(_))
        ));
    }
}
