use crate::config::CompletionConfig;
use crate::error::{CompletionError, ConfigError};
use crate::models::{ChatTurn, CompletionOptions};
use crate::traits::ChatBackend;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    options: CompletionOptions,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            options: config.options.clone(),
        })
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    async fn send(&self, messages: &[ChatTurn]) -> Result<String, CompletionError> {
        let payload = CompletionRequest {
            model: &self.options.model,
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status.as_u16(), body));
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionError::MalformedResponse("response had no message content".to_string())
            })
    }
}

#[async_trait]
impl ChatBackend for ChatCompletionClient {
    async fn complete(&self, messages: &[ChatTurn]) -> Result<String, CompletionError> {
        debug!(
            endpoint = %self.endpoint,
            model = %self.options.model,
            turns = messages.len(),
            "sending completion request"
        );

        let result = self.send(messages).await;
        match &result {
            Ok(reply) => debug!(chars = reply.chars().count(), "completion received"),
            Err(error) => warn!(error = %error, "completion request failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> ChatCompletionClient {
        let mut config =
            CompletionConfig::new(&server.uri(), "test-key").expect("mock uri is a valid url");
        config.timeout = timeout;
        ChatCompletionClient::new(&config).expect("client should build")
    }

    fn turns() -> Vec<ChatTurn> {
        vec![
            ChatTurn::system("You are StudyGenie."),
            ChatTurn::user("What is osmosis?"),
        ]
    }

    #[tokio::test]
    async fn successful_reply_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 1000,
                "messages": [
                    {"role": "system", "content": "You are StudyGenie."},
                    {"role": "user", "content": "What is osmosis?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Water moves across a membrane."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let reply = client.complete(&turns()).await.expect("completion should succeed");
        assert_eq!(reply, "Water moves across a membrane.");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_key_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_api_key"))
            .mount(&server)
            .await;

        let error = client_for(&server, Duration::from_secs(5))
            .complete(&turns())
            .await
            .expect_err("401 should fail");
        assert!(matches!(error, CompletionError::Unauthorized));
        assert_eq!(
            error.user_message(),
            "Invalid API key. Please check your GROQ_API_KEY configuration."
        );
    }

    #[tokio::test]
    async fn too_many_requests_maps_to_rate_limit_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let error = client_for(&server, Duration::from_secs(5))
            .complete(&turns())
            .await
            .expect_err("429 should fail");
        assert!(matches!(error, CompletionError::RateLimited));
        assert_eq!(
            error.user_message(),
            "Rate limit exceeded. Please wait a moment and try again."
        );
    }

    #[tokio::test]
    async fn slow_endpoint_maps_to_timeout_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let error = client_for(&server, Duration::from_millis(200))
            .complete(&turns())
            .await
            .expect_err("request should time out");
        assert!(matches!(error, CompletionError::Timeout));
        assert_eq!(error.user_message(), "The request timed out. Please try again.");
    }

    #[tokio::test]
    async fn server_error_and_empty_choices_are_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let error = client_for(&server, Duration::from_secs(5))
            .complete(&turns())
            .await
            .expect_err("503 should fail");
        assert!(matches!(error, CompletionError::Status { status: 503, .. }));

        let empty = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&empty)
            .await;

        let error = client_for(&empty, Duration::from_secs(5))
            .complete(&turns())
            .await
            .expect_err("empty choices should fail");
        assert!(matches!(error, CompletionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let config = CompletionConfig::new("http://127.0.0.1:9", "test-key")
            .expect("literal url is valid");
        let client = ChatCompletionClient::new(&config).expect("client should build");

        let error = client
            .complete(&turns())
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(error, CompletionError::Network(_)), "{error:?}");
    }
}
