//! services/api/src/adapters/flashcard_llm.rs
//!
//! This module contains the adapter for the flashcard-writing LLM.
//! It implements the `TextGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use flashcards_core::ports::{PortError, PortResult, TextGenerationService};
use std::time::Duration;
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You are a study assistant that writes flashcards from course material. \
You always answer with a raw JSON array of objects that have exactly two string fields, \
'question' and 'answer'. Never wrap the array in prose.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiFlashcardAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiFlashcardAdapter {
    /// Creates a new `OpenAiFlashcardAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client from `config` with the library's retry loop turned off.
    ///
    /// Failed replies are retried by the generation loop, which counts them
    /// against its attempt budget.
    pub fn from_config(config: OpenAIConfig, model: String) -> Self {
        let client = Client::with_config(config).with_backoff(no_retry());
        Self::new(client, model)
    }
}

/// A backoff whose first `next_backoff` already gives up.
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..ExponentialBackoff::default()
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiFlashcardAdapter {
    async fn generate_text(&self, prompt: &str) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::Unexpected("Flashcard LLM returned no choices in its response.".to_string())
            })?
            .message
            .content;

        // A choice without text is a content problem, so let validation retry it.
        let reply = content.unwrap_or_default();
        debug!(chars = reply.len(), "Received flashcard reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> OpenAiFlashcardAdapter {
        let config = OpenAIConfig::new()
            .with_api_base(server.uri())
            .with_api_key("sk-test");
        OpenAiFlashcardAdapter::from_config(config, "gpt-test".to_string())
    }

    fn completion(choices: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-test",
            "choices": choices
        })
    }

    fn choice(content: serde_json::Value) -> serde_json::Value {
        json!({
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        })
    }

    #[tokio::test]
    async fn returns_reply_text_verbatim() {
        let server = MockServer::start().await;
        let reply = "  [{\"question\": \"Capital of France?\", \"answer\": \"Paris\"}]\n";
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-test", "n": 1 })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(json!([choice(json!(reply))]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = adapter(&server).generate_text("Write one card").await.unwrap();
        assert_eq!(text, reply);
    }

    #[tokio::test]
    async fn missing_content_is_an_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(json!([choice(json!(null))]))),
            )
            .mount(&server)
            .await;

        let text = adapter(&server).generate_text("Write one card").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn reply_without_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!([]))))
            .mount(&server)
            .await;

        let err = adapter(&server).generate_text("Write one card").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = adapter(&server).generate_text("Write one card").await.unwrap_err();
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn server_errors_are_not_retried_by_the_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let result = adapter(&server).generate_text("Write one card").await;

        assert!(result.is_err());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }
}
