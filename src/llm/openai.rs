use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::provider::{EmbeddingProvider, GenerationProvider};
use super::types::{ChatCompletionResponse, ChatRequest, EmbeddingRequest, EmbeddingResponse};
use crate::core::config::OpenAiSettings;
use crate::core::errors::ProviderError;

const PROVIDER: &str = "openai";

/// OpenAI-compatible embeddings and chat completions over HTTP.
///
/// `reqwest::Client` pools connections and is cheap to clone, so one
/// instance serves every concurrent request.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiClient {
    /// `request_timeout` bounds each HTTP exchange at the transport level.
    pub fn new(settings: &OpenAiSettings, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ProviderError::rejected(PROVIDER, e.to_string()))?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            embedding_model: settings.embedding_model.clone(),
            chat_model: settings.chat_model.clone(),
            temperature: settings.temperature,
            client,
        })
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(PROVIDER, status.as_u16(), &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let payload = self.post_json("/v1/embeddings", &body).await?;
        parse_embedding_payload(&payload)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = ChatRequest::single_turn(&self.chat_model, prompt, self.temperature);
        let payload = self.post_json("/v1/chat/completions", &body).await?;
        parse_chat_payload(&payload)
    }
}

fn parse_embedding_payload(payload: &str) -> Result<Vec<f32>, ProviderError> {
    let response: EmbeddingResponse = serde_json::from_str(payload)
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("embedding response: {}", e)))?;

    let vector = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "embedding response had no data"))?;

    if vector.is_empty() {
        return Err(ProviderError::malformed(PROVIDER, "embedding vector is empty"));
    }
    Ok(vector)
}

fn parse_chat_payload(payload: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionResponse = serde_json::from_str(payload)
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("chat response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "chat response had no content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::FailureKind;

    #[test]
    fn test_parse_embedding_payload() {
        let payload = r#"{
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0]}],
            "model": "text-embedding-3-small",
            "usage": {"prompt_tokens": 5, "total_tokens": 5}
        }"#;
        assert_eq!(parse_embedding_payload(payload).unwrap(), vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_parse_embedding_payload_without_data() {
        let err = parse_embedding_payload(r#"{"data": []}"#).unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);

        let err = parse_embedding_payload("not json").unwrap_err();
        assert_eq!(err.kind, FailureKind::Malformed);
    }

    #[test]
    fn test_parse_chat_payload() {
        let payload = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Try the Seaside Inn [hotel_1]."},
                "finish_reason": "stop"
            }]
        }"#;
        assert_eq!(
            parse_chat_payload(payload).unwrap(),
            "Try the Seaside Inn [hotel_1]."
        );
    }

    #[test]
    fn test_parse_chat_payload_null_content() {
        let payload = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let err = parse_chat_payload(payload).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unusable_base_url_fails_without_retry() {
        let settings = OpenAiSettings {
            api_key: "sk-test".to_string(),
            base_url: "localhost:1234".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4-1106-preview".to_string(),
            temperature: 0.0,
            embedding_dimension: None,
        };
        let client = OpenAiClient::new(&settings, Duration::from_secs(1)).unwrap();

        let err = client.embed("x").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::Rejected);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest::single_turn("gpt-4-1106-preview", "hello", 0.0);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4-1106-preview");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert_eq!(value["stream"], false);
        assert_eq!(value["temperature"], 0.0);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_openai_round_trip() {
        let settings = OpenAiSettings {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4-1106-preview".to_string(),
            temperature: 0.0,
            embedding_dimension: None,
        };
        let client = OpenAiClient::new(&settings, Duration::from_secs(30)).unwrap();

        match client.embed("beachfront hotel").await {
            Ok(vector) => println!("embedding dimension: {}", vector.len()),
            Err(e) => panic!("Failed to embed: {}", e),
        }
        match client.complete("Say hello.").await {
            Ok(text) => println!("completion: {}", text),
            Err(e) => println!("completion error: {}", e),
        }
    }
}
