//! OpenAI primary provider.

use crate::config::{OpenAiConfig, OPENAI};
use crate::error::ProviderError;
use crate::models::Verdict;
use crate::provider::chat_completions::ChatCompletionsClient;
use crate::provider::{classification_prompt, parse_verdict, ClassificationProvider};
use async_trait::async_trait;

pub struct OpenAiProvider {
    client: ChatCompletionsClient,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig, api_key: &str, http_client: reqwest::Client) -> Self {
        let endpoint = format!(
            "{}/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        Self {
            client: ChatCompletionsClient::new(OPENAI, endpoint, api_key, &config.model, http_client),
        }
    }
}

#[async_trait]
impl ClassificationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn classify(&self, text: &str) -> Result<Verdict, ProviderError> {
        let content = self.client.complete(&classification_prompt(text)).await?;
        parse_verdict(self.name(), &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        let config = OpenAiConfig {
            base_url: format!("{}/", server.uri()),
            ..OpenAiConfig::default()
        };
        OpenAiProvider::new(&config, "sk-test", reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_classify_parses_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"is_scam\": false, \"reason\": \"Tin nhắn chào hỏi\", \"types\": \"\", \"score\": 1, \"recommend\": \"bỏ qua\"}"}}]
            })))
            .mount(&server)
            .await;

        let verdict = provider(&server).classify("Chào bạn").await.unwrap();
        assert!(!verdict.is_scam);
        assert_eq!(verdict.score, 1);
        assert_eq!(verdict.recommend, "bỏ qua");
    }

    #[tokio::test]
    async fn test_classify_rejects_prose() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Sorry, I can't do that."}}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).classify("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedVerdict { .. }));
        assert!(err.to_string().starts_with("openai"));
    }
}
