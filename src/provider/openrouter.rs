//! OpenRouter-hosted synthesizer.

use crate::config::{SynthesizerConfig, OPENROUTER};
use crate::error::ProviderError;
use crate::models::Verdict;
use crate::provider::chat_completions::ChatCompletionsClient;
use crate::provider::{parse_verdict, synthesis_prompt, Synthesizer};
use async_trait::async_trait;

pub struct OpenRouterSynthesizer {
    client: ChatCompletionsClient,
}

impl OpenRouterSynthesizer {
    pub fn new(config: &SynthesizerConfig, api_key: &str, http_client: reqwest::Client) -> Self {
        let endpoint = format!(
            "{}/api/v1/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let client =
            ChatCompletionsClient::new(OPENROUTER, endpoint, api_key, &config.model, http_client)
                .with_temperature(config.temperature);
        Self { client }
    }
}

#[async_trait]
impl Synthesizer for OpenRouterSynthesizer {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn synthesize(&self, verdicts: &[Verdict]) -> Result<Verdict, ProviderError> {
        let content = self.client.complete(&synthesis_prompt(verdicts)).await?;
        parse_verdict(self.name(), &content)
    }
}
