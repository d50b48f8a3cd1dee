//! Pipeline orchestration: validate, fan out, synthesize.

use crate::analysis::MultiProviderAnalyzer;
use crate::config::{Config, Credentials, GEMINI, OPENAI, OPENROUTER};
use crate::error::AnalysisError;
use crate::models::Verdict;
use crate::provider::{
    self, ClassificationProvider, GeminiProvider, OpenAiProvider, OpenRouterSynthesizer,
    Synthesizer,
};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One analyzer plus one synthesizer. Holds no per-job state, so a single
/// instance serves any number of concurrent jobs.
pub struct Pipeline {
    analyzer: MultiProviderAnalyzer,
    synthesizer: Arc<dyn Synthesizer>,
}

impl Pipeline {
    pub fn new(analyzer: MultiProviderAnalyzer, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            analyzer,
            synthesizer,
        }
    }

    /// Build the production pipeline from config and environment credentials.
    ///
    /// Primary providers without a credential are left out; at least one
    /// primary and the synthesizer credential are required.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        let http_client = provider::http_client(config.http.timeout_seconds)
            .context("Failed to create HTTP client")?;

        let mut providers: Vec<Arc<dyn ClassificationProvider>> = Vec::new();

        match credentials.get(GEMINI) {
            Some(key) => providers.push(Arc::new(GeminiProvider::new(
                &config.gemini,
                key,
                http_client.clone(),
            ))),
            None => warn!("No credential for {}, provider disabled", GEMINI),
        }

        match credentials.get(OPENAI) {
            Some(key) => providers.push(Arc::new(OpenAiProvider::new(
                &config.openai,
                key,
                http_client.clone(),
            ))),
            None => warn!("No credential for {}, provider disabled", OPENAI),
        }

        if providers.is_empty() {
            bail!("No primary provider credentials found (set GOOGLE_API_KEY and/or OPENAI_API_KEY)");
        }

        let Some(synth_key) = credentials.get(OPENROUTER) else {
            bail!("No synthesizer credential found (set OPENROUTER_API_KEY)");
        };
        let synthesizer = OpenRouterSynthesizer::new(&config.synthesizer, synth_key, http_client);

        let analyzer = MultiProviderAnalyzer::new(providers);
        info!(
            "Pipeline ready: primary [{}], synthesizer {} ({})",
            analyzer.provider_names().join(", "),
            OPENROUTER,
            config.synthesizer.model
        );

        Ok(Self::new(analyzer, Arc::new(synthesizer)))
    }

    #[allow(dead_code)] // Accessor for diagnostics
    pub fn analyzer(&self) -> &MultiProviderAnalyzer {
        &self.analyzer
    }

    /// Produce the final verdict for `text`.
    ///
    /// Blank text is rejected before any network call. A synthesis failure is
    /// fatal even when primary verdicts exist; they are never returned as a
    /// fallback.
    pub async fn run(&self, text: &str) -> Result<Verdict, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::NoText);
        }

        let verdicts = self.analyzer.analyze(text).await?;

        debug!(
            "Synthesizing {} verdicts with {}",
            verdicts.len(),
            self.synthesizer.name()
        );

        self.synthesizer.synthesize(&verdicts).await.map_err(|e| {
            warn!("Synthesizer {} failed: {}", self.synthesizer.name(), e);
            AnalysisError::Synthesis(e)
        })
    }
}
