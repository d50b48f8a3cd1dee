//! Concurrent fan-out over the primary providers.

use crate::error::AnalysisError;
use crate::models::Verdict;
use crate::provider::ClassificationProvider;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs every primary provider against the same text and keeps the successes.
pub struct MultiProviderAnalyzer {
    providers: Vec<Arc<dyn ClassificationProvider>>,
}

impl MultiProviderAnalyzer {
    pub fn new(providers: Vec<Arc<dyn ClassificationProvider>>) -> Self {
        Self { providers }
    }

    /// Names of the configured providers, in invocation order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Classify `text` with all providers concurrently.
    ///
    /// Waits for every call to settle. Successful verdicts are returned in
    /// provider order regardless of which call finished first; failed calls
    /// are logged and dropped. Fails only when no provider succeeded.
    pub async fn analyze(&self, text: &str) -> Result<Vec<Verdict>, AnalysisError> {
        let outcomes = join_all(self.providers.iter().map(|p| p.classify(text))).await;

        let mut verdicts = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (provider, outcome) in self.providers.iter().zip(outcomes) {
            match outcome {
                Ok(verdict) => {
                    debug!(
                        "{} verdict: is_scam={} score={}",
                        provider.name(),
                        verdict.is_scam,
                        verdict.score
                    );
                    verdicts.push(verdict);
                }
                Err(e) => {
                    warn!("Primary provider {} failed: {}", provider.name(), e);
                    failures.push(e.to_string());
                }
            }
        }

        if verdicts.is_empty() {
            return Err(AnalysisError::AllProvidersFailed { failures });
        }

        info!(
            "{} of {} primary providers succeeded",
            verdicts.len(),
            self.providers.len()
        );
        Ok(verdicts)
    }
}
