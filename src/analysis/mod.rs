//! Analysis modules.
//!
//! The analyzer fans a message out to every primary provider; the pipeline
//! feeds the surviving verdicts to the synthesizer.

pub mod analyzer;
pub mod pipeline;

pub use analyzer::MultiProviderAnalyzer;
pub use pipeline::Pipeline;
