//! Model clients and the analysis orchestrator: Gemini, Brainbox retrieval, a
//! local heuristic fallback, and the resilience layer that keeps every wizard
//! step answerable.

pub mod brainbox;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod heuristic;
pub mod orchestrator;
pub mod resilience;
pub mod wire;

#[cfg(test)]
mod testing;

pub use brainbox::{BoxFile, BrainboxClient, RagGenerator, RetrievedDocument};
pub use client::{Generator, LlmClient, ModelClient};
pub use config::{AiConfig, Backend};
pub use error::{ClientError, ErrorKind};
pub use fallback::{AugmentationPolicy, AugmentationRule};
pub use gemini::GeminiGenerator;
pub use heuristic::HeuristicClient;
pub use orchestrator::Orchestrator;
pub use resilience::{Notice, Outcome, Source};
