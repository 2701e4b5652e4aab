pub mod config;
pub mod errors;
pub mod fallback;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod recovery;
pub mod schema;

pub use config::{Config, RecoveryConfig};
pub use errors::*;
pub use fallback::FallbackSynthesizer;
pub use llm_providers::{LLMProvider, LLMProviderFactory, LLMProviderType, ModelClient};
pub use llm_service::{GenerationJob, LLMService};
pub use models::*;
pub use recovery::{
    CandidateSelection, NoopObserver, RecoveryObserver, RecoveryOutcome, RecoveryPipeline,
    StrategyKind, TracingObserver,
};
pub use schema::{validate, Candidate, SchemaDescriptor, ValidationResult};
