use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::RecoveryConfig;
use crate::llm_providers::{LLMProviderFactory, LLMProviderType, ModelClient};
use crate::models::{GeneratedContent, GenerationRequest};
use crate::recovery::{RecoveryOutcome, RecoveryPipeline};
use crate::schema::SchemaDescriptor;

// Import logging macros
use crate::{log_llm_operation, log_performance};

const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are an experienced teacher. Always respond with a single valid JSON object in the requested format.";

/// One unit of work for [`LLMService::generate_batch`].
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub request: GenerationRequest,
    pub schema: SchemaDescriptor,
    pub prompt: String,
}

/// Calls the model and recovers a schema-valid record from whatever comes back.
#[derive(Clone)]
pub struct LLMService {
    client: Arc<dyn ModelClient>,
    pipeline: RecoveryPipeline,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
        recovery: RecoveryConfig,
    ) -> Self {
        let provider = LLMProviderFactory::create_provider(provider_type, api_key, base_url, model);
        Self::with_client(Arc::new(provider), RecoveryPipeline::new(recovery))
    }

    pub fn with_client(client: Arc<dyn ModelClient>, pipeline: RecoveryPipeline) -> Self {
        Self { client, pipeline }
    }

    /// Get the provider name for logging and testing
    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn pipeline(&self) -> &RecoveryPipeline {
        &self.pipeline
    }

    /// Generate one record. Never fails: a failed model call yields placeholder content.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
        system_message: Option<&str>,
        prompt: &str,
    ) -> GeneratedContent {
        let operation = format!("generate_{}", schema.kind);
        log_llm_operation!(start, operation.as_str(), provider = self.provider_name(), topic = request.topic);

        let started = Instant::now();
        let system_message = system_message.unwrap_or(DEFAULT_SYSTEM_MESSAGE);

        // An unreachable model is indistinguishable from an empty answer downstream.
        let raw = match self.client.complete(Some(system_message), prompt).await {
            Ok(text) => {
                log_llm_operation!(
                    success,
                    operation.as_str(),
                    provider = self.provider_name(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    response_length = text.len()
                );
                if text.trim().is_empty() {
                    log_llm_operation!(warn, operation.as_str(), "model returned an empty response");
                }
                text
            }
            Err(e) => {
                log_llm_operation!(error, operation.as_str(), provider = self.provider_name(), error = e);
                String::new()
            }
        };

        debug!(
            topic = %request.topic,
            response_content = %raw,
            "Raw LLM response"
        );

        self.recover_only(&raw, request, schema)
    }

    pub async fn generate_lesson(&self, request: &GenerationRequest, prompt: &str) -> GeneratedContent {
        self.generate(request, &SchemaDescriptor::lesson(), None, prompt).await
    }

    pub async fn generate_question(&self, request: &GenerationRequest, prompt: &str) -> GeneratedContent {
        self.generate(request, &SchemaDescriptor::question(), None, prompt).await
    }

    /// Run independent generations concurrently. Results keep the order of `jobs`.
    pub async fn generate_batch(&self, jobs: &[GenerationJob]) -> Vec<GeneratedContent> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        info!(job_count = jobs.len(), "Generating batch of records");

        let results = join_all(
            jobs.iter()
                .map(|job| self.generate(&job.request, &job.schema, None, &job.prompt)),
        )
        .await;

        let degraded = results.iter().filter(|content| content.degraded).count();
        info!(
            job_count = jobs.len(),
            degraded_count = degraded,
            "Batch generation completed"
        );
        log_performance!(
            "batch_generation",
            duration_ms = started.elapsed().as_millis() as u64,
            count = jobs.len()
        );

        results
    }

    /// Recover a record from raw text the caller already holds.
    pub fn recover_only(
        &self,
        raw: &str,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> GeneratedContent {
        let outcome = self.pipeline.recover_with_report(raw, request, schema);
        into_content(request, outcome)
    }
}

fn into_content(request: &GenerationRequest, outcome: RecoveryOutcome) -> GeneratedContent {
    GeneratedContent {
        id: Uuid::new_v4(),
        topic: request.topic.clone(),
        difficulty: request.difficulty,
        kind: outcome.record.kind(),
        record: outcome.record,
        strategy: outcome.strategy,
        degraded: outcome.degraded,
        created_at: Utc::now(),
    }
}
