// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the crate
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// Recovery Pipeline Logging Macros
// ============================================================================

/// Log recovery cascade events with the strategy that ran
#[macro_export]
macro_rules! log_recovery {
    (attempt_failed, strategy = $strategy:expr, error = $error:expr) => {
        tracing::debug!(
            component = "recovery",
            strategy = %$strategy,
            error_kind = $error.label(),
            error = %$error,
            "Recovery strategy failed"
        )
    };
    (recovered, strategy = $strategy:expr, kind = $kind:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = "recovery",
            strategy = %$strategy,
            record_kind = %$kind,
            duration_ms = $duration,
            "Recovered structured record"
        )
    };
    (backfilled, strategy = $strategy:expr, kind = $kind:expr, fields = $fields:expr, duration_ms = $duration:expr) => {
        tracing::warn!(
            component = "recovery",
            strategy = %$strategy,
            record_kind = %$kind,
            backfilled_fields = %$fields,
            duration_ms = $duration,
            "Recovered partial record, missing fields filled with placeholder content"
        )
    };
    (degraded, strategy = $strategy:expr, kind = $kind:expr, reason = $reason:expr, duration_ms = $duration:expr) => {
        tracing::warn!(
            component = "recovery",
            strategy = %$strategy,
            record_kind = %$kind,
            reason_kind = $reason.label(),
            reason = %$reason,
            duration_ms = $duration,
            "Falling back to synthesized placeholder record"
        )
    };
}

// ============================================================================
// LLM Service Logging Macros
// ============================================================================

/// Log LLM service operations with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, provider = $provider:expr, topic = $topic:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            topic = %$topic,
            "LLM operation started"
        )
    };
    (success, $operation:expr, provider = $provider:expr, duration_ms = $duration:expr, response_length = $length:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            duration_ms = $duration,
            response_length = $length,
            "LLM operation completed successfully"
        )
    };
    (error, $operation:expr, provider = $provider:expr, error = $error:expr) => {
        tracing::error!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            error = %$error,
            "LLM operation failed"
        )
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "llm_service",
            operation = $operation,
            "LLM operation warning: {}", $msg
        )
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        )
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        )
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg)
    };
}

// ============================================================================
// Performance Logging Macros
// ============================================================================

/// Log performance metrics with consistent structure
#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_ms = $duration:expr, count = $count:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            item_count = $count,
            "Performance metrics"
        )
    };
    ($operation:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            "Performance metrics"
        )
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        )
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::errors::RecoveryError;
    use crate::models::RecordKind;
    use crate::recovery::StrategyKind;

    #[test]
    fn test_logging_macros_compile() {
        let error = RecoveryError::Parse("unexpected end of input".to_string());
        let reason = RecoveryError::UnparsableResponse { attempts: 7 };

        // Test that all macro variants compile successfully
        log_recovery!(attempt_failed, strategy = StrategyKind::DirectParse, error = error);
        log_recovery!(
            recovered,
            strategy = StrategyKind::FenceStrip,
            kind = RecordKind::Lesson,
            duration_ms = 3
        );
        log_recovery!(
            backfilled,
            strategy = StrategyKind::BraceScan,
            kind = RecordKind::Lesson,
            fields = "keyConcepts,commonMistakes",
            duration_ms = 4
        );
        log_recovery!(
            degraded,
            strategy = StrategyKind::Synthesis,
            kind = RecordKind::Question,
            reason = reason,
            duration_ms = 1
        );

        log_llm_operation!(start, "generate", provider = "OpenAI", topic = "Ownership");
        log_llm_operation!(
            success,
            "generate",
            provider = "OpenAI",
            duration_ms = 1500,
            response_length = 1024
        );
        log_llm_operation!(error, "generate", provider = "Gemini", error = "timeout");
        log_llm_operation!(warn, "generate", "empty response");

        log_system_event!(startup, component = "cli", "starting");
        log_system_event!(shutdown, component = "cli", "done");
        log_system_event!(config, "configuration loaded successfully");

        log_performance!("batch_generation", duration_ms = 2500, count = 4);
        log_performance!("single_recovery", duration_ms = 2);

        log_validation!(success, "generation_request", "request validated");
        log_validation!(failure, "generation_request", error = "empty topic");
    }
}
