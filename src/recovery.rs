//! Recovery of structured records from unreliable model output.
//!
//! The model is asked for one JSON object but often wraps it in code fences,
//! doubles its escapes, leaves trailing commas, truncates it or answers in
//! prose. [`RecoveryPipeline`] runs an ordered cascade of increasingly
//! aggressive extraction strategies over the raw text and returns the first
//! candidate the schema admits. When every strategy fails, the
//! [`FallbackSynthesizer`] builds a placeholder, so recovery never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;
use crate::errors::RecoveryError;
use crate::fallback::{backfill, FallbackSynthesizer};
use crate::models::{GenerationRequest, StructuredRecord};
use crate::schema::{admit, has_keys, validate, Candidate, SchemaDescriptor};

// Import logging macros
use crate::log_recovery;

static FENCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_+\-]*[ \t]*$").expect("fence line pattern")
});
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A```[A-Za-z0-9_+\-]*").expect("opening fence pattern"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\z").expect("closing fence pattern"));
static ESCAPED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\"[A-Za-z_][A-Za-z0-9_]*\\"\s*:"#).expect("escaped key pattern")
});
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^\\])"[A-Za-z_][A-Za-z0-9_]*"\s*:"#).expect("bare key pattern")
});
static ESCAPED_QUOTE_AFTER_STRUCTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\{\[,:]\s*)\\""#).expect("leading quote pattern"));
static ESCAPED_QUOTE_BEFORE_STRUCTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\"(\s*[:,\}\]])"#).expect("trailing quote pattern"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\}\]])").expect("trailing comma pattern"));

/// Which step of the cascade produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectParse,
    FenceStrip,
    BoundExtraction,
    Normalization,
    FieldAnchored,
    FieldAnchoredReduced,
    BraceScan,
    Synthesis,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DirectParse => "direct_parse",
            StrategyKind::FenceStrip => "fence_strip",
            StrategyKind::BoundExtraction => "bound_extraction",
            StrategyKind::Normalization => "normalization",
            StrategyKind::FieldAnchored => "field_anchored",
            StrategyKind::FieldAnchoredReduced => "field_anchored_reduced",
            StrategyKind::BraceScan => "brace_scan",
            StrategyKind::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the brace scan picks among qualifying candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSelection {
    /// Greatest raw character length, earliest on ties.
    #[default]
    Longest,
    /// Fewest schema errors, then longest, then earliest.
    MostComplete,
}

impl FromStr for CandidateSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "longest" => Ok(CandidateSelection::Longest),
            "most_complete" | "complete" => Ok(CandidateSelection::MostComplete),
            other => Err(format!("unknown candidate selection '{}'", other)),
        }
    }
}

/// Result of one pipeline run, including diagnostics callers may ignore.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryOutcome {
    pub record: StructuredRecord,
    pub strategy: StrategyKind,
    /// True when any part of `record` is synthesized placeholder content.
    pub degraded: bool,
    /// Why the cascade fell through to synthesis, if it did.
    pub failure: Option<RecoveryError>,
    /// Top-level fields filled in from the synthesized record.
    pub backfilled: Vec<String>,
}

/// Receives pipeline diagnostics. Correctness never depends on it.
pub trait RecoveryObserver: Send + Sync {
    fn strategy_failed(&self, _strategy: StrategyKind, _error: &RecoveryError) {}

    fn recovered(&self, _outcome: &RecoveryOutcome, _elapsed: Duration) {}
}

/// Emits structured `tracing` events for every pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RecoveryObserver for TracingObserver {
    fn strategy_failed(&self, strategy: StrategyKind, error: &RecoveryError) {
        log_recovery!(attempt_failed, strategy = strategy, error = error);
    }

    fn recovered(&self, outcome: &RecoveryOutcome, elapsed: Duration) {
        let duration_ms = elapsed.as_millis() as u64;
        match &outcome.failure {
            Some(failure) => log_recovery!(
                degraded,
                strategy = outcome.strategy,
                kind = outcome.record.kind(),
                reason = failure,
                duration_ms = duration_ms
            ),
            None if outcome.degraded => log_recovery!(
                backfilled,
                strategy = outcome.strategy,
                kind = outcome.record.kind(),
                fields = outcome.backfilled.join(","),
                duration_ms = duration_ms
            ),
            None => log_recovery!(
                recovered,
                strategy = outcome.strategy,
                kind = outcome.record.kind(),
                duration_ms = duration_ms
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RecoveryObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acceptance {
    /// The candidate must pass validation as parsed.
    Complete,
    /// The candidate may be backfilled from the synthesized record first.
    Partial,
}

type Attempt = Result<Value, RecoveryError>;
type Extractor = fn(&str, &SchemaDescriptor, &RecoveryConfig) -> Vec<Attempt>;

struct Strategy {
    kind: StrategyKind,
    extract: Extractor,
    acceptance: Acceptance,
}

const CASCADE: [Strategy; 7] = [
    Strategy {
        kind: StrategyKind::DirectParse,
        extract: direct_parse,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::FenceStrip,
        extract: fence_strip,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::BoundExtraction,
        extract: bound_extraction,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::Normalization,
        extract: normalization,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::FieldAnchored,
        extract: field_anchored,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::FieldAnchoredReduced,
        extract: field_anchored_reduced,
        acceptance: Acceptance::Complete,
    },
    Strategy {
        kind: StrategyKind::BraceScan,
        extract: brace_scan,
        acceptance: Acceptance::Partial,
    },
];

/// Stateless recovery cascade. Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct RecoveryPipeline {
    config: RecoveryConfig,
    synthesizer: FallbackSynthesizer,
    observer: Arc<dyn RecoveryObserver>,
}

impl fmt::Debug for RecoveryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RecoveryPipeline {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl RecoveryPipeline {
    pub fn new(config: RecoveryConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(config: RecoveryConfig, observer: Arc<dyn RecoveryObserver>) -> Self {
        Self {
            config,
            synthesizer: FallbackSynthesizer::new(),
            observer,
        }
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Turn raw model output into a record that always passes `schema`.
    pub fn recover(
        &self,
        raw: &str,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> StructuredRecord {
        self.recover_with_report(raw, request, schema).record
    }

    pub fn recover_with_report(
        &self,
        raw: &str,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> RecoveryOutcome {
        let started = Instant::now();
        let length = raw.chars().count();

        let outcome = if length < self.config.min_response_length {
            self.synthesized(
                request,
                schema,
                RecoveryError::TruncatedResponse {
                    length,
                    minimum: self.config.min_response_length,
                },
            )
        } else {
            self.run_cascade(raw, request, schema)
        };

        let outcome = self.ensure_valid(outcome, request, schema);
        self.observer.recovered(&outcome, started.elapsed());
        outcome
    }

    fn run_cascade(
        &self,
        raw: &str,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> RecoveryOutcome {
        let mut attempts = 0;

        for strategy in &CASCADE {
            for attempt in (strategy.extract)(raw, schema, &self.config) {
                attempts += 1;
                let accepted = attempt.and_then(|value| self.accept(value, strategy.acceptance, request, schema));
                match accepted {
                    Ok((record, backfilled)) => {
                        return RecoveryOutcome {
                            record,
                            strategy: strategy.kind,
                            degraded: !backfilled.is_empty(),
                            failure: None,
                            backfilled,
                        };
                    }
                    Err(error) => self.observer.strategy_failed(strategy.kind, &error),
                }
            }
        }

        self.synthesized(request, schema, RecoveryError::UnparsableResponse { attempts })
    }

    fn accept(
        &self,
        value: Value,
        acceptance: Acceptance,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> Result<(StructuredRecord, Vec<String>), RecoveryError> {
        let validation = validate(&value, schema);
        if validation.valid {
            return Ok((Candidate::Unvalidated(value).validate(schema)?, Vec::new()));
        }

        let violation = RecoveryError::SchemaViolation {
            fields: validation.missing_or_malformed.clone(),
        };
        if acceptance == Acceptance::Complete || !self.config.backfill_partial {
            return Err(violation);
        }

        let synthesized = self.synthesizer.synthesize(request, schema);
        let (patched, backfilled) =
            backfill(&value, &synthesized, &validation, schema).ok_or(violation)?;
        Ok((admit(patched, schema)?, backfilled))
    }

    fn synthesized(
        &self,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
        failure: RecoveryError,
    ) -> RecoveryOutcome {
        RecoveryOutcome {
            record: self.synthesizer.synthesize(request, schema),
            strategy: StrategyKind::Synthesis,
            degraded: true,
            failure: Some(failure),
            backfilled: Vec::new(),
        }
    }

    /// Final guarantee check before the record leaves the pipeline.
    fn ensure_valid(
        &self,
        outcome: RecoveryOutcome,
        request: &GenerationRequest,
        schema: &SchemaDescriptor,
    ) -> RecoveryOutcome {
        let result = validate(&outcome.record.to_value(), schema);
        if result.valid && outcome.record.kind() == schema.kind {
            return outcome;
        }
        self.synthesized(
            request,
            schema,
            RecoveryError::SchemaViolation {
                fields: result.missing_or_malformed,
            },
        )
    }
}

fn parse(text: &str) -> Attempt {
    Ok(serde_json::from_str::<Value>(text)?)
}

fn direct_parse(raw: &str, _schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    vec![parse(raw)]
}

fn fence_strip(raw: &str, _schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    let stripped = strip_fences(raw);
    if stripped == raw.trim() {
        return Vec::new();
    }
    vec![parse(&stripped)]
}

fn bound_extraction(raw: &str, _schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    match bound_slice(raw) {
        Some(slice) => vec![parse(slice)],
        None => vec![Err(RecoveryError::Parse("no brace-delimited object found".to_string()))],
    }
}

fn normalization(raw: &str, _schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    let stripped = strip_fences(raw);
    let base = bound_slice(raw).map(str::to_string).unwrap_or(stripped);
    normalization_steps(&base)
        .iter()
        .map(|text| parse(text))
        .collect()
}

fn field_anchored(raw: &str, schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    let required = schema.required_fields();
    let (Some(first), Some(last)) = (required.first(), required.last()) else {
        return Vec::new();
    };
    vec![anchored_window(raw, first, last).and_then(|window| parse(&window))]
}

fn field_anchored_reduced(raw: &str, schema: &SchemaDescriptor, _config: &RecoveryConfig) -> Vec<Attempt> {
    let essential = schema.essential_fields();
    let required = schema.required_fields();
    let (Some(first), Some(last)) = (essential.first(), essential.last()) else {
        return Vec::new();
    };

    let reduced = anchored_window(raw, first, last);
    // Identical windows were already tried by the full anchor.
    if let (Ok(reduced_text), Some(full_last)) = (&reduced, required.last()) {
        if anchored_window(raw, first, full_last).ok().as_ref() == Some(reduced_text) {
            return Vec::new();
        }
    }
    vec![reduced.and_then(|window| parse(&window))]
}

fn brace_scan(raw: &str, schema: &SchemaDescriptor, config: &RecoveryConfig) -> Vec<Attempt> {
    let essential = schema.essential_fields();

    let qualifying: Vec<(usize, Value)> = balanced_spans(raw)
        .into_iter()
        .filter_map(|span| {
            let value = parse(span).ok().or_else(|| {
                let normalized = normalize(span);
                (normalized != span).then(|| parse(&normalized).ok()).flatten()
            })?;
            has_keys(&value, &essential).then(|| (span.chars().count(), value))
        })
        .collect();

    match select_candidate(qualifying, schema, config.candidate_selection) {
        Some(value) => vec![Ok(value)],
        None => vec![Err(RecoveryError::Parse(format!(
            "no balanced object carries {}",
            essential.join(" and ")
        )))],
    }
}

fn select_candidate(
    candidates: Vec<(usize, Value)>,
    schema: &SchemaDescriptor,
    selection: CandidateSelection,
) -> Option<Value> {
    let mut best: Option<(usize, usize, Value)> = None;

    for (length, value) in candidates {
        let errors = match selection {
            CandidateSelection::Longest => 0,
            CandidateSelection::MostComplete => validate(&value, schema).missing_or_malformed.len(),
        };
        // Strict comparisons keep the earliest candidate on ties.
        let better = match &best {
            None => true,
            Some((best_errors, best_length, _)) => {
                errors < *best_errors || (errors == *best_errors && length > *best_length)
            }
        };
        if better {
            best = Some((errors, length, value));
        }
    }

    best.map(|(_, _, value)| value)
}

/// Remove code fence markers, with or without a language tag, that sit on their own
/// line or wrap the whole text. Markers inside string values are left alone.
pub fn strip_fences(text: &str) -> String {
    let unfenced = FENCE_LINE.replace_all(text, "");
    let opened = OPENING_FENCE.replace(unfenced.trim(), "");
    CLOSING_FENCE.replace(&opened, "").trim().to_string()
}

/// The substring from the first `{` to the last `}`, inclusive.
pub fn bound_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Window from the first `"first"` key through the last `}` after the last `"last"` key,
/// reopened with a leading brace.
fn anchored_window(text: &str, first: &str, last: &str) -> Result<String, RecoveryError> {
    let first_key = format!("\"{}\"", first);
    let last_key = format!("\"{}\"", last);

    let start = text
        .find(&first_key)
        .ok_or_else(|| RecoveryError::Parse(format!("key {} not found", first_key)))?;
    let last_position = text[start..]
        .rfind(&last_key)
        .map(|offset| start + offset)
        .ok_or_else(|| RecoveryError::Parse(format!("key {} not found", last_key)))?;
    let close = text[last_position..]
        .rfind('}')
        .map(|offset| last_position + offset)
        .ok_or_else(|| RecoveryError::Parse(format!("no closing brace after {}", last_key)))?;

    Ok(normalize(&format!("{{{}", &text[start..=close])))
}

/// Byte spans where brace depth returns to zero after being positive.
pub fn balanced_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (index, ch) in text.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    start = index;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=index]);
                }
            }
            _ => {}
        }
    }

    spans
}

fn until_stable(text: &str, fixup: impl Fn(&str) -> String) -> String {
    let mut current = text.to_string();
    loop {
        let next = fixup(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// `\\"` becomes `\"`.
fn collapse_doubled_escapes(text: &str) -> String {
    until_stable(text, |current| current.replace("\\\\\"", "\\\""))
}

/// `\"` next to `{ [ , :` or before `: , } ]` becomes a plain quote.
fn unescape_boundary_quotes(text: &str) -> String {
    until_stable(text, |current| {
        let leading = ESCAPED_QUOTE_AFTER_STRUCTURE.replace_all(current, "$1\"");
        ESCAPED_QUOTE_BEFORE_STRUCTURE
            .replace_all(&leading, "\"$1")
            .into_owned()
    })
}

fn remove_trailing_commas(text: &str) -> String {
    until_stable(text, |current| TRAILING_COMMA.replace_all(current, "$1").into_owned())
}

/// Keys appear only as `\"key\":`, so every quote in the text carries one escape too many.
fn is_double_escaped(text: &str) -> bool {
    ESCAPED_KEY.is_match(text) && !BARE_KEY.is_match(text)
}

fn apply_fixups(text: &str) -> [String; 4] {
    let collapsed = collapse_doubled_escapes(text);
    let unescaped = if is_double_escaped(&collapsed) {
        unescape_boundary_quotes(&collapsed)
    } else {
        collapsed.clone()
    };
    let unfenced = strip_fences(&unescaped);
    let trimmed = remove_trailing_commas(&unfenced);
    [collapsed, unescaped, unfenced, trimmed]
}

/// All normalization fixups, repeated until nothing changes. Idempotent.
pub fn normalize(text: &str) -> String {
    until_stable(text, |current| {
        let [.., trimmed] = apply_fixups(current);
        trimmed
    })
}

/// Texts to parse after each cumulative fixup, skipping ones identical to an earlier text.
fn normalization_steps(base: &str) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();
    let [collapsed, unescaped, unfenced, trimmed] = apply_fixups(base);

    for text in [collapsed, unescaped, unfenced, trimmed, normalize(base)] {
        if text != base && !steps.contains(&text) {
            steps.push(text);
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_with_and_without_language() {
        assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("Here:\n```JSON\n{}\n```\nDone"), "Here:\n\n{}\n\nDone");
    }

    #[test]
    fn test_strip_fences_keeps_markers_inside_values() {
        let text = "```json\n{\"a\": \"Run ```rust\\nmain()\\n``` first\"}\n```";
        assert_eq!(strip_fences(text), "{\"a\": \"Run ```rust\\nmain()\\n``` first\"}");
        assert_eq!(strip_fences("```json {\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_is_double_escaped() {
        assert!(is_double_escaped(r#"{\"a\": \"b\"}"#));
        assert!(!is_double_escaped(r#"{"a": "write \"key\": value pairs"}"#));
        assert!(!is_double_escaped("no keys here"));
    }

    #[test]
    fn test_normalize_keeps_escaped_quotes_in_plain_json() {
        let text = r#"{"explanation": "In Rust, \"move\" closures take ownership.",}"#;
        let value: Value = serde_json::from_str(&normalize(text)).unwrap();
        assert_eq!(value["explanation"], "In Rust, \"move\" closures take ownership.");
    }

    #[test]
    fn test_bound_slice() {
        assert_eq!(bound_slice("noise {\"a\": {\"b\": 1}} tail"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(bound_slice("} backwards {"), None);
        assert_eq!(bound_slice("no braces"), None);
    }

    #[test]
    fn test_collapse_doubled_escapes() {
        assert_eq!(collapse_doubled_escapes(r#"{\\"a\\": 1}"#), r#"{\"a\": 1}"#);
        assert_eq!(collapse_doubled_escapes(r#"\\\\""#), r#"\""#);
    }

    #[test]
    fn test_unescape_boundary_quotes() {
        assert_eq!(
            unescape_boundary_quotes(r#"{\"a\": \"b\", \"c\": [\"d\"]}"#),
            r#"{"a": "b", "c": ["d"]}"#
        );
    }

    #[test]
    fn test_remove_trailing_commas() {
        assert_eq!(remove_trailing_commas("{\"a\": [1, 2,], }"), "{\"a\": [1, 2]}");
        assert_eq!(remove_trailing_commas("[1,,]"), "[1]");
    }

    #[test]
    fn test_normalize_repairs_double_escaped_object() {
        let text = r#"{\\"question\\": \\"Why?\\", \\"options\\": [\\"a\\",],}"#;
        let normalized = normalize(text);
        let value: Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["question"], "Why?");
        assert_eq!(value["options"][0], "a");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            r#"{\\"a\\": \\"b\\",}"#,
            "```json\n{\"a\": [1,],}\n```",
            r#"{\"x\": \"y\" ,}"#,
            "plain text, no structure",
            r#"{"quote": "she said \"hi\""}"#,
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_normalization_steps_are_cumulative_and_distinct() {
        let steps = normalization_steps("{\"a\": 1,}");
        assert_eq!(steps, vec!["{\"a\": 1}".to_string()]);
        assert!(normalization_steps("{\"a\": 1}").is_empty());
    }

    #[test]
    fn test_balanced_spans() {
        let text = "x {\"a\": {\"b\": 1}} y } {\"c\": 2} {unclosed";
        assert_eq!(balanced_spans(text), vec!["{\"a\": {\"b\": 1}}", "{\"c\": 2}"]);
    }

    #[test]
    fn test_anchored_window_reopens_object() {
        let text = "Result: \"question\": \"Q\", \"options\": [], \"explanation\": \"E\"} trailing";
        let window = anchored_window(text, "question", "explanation").unwrap();
        assert_eq!(window, "{\"question\": \"Q\", \"options\": [], \"explanation\": \"E\"}");
        assert!(anchored_window(text, "title", "explanation").is_err());
    }

    #[test]
    fn test_select_candidate_tie_keeps_earliest() {
        let schema = SchemaDescriptor::question();
        let candidates = vec![
            (10, serde_json::json!({"id": 1})),
            (10, serde_json::json!({"id": 2})),
        ];
        let selected = select_candidate(candidates, &schema, CandidateSelection::Longest).unwrap();
        assert_eq!(selected["id"], 1);
    }

    #[test]
    fn test_candidate_selection_parsing() {
        assert_eq!("longest".parse::<CandidateSelection>(), Ok(CandidateSelection::Longest));
        assert_eq!(
            "Most-Complete".parse::<CandidateSelection>(),
            Ok(CandidateSelection::MostComplete)
        );
        assert!("biggest".parse::<CandidateSelection>().is_err());
    }
}
