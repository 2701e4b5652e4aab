//! Declarative record schemas and the structural validator.
//!
//! A [`SchemaDescriptor`] lists the required fields of a record, the shape of
//! each field and any cross-field constraints. [`validate`] checks a parsed
//! JSON value against it and reports every missing or malformed field path.
//! [`admit`] is the only way an unchecked value becomes a [`StructuredRecord`].

use serde::Serialize;
use serde_json::Value;

use crate::errors::RecoveryError;
use crate::models::{LessonRecord, QuestionRecord, RecordKind, StructuredRecord};

/// Number of options every multiple-choice question carries.
pub const OPTION_COUNT: usize = 4;
pub const PRACTICE_QUESTION_COUNT: usize = 3;
pub const MIN_COMMON_MISTAKES: usize = 3;
pub const MIN_KEY_CONCEPTS: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// A JSON string.
    Text,
    /// A JSON array whose elements all have `element` shape.
    List {
        element: Box<FieldShape>,
        min_len: usize,
        exact_len: Option<usize>,
    },
    Object(ObjectShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The string in `field` must equal one of the strings in the list `options`.
    OneOf {
        field: &'static str,
        options: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectShape {
    pub fields: Vec<FieldSpec>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub kind: RecordKind,
    pub root: ObjectShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub missing_or_malformed: Vec<String>,
}

impl ValidationResult {
    fn from_errors(missing_or_malformed: Vec<String>) -> Self {
        Self {
            valid: missing_or_malformed.is_empty(),
            missing_or_malformed,
        }
    }

    /// Top-level field names touched by the reported paths, deduplicated in report order.
    pub fn top_level_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for path in &self.missing_or_malformed {
            let end = path.find(['.', '[']).unwrap_or(path.len());
            let name = &path[..end];
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }
}

fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        shape: FieldShape::Text,
    }
}

fn list(name: &'static str, element: FieldShape, min_len: usize, exact_len: Option<usize>) -> FieldSpec {
    FieldSpec {
        name,
        shape: FieldShape::List {
            element: Box::new(element),
            min_len,
            exact_len,
        },
    }
}

fn question_shape() -> ObjectShape {
    ObjectShape {
        fields: vec![
            text("question"),
            list("options", FieldShape::Text, OPTION_COUNT, Some(OPTION_COUNT)),
            text("answer"),
            text("explanation"),
        ],
        constraints: vec![Constraint::OneOf {
            field: "answer",
            options: "options",
        }],
    }
}

impl SchemaDescriptor {
    pub fn lesson() -> Self {
        let key_concept = ObjectShape {
            fields: vec![text("title"), text("explanation"), text("example")],
            constraints: Vec::new(),
        };

        Self {
            kind: RecordKind::Lesson,
            root: ObjectShape {
                fields: vec![
                    text("title"),
                    text("summary"),
                    list(
                        "keyConcepts",
                        FieldShape::Object(key_concept),
                        MIN_KEY_CONCEPTS,
                        None,
                    ),
                    list("commonMistakes", FieldShape::Text, MIN_COMMON_MISTAKES, None),
                    list(
                        "practiceQuestions",
                        FieldShape::Object(question_shape()),
                        PRACTICE_QUESTION_COUNT,
                        Some(PRACTICE_QUESTION_COUNT),
                    ),
                ],
                constraints: Vec::new(),
            },
        }
    }

    pub fn question() -> Self {
        Self {
            kind: RecordKind::Question,
            root: question_shape(),
        }
    }

    pub fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Lesson => Self::lesson(),
            RecordKind::Question => Self::question(),
        }
    }

    /// Required top-level field names in declared order.
    pub fn required_fields(&self) -> Vec<&'static str> {
        self.root.fields.iter().map(|field| field.name).collect()
    }

    /// The first two required fields, the minimum a partial record must carry.
    pub fn essential_fields(&self) -> Vec<&'static str> {
        self.root.fields.iter().take(2).map(|field| field.name).collect()
    }
}

/// Check `candidate` against `schema`. Never panics; always returns a result.
pub fn validate(candidate: &Value, schema: &SchemaDescriptor) -> ValidationResult {
    let mut errors = Vec::new();
    match candidate {
        Value::Object(_) => validate_object(candidate, &schema.root, "", &mut errors),
        _ => errors.extend(schema.required_fields().into_iter().map(str::to_string)),
    }
    ValidationResult::from_errors(errors)
}

/// True when `candidate` is an object carrying every key in `keys`, whatever their values.
pub fn has_keys(candidate: &Value, keys: &[&str]) -> bool {
    candidate
        .as_object()
        .is_some_and(|object| keys.iter().all(|key| object.contains_key(*key)))
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_object(value: &Value, shape: &ObjectShape, prefix: &str, errors: &mut Vec<String>) {
    let Some(object) = value.as_object() else {
        errors.push(if prefix.is_empty() { "$".to_string() } else { prefix.to_string() });
        return;
    };

    for field in &shape.fields {
        let path = join_path(prefix, field.name);
        match object.get(field.name) {
            Some(field_value) => validate_shape(field_value, &field.shape, &path, errors),
            None => errors.push(path),
        }
    }

    for constraint in &shape.constraints {
        match constraint {
            Constraint::OneOf { field, options } => {
                // Only meaningful once both sides are well-formed; shape errors are reported above.
                let chosen = object.get(*field).and_then(Value::as_str);
                let choices = object.get(*options).and_then(Value::as_array);
                if let (Some(chosen), Some(choices)) = (chosen, choices) {
                    if !choices.iter().any(|choice| choice.as_str() == Some(chosen)) {
                        errors.push(join_path(prefix, field));
                    }
                }
            }
        }
    }
}

fn validate_shape(value: &Value, shape: &FieldShape, path: &str, errors: &mut Vec<String>) {
    match shape {
        FieldShape::Text => {
            if !value.is_string() {
                errors.push(path.to_string());
            }
        }
        FieldShape::List {
            element,
            min_len,
            exact_len,
        } => {
            let Some(items) = value.as_array() else {
                errors.push(path.to_string());
                return;
            };
            let length_ok = match exact_len {
                Some(exact) => items.len() == *exact,
                None => items.len() >= *min_len,
            };
            if !length_ok {
                errors.push(path.to_string());
            }
            for (index, item) in items.iter().enumerate() {
                validate_shape(item, element, &format!("{}[{}]", path, index), errors);
            }
        }
        FieldShape::Object(object_shape) => validate_object(value, object_shape, path, errors),
    }
}

/// Convert a checked value into a typed record. The single admission point for parsed content.
pub fn admit(value: Value, schema: &SchemaDescriptor) -> Result<StructuredRecord, RecoveryError> {
    let result = validate(&value, schema);
    if !result.valid {
        return Err(RecoveryError::SchemaViolation {
            fields: result.missing_or_malformed,
        });
    }

    let record = match schema.kind {
        RecordKind::Lesson => StructuredRecord::Lesson(serde_json::from_value::<LessonRecord>(value)?),
        RecordKind::Question => {
            StructuredRecord::Question(serde_json::from_value::<QuestionRecord>(value)?)
        }
    };
    Ok(record)
}

/// A parsed value before and after schema admission.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Unvalidated(Value),
    Validated(StructuredRecord),
}

impl Candidate {
    pub fn validate(self, schema: &SchemaDescriptor) -> Result<StructuredRecord, RecoveryError> {
        match self {
            Candidate::Validated(record) if record.kind() == schema.kind => Ok(record),
            Candidate::Validated(record) => admit(record.to_value(), schema),
            Candidate::Unvalidated(value) => admit(value, schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_question() -> Value {
        json!({
            "question": "What does ownership prevent?",
            "options": ["Data races", "Slow builds", "Large binaries", "Verbose syntax"],
            "answer": "Data races",
            "explanation": "The borrow checker rejects aliased mutation."
        })
    }

    fn valid_lesson() -> Value {
        json!({
            "title": "Ownership",
            "summary": "How Rust manages memory without a garbage collector.",
            "keyConcepts": [
                {"title": "Move", "explanation": "Values have one owner.", "example": "let b = a;"}
            ],
            "commonMistakes": ["Using a moved value", "Fighting the borrow checker", "Cloning everything"],
            "practiceQuestions": [valid_question(), valid_question(), valid_question()]
        })
    }

    #[test]
    fn test_valid_question_passes() {
        let result = validate(&valid_question(), &SchemaDescriptor::question());
        assert!(result.valid, "unexpected errors: {:?}", result.missing_or_malformed);
    }

    #[test]
    fn test_valid_lesson_passes() {
        let result = validate(&valid_lesson(), &SchemaDescriptor::lesson());
        assert!(result.valid, "unexpected errors: {:?}", result.missing_or_malformed);
    }

    #[test]
    fn test_answer_must_be_an_option() {
        let mut question = valid_question();
        question["answer"] = json!("Memory leaks");
        let result = validate(&question, &SchemaDescriptor::question());
        assert!(!result.valid);
        assert_eq!(result.missing_or_malformed, vec!["answer"]);
    }

    #[test]
    fn test_option_count_is_exact() {
        let mut question = valid_question();
        question["options"] = json!(["Data races", "Slow builds", "Large binaries"]);
        let result = validate(&question, &SchemaDescriptor::question());
        assert_eq!(result.missing_or_malformed, vec!["options"]);
    }

    #[test]
    fn test_missing_fields_reported_in_declared_order() {
        let result = validate(&json!({"question": "Why?"}), &SchemaDescriptor::question());
        assert_eq!(
            result.missing_or_malformed,
            vec!["options", "answer", "explanation"]
        );
    }

    #[test]
    fn test_nested_paths_for_lesson() {
        let mut lesson = valid_lesson();
        lesson["practiceQuestions"][1]["answer"] = json!(42);
        lesson["commonMistakes"] = json!(["only one"]);
        let result = validate(&lesson, &SchemaDescriptor::lesson());
        assert!(!result.valid);
        assert!(result.missing_or_malformed.contains(&"commonMistakes".to_string()));
        assert!(result
            .missing_or_malformed
            .contains(&"practiceQuestions[1].answer".to_string()));
        assert_eq!(result.top_level_fields(), vec!["commonMistakes", "practiceQuestions"]);
    }

    #[test]
    fn test_non_object_reports_every_required_field() {
        let result = validate(&json!([1, 2, 3]), &SchemaDescriptor::question());
        assert!(!result.valid);
        assert_eq!(result.missing_or_malformed.len(), 4);
    }

    #[test]
    fn test_essential_fields() {
        assert_eq!(SchemaDescriptor::lesson().essential_fields(), vec!["title", "summary"]);
        assert_eq!(SchemaDescriptor::question().essential_fields(), vec!["question", "options"]);
    }

    #[test]
    fn test_admit_and_candidate_conversion() {
        let schema = SchemaDescriptor::question();
        let record = Candidate::Unvalidated(valid_question()).validate(&schema).unwrap();
        assert_eq!(record.as_question().unwrap().answer, "Data races");

        let revalidated = Candidate::Validated(record.clone()).validate(&schema).unwrap();
        assert_eq!(revalidated, record);

        let rejected = Candidate::Unvalidated(json!({"question": "Why?"})).validate(&schema);
        assert!(matches!(rejected, Err(RecoveryError::SchemaViolation { .. })));

        let wrong_kind = Candidate::Validated(record).validate(&SchemaDescriptor::lesson());
        assert!(wrong_kind.is_err());
    }

    #[test]
    fn test_has_keys() {
        assert!(has_keys(&valid_question(), &["question", "options"]));
        assert!(!has_keys(&json!({"question": "x"}), &["question", "options"]));
        assert!(!has_keys(&json!("question"), &["question"]));
    }
}
