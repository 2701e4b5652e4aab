//! Deterministic placeholder records used when nothing usable can be recovered.

use serde_json::Value;

use crate::models::{
    Difficulty, GenerationRequest, KeyConcept, LessonRecord, QuestionRecord, RecordKind,
    StructuredRecord,
};
use crate::schema::{Constraint, SchemaDescriptor, ValidationResult, OPTION_COUNT};

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSynthesizer;

impl FallbackSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Build a schema-valid record from the request alone. Same input, same output.
    pub fn synthesize(&self, request: &GenerationRequest, schema: &SchemaDescriptor) -> StructuredRecord {
        match schema.kind {
            RecordKind::Lesson => StructuredRecord::Lesson(self.lesson(request)),
            RecordKind::Question => StructuredRecord::Question(self.question(request, 0)),
        }
    }

    fn lesson(&self, request: &GenerationRequest) -> LessonRecord {
        let topic = request.topic.trim();
        let level = level_label(request.difficulty);

        let key_concepts = [
            ("Core definition", "what it is and the problem it solves"),
            ("Building blocks", "the parts it is made of and how they relate"),
            ("Typical usage", "where it shows up in practice"),
            ("Limits and trade-offs", "when it stops being the right tool"),
        ]
        .iter()
        .map(|(title, angle)| KeyConcept {
            title: format!("{}: {}", title, topic),
            explanation: format!("A {} look at {}: {}.", level, topic, angle),
            example: format!("Work through a short {} example involving {}.", level, topic),
        })
        .collect();

        let common_mistakes = vec![
            format!("Memorizing terms about {} without understanding them", topic),
            format!("Skipping the fundamentals of {} before moving on", topic),
            format!("Applying {} outside the situations it was meant for", topic),
        ];

        let practice_questions = (0..3).map(|index| self.question(request, index)).collect();

        LessonRecord {
            title: format!("Introduction to {}", topic),
            summary: format!(
                "A {} overview of {} covering its core ideas, common pitfalls and practice questions.",
                level, topic
            ),
            key_concepts,
            common_mistakes,
            practice_questions,
        }
    }

    fn question(&self, request: &GenerationRequest, index: usize) -> QuestionRecord {
        let topic = request.topic.trim();
        let prompts = [
            format!("Which statement best describes {}?", topic),
            format!("What is a good first step when learning {}?", topic),
            format!("Which habit helps most when practicing {}?", topic),
        ];
        let correct = [
            format!("It is a {} topic worth studying from its fundamentals", level_label(request.difficulty)),
            format!("Review the core definitions of {}", topic),
            "Checking answers against worked examples".to_string(),
        ];
        let distractors = [
            "It cannot be learned through practice".to_string(),
            "It has no practical applications".to_string(),
            "Only memorization is needed".to_string(),
        ];

        let slot = index % prompts.len();
        // Rotate the correct answer through the option positions.
        let answer_position = index % OPTION_COUNT;
        let mut options: Vec<String> = distractors.to_vec();
        options.insert(answer_position.min(options.len()), correct[slot].clone());

        QuestionRecord {
            question: prompts[slot].clone(),
            answer: correct[slot].clone(),
            options,
            explanation: format!(
                "This placeholder question about {} was generated because the original content could not be recovered.",
                topic
            ),
        }
    }
}

fn level_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "beginner-friendly",
        Difficulty::Hard => "advanced",
    }
}

/// Replace the fields a partial candidate got wrong with the synthesized record's values.
///
/// Returns the patched value and the names of the replaced top-level fields,
/// or `None` when `partial` is not an object.
pub fn backfill(
    partial: &Value,
    synthesized: &StructuredRecord,
    validation: &ValidationResult,
    schema: &SchemaDescriptor,
) -> Option<(Value, Vec<String>)> {
    let mut patched = partial.as_object()?.clone();
    let donor = synthesized.to_value();
    let donor = donor.as_object()?;

    let mut replaced: Vec<String> = validation
        .top_level_fields()
        .into_iter()
        .map(str::to_string)
        .collect();

    // Keep constrained pairs consistent, e.g. a donated answer needs the donated options.
    for constraint in &schema.root.constraints {
        let Constraint::OneOf { field, options } = constraint;
        let touched = replaced.iter().any(|name| name == field || name == options);
        if touched {
            for name in [*field, *options] {
                if !replaced.iter().any(|existing| existing == name) {
                    replaced.push(name.to_string());
                }
            }
        }
    }

    for name in &replaced {
        if let Some(value) = donor.get(name) {
            patched.insert(name.clone(), value.clone());
        }
    }

    Some((Value::Object(patched), replaced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    fn request(topic: &str, difficulty: Difficulty) -> GenerationRequest {
        GenerationRequest::new(topic, difficulty).unwrap()
    }

    #[test]
    fn test_synthesized_lesson_is_valid() {
        let schema = SchemaDescriptor::lesson();
        for difficulty in [Difficulty::Easy, Difficulty::Hard] {
            let record = FallbackSynthesizer::new().synthesize(&request("Borrowing", difficulty), &schema);
            let result = validate(&record.to_value(), &schema);
            assert!(result.valid, "errors: {:?}", result.missing_or_malformed);

            let lesson = record.as_lesson().unwrap();
            assert!(lesson.title.contains("Borrowing"));
            assert!((4..=6).contains(&lesson.key_concepts.len()));
            assert_eq!(lesson.practice_questions.len(), 3);
        }
    }

    #[test]
    fn test_synthesized_question_is_valid() {
        let schema = SchemaDescriptor::question();
        let record = FallbackSynthesizer::new().synthesize(&request("Lifetimes", Difficulty::Hard), &schema);
        assert!(validate(&record.to_value(), &schema).valid);

        let question = record.as_question().unwrap();
        assert!(question.question.contains("Lifetimes"));
        assert_eq!(question.options.len(), OPTION_COUNT);
        assert!(question.options.contains(&question.answer));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let schema = SchemaDescriptor::lesson();
        let synthesizer = FallbackSynthesizer::new();
        let first = synthesizer.synthesize(&request("Traits", Difficulty::Easy), &schema);
        let second = synthesizer.synthesize(&request("Traits", Difficulty::Easy), &schema);
        assert_eq!(first, second);
    }

    #[test]
    fn test_answer_position_rotates() {
        let lesson = FallbackSynthesizer::new().lesson(&request("Closures", Difficulty::Easy));
        let positions: Vec<usize> = lesson
            .practice_questions
            .iter()
            .map(|q| q.options.iter().position(|o| o == &q.answer).unwrap())
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_backfill_keeps_recovered_fields() {
        let schema = SchemaDescriptor::lesson();
        let req = request("Iterators", Difficulty::Easy);
        let synthesized = FallbackSynthesizer::new().synthesize(&req, &schema);
        let partial = json!({"title": "Iterators in depth", "summary": "Lazy sequences."});

        let validation = validate(&partial, &schema);
        let (patched, replaced) = backfill(&partial, &synthesized, &validation, &schema).unwrap();

        assert!(validate(&patched, &schema).valid);
        assert_eq!(patched["title"], "Iterators in depth");
        assert_eq!(replaced, vec!["keyConcepts", "commonMistakes", "practiceQuestions"]);
    }

    #[test]
    fn test_backfill_replaces_constrained_pair() {
        let schema = SchemaDescriptor::question();
        let req = request("Generics", Difficulty::Hard);
        let synthesized = FallbackSynthesizer::new().synthesize(&req, &schema);
        let partial = json!({
            "question": "What do generics give you?",
            "options": ["Reuse", "Speed", "Safety", "Nothing"],
            "explanation": "Monomorphization."
        });

        let validation = validate(&partial, &schema);
        let (patched, replaced) = backfill(&partial, &synthesized, &validation, &schema).unwrap();

        assert_eq!(replaced, vec!["answer", "options"]);
        assert_eq!(patched["question"], "What do generics give you?");
        assert!(validate(&patched, &schema).valid);
    }

    #[test]
    fn test_backfill_rejects_non_objects() {
        let schema = SchemaDescriptor::question();
        let synthesized = FallbackSynthesizer::new().synthesize(&request("x", Difficulty::Easy), &schema);
        let validation = validate(&json!("text"), &schema);
        assert!(backfill(&json!("text"), &synthesized, &validation, &schema).is_none());
    }
}
