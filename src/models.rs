use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::RecoveryError;
use crate::recovery::StrategyKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "hard" => Ok(Difficulty::Hard),
            other => Err(RecoveryError::InvalidRequest(format!(
                "unknown difficulty '{}', expected 'easy' or 'hard'",
                other
            ))),
        }
    }
}

/// Parameters of one generation call. Seeds the fallback content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub difficulty: Difficulty,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, difficulty: Difficulty) -> Result<Self, RecoveryError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(RecoveryError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        Ok(Self { topic, difficulty })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Lesson,
    Question,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Lesson => f.write_str("lesson"),
            RecordKind::Question => f.write_str("question"),
        }
    }
}

impl FromStr for RecordKind {
    type Err = RecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lesson" => Ok(RecordKind::Lesson),
            "question" | "quiz" => Ok(RecordKind::Question),
            other => Err(RecoveryError::InvalidRequest(format!(
                "unknown record kind '{}', expected 'lesson' or 'question'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyConcept {
    pub title: String,
    pub explanation: String,
    pub example: String,
}

/// Multiple-choice question. `answer` is always one of `options`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub title: String,
    pub summary: String,
    pub key_concepts: Vec<KeyConcept>,
    pub common_mistakes: Vec<String>,
    pub practice_questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StructuredRecord {
    Lesson(LessonRecord),
    Question(QuestionRecord),
}

impl StructuredRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            StructuredRecord::Lesson(_) => RecordKind::Lesson,
            StructuredRecord::Question(_) => RecordKind::Question,
        }
    }

    pub fn as_lesson(&self) -> Option<&LessonRecord> {
        match self {
            StructuredRecord::Lesson(lesson) => Some(lesson),
            StructuredRecord::Question(_) => None,
        }
    }

    pub fn as_question(&self) -> Option<&QuestionRecord> {
        match self {
            StructuredRecord::Question(question) => Some(question),
            StructuredRecord::Lesson(_) => None,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            StructuredRecord::Lesson(lesson) => serde_json::to_value(lesson),
            StructuredRecord::Question(question) => serde_json::to_value(question),
        };
        // Records hold only strings and lists, serialization cannot fail.
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Hand-off envelope for the persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub id: Uuid,
    pub topic: String,
    pub difficulty: Difficulty,
    pub kind: RecordKind,
    pub record: StructuredRecord,
    pub strategy: StrategyKind,
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}
