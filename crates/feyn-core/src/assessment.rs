use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A domain term found in the learner's answer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyItem {
    pub term: String,
    /// Character offset into the source text.
    pub position: usize,
    /// Plainer wording to use instead, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Rubric scores as returned by an assessor, before composition.
///
/// All four dimensions are 1-10. `terminology` reads inverted: a low score
/// means few unexplained technical terms, which is what the method rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricAssessment {
    pub clarity: u8,
    pub logic: u8,
    pub completeness: u8,
    pub terminology: u8,
    pub suggestions: Vec<String>,
}

/// Final assessment of one answer, as persisted inside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub clarity: u8,
    pub logic: u8,
    pub completeness: u8,
    pub terminology: u8,
    /// Weighted composite of the four dimensions, 1-10.
    pub overall: u8,
    pub terminology_list: Vec<TerminologyItem>,
    pub suggestions: Vec<String>,
    pub assessed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
}
