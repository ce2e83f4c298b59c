use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::AssessmentResult;

/// One practice session: a knowledge point, the probing questions, the
/// learner's explanation and its assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub knowledge: String,
    pub questions: Vec<String>,
    pub answer: String,
    pub assessment: Option<AssessmentResult>,
    /// Tag ids, not names.
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    pub fn new(knowledge: String) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string(),
            knowledge,
            questions: Vec::new(),
            answer: String::new(),
            assessment: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.trim().to_string(),
            color: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_color(name: &str, color: Option<String>) -> Self {
        let mut tag = Self::new(name);
        tag.color = color;
        tag
    }
}
