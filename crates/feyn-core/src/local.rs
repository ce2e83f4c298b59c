//! Rule-based provider, no network.
//!
//! Stands in for the remote model during development and when no model is
//! reachable. Questions come from a canned list; scoring uses coarse
//! signals: answer length, connector words, concrete examples, and the
//! local terminology density.

use crate::assessment::RubricAssessment;
use crate::error::{FeynError, FeynResult};
use crate::pipeline::{AnswerAssessor, QuestionGenerator, ReferenceAnswerGenerator};
use crate::terminology::calculate_terminology_density;

const CANNED_QUESTIONS: &[&str] = &[
    "这是什么？",
    "它有什么用？",
    "为什么需要它？",
    "它是怎么工作的？",
    "能举个例子吗？",
];

const EXAMPLE_MARKERS: &[&str] = &["例如", "比如", "举例", "就像"];
const CONNECTOR_MARKERS: &[&str] = &["因为", "所以", "因此", "首先", "然后", "最后"];

#[derive(Debug, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

impl QuestionGenerator for LocalProvider {
    fn generate_questions(&self, knowledge: &str) -> FeynResult<Vec<String>> {
        // short knowledge points get the three basic questions only
        let count = if knowledge.chars().count() < 50 { 3 } else { 5 };
        Ok(CANNED_QUESTIONS
            .iter()
            .take(count)
            .map(|q| q.to_string())
            .collect())
    }
}

impl AnswerAssessor for LocalProvider {
    fn assess_answer(
        &self,
        _knowledge: &str,
        _question: &str,
        answer: &str,
    ) -> FeynResult<RubricAssessment> {
        let density = calculate_terminology_density(answer);
        let length = answer.chars().count();
        let has_examples = contains_any(answer, EXAMPLE_MARKERS);
        let has_connectors = contains_any(answer, CONNECTOR_MARKERS);

        let mut clarity = 5u8;
        if length > 50 {
            clarity += 2;
        }
        if has_examples {
            clarity += 2;
        }
        if has_connectors {
            clarity += 1;
        }

        let mut logic = 5u8;
        if has_connectors {
            logic += 3;
        }
        if length > 100 {
            logic += 2;
        }

        let mut completeness = 5u8;
        if length > 80 {
            completeness += 3;
        }
        if answer.contains('？') || length > 50 {
            completeness += 2;
        }

        let terminology = (10 - ((density * 20.0).floor() as i64).min(9)).clamp(1, 10) as u8;

        let mut suggestions = Vec::new();
        if density > 0.1 {
            suggestions.push("建议减少专业术语的使用，用更通俗的语言解释".to_string());
        }
        if length < 50 {
            suggestions.push("回答可以更详细一些，补充更多说明".to_string());
        }
        if !has_examples {
            suggestions.push("可以添加具体的例子帮助理解".to_string());
        }
        if !has_connectors {
            suggestions.push("可以使用\"因为\"、\"所以\"等连接词，让逻辑更清晰".to_string());
        }
        if suggestions.is_empty() {
            suggestions.push("回答质量不错，继续保持！".to_string());
        }

        Ok(RubricAssessment {
            clarity: clarity.min(10),
            logic: logic.min(10),
            completeness: completeness.min(10),
            terminology,
            suggestions,
        })
    }
}

impl ReferenceAnswerGenerator for LocalProvider {
    fn generate_reference_answer(
        &self,
        _knowledge: &str,
        _questions: &[String],
    ) -> FeynResult<String> {
        // absorbed by the pipeline's best-effort reference step
        Err(FeynError::Api(
            "local provider cannot generate reference answers".into(),
        ))
    }
}
