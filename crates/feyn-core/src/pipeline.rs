//! The assessment pipeline: question generation and answer scoring.
//!
//! Providers are swappable behind three small traits so the pipeline can be
//! tested without network access, and so a rule-based local provider can
//! stand in when no remote model is reachable.

use chrono::Utc;
use tracing::warn;

use crate::assessment::{AssessmentResult, RubricAssessment};
use crate::error::{FeynError, FeynResult};
use crate::terminology::detect_terminology;

/// Composite weights, fixed product constants.
const W_CLARITY: f64 = 0.30;
const W_LOGIC: f64 = 0.25;
const W_COMPLETENESS: f64 = 0.25;
const W_TERMINOLOGY: f64 = 0.20;

/// Returned when the model's question output yields nothing usable.
const DEFAULT_QUESTIONS: &[&str] = &["这是什么？", "它有什么用？", "为什么需要它？"];

pub trait QuestionGenerator {
    fn generate_questions(&self, knowledge: &str) -> FeynResult<Vec<String>>;
}

pub trait AnswerAssessor {
    fn assess_answer(
        &self,
        knowledge: &str,
        question: &str,
        answer: &str,
    ) -> FeynResult<RubricAssessment>;
}

pub trait ReferenceAnswerGenerator {
    fn generate_reference_answer(
        &self,
        knowledge: &str,
        questions: &[String],
    ) -> FeynResult<String>;
}

/// Weighted composite of the four rubric dimensions.
///
/// The terminology score is inverted: a low raw score means few unexplained
/// technical terms, which should pull the composite up.
pub fn compose_overall(rubric: &RubricAssessment) -> u8 {
    let score = f64::from(rubric.clarity) * W_CLARITY
        + f64::from(rubric.logic) * W_LOGIC
        + f64::from(rubric.completeness) * W_COMPLETENESS
        + (11.0 - f64::from(rubric.terminology)) * W_TERMINOLOGY;
    score.round() as u8
}

pub struct AssessmentPipeline<P> {
    provider: P,
}

impl<P> AssessmentPipeline<P>
where
    P: QuestionGenerator + AnswerAssessor + ReferenceAnswerGenerator,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Probing questions for a knowledge point. An empty result from the
    /// provider falls back to a fixed starter set rather than failing.
    pub fn generate_questions(&self, knowledge: &str) -> FeynResult<Vec<String>> {
        if knowledge.trim().is_empty() {
            return Err(FeynError::InvalidInput("知识点不能为空".into()));
        }

        let questions = self.provider.generate_questions(knowledge)?;
        if questions.is_empty() {
            return Ok(DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect());
        }
        Ok(questions)
    }

    /// Score one answer. When `questions` is given and non-empty, a
    /// reference answer is generated as well; that step is best-effort and
    /// its failure never fails the assessment.
    pub fn assess_answer(
        &self,
        knowledge: &str,
        question: &str,
        answer: &str,
        questions: Option<&[String]>,
    ) -> FeynResult<AssessmentResult> {
        if answer.trim().is_empty() {
            return Err(FeynError::InvalidInput("回答不能为空".into()));
        }

        let rubric = self.provider.assess_answer(knowledge, question, answer)?;
        let overall = compose_overall(&rubric);

        // Always detected locally, independent of the model's own
        // terminology score.
        let terminology_list = detect_terminology(answer);

        let reference_answer = match questions {
            Some(qs) if !qs.is_empty() => {
                match self.provider.generate_reference_answer(knowledge, qs) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!("reference answer generation failed: {e}");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(AssessmentResult {
            clarity: rubric.clarity,
            logic: rubric.logic,
            completeness: rubric.completeness,
            terminology: rubric.terminology,
            overall,
            terminology_list,
            suggestions: rubric.suggestions,
            assessed_at: Utc::now(),
            reference_answer,
        })
    }
}
