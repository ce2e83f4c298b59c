//! Remote provider: prompts in, parsed values out.
//!
//! Implements the pipeline's three operations on top of the failover
//! client. Each operation is one prompt, one roster pass, one parse.

use feyn_core::parse::{parse_question_list, parse_rubric, strip_code_fence};
use feyn_core::prompts::{
    build_assessment_prompt, build_question_prompt, build_reference_answer_prompt,
};
use feyn_core::{
    AnswerAssessor, FeynResult, QuestionGenerator, ReferenceAnswerGenerator, RubricAssessment,
};

use crate::client::FailoverClient;
use crate::transport::{ChatMessage, ChatTransport};

/// Shown when the model returned an empty reference answer.
const REFERENCE_FALLBACK: &str = "参考版本生成失败，请重试";

pub struct QianfanProvider<T: ChatTransport> {
    client: FailoverClient<T>,
}

impl<T: ChatTransport> QianfanProvider<T> {
    pub fn new(client: FailoverClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FailoverClient<T> {
        &self.client
    }
}

impl<T: ChatTransport> QuestionGenerator for QianfanProvider<T> {
    fn generate_questions(&self, knowledge: &str) -> FeynResult<Vec<String>> {
        let prompt = build_question_prompt(knowledge);
        let raw = self.client.chat(&[ChatMessage::user(prompt)])?;
        Ok(parse_question_list(&raw))
    }
}

impl<T: ChatTransport> AnswerAssessor for QianfanProvider<T> {
    fn assess_answer(
        &self,
        knowledge: &str,
        question: &str,
        answer: &str,
    ) -> FeynResult<RubricAssessment> {
        let prompt = build_assessment_prompt(knowledge, question, answer);
        let raw = self.client.chat(&[ChatMessage::user(prompt)])?;
        Ok(parse_rubric(&raw))
    }
}

impl<T: ChatTransport> ReferenceAnswerGenerator for QianfanProvider<T> {
    fn generate_reference_answer(
        &self,
        knowledge: &str,
        questions: &[String],
    ) -> FeynResult<String> {
        let prompt = build_reference_answer_prompt(knowledge, questions);
        let raw = self.client.chat(&[ChatMessage::user(prompt)])?;

        let cleaned = strip_code_fence(&raw).trim().to_string();
        if cleaned.is_empty() {
            Ok(REFERENCE_FALLBACK.to_string())
        } else {
            Ok(cleaned)
        }
    }
}
