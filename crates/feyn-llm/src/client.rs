//! Failover across the model roster.
//!
//! One pass, strictly in roster order, never concurrent. A switchable
//! failure advances to the next model and records the tentative position;
//! success records the winning position so the next call starts there. A
//! non-switchable failure stops the pass immediately.

use serde_json::Value;
use tracing::{debug, warn};

use feyn_core::{should_switch_model, FeynError, FeynResult, ModelRoster};

use crate::transport::{ChatMessage, ChatTransport};

type Extractor = fn(&Value) -> Option<String>;

/// Ordered content-extraction policy. The first strategy yielding a
/// non-empty string wins; a 2xx body matching none of them is malformed.
const CONTENT_EXTRACTORS: &[Extractor] = &[
    choices_message_content,
    top_level_result,
    top_level_content,
];

fn choices_message_content(body: &Value) -> Option<String> {
    body.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

fn top_level_result(body: &Value) -> Option<String> {
    body.get("result")?.as_str().map(str::to_string)
}

fn top_level_content(body: &Value) -> Option<String> {
    body.get("content")?.as_str().map(str::to_string)
}

fn extract_content(body: &Value) -> Option<String> {
    CONTENT_EXTRACTORS
        .iter()
        .find_map(|extract| extract(body).filter(|text| !text.is_empty()))
}

pub struct FailoverClient<T: ChatTransport> {
    transport: T,
    roster: ModelRoster,
}

impl<T: ChatTransport> FailoverClient<T> {
    pub fn new(transport: T, roster: ModelRoster) -> Self {
        Self { transport, roster }
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    /// One pass through the roster, starting at the persisted position.
    pub fn chat(&self, messages: &[ChatMessage]) -> FeynResult<String> {
        self.chat_from(messages, None)
    }

    /// Same, with an explicit starting position.
    pub fn chat_from(
        &self,
        messages: &[ChatMessage],
        start_index: Option<usize>,
    ) -> FeynResult<String> {
        let models = self.roster.models();
        let start = start_index.unwrap_or_else(|| self.roster.current_index());
        let mut last_error: Option<FeynError> = None;

        for i in start..models.len() {
            let model = &models[i];
            match self.try_model(model.model, messages) {
                Ok(content) => {
                    self.roster.save_index(i);
                    if i != start {
                        debug!("switched to model {}", model.name);
                    }
                    return Ok(content);
                }
                Err(e) => {
                    if is_switchable(&e) && i + 1 < models.len() {
                        warn!("model {} failed, trying next: {e}", model.name);
                        // tentative: the next model has not answered yet
                        self.roster.save_index(i + 1);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FeynError::RosterExhausted("所有模型都尝试失败，请检查 API 配置或稍后重试".into())
        }))
    }

    /// One attempt against one model.
    fn try_model(&self, model_id: &str, messages: &[ChatMessage]) -> FeynResult<String> {
        let body = self.transport.send(model_id, messages)?;

        // a 2xx body can still carry a structured error object
        if let Some(err) = body.get("error") {
            return Err(FeynError::Api(structured_error_message(err)));
        }

        extract_content(&body).ok_or_else(|| {
            FeynError::MalformedResponse("no usable content in any known response field".into())
        })
    }
}

fn structured_error_message(err: &Value) -> String {
    if let Some(message) = err.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match err.get("code") {
        Some(Value::String(code)) => code.clone(),
        Some(Value::Number(code)) => code.to_string(),
        _ => "未知错误".to_string(),
    }
}

/// Transport and API failures switch on a matching signature; malformed
/// 2xx responses are fatal for the whole pass.
fn is_switchable(error: &FeynError) -> bool {
    match error {
        FeynError::Transport(message) | FeynError::Api(message) => should_switch_model(message),
        _ => false,
    }
}
