//! One chat request to one model.
//!
//! The transport owns the wire concerns only: endpoint, headers, body
//! shape, timeout. Any 2xx body is handed back as raw JSON; everything
//! else becomes a transport error whose message carries the HTTP status
//! and response text, so the failover layer can classify it.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use feyn_core::{FeynError, FeynResult};

pub const DEFAULT_BASE_URL: &str = "https://qianfan.baidubce.com/v2";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

pub trait ChatTransport {
    /// Issue one request against one model and return the parsed 2xx body.
    fn send(&self, model_id: &str, messages: &[ChatMessage]) -> FeynResult<Value>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    temperature: f32,
}

impl HttpTransport {
    pub fn new(api_key: String) -> Self {
        Self::with_options(
            DEFAULT_BASE_URL.to_string(),
            api_key,
            DEFAULT_TEMPERATURE,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_options(
        base_url: String,
        api_key: String,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url,
            api_key,
            temperature,
        }
    }
}

impl ChatTransport for HttpTransport {
    fn send(&self, model_id: &str, messages: &[ChatMessage]) -> FeynResult<Value> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": model_id,
            "messages": messages,
            "temperature": self.temperature,
        });

        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(body);

        match response {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|e| FeynError::MalformedResponse(format!("invalid JSON body: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let status_text = resp.status_text().to_string();
                let text = resp.into_string().unwrap_or_default();
                Err(FeynError::Transport(format!(
                    "{code} {status_text} - {text}"
                )))
            }
            Err(e) => Err(FeynError::Transport(e.to_string())),
        }
    }
}
