//! The backend model roster and the failure signatures that justify
//! switching to the next model.

/// One backend model, fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Display name.
    pub name: &'static str,
    /// Identifier sent in the request body.
    pub model: &'static str,
    pub description: Option<&'static str>,
}

/// Priority-ordered roster. The first entry is the preferred model; when it
/// fails on a switchable error the next one is tried.
pub const MODEL_LIST: &[ModelConfig] = &[
    // First tier: high-performance models
    ModelConfig {
        name: "ERNIE-4.5 Turbo 128K",
        model: "ernie-4.5-turbo-128k",
        description: Some("high-performance, 128K context"),
    },
    ModelConfig {
        name: "ERNIE-4.5 Turbo 32K",
        model: "ernie-4.5-turbo-32k",
        description: Some("high-performance, 32K context"),
    },
    ModelConfig {
        name: "ERNIE-X1 Turbo",
        model: "ernie-x1-turbo-32k",
        description: Some("ERNIE X1 series, 32K context"),
    },
    // Second tier: DeepSeek
    ModelConfig {
        name: "DeepSeek V3.1",
        model: "deepseek-v3.1-250821",
        description: Some("latest DeepSeek release"),
    },
    ModelConfig {
        name: "DeepSeek V3.1 Think",
        model: "deepseek-v3.1-think-250821",
        description: Some("reasoning-enhanced variant"),
    },
    ModelConfig {
        name: "DeepSeek R1",
        model: "deepseek-r1",
        description: Some("DeepSeek R1 reasoning model"),
    },
    // Third tier: Qwen
    ModelConfig {
        name: "Qwen3 235B",
        model: "qwen3-235b-a22b-instruct-2507",
        description: Some("Qwen 235B"),
    },
    ModelConfig {
        name: "Qwen3 30B",
        model: "qwen3-30b-a3b-instruct-2507",
        description: Some("Qwen 30B"),
    },
    // Fourth tier: other fallbacks
    ModelConfig {
        name: "Kimi K2",
        model: "kimi-k2-instruct",
        description: Some("Kimi K2 instruct model"),
    },
    ModelConfig {
        name: "Qianfan Sug",
        model: "qianfan-sug-8k",
        description: Some("platform-recommended model"),
    },
    // Last resort: base models
    ModelConfig {
        name: "ERNIE-4.0 Turbo",
        model: "ernie-4.0-turbo-8k",
        description: Some("standard model"),
    },
    ModelConfig {
        name: "ERNIE-3.5",
        model: "ernie-3.5-8k",
        description: Some("economy model"),
    },
    ModelConfig {
        name: "ERNIE-Lite",
        model: "ernie-lite-8k",
        description: Some("lightweight model"),
    },
];

/// Error-message fragments that mark the current model as unusable while
/// leaving the next one worth trying: exhausted quota, rate limiting,
/// authorization failures, model unavailability. Matched case-insensitively,
/// in both English and the upstream platform's Chinese error vocabulary.
/// "timed out" is included so a per-request timeout counts as switchable.
const SWITCH_MARKERS: &[&str] = &[
    "quota",
    "limit",
    "exceeded",
    "insufficient",
    "unauthorized",
    "forbidden",
    "model not found",
    "model unavailable",
    "rate limit",
    "429",
    "timed out",
    "余额不足",
    "额度",
    "配额",
    "超出限制",
];

/// Whether an error message justifies advancing to the next roster model.
pub fn should_switch_model(message: &str) -> bool {
    let lower = message.to_lowercase();
    SWITCH_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_is_nonempty_and_unique() {
        assert!(!MODEL_LIST.is_empty());
        let mut ids: Vec<&str> = MODEL_LIST.iter().map(|m| m.model).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), MODEL_LIST.len());
    }

    #[test]
    fn test_switchable_markers() {
        assert!(should_switch_model("Rate limit reached for requests"));
        assert!(should_switch_model("API call failed: 429 Too Many Requests"));
        assert!(should_switch_model("Insufficient balance"));
        assert!(should_switch_model("QUOTA exceeded for this key"));
        assert!(should_switch_model("model not found: ernie-zzz"));
        assert!(should_switch_model("账户余额不足，请充值"));
        assert!(should_switch_model("已超出限制"));
    }

    #[test]
    fn test_non_switchable_messages() {
        assert!(!should_switch_model("internal server error"));
        assert!(!should_switch_model("bad request: messages missing"));
        assert!(!should_switch_model(""));
    }

    #[test]
    fn test_timeout_is_switchable() {
        assert!(should_switch_model("request timed out after 60s"));
    }
}
