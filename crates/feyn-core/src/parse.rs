//! Parsing of raw model output: question lists and rubric JSON.
//!
//! Model output is treated as hostile input. Question lists tolerate
//! enumeration markers and blank lines; rubric JSON tolerates code fences,
//! trailing commas (lenient parser), missing fields and wrong types. A
//! rubric parse can degrade but never fail.

use serde_json_lenient::Value;
use tracing::warn;

use crate::assessment::RubricAssessment;

/// Suggestion attached when the model's assessment JSON cannot be parsed.
pub const PARSE_FAILURE_SUGGESTION: &str = "AI 评估解析失败，请重试";

/// Suggestion used when the parsed JSON carries no usable suggestion list.
pub const DEFAULT_SUGGESTION: &str = "继续努力，提升表达清晰度";

const DEFAULT_SCORE: u8 = 5;

/// Split raw output into questions: one per line, trimmed, enumeration
/// markers ("1. ", "2、") stripped, empties dropped, capped at five.
pub fn parse_question_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_enumeration)
        .filter(|line| !line.is_empty())
        .take(5)
        .map(str::to_string)
        .collect()
}

/// Drop a leading `digits + ('.' | '、') + whitespace` marker, if present.
fn strip_enumeration(line: &str) -> &str {
    let digits = line
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return line;
    }

    let rest = &line[digits..];
    let mut chars = rest.chars();
    match chars.next() {
        Some('.') | Some('、') => chars.as_str().trim_start(),
        _ => line,
    }
}

/// Extract the body of the first fenced code block, or the trimmed input
/// when no complete fence is found. Info strings like ```json are skipped.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let mut body = &trimmed[open + 3..];
    for tag in ["json", "markdown", "text"] {
        if let Some(rest) = body.strip_prefix(tag) {
            body = rest;
            break;
        }
    }

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => trimmed,
    }
}

/// Parse the model's rubric JSON into scores.
///
/// Never fails: an unparsable payload yields all-default scores plus a
/// single advisory suggestion, so the assessment flow always produces a
/// result.
pub fn parse_rubric(raw: &str) -> RubricAssessment {
    let json = strip_code_fence(raw);
    let value: Value = match serde_json_lenient::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            warn!("unparsable assessment payload: {e}");
            return RubricAssessment {
                clarity: DEFAULT_SCORE,
                logic: DEFAULT_SCORE,
                completeness: DEFAULT_SCORE,
                terminology: DEFAULT_SCORE,
                suggestions: vec![PARSE_FAILURE_SUGGESTION.to_string()],
            };
        }
    };

    RubricAssessment {
        clarity: score_field(&value, "clarity"),
        logic: score_field(&value, "logic"),
        completeness: score_field(&value, "completeness"),
        terminology: score_field(&value, "terminology"),
        suggestions: suggestion_list(&value),
    }
}

/// Clamp a numeric field to 1..=10; absent or non-numeric reads as 5.
fn score_field(value: &Value, field: &str) -> u8 {
    match value.get(field).and_then(Value::as_f64) {
        Some(v) if v.is_finite() => (v.round() as i64).clamp(1, 10) as u8,
        _ => DEFAULT_SCORE,
    }
}

fn suggestion_list(value: &Value) -> Vec<String> {
    let parsed: Vec<String> = value
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    if parsed.is_empty() {
        vec![DEFAULT_SUGGESTION.to_string()]
    } else {
        parsed
    }
}
