//! Record export: JSON for machines, Markdown for notes.

use anyhow::Result;
use chrono::{DateTime, Utc};

use feyn_core::KnowledgeRecord;

fn format_dt(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn record_to_json(record: &KnowledgeRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn records_to_json(records: &[KnowledgeRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// One record as a Markdown note. `tag_names` are the resolved names of
/// `record.tags`, in display order.
pub fn record_to_markdown(record: &KnowledgeRecord, tag_names: &[String]) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# {}", record.knowledge));
    lines.push(String::new());
    lines.push(format!("**创建时间**: {}", format_dt(&record.created_at)));
    if !tag_names.is_empty() {
        lines.push(format!("**标签**: {}", tag_names.join(", ")));
    }
    lines.push(String::new());

    if !record.questions.is_empty() {
        lines.push("## 问题".to_string());
        lines.push(String::new());
        for (i, q) in record.questions.iter().enumerate() {
            lines.push(format!("{}. {q}", i + 1));
        }
        lines.push(String::new());
    }

    if !record.answer.is_empty() {
        lines.push("## 回答".to_string());
        lines.push(String::new());
        lines.push(record.answer.clone());
        lines.push(String::new());
    }

    if let Some(assessment) = &record.assessment {
        lines.push("## 评估结果".to_string());
        lines.push(String::new());
        lines.push(format!("- **总体评分**: {}/10", assessment.overall));
        lines.push(format!("- **清晰度**: {}/10", assessment.clarity));
        lines.push(format!("- **逻辑性**: {}/10", assessment.logic));
        lines.push(format!("- **完整性**: {}/10", assessment.completeness));
        // displayed inverted: high is good
        lines.push(format!("- **术语使用**: {}/10", 11 - assessment.terminology));
        lines.push(String::new());

        if !assessment.terminology_list.is_empty() {
            lines.push("### 检测到的专业术语".to_string());
            lines.push(String::new());
            for item in &assessment.terminology_list {
                lines.push(format!("- {}", item.term));
            }
            lines.push(String::new());
        }

        if !assessment.suggestions.is_empty() {
            lines.push("### 改进建议".to_string());
            lines.push(String::new());
            for suggestion in &assessment.suggestions {
                lines.push(format!("- {suggestion}"));
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

/// All records as one Markdown document, separated by horizontal rules.
pub fn records_to_markdown(records: &[KnowledgeRecord]) -> String {
    records
        .iter()
        .map(|r| record_to_markdown(r, &[]))
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feyn_core::{AssessmentResult, TerminologyItem};

    fn sample_record() -> KnowledgeRecord {
        let mut record = KnowledgeRecord::new("HTTP 协议".to_string());
        record.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        record.questions = vec!["这是什么？".into(), "它有什么用？".into()];
        record.answer = "就像寄信的约定".into();
        record.assessment = Some(AssessmentResult {
            clarity: 8,
            logic: 7,
            completeness: 9,
            terminology: 3,
            overall: 8,
            terminology_list: vec![TerminologyItem {
                term: "API".into(),
                position: 0,
                suggestion: None,
            }],
            suggestions: vec!["多举例子".into()],
            assessed_at: Utc::now(),
            reference_answer: None,
        });
        record
    }

    #[test]
    fn test_markdown_sections() {
        let md = record_to_markdown(&sample_record(), &["networking".into()]);
        assert!(md.starts_with("# HTTP 协议"));
        assert!(md.contains("**创建时间**: 2024-06-01 10:30"));
        assert!(md.contains("**标签**: networking"));
        assert!(md.contains("## 问题"));
        assert!(md.contains("1. 这是什么？"));
        assert!(md.contains("2. 它有什么用？"));
        assert!(md.contains("## 回答"));
        assert!(md.contains("## 评估结果"));
        assert!(md.contains("- **总体评分**: 8/10"));
        // terminology is displayed inverted: 11 - 3 = 8
        assert!(md.contains("- **术语使用**: 8/10"));
        assert!(md.contains("### 检测到的专业术语"));
        assert!(md.contains("- API"));
        assert!(md.contains("### 改进建议"));
    }

    #[test]
    fn test_markdown_skips_empty_sections() {
        let record = KnowledgeRecord::new("bare".to_string());
        let md = record_to_markdown(&record, &[]);
        assert!(!md.contains("## 问题"));
        assert!(!md.contains("## 回答"));
        assert!(!md.contains("## 评估结果"));
        assert!(!md.contains("**标签**"));
    }

    #[test]
    fn test_json_roundtrip() {
        let record = sample_record();
        let json = record_to_json(&record).unwrap();
        let parsed: KnowledgeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.assessment.unwrap().overall, 8);
    }

    #[test]
    fn test_records_to_markdown_separator() {
        let records = vec![sample_record(), sample_record()];
        let md = records_to_markdown(&records);
        assert_eq!(md.matches("\n---\n").count(), 1);
    }
}
