//! Prompt templates for the three remote-model operations.
//!
//! Plain `{placeholder}` substitution, no templating engine. The wording is
//! the product's: the model plays a novice who asks simple questions, then
//! grades the learner's explanation.

const QUESTION_PROMPT: &str = "\
你是一个完全不懂技术的小白。请针对以下知识点，提出3-5个简单的问题：

知识点：{knowledge}

要求：
1. 问题要简单易懂，像小学生会问的问题
2. 不要使用专业术语
3. 问题要有层次（从基础到深入）
4. 问题要能帮助检验理解深度

请直接返回问题列表，每行一个问题，不要添加其他说明。";

const ASSESSMENT_PROMPT: &str = "\
请评估以下回答的质量：

知识点：{knowledge}
问题：{question}
回答：{answer}

请从以下维度评估（1-10分）：
1. 清晰度：是否用简单语言解释清楚
2. 逻辑性：是否有清晰的逻辑结构
3. 完整性：是否回答了问题的核心
4. 专业术语使用：是否过度使用专业术语（分数越低表示使用越少，越好）

请以 JSON 格式返回，包含以下字段：
{
  \"clarity\": 数字,
  \"logic\": 数字,
  \"completeness\": 数字,
  \"terminology\": 数字,
  \"suggestions\": [\"建议1\", \"建议2\", ...]
}";

const REFERENCE_ANSWER_PROMPT: &str = "\
请针对以下知识点，写一份面向初学者的参考讲解：

知识点：{knowledge}

需要覆盖的问题：
{questions}

要求：
1. 用简单通俗的语言，逐一回应上面的问题
2. 尽量少用专业术语，必要时加以解释
3. 给出贴近生活的例子帮助理解

请直接返回讲解内容，不要添加其他说明。";

pub fn build_question_prompt(knowledge: &str) -> String {
    QUESTION_PROMPT.replace("{knowledge}", knowledge)
}

pub fn build_assessment_prompt(knowledge: &str, question: &str, answer: &str) -> String {
    ASSESSMENT_PROMPT
        .replace("{knowledge}", knowledge)
        .replace("{question}", question)
        .replace("{answer}", answer)
}

/// Questions are numbered and joined one-per-line before substitution.
pub fn build_reference_answer_prompt(knowledge: &str, questions: &[String]) -> String {
    let numbered: Vec<String> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {q}", i + 1))
        .collect();

    REFERENCE_ANSWER_PROMPT
        .replace("{knowledge}", knowledge)
        .replace("{questions}", &numbered.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_substitutes_knowledge() {
        let prompt = build_question_prompt("TCP 三次握手");
        assert!(prompt.contains("知识点：TCP 三次握手"));
        assert!(!prompt.contains("{knowledge}"));
    }

    #[test]
    fn test_assessment_prompt_substitutes_all_fields() {
        let prompt = build_assessment_prompt("HTTP", "这是什么？", "一种协议");
        assert!(prompt.contains("知识点：HTTP"));
        assert!(prompt.contains("问题：这是什么？"));
        assert!(prompt.contains("回答：一种协议"));
        // the JSON skeleton stays intact
        assert!(prompt.contains("\"clarity\""));
    }

    #[test]
    fn test_reference_prompt_numbers_questions() {
        let questions = vec!["这是什么？".to_string(), "它有什么用？".to_string()];
        let prompt = build_reference_answer_prompt("DNS", &questions);
        assert!(prompt.contains("1. 这是什么？"));
        assert!(prompt.contains("2. 它有什么用？"));
        assert!(!prompt.contains("{questions}"));
    }
}
