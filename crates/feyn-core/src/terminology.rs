//! Jargon detection over a fixed term dictionary.
//!
//! The Feynman method penalizes unexplained technical vocabulary, so the
//! answer text is scanned locally against a small dictionary and every hit
//! is reported with its position. The scan is case-insensitive and only
//! accepts occurrences standing on word boundaries, where a boundary is
//! anything that is neither ASCII alphanumeric nor a CJK ideograph.

use crate::assessment::TerminologyItem;

const TECHNOLOGY_TERMS: &[&str] = &[
    "API", "SDK", "框架", "算法", "数据结构", "数据库", "缓存", "分布式",
    "微服务", "容器", "Docker", "Kubernetes", "CI/CD", "DevOps",
    "前端", "后端", "全栈", "响应式", "异步", "同步", "并发", "多线程",
    "区块链", "智能合约", "加密货币", "NFT", "Web3",
    "机器学习", "深度学习", "神经网络", "人工智能", "AI", "NLP",
    "云计算", "SaaS", "PaaS", "IaaS", "虚拟化",
];

const BUSINESS_TERMS: &[&str] = &[
    "KPI", "ROI", "商业模式", "价值链", "供应链", "B2B", "B2C", "C2C",
    "市场定位", "用户画像", "转化率", "留存率", "DAU", "MAU",
    "MVP", "PMF", "增长黑客", "A/B测试", "数据分析",
];

const GENERAL_TERMS: &[&str] = &[
    "方法论", "范式", "架构", "设计模式", "最佳实践", "标准化",
    "可扩展性", "可维护性", "可复用性", "耦合", "解耦",
    "抽象", "封装", "继承", "多态", "接口", "实现",
];

/// All dictionary terms, in scan order.
fn all_terms() -> impl Iterator<Item = &'static str> {
    TECHNOLOGY_TERMS
        .iter()
        .chain(BUSINESS_TERMS)
        .chain(GENERAL_TERMS)
        .copied()
}

/// Which dictionary category a term belongs to, if any.
pub fn term_category(term: &str) -> Option<&'static str> {
    if TECHNOLOGY_TERMS.contains(&term) {
        Some("technology")
    } else if BUSINESS_TERMS.contains(&term) {
        Some("business")
    } else if GENERAL_TERMS.contains(&term) {
        Some("general")
    } else {
        None
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Scan `text` for dictionary terms.
///
/// Positions are character offsets. Different terms may overlap; the same
/// term never matches twice at overlapping positions.
pub fn detect_terminology(text: &str) -> Vec<TerminologyItem> {
    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold(c)).collect();

    let mut items = Vec::new();
    for term in all_terms() {
        let needle: Vec<char> = term.chars().map(fold).collect();
        if needle.is_empty() || needle.len() > folded.len() {
            continue;
        }

        let mut at = 0;
        while at + needle.len() <= folded.len() {
            if folded[at..at + needle.len()] != needle[..] {
                at += 1;
                continue;
            }

            let end = at + needle.len();
            let before_ok = at == 0 || !is_word_char(chars[at - 1]);
            let after_ok = end == chars.len() || !is_word_char(chars[end]);
            if before_ok && after_ok {
                items.push(TerminologyItem {
                    term: chars[at..end].iter().collect(),
                    position: at,
                    suggestion: None,
                });
            }
            at = end;
        }
    }

    items
}

/// Detected-term count per whitespace-delimited token. 0 for token-free text.
pub fn calculate_terminology_density(text: &str) -> f32 {
    let terms = detect_terminology(text);
    let tokens = text.split_whitespace().count();
    if tokens == 0 {
        0.0
    } else {
        terms.len() as f32 / tokens as f32
    }
}
