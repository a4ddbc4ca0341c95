//! 敏感信息检测规则
//!
//! 每个类别对应一条固定规则：正则模式负责粗筛，校验函数结合上下文
//! 收窄误报，归一化函数统一输出形态。规则集是封闭的静态表，
//! 不支持运行时注册。

mod validators;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use veil_core::Category;

/// 上下文窗口半径：取匹配位置前后各 50 个字符
const CONTEXT_RADIUS: usize = 50;

/// 校验选项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// 银行账号的首位数字兜底启发式（0-6 开头即接受）。
    /// 精度较低但召回高，关闭后只接受上下文含银行关键词的候选。
    pub bank_digit_fallback: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            bank_digit_fallback: true,
        }
    }
}

struct RuleDef {
    category: Category,
    pattern: &'static str,
    validate: fn(&str, &str, &ValidationOptions) -> bool,
    normalize: fn(&str) -> String,
}

/// 编译后的类别规则
pub struct CompiledRule {
    pub category: Category,
    pub pattern: &'static str,
    regex: Result<Regex, String>,
    validate: fn(&str, &str, &ValidationOptions) -> bool,
    normalize: fn(&str) -> String,
}

const RULE_DEFS: [RuleDef; 6] = [
    RuleDef {
        category: Category::Aadhaar,
        pattern: r"\b\d{4}\s?\d{4}\s?\d{4}\b",
        validate: |m, _ctx, _opts| validators::is_likely_aadhaar(m),
        normalize: validators::strip_whitespace,
    },
    RuleDef {
        category: Category::Pan,
        pattern: r"\b[A-Z]{5}\d{4}[A-Z]\b",
        validate: |m, _ctx, _opts| validators::is_likely_pan(m),
        normalize: |m| m.to_uppercase(),
    },
    RuleDef {
        category: Category::Phone,
        pattern: r"(\+91[\-\s]?)?[6-9]\d{9}\b",
        validate: |m, _ctx, _opts| validators::is_likely_phone(m),
        normalize: validators::normalize_phone,
    },
    RuleDef {
        category: Category::Email,
        pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b",
        validate: |m, _ctx, _opts| validators::is_likely_email(m),
        normalize: |m| m.to_lowercase(),
    },
    RuleDef {
        category: Category::BankAccount,
        pattern: r"\b\d{9,18}\b",
        validate: |m, ctx, opts| {
            validators::is_likely_bank_account(m, ctx, opts.bank_digit_fallback)
        },
        normalize: validators::strip_separators,
    },
    RuleDef {
        category: Category::CreditDebitCard,
        pattern: r"\b\d{4}[\s\-]?\d{4}[\s\-]?\d{4}[\s\-]?\d{4}\b",
        validate: |m, _ctx, _opts| validators::is_likely_credit_card(m),
        normalize: validators::strip_separators,
    },
];

static REGISTRY: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    RULE_DEFS
        .iter()
        .map(|def| CompiledRule {
            category: def.category,
            pattern: def.pattern,
            regex: Regex::new(def.pattern).map_err(|e| e.to_string()),
            validate: def.validate,
            normalize: def.normalize,
        })
        .collect()
});

/// 全部类别规则，顺序与 `Category::ALL` 一致
pub fn registry() -> &'static [CompiledRule] {
    &REGISTRY
}

/// 按类别取规则
pub fn rule_for(category: Category) -> &'static CompiledRule {
    REGISTRY
        .iter()
        .find(|r| r.category == category)
        .expect("registry covers all categories")
}

impl CompiledRule {
    /// 在全文上做非重叠扫描，按出现顺序返回原始匹配串
    pub fn raw_matches(&self, text: &str) -> Result<Vec<String>, String> {
        let regex = self.regex.as_ref().map_err(|e| e.clone())?;
        Ok(regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect())
    }

    /// 对原始匹配做校验与归一化，结果去重（无顺序保证）
    pub fn validate_matches(
        &self,
        full_text: &str,
        raw_matches: &[String],
        opts: &ValidationOptions,
    ) -> Vec<String> {
        let mut valid: HashSet<String> = HashSet::new();

        for raw in raw_matches {
            let context = context_window(full_text, raw, CONTEXT_RADIUS);
            if (self.validate)(raw, &context, opts) {
                valid.insert((self.normalize)(raw));
            }
        }

        valid.into_iter().collect()
    }
}

/// 取匹配串首次出现位置前后各 `radius` 个字符作为上下文。
/// 匹配串在全文中找不到时返回空串（按字符计，不按字节）。
fn context_window(text: &str, needle: &str, radius: usize) -> String {
    let byte_idx = match text.find(needle) {
        Some(idx) => idx,
        None => return String::new(),
    };

    let char_idx = text[..byte_idx].chars().count();
    let needle_chars = needle.chars().count();
    let chars: Vec<char> = text.chars().collect();

    let start = char_idx.saturating_sub(radius);
    let end = (char_idx + needle_chars + radius).min(chars.len());
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_one(category: Category, full_text: &str, raw: &str) -> Vec<String> {
        rule_for(category).validate_matches(
            full_text,
            &[raw.to_string()],
            &ValidationOptions::default(),
        )
    }

    #[test]
    fn test_registry_covers_all_categories() {
        assert_eq!(registry().len(), Category::ALL.len());
        for category in Category::ALL {
            assert_eq!(rule_for(category).category, category);
        }
    }

    #[test]
    fn test_all_patterns_compile() {
        for rule in registry() {
            assert!(rule.raw_matches("").is_ok(), "pattern failed: {}", rule.pattern);
        }
    }

    #[test]
    fn test_aadhaar_matcher_grouped_and_plain() {
        let text = "Aadhaar: 2345 6789 0123 and 234567890123";
        let raw = rule_for(Category::Aadhaar).raw_matches(text).unwrap();
        assert_eq!(raw, vec!["2345 6789 0123", "234567890123"]);
    }

    #[test]
    fn test_aadhaar_rejects_leading_zero_or_one() {
        assert!(validate_one(Category::Aadhaar, "", "034567890123").is_empty());
        assert!(validate_one(Category::Aadhaar, "", "134567890123").is_empty());
        assert_eq!(
            validate_one(Category::Aadhaar, "", "234567890123"),
            vec!["234567890123"]
        );
    }

    #[test]
    fn test_aadhaar_grouped_normalizes_to_plain() {
        let rule = rule_for(Category::Aadhaar);
        let raw = vec!["2345 6789 0123".to_string(), "234567890123".to_string()];
        let valid = rule.validate_matches("", &raw, &ValidationOptions::default());
        assert_eq!(valid, vec!["234567890123"]);
    }

    #[test]
    fn test_pan_validation() {
        assert_eq!(
            validate_one(Category::Pan, "", "ABCDE1234F"),
            vec!["ABCDE1234F"]
        );
        assert!(validate_one(Category::Pan, "", "ABCDE1234f").is_empty());
        assert!(validate_one(Category::Pan, "", "ABCD1234F").is_empty());
    }

    #[test]
    fn test_phone_validation_and_normalization() {
        assert_eq!(
            validate_one(Category::Phone, "", "9876543210"),
            vec!["9876543210"]
        );
        assert_eq!(
            validate_one(Category::Phone, "", "919876543210"),
            vec!["9876543210"]
        );
        assert_eq!(
            validate_one(Category::Phone, "", "+91-9876543210"),
            vec!["9876543210"]
        );
        assert!(validate_one(Category::Phone, "", "1234567890").is_empty());
    }

    #[test]
    fn test_phone_matcher_with_country_code() {
        let text = "Call +91 9876543210 or 8765432109.";
        let raw = rule_for(Category::Phone).raw_matches(text).unwrap();
        assert_eq!(raw, vec!["+91 9876543210", "8765432109"]);
    }

    #[test]
    fn test_credit_card_validation() {
        assert_eq!(
            validate_one(Category::CreditDebitCard, "", "4111222233334444"),
            vec!["4111222233334444"]
        );
        assert_eq!(
            validate_one(Category::CreditDebitCard, "", "4111 2222 3333 4444"),
            vec!["4111222233334444"]
        );
        assert!(validate_one(Category::CreditDebitCard, "", "1111222233334444").is_empty());
        assert!(validate_one(Category::CreditDebitCard, "", "411122223333444").is_empty());
    }

    #[test]
    fn test_bank_account_context_keyword() {
        let text = "Savings A/c No: 712345678901 held at the main branch";
        let valid = validate_one(Category::BankAccount, text, "712345678901");
        assert_eq!(valid, vec!["712345678901"]);
    }

    #[test]
    fn test_bank_account_digit_fallback() {
        // 无上下文但首位在 0-6，兜底启发式接受
        assert_eq!(
            validate_one(Category::BankAccount, "", "312345678901"),
            vec!["312345678901"]
        );
        // 首位 7-9 且无关键词上下文，拒绝
        assert!(validate_one(Category::BankAccount, "no keywords here 712345678901", "712345678901").is_empty());
    }

    #[test]
    fn test_bank_account_strict_mode() {
        let opts = ValidationOptions {
            bank_digit_fallback: false,
        };
        let rule = rule_for(Category::BankAccount);
        let raw = vec!["312345678901".to_string()];
        assert!(rule.validate_matches("", &raw, &opts).is_empty());

        let text = "bank account 312345678901";
        assert_eq!(
            rule.validate_matches(text, &raw, &opts),
            vec!["312345678901"]
        );
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(
            validate_one(Category::Email, "", "First.Last@Example.COM"),
            vec!["first.last@example.com"]
        );
        assert!(validate_one(Category::Email, "", "not-an-email").is_empty());
    }

    #[test]
    fn test_email_matcher() {
        let text = "contact: alice@example.com, bob@test.org.";
        let raw = rule_for(Category::Email).raw_matches(text).unwrap();
        assert_eq!(raw, vec!["alice@example.com", "bob@test.org"]);
    }

    #[test]
    fn test_context_window_clipped_at_edges() {
        let ctx = context_window("bank 123456789", "123456789", 50);
        assert_eq!(ctx, "bank 123456789");
        assert_eq!(context_window("abc", "zzz", 50), "");
    }
}
