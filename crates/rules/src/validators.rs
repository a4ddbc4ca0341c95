//! 各类别的校验与归一化函数
//!
//! 校验是启发式的，不做校验和（Luhn/Verhoeff）验证：
//! 目标是在 OCR 文本上保持召回，由上下文关键词收窄误报。

use once_cell::sync::Lazy;
use regex::Regex;

/// 银行上下文关键词（小写子串匹配）
const BANK_KEYWORDS: [&str; 9] = [
    "account",
    "a/c",
    "acc",
    "bank",
    "ifsc",
    "branch",
    "savings",
    "current",
    "overdraft",
];

static PAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{5}\d{4}[A-Z]$").expect("valid PAN pattern"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}$").expect("valid email pattern")
});

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// 去掉所有空白字符
pub(crate) fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 去掉空白字符和连字符
pub(crate) fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// 去掉空白、连字符和加号（电话号码用）
fn strip_phone_separators(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect()
}

/// Aadhaar：去空白后恰为 12 位数字，且不以 0 或 1 开头（编号规则）
pub(crate) fn is_likely_aadhaar(text: &str) -> bool {
    let clean = strip_whitespace(text);
    clean.len() == 12 && all_digits(&clean) && !clean.starts_with('0') && !clean.starts_with('1')
}

/// PAN：严格 5 字母 + 4 数字 + 1 字母，全大写
pub(crate) fn is_likely_pan(text: &str) -> bool {
    text.len() == 10 && PAN_RE.is_match(text)
}

/// 电话：10 位且以 6-9 开头，或带 91 国家码的 12 位
pub(crate) fn is_likely_phone(text: &str) -> bool {
    let clean = strip_phone_separators(text);

    if clean.len() == 10 && all_digits(&clean) && clean.starts_with(['6', '7', '8', '9']) {
        return true;
    }

    if clean.len() == 12 && all_digits(&clean) && clean.starts_with("91") {
        return matches!(clean.as_bytes()[2], b'6'..=b'9');
    }

    false
}

/// 电话归一化：去分隔符，12 位形式去掉 91 国家码
pub(crate) fn normalize_phone(text: &str) -> String {
    let clean = strip_phone_separators(text);
    if clean.len() == 12 && clean.starts_with("91") {
        clean[2..].to_string()
    } else {
        clean
    }
}

/// 银行账号：9-18 位数字，上下文含银行关键词即接受；
/// `digit_fallback` 开启时首位 0-6 也接受（低精度兜底）
pub(crate) fn is_likely_bank_account(text: &str, context: &str, digit_fallback: bool) -> bool {
    let clean = strip_separators(text);

    if !all_digits(&clean) || !(9..=18).contains(&clean.len()) {
        return false;
    }

    let context_lower = context.to_lowercase();
    if BANK_KEYWORDS.iter().any(|kw| context_lower.contains(kw)) {
        return true;
    }

    digit_fallback && matches!(clean.as_bytes()[0], b'0'..=b'6')
}

/// 卡号：恰 16 位数字，首位 4/5/6（Visa/Mastercard/Discover 段）
pub(crate) fn is_likely_credit_card(text: &str) -> bool {
    let clean = strip_separators(text);
    clean.len() == 16 && all_digits(&clean) && clean.starts_with(['4', '5', '6'])
}

/// 邮箱：整串重新匹配标准形态
pub(crate) fn is_likely_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_separators("4111 2222-3333 4444"), "4111222233334444");
        assert_eq!(strip_whitespace("2345 6789 0123"), "234567890123");
        assert_eq!(strip_phone_separators("+91-98765 43210"), "919876543210");
    }

    #[test]
    fn test_aadhaar_needs_twelve_digits() {
        assert!(is_likely_aadhaar("234567890123"));
        assert!(is_likely_aadhaar("2345 6789 0123"));
        assert!(!is_likely_aadhaar("23456789012"));
        assert!(!is_likely_aadhaar("2345678901234"));
        assert!(!is_likely_aadhaar("23456789012a"));
    }

    #[test]
    fn test_phone_country_code_forms() {
        assert!(is_likely_phone("919876543210"));
        assert!(!is_likely_phone("915876543210"));
        assert!(!is_likely_phone("99876543210"));
    }

    #[test]
    fn test_bank_keyword_subsumes_phrases() {
        // "account no" / "a/c no" 等短语都包含基础关键词
        assert!(is_likely_bank_account("712345678", "Account No: 712345678", true));
        assert!(is_likely_bank_account("712345678", "A/C no 712345678", true));
        assert!(!is_likely_bank_account("712345678", "", false));
    }

    #[test]
    fn test_bank_length_bounds() {
        assert!(!is_likely_bank_account("12345678", "bank", true));
        assert!(is_likely_bank_account("123456789", "bank", true));
        assert!(is_likely_bank_account("123456789012345678", "bank", true));
        assert!(!is_likely_bank_account("1234567890123456789", "bank", true));
    }

    #[test]
    fn test_credit_card_prefixes() {
        assert!(is_likely_credit_card("5111222233334444"));
        assert!(is_likely_credit_card("6111222233334444"));
        assert!(!is_likely_credit_card("3111222233334444"));
    }
}
