//! 敏感信息检测流水线
//!
//! 提取全文 -> 逐类别匹配 -> 上下文校验归一化 -> 汇总。
//! 单个类别的失败只记录在该类别的检查记录里，不影响其余类别；
//! 提取失败与文本过少作为状态返回，不抛错。

use std::path::Path;

use veil_core::{DetectionOutcome, DetectionStatus, PatternCheck};
use veil_ocr::TesseractEngine;
use veil_rules::ValidationOptions;

use crate::extract::extract_document;

/// 全文低于该字符数时判定为无有效文本
const MIN_TEXT_CHARS: usize = 10;

/// 检测一篇文档中的敏感信息
pub fn detect_sensitive_data(
    path: &Path,
    ocr: Option<&TesseractEngine>,
    opts: &ValidationOptions,
) -> DetectionOutcome {
    let debug_info = extract_document(path, ocr);

    let mut outcome = DetectionOutcome {
        detected_data: Default::default(),
        patterns_checked: Vec::new(),
        status: DetectionStatus::Success,
        debug_info,
    };

    if outcome.debug_info.error.is_some() {
        outcome.status = DetectionStatus::ExtractionFailed;
        return outcome;
    }

    let text = outcome.debug_info.text_content.clone();

    if text.trim().chars().count() < MIN_TEXT_CHARS {
        log::warn!("[Detection] 文档中没有足够的文本");
        outcome.status = DetectionStatus::NoTextFound;
        return outcome;
    }

    for rule in veil_rules::registry() {
        let category_name = rule.category.name().to_string();

        match rule.raw_matches(&text) {
            Ok(raw) => {
                let valid = rule.validate_matches(&text, &raw, opts);

                log::info!(
                    "[Detection] {}: {} 个有效匹配（原始 {} 个）",
                    category_name,
                    valid.len(),
                    raw.len()
                );

                outcome.patterns_checked.push(PatternCheck {
                    data_type: category_name.clone(),
                    pattern: rule.pattern.to_string(),
                    raw_matches: raw.len(),
                    valid_matches: valid.len(),
                    sample: if valid.is_empty() {
                        None
                    } else {
                        Some(valid.iter().take(2).cloned().collect())
                    },
                    error: None,
                });

                if !valid.is_empty() {
                    outcome.detected_data.insert(category_name, valid);
                }
            }
            Err(e) => {
                log::error!("[Detection] 类别 {} 匹配失败: {}", category_name, e);
                outcome.patterns_checked.push(PatternCheck {
                    data_type: category_name,
                    pattern: rule.pattern.to_string(),
                    raw_matches: 0,
                    valid_matches: 0,
                    sample: None,
                    error: Some(e),
                });
            }
        }
    }

    let total: usize = outcome.detected_data.values().map(|v| v.len()).sum();
    log::info!("[Detection] 检测完成: 共 {} 项", total);

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_extraction_failed() {
        let outcome = detect_sensitive_data(
            Path::new("/nonexistent/doc.pdf"),
            None,
            &ValidationOptions::default(),
        );
        assert_eq!(outcome.status, DetectionStatus::ExtractionFailed);
        assert!(outcome.detected_data.is_empty());
        assert!(outcome.patterns_checked.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_extraction_failed() {
        let path = std::env::temp_dir().join(format!(
            "veil_detect_bad_{}.pdf",
            std::process::id()
        ));
        std::fs::write(&path, b"garbage").unwrap();

        let outcome =
            detect_sensitive_data(&path, None, &ValidationOptions::default());
        assert_eq!(outcome.status, DetectionStatus::ExtractionFailed);

        std::fs::remove_file(&path).ok();
    }
}
