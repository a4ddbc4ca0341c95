//! 检测与脱敏的数据结构定义
//!
//! 这些结构直接序列化为对外接口的 JSON，字段名即线上格式，
//! 不做 rename 映射（`PatternCheck::data_type` 除外）。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 单页提取结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    /// 页码，从 1 开始
    pub page: usize,
    /// 最终文本字符数（含 OCR 补充）
    pub characters: usize,
    /// 内嵌文本原始字符数（不含 OCR）
    pub original_characters: usize,
    /// 本页是否使用了 OCR
    pub ocr_used: bool,
    /// 文本预览（前 100 个字符）
    pub preview: String,
    /// 本页提取失败时的错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 整篇文档的提取诊断信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionDebugInfo {
    pub file_path: String,
    pub file_exists: bool,
    /// 全文（各页文本以换行符连接）
    pub text_content: String,
    pub page_count: usize,
    pub characters_per_page: Vec<PageExtraction>,
    pub total_characters: usize,
    /// 任意一页使用了 OCR 即为 true
    pub ocr_used: bool,
    /// 使用了 OCR 的页码列表（从 1 开始）
    pub ocr_pages: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionDebugInfo {
    /// 初始化一份空的诊断记录
    pub fn new(file_path: &str, file_exists: bool) -> Self {
        Self {
            file_path: file_path.to_string(),
            file_exists,
            text_content: String::new(),
            page_count: 0,
            characters_per_page: Vec::new(),
            total_characters: 0,
            ocr_used: false,
            ocr_pages: Vec::new(),
            error: None,
        }
    }
}

/// 检测流程的整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// 检测正常完成
    Success,
    /// 文本过少，结果不可信
    NoTextFound,
    /// 文档无法打开或解析
    ExtractionFailed,
    /// 检测流程整体失败
    DetectionFailed,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Success => "success",
            DetectionStatus::NoTextFound => "no_text_found",
            DetectionStatus::ExtractionFailed => "extraction_failed",
            DetectionStatus::DetectionFailed => "detection_failed",
        }
    }
}

/// 单个类别的模式检查记录
///
/// 无论是否命中，六个类别都会各有一条记录，便于排查。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternCheck {
    #[serde(rename = "type")]
    pub data_type: String,
    pub pattern: String,
    pub raw_matches: usize,
    pub valid_matches: usize,
    /// 最多两个通过校验的样例
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 检测流水线的完整输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// 类别名 -> 通过校验的归一化值；空类别不出现
    pub detected_data: BTreeMap<String, Vec<String>>,
    pub patterns_checked: Vec<PatternCheck>,
    pub status: DetectionStatus,
    pub debug_info: ExtractionDebugInfo,
}

/// 脱敏请求：类别名 -> 要移除的字面值列表
///
/// key 不做类别合法性校验，由调用方自行决定要移除什么。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionRequest {
    pub items_to_redact: BTreeMap<String, Vec<String>>,
}

/// 报告摘要，从请求内容重新计算而来
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_redacted: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// 脱敏核验报告，每次脱敏生成一份并持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub file_id: String,
    /// UTC ISO-8601 时间戳
    pub redaction_timestamp: String,
    pub redacted_items: BTreeMap<String, Vec<String>>,
    pub summary: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serde_shape() {
        let mut items = BTreeMap::new();
        items.insert("Email".to_string(), vec!["a@b.com".to_string()]);
        let mut by_type = BTreeMap::new();
        by_type.insert("Email".to_string(), 1);

        let report = VerificationReport {
            file_id: "abc".to_string(),
            redaction_timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            redacted_items: items,
            summary: ReportSummary {
                total_redacted: 1,
                by_type,
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["total_redacted"], 1);
        assert_eq!(json["summary"]["by_type"]["Email"], 1);
        assert_eq!(json["redacted_items"]["Email"][0], "a@b.com");
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&DetectionStatus::NoTextFound).unwrap();
        assert_eq!(json, "\"no_text_found\"");
        assert_eq!(DetectionStatus::ExtractionFailed.as_str(), "extraction_failed");
    }

    #[test]
    fn test_pattern_check_type_key() {
        let check = PatternCheck {
            data_type: "Aadhaar".to_string(),
            pattern: "x".to_string(),
            raw_matches: 3,
            valid_matches: 1,
            sample: None,
            error: None,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["type"], "Aadhaar");
        assert!(json.get("sample").is_none());
    }
}
