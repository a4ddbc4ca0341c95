//! 脱敏核验报告
//!
//! 每次脱敏生成一份报告并持久化为 JSON，同一 id 重新脱敏时覆盖。
//! 摘要计数从请求内容重新计算，不复用脱敏执行器的计数，
//! 后续核验只依赖报告本身。

use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::Path;

use veil_core::{RedactionRequest, ReportSummary, VerificationReport};

use crate::EngineError;

/// 生成核验报告（纯函数，不做 I/O）
pub fn generate_verification_report(
    request: &RedactionRequest,
    file_id: &str,
) -> VerificationReport {
    let total_redacted = request.items_to_redact.values().map(|v| v.len()).sum();
    let by_type = request
        .items_to_redact
        .iter()
        .map(|(category, items)| (category.clone(), items.len()))
        .collect();

    VerificationReport {
        file_id: file_id.to_string(),
        redaction_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        redacted_items: request.items_to_redact.clone(),
        summary: ReportSummary {
            total_redacted,
            by_type,
        },
    }
}

/// 保存报告，覆盖同路径的旧报告
pub fn save_verification_report(
    path: &Path,
    report: &VerificationReport,
) -> Result<(), EngineError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(report)?;
    fs::write(path, raw)?;
    log::info!("[Report] 核验报告已保存: {:?}", path);
    Ok(())
}

/// 读取持久化的报告
pub fn load_verification_report(path: &Path) -> Result<VerificationReport, EngineError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn email_request() -> RedactionRequest {
        let mut items = BTreeMap::new();
        items.insert("Email".to_string(), vec!["a@b.com".to_string()]);
        RedactionRequest {
            items_to_redact: items,
        }
    }

    fn temp_report_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "veil_report_test_{}_{}_report.json",
            std::process::id(),
            tag
        ))
    }

    #[test]
    fn test_summary_computed_from_request() {
        let mut items = BTreeMap::new();
        items.insert(
            "Phone".to_string(),
            vec!["9876543210".to_string(), "8765432109".to_string()],
        );
        items.insert("PAN".to_string(), vec!["ABCDE1234F".to_string()]);
        items.insert("Aadhaar".to_string(), vec![]);
        let request = RedactionRequest {
            items_to_redact: items,
        };

        let report = generate_verification_report(&request, "doc42");
        assert_eq!(report.file_id, "doc42");
        assert_eq!(report.summary.total_redacted, 3);
        assert_eq!(report.summary.by_type["Phone"], 2);
        assert_eq!(report.summary.by_type["PAN"], 1);
        assert_eq!(report.summary.by_type["Aadhaar"], 0);
        assert_eq!(report.redacted_items, request.items_to_redact);
        // UTC ISO-8601 时间戳
        assert!(report.redaction_timestamp.ends_with('Z'));
    }

    #[test]
    fn test_round_trip() {
        let path = temp_report_path("round_trip");
        let report = generate_verification_report(&email_request(), "doc1");
        save_verification_report(&path, &report).unwrap();

        let loaded = load_verification_report(&path).unwrap();
        assert_eq!(loaded.summary.total_redacted, 1);
        assert_eq!(loaded.summary.by_type["Email"], 1);
        assert_eq!(loaded.redacted_items["Email"], vec!["a@b.com"]);
        assert_eq!(loaded.redaction_timestamp, report.redaction_timestamp);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_overwrites_previous_report() {
        let path = temp_report_path("overwrite");
        save_verification_report(&path, &generate_verification_report(&email_request(), "old"))
            .unwrap();

        let mut items = BTreeMap::new();
        items.insert("Phone".to_string(), vec!["9876543210".to_string()]);
        let request = RedactionRequest {
            items_to_redact: items,
        };
        save_verification_report(&path, &generate_verification_report(&request, "new")).unwrap();

        let loaded = load_verification_report(&path).unwrap();
        assert_eq!(loaded.file_id, "new");
        assert!(loaded.redacted_items.contains_key("Phone"));
        assert!(!loaded.redacted_items.contains_key("Email"));

        fs::remove_file(&path).ok();
    }
}
