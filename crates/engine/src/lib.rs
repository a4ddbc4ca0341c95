//! 检测与脱敏引擎门面
//!
//! 每次调用都是独立的工作单元：以文档 id 为键打开输入、产出输出，
//! 调用间不共享可变状态。HTTP 路由、上传解析、静态下载等薄壳
//! 由外部承担，只依赖这里暴露的窄接口。

pub mod config;
mod detect;
mod extract;
mod redact;
mod report;
pub mod storage;

pub use config::EngineConfig;
pub use extract::extract_document;
pub use report::{generate_verification_report, load_verification_report, save_verification_report};
pub use storage::Storage;

pub use veil_core::{
    Category, DetectionOutcome, DetectionStatus, ExtractionDebugInfo, PageExtraction,
    PatternCheck, RedactionRequest, ReportSummary, VerificationReport,
};
pub use veil_ocr::{OcrHealth, TesseractConfig};
pub use veil_rules::ValidationOptions;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use veil_ocr::TesseractEngine;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("invalid file id: {0}")]
    InvalidFileId(String),
    #[error("redaction failed: {0}")]
    Redaction(String),
    #[error("verification report for {0} not found")]
    ReportNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 检测响应中的诊断块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionDiagnostics {
    pub status: DetectionStatus,
    pub page_count: usize,
    pub total_characters: usize,
    pub ocr_used: bool,
    pub ocr_pages: Vec<usize>,
    pub patterns_checked: Vec<PatternCheck>,
    /// 状态异常时附带完整提取细节
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_details: Option<ExtractionDebugInfo>,
}

/// 检测操作的对外响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub file_id: String,
    /// 类别名 -> 校验通过的归一化值；空类别不出现
    pub detected_data: BTreeMap<String, Vec<String>>,
    pub debug_info: DetectionDiagnostics,
    pub message: String,
}

/// 脱敏操作的对外响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionOutcome {
    pub file_id: String,
    pub redacted_count: usize,
    /// 脱敏产物路径（下载引用）
    pub output_path: String,
    /// 报告路径（核验引用）
    pub report_path: String,
    pub verification_report: VerificationReport,
}

/// 产物文件状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub redacted_pdf_exists: bool,
    pub report_exists: bool,
    pub redacted_pdf_size: u64,
}

/// 核验查询结果：报告内容加产物文件状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationStatus {
    #[serde(flatten)]
    pub report: VerificationReport,
    pub file_status: FileStatus,
}

/// 检测与脱敏引擎
pub struct Engine {
    config: EngineConfig,
    storage: Storage,
}

impl Engine {
    /// 创建引擎并初始化存储目录
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let storage = Storage::new(&config)?;
        Ok(Self { config, storage })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// 按配置构建 OCR 引擎，不可用时返回 None（提取降级为纯文本）
    fn build_ocr_engine(&self) -> Option<TesseractEngine> {
        match TesseractEngine::new(self.config.ocr.clone()) {
            Ok(engine) => Some(engine),
            Err(e) => {
                log::info!("[Engine] OCR 引擎不可用，仅使用内嵌文本: {}", e);
                None
            }
        }
    }

    /// 检测指定文档中的敏感信息
    pub fn detect(&self, file_id: &str) -> Result<DetectionResponse, EngineError> {
        let path = self.storage.document_path(file_id)?;
        if !path.exists() {
            return Err(EngineError::NotFound(file_id.to_string()));
        }

        log::info!("[Engine] 检测请求: {}", file_id);

        let ocr_engine = self.build_ocr_engine();
        let outcome =
            detect::detect_sensitive_data(&path, ocr_engine.as_ref(), &self.config.validation);

        let message = format!("Detection completed: {}", outcome.status.as_str());
        let include_details = outcome.status != DetectionStatus::Success;

        Ok(DetectionResponse {
            file_id: file_id.to_string(),
            detected_data: outcome.detected_data,
            debug_info: DetectionDiagnostics {
                status: outcome.status,
                page_count: outcome.debug_info.page_count,
                total_characters: outcome.debug_info.total_characters,
                ocr_used: outcome.debug_info.ocr_used,
                ocr_pages: outcome.debug_info.ocr_pages.clone(),
                patterns_checked: outcome.patterns_checked,
                extraction_details: include_details.then_some(outcome.debug_info),
            },
            message,
        })
    }

    /// 按请求脱敏指定文档，生成并持久化核验报告
    pub fn redact(
        &self,
        file_id: &str,
        request: &RedactionRequest,
    ) -> Result<RedactionOutcome, EngineError> {
        let input = self.storage.document_path(file_id)?;
        if !input.exists() {
            return Err(EngineError::NotFound(file_id.to_string()));
        }

        let output = self.storage.redacted_path(file_id)?;
        log::info!("[Engine] 脱敏请求: {} -> {:?}", file_id, output);

        let redacted_count =
            redact::perform_redaction(&input, &output, request).map_err(EngineError::Redaction)?;

        let verification_report = report::generate_verification_report(request, file_id);
        let report_path = self.storage.report_path(file_id)?;
        report::save_verification_report(&report_path, &verification_report)?;

        Ok(RedactionOutcome {
            file_id: file_id.to_string(),
            redacted_count,
            output_path: output.to_string_lossy().to_string(),
            report_path: report_path.to_string_lossy().to_string(),
            verification_report,
        })
    }

    /// 查询某次脱敏的核验状态
    pub fn verification_status(&self, file_id: &str) -> Result<VerificationStatus, EngineError> {
        let report_path = self.storage.report_path(file_id)?;
        if !report_path.exists() {
            return Err(EngineError::ReportNotFound(file_id.to_string()));
        }

        let report = report::load_verification_report(&report_path)?;
        let pdf_path = self.storage.redacted_path(file_id)?;
        let redacted_pdf_size = fs::metadata(&pdf_path).map(|m| m.len()).unwrap_or(0);

        Ok(VerificationStatus {
            report,
            file_status: FileStatus {
                redacted_pdf_exists: pdf_path.exists(),
                report_exists: true,
                redacted_pdf_size,
            },
        })
    }

    /// OCR 引擎健康状态，独立于具体文档
    pub fn ocr_health(&self) -> OcrHealth {
        veil_ocr::health(&self.config.ocr)
    }
}
