//! 引擎配置
//!
//! JSON 文件持久化，文件缺失时落回默认值。
//! OCR 渲染缩放等运行时可调项通过环境变量覆盖（见 extract 模块）。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::EngineError;
use veil_ocr::TesseractConfig;
use veil_rules::ValidationOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 上传文档目录（{id}.pdf）
    pub upload_dir: PathBuf,
    /// 脱敏产物目录（{id}_redacted.pdf 与 {id}_report.json）
    pub redacted_dir: PathBuf,
    /// OCR 引擎配置
    pub ocr: TesseractConfig,
    /// 候选校验选项
    pub validation: ValidationOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            redacted_dir: PathBuf::from("redacted"),
            ocr: TesseractConfig::default(),
            validation: ValidationOptions::default(),
        }
    }
}

impl EngineConfig {
    /// 从 JSON 文件加载配置，文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// 保存配置到 JSON 文件
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}
