//! 存储命名空间
//!
//! 以文档 id 为键管理上传文档与脱敏产物的磁盘路径。
//! id 在整个 脱敏 -> 核验 -> 下载 生命周期内保持稳定，
//! 两个并发操作只要 id 不同就不会触碰同一产物路径。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::EngineError;

pub struct Storage {
    upload_dir: PathBuf,
    redacted_dir: PathBuf,
}

impl Storage {
    /// 创建存储层并确保目录存在
    pub fn new(config: &EngineConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.upload_dir)?;
        fs::create_dir_all(&config.redacted_dir)?;
        Ok(Self {
            upload_dir: config.upload_dir.clone(),
            redacted_dir: config.redacted_dir.clone(),
        })
    }

    /// 校验文档 id：只允许字母、数字、连字符与下划线，
    /// 拒绝一切可能逃出存储目录的字符
    fn check_id(file_id: &str) -> Result<(), EngineError> {
        let valid = !file_id.is_empty()
            && file_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(EngineError::InvalidFileId(file_id.to_string()))
        }
    }

    /// 上传文档路径：upload_dir/{id}.pdf
    pub fn document_path(&self, file_id: &str) -> Result<PathBuf, EngineError> {
        Self::check_id(file_id)?;
        Ok(self.upload_dir.join(format!("{}.pdf", file_id)))
    }

    /// 脱敏产物路径：redacted_dir/{id}_redacted.pdf
    pub fn redacted_path(&self, file_id: &str) -> Result<PathBuf, EngineError> {
        Self::check_id(file_id)?;
        Ok(self.redacted_dir.join(format!("{}_redacted.pdf", file_id)))
    }

    /// 核验报告路径：redacted_dir/{id}_report.json
    pub fn report_path(&self, file_id: &str) -> Result<PathBuf, EngineError> {
        Self::check_id(file_id)?;
        Ok(self.redacted_dir.join(format!("{}_report.json", file_id)))
    }

    /// 是否存在该 id 对应的上传文档
    pub fn exists(&self, file_id: &str) -> bool {
        self.document_path(file_id)
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// 写入上传文档内容
    pub fn write_document(&self, file_id: &str, bytes: &[u8]) -> Result<PathBuf, EngineError> {
        let path = self.document_path(file_id)?;
        fs::write(&path, bytes)?;
        log::info!("[Storage] 写入文档: {:?} ({} 字节)", path, bytes.len());
        Ok(path)
    }
}

/// 产物的暂存路径：目标文件名追加 .tmp 后缀
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}
