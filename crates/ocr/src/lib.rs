//! Tesseract OCR 引擎（CLI 包装）
//!
//! 通过系统 tesseract 可执行文件识别页面图片，输出纯文本。
//! 引擎缺失或执行失败时调用方应降级为纯文本提取，而不是中断流程。

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Tesseract 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseractConfig {
    /// tesseract 可执行文件路径，缺省时走 PATH
    pub binary_path: Option<String>,
    /// tessdata 目录路径
    pub tessdata_path: Option<String>,
    /// 识别语言（如 "eng"）
    pub lang: Option<String>,
    /// 页面分割模式 (0-13)
    pub psm: Option<u8>,
    /// OCR 引擎模式 (0-3)
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }

    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or("eng")
    }

    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(3)
    }

    pub fn oem_or_default(&self) -> u8 {
        self.oem.unwrap_or(1)
    }
}

/// OCR 引擎健康状态，独立于单次文档处理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrHealth {
    pub available: bool,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
}

/// 临时文件序号，避免同进程并发识别时文件名冲突
static TEMP_SEQ: AtomicUsize = AtomicUsize::new(0);

impl TesseractEngine {
    /// 创建引擎，构造时探测可执行文件版本
    pub fn new(config: TesseractConfig) -> Result<Self, String> {
        let version = get_tesseract_version(config.binary_or_default())?;
        log::info!("[Tesseract] 初始化成功，版本: {}", version);
        Ok(Self { config, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// 识别内存中的页面图片，返回识别出的纯文本
    pub fn recognize_image(&self, img: &DynamicImage) -> Result<String, String> {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_input = std::env::temp_dir().join(format!(
            "veil_ocr_{}_{}.png",
            std::process::id(),
            seq
        ));

        img.save(&temp_input)
            .map_err(|e| format!("保存临时图片失败: {}", e))?;

        let result = self.recognize_file(temp_input.to_string_lossy().as_ref());

        if let Err(e) = std::fs::remove_file(&temp_input) {
            log::warn!("[Tesseract] 删除临时文件失败: {}", e);
        }

        result
    }

    /// 识别图片文件
    pub fn recognize_file(&self, image_path: &str) -> Result<String, String> {
        let start = Instant::now();

        let mut cmd = Command::new(self.config.binary_or_default());
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(self.config.lang_or_default())
            .arg("--psm")
            .arg(self.config.psm_or_default().to_string())
            .arg("--oem")
            .arg(self.config.oem_or_default().to_string());

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        let output = cmd
            .output()
            .map_err(|e| format!("执行 tesseract 失败: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("Tesseract 执行失败: {}", stderr));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();

        log::info!(
            "[Tesseract] 识别完成，耗时: {} ms，字符数: {}",
            start.elapsed().as_millis(),
            text.chars().count()
        );

        Ok(text)
    }
}

/// 获取 Tesseract 版本号
pub fn get_tesseract_version(binary_path: &str) -> Result<String, String> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| format!("无法执行 tesseract: {}", e))?;

    if !output.status.success() {
        return Err("tesseract --version 执行失败".to_string());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    // 版本号通常在第一行，形如 "tesseract 5.3.0" 或 "tesseract v5.3.0"
    for line in combined.lines() {
        if line.contains("tesseract") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                return Ok(parts[1].trim_start_matches('v').to_string());
            }
        }
    }

    Ok("unknown".to_string())
}

/// 探测 OCR 引擎可用性
pub fn health(config: &TesseractConfig) -> OcrHealth {
    match get_tesseract_version(config.binary_or_default()) {
        Ok(version) => OcrHealth {
            available: true,
            version: Some(version),
            error: None,
        },
        Err(e) => OcrHealth {
            available: false,
            version: None,
            error: Some(e),
        },
    }
}
