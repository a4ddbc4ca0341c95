//! 文档文本提取
//!
//! 每页先取内嵌文本；文本过少时把页面渲染成位图走 OCR，
//! OCR 结果追加在内嵌文本之后。OCR 路径上的任何失败（渲染、引擎）
//! 都静默回退到内嵌文本，单页提取永远不会失败。
//! 单页的内嵌文本提取失败会被记录为该页的错误，不影响其余页面。

use std::path::Path;

use veil_core::{ExtractionDebugInfo, PageExtraction};
use veil_ocr::TesseractEngine;
use veil_pdf::PdfDocument;

/// 内嵌文本低于该字符数时尝试 OCR
const LOW_TEXT_THRESHOLD: usize = 50;
/// OCR 结果超过该字符数才采纳
const OCR_MIN_CHARS: usize = 10;
/// 判定"OCR 起了作用"的最小增量
const OCR_GAIN_THRESHOLD: usize = 20;
/// 预览截断长度
const PREVIEW_CHARS: usize = 100;
/// 默认渲染缩放倍数（2x 提升识别率）
const DEFAULT_OCR_ZOOM: f32 = 2.0;

/// OCR 渲染缩放倍数，可用 VEIL_OCR_ZOOM 覆盖
fn ocr_zoom() -> f32 {
    std::env::var("VEIL_OCR_ZOOM")
        .ok()
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_OCR_ZOOM)
}

/// 单页是否判定为 OCR 起效：内嵌文本过少且最终文本明显更长
fn ocr_flagged(original_text: &str, final_char_count: usize) -> bool {
    original_text.trim().chars().count() < LOW_TEXT_THRESHOLD
        && final_char_count > original_text.chars().count() + OCR_GAIN_THRESHOLD
}

/// 单页提取：内嵌文本不足时渲染页面并用 OCR 补充。
/// 返回值已做首尾空白修剪。本函数不会失败。
fn extract_page_with_ocr(
    doc: &PdfDocument,
    page_index: usize,
    direct_text: &str,
    ocr: Option<&TesseractEngine>,
) -> String {
    let trimmed = direct_text.trim();
    if trimmed.chars().count() >= LOW_TEXT_THRESHOLD {
        return trimmed.to_string();
    }

    let engine = match ocr {
        Some(engine) => engine,
        None => return trimmed.to_string(),
    };

    log::info!(
        "[Extract] 页面 {} 内嵌文本过少（{} 字符），尝试 OCR",
        page_index + 1,
        trimmed.chars().count()
    );

    let image = match doc.render_page(page_index, ocr_zoom()) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("[Extract] 页面 {} 渲染失败: {}，使用内嵌文本", page_index + 1, e);
            return trimmed.to_string();
        }
    };

    let ocr_text = match engine.recognize_image(&image) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("[Extract] 页面 {} OCR 失败: {}，使用内嵌文本", page_index + 1, e);
            return trimmed.to_string();
        }
    };

    if ocr_text.trim().chars().count() > OCR_MIN_CHARS {
        log::info!(
            "[Extract] 页面 {} OCR 识别到 {} 字符",
            page_index + 1,
            ocr_text.chars().count()
        );
        if trimmed.is_empty() {
            ocr_text.trim().to_string()
        } else {
            format!("{}\n{}", direct_text, ocr_text).trim().to_string()
        }
    } else {
        trimmed.to_string()
    }
}

/// 提取整篇文档并汇总诊断信息。
/// 文件缺失或文档无法打开时填充 error 字段提前返回；
/// 单页失败记为该页 0 字符并继续后续页面。
pub fn extract_document(path: &Path, ocr: Option<&TesseractEngine>) -> ExtractionDebugInfo {
    let mut debug_info = ExtractionDebugInfo::new(&path.to_string_lossy(), path.exists());

    if !debug_info.file_exists {
        debug_info.error = Some("File does not exist".to_string());
        return debug_info;
    }

    let doc = match PdfDocument::open(path) {
        Ok(doc) => doc,
        Err(e) => {
            log::error!("[Extract] 打开文档失败: {}", e);
            debug_info.error = Some(e);
            return debug_info;
        }
    };
    debug_info.page_count = doc.page_count();

    let mut full_text = String::new();

    for page in doc.page_texts() {
        let page_number = page.index + 1;

        if let Some(page_error) = page.error {
            log::error!("[Extract] 页面 {} 提取失败: {}", page_number, page_error);
            debug_info.characters_per_page.push(PageExtraction {
                page: page_number,
                characters: 0,
                original_characters: 0,
                ocr_used: false,
                preview: String::new(),
                error: Some(page_error),
            });
            continue;
        }

        let original_text = page.text;
        let page_text = extract_page_with_ocr(&doc, page.index, &original_text, ocr);
        let char_count = page_text.chars().count();

        let ocr_used = ocr_flagged(&original_text, char_count);
        if ocr_used {
            debug_info.ocr_used = true;
            debug_info.ocr_pages.push(page_number);
        }

        let preview = if char_count > PREVIEW_CHARS {
            let head: String = page_text.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        } else {
            page_text.clone()
        };

        debug_info.characters_per_page.push(PageExtraction {
            page: page_number,
            characters: char_count,
            original_characters: original_text.chars().count(),
            ocr_used,
            preview,
            error: None,
        });

        full_text.push_str(&page_text);
        full_text.push('\n');

        log::info!(
            "[Extract] 页面 {}: {} 字符 (OCR: {})",
            page_number,
            char_count,
            ocr_used
        );
    }

    debug_info.total_characters = full_text.chars().count();
    debug_info.text_content = full_text;

    log::info!(
        "[Extract] 提取完成: 共 {} 字符，OCR 使用: {}",
        debug_info.total_characters,
        debug_info.ocr_used
    );

    debug_info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_flag_requires_short_original_and_real_gain() {
        let long_text = "x".repeat(60);
        // 内嵌文本已足够，无论最终多长都不算 OCR
        assert!(!ocr_flagged(&long_text, 500));
        // 内嵌文本短、增量明显
        assert!(ocr_flagged("short", 5 + OCR_GAIN_THRESHOLD + 1));
        // 增量不足
        assert!(!ocr_flagged("short", 5 + OCR_GAIN_THRESHOLD));
        assert!(!ocr_flagged("", 20));
        assert!(ocr_flagged("", 21));
    }

    #[test]
    fn test_ocr_flag_counts_chars_not_bytes() {
        // 49 个多字节字符：按字符数仍低于阈值
        let original: String = "页".repeat(49);
        assert!(ocr_flagged(&original, original.chars().count() + 21));
    }

    #[test]
    fn test_extract_missing_file() {
        let info = extract_document(Path::new("/nonexistent/doc.pdf"), None);
        assert!(!info.file_exists);
        assert_eq!(info.error.as_deref(), Some("File does not exist"));
        assert_eq!(info.page_count, 0);
    }

    #[test]
    fn test_extract_unparseable_file() {
        let path = std::env::temp_dir().join(format!(
            "veil_extract_bad_{}.pdf",
            std::process::id()
        ));
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let info = extract_document(&path, None);
        assert!(info.file_exists);
        assert!(info.error.is_some());
        assert!(info.text_content.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_ocr_zoom_default() {
        // 未设置环境变量时使用默认缩放
        if std::env::var("VEIL_OCR_ZOOM").is_err() {
            assert_eq!(ocr_zoom(), DEFAULT_OCR_ZOOM);
        }
    }
}
