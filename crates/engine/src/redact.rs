//! 脱敏执行
//!
//! 逐页定位请求中的字面文本并做不可逆移除。整个过程任一环节失败
//! 都作为单一失败返回；输出先写入暂存文件，全部成功后才原子替换到
//! 目标路径，调用方看到的要么是完整产物要么是错误，不会有半成品。

use std::fs;
use std::path::Path;

use veil_core::RedactionRequest;
use veil_pdf::PdfDocument;

use crate::storage::staging_path;

/// 执行脱敏，返回移除的区域数量
pub fn perform_redaction(
    input: &Path,
    output: &Path,
    request: &RedactionRequest,
) -> Result<usize, String> {
    let mut doc = PdfDocument::open(input)?;
    let mut redacted_count = 0usize;

    for page_index in 0..doc.page_count() {
        for (category, items) in &request.items_to_redact {
            let terms: Vec<&str> = items
                .iter()
                .filter(|item| !item.is_empty())
                .map(|item| item.as_str())
                .collect();
            if terms.is_empty() {
                continue;
            }

            for (term, masks) in doc.find_text(page_index, &terms)? {
                log::debug!(
                    "[Redact] 页面 {} 类别 {} 文本 {:?}: {} 处",
                    page_index,
                    category,
                    term,
                    masks.len()
                );
                for mask in masks {
                    doc.mark_for_redaction(page_index, mask);
                    redacted_count += 1;
                }
            }
        }

        // 本页所有类别标记完后一次性提交
        doc.apply_redactions(page_index)?;
    }

    let staging = staging_path(output);
    if let Err(e) = doc.save(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    if let Err(e) = fs::rename(&staging, output) {
        let _ = fs::remove_file(&staging);
        return Err(format!("发布脱敏产物失败: {}", e));
    }

    log::info!("[Redact] 脱敏完成: 移除 {} 处，输出 {:?}", redacted_count, output);
    Ok(redacted_count)
}
