//! PDF 文档层
//!
//! 对上层提供统一的文档接口：按页提取文本、渲染位图、
//! 定位字面文本、标记并执行不可逆的内容移除。
//!
//! 文本提取与定位优先走 pdfium（编码处理准确），pdfium 不可用时
//! 回退到 lopdf 内容流解析；内容移除始终通过 lopdf 改写内容流完成，
//! 被移除的文字在输出文档的文本层中不复存在。

mod content;
mod pdfium;
mod types;
mod utils;

pub use types::{Mask, MaskRect, PageText};

use image::DynamicImage;
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 一份打开的 PDF 文档
///
/// 检测阶段只读；脱敏阶段先通过 [`PdfDocument::mark_for_redaction`]
/// 逐页累积待移除区域，再按页一次性提交（[`PdfDocument::apply_redactions`]），
/// 最后另存为新文件，不覆盖原始文档。
pub struct PdfDocument {
    path: PathBuf,
    doc: lopdf::Document,
    page_ids: Vec<lopdf::ObjectId>,
    pending: BTreeMap<usize, Vec<Mask>>,
}

impl PdfDocument {
    /// 打开 PDF 文件
    pub fn open(path: &Path) -> Result<Self, String> {
        let doc = lopdf::Document::load(path).map_err(|e| format!("无法加载 PDF: {}", e))?;
        let page_ids: Vec<lopdf::ObjectId> = doc.page_iter().collect();

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_ids,
            pending: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// 提取每页的内嵌文本。pdfium 优先，失败时回退到 lopdf。
    /// 返回结果覆盖所有页面，单页失败记录在该页的 error 上。
    pub fn page_texts(&self) -> Vec<PageText> {
        match pdfium::extract_page_texts(&self.path) {
            Ok(texts) => {
                log::info!("[PdfDocument] 使用 pdfium 提取文本成功");
                texts
            }
            Err(e) => {
                log::warn!("[PdfDocument] pdfium 提取失败: {}，回退到 lopdf", e);
                self.page_texts_lopdf()
            }
        }
    }

    /// lopdf 回退提取：逐页解析内容流中的字符串
    fn page_texts_lopdf(&self) -> Vec<PageText> {
        self.page_ids
            .iter()
            .enumerate()
            .map(|(idx, page_id)| match utils::get_page_content(&self.doc, *page_id) {
                Ok(data) => PageText {
                    index: idx,
                    text: content::extract_text_from_content(&data),
                    error: None,
                },
                Err(e) => PageText {
                    index: idx,
                    text: String::new(),
                    error: Some(e),
                },
            })
            .collect()
    }

    /// 将页面渲染为位图，`zoom` 为线性缩放倍数
    pub fn render_page(&self, page_index: usize, zoom: f32) -> Result<DynamicImage, String> {
        pdfium::render_page_image(&self.path, page_index, zoom)
    }

    /// 在单页上定位多个字面文本的所有出现位置（区分大小写）
    pub fn find_text(
        &self,
        page_index: usize,
        search_terms: &[&str],
    ) -> Result<Vec<(String, Vec<Mask>)>, String> {
        pdfium::batch_search_text(&self.path, page_index, search_terms)
    }

    /// 标记一个待移除区域，等待本页统一提交
    pub fn mark_for_redaction(&mut self, page_index: usize, mask: Mask) {
        self.pending.entry(page_index).or_default().push(mask);
    }

    /// 本页已标记但未提交的区域数量
    pub fn pending_redactions(&self, page_index: usize) -> usize {
        self.pending.get(&page_index).map_or(0, |m| m.len())
    }

    /// 提交本页的全部待移除区域：把区域内的文字改写为空格并覆盖
    /// 黑色矩形，整页内容流只替换一次。无待移除区域时不做任何修改。
    pub fn apply_redactions(&mut self, page_index: usize) -> Result<(), String> {
        let masks = match self.pending.remove(&page_index) {
            Some(masks) if !masks.is_empty() => masks,
            _ => return Ok(()),
        };

        let page_id = *self
            .page_ids
            .get(page_index)
            .ok_or_else(|| format!("页面 {} 不存在", page_index))?;

        let (llx, lly, urx, ury, rotation) =
            utils::get_media_box_with_rotation(&self.doc, page_id);
        let mask_rects =
            utils::convert_masks_to_pdf_coords(&masks, (llx, lly, urx, ury), rotation);

        let content_data = utils::get_page_content(&self.doc, page_id)?;
        let processed = content::process_content_stream(&content_data, &mask_rects)?;
        let final_data = content::add_black_overlay(&processed, &mask_rects)?;

        let stream = Stream::new(Dictionary::new(), final_data);
        let stream_id = self.doc.add_object(stream);
        if let Ok(Object::Dictionary(dict)) = self.doc.get_object_mut(page_id) {
            dict.set(b"Contents", Object::Reference(stream_id));
        }

        log::info!(
            "[PdfDocument] 页面 {} 提交 {} 个移除区域",
            page_index,
            masks.len()
        );
        Ok(())
    }

    /// 另存为新文件（压缩后写出）
    pub fn save(&mut self, path: &Path) -> Result<(), String> {
        self.doc.compress();
        let mut file = fs::File::create(path).map_err(|e| format!("创建文件失败: {}", e))?;
        self.doc
            .save_to(&mut file)
            .map_err(|e| format!("保存失败: {}", e))?;
        Ok(())
    }
}
