//! pdfium 接入
//!
//! 文本提取、页面渲染与文本定位都走 pdfium（编码处理最准确）。
//! pdfium 动态库按搜索路径探测加载，不可用时由上层回退到
//! lopdf 的内容流解析。

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};

use super::types::{Mask, PageText};

/// pdfium 动态库的搜索路径
fn get_pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. 环境变量指定的目录优先
    if let Ok(dir) = std::env::var("VEIL_PDFIUM_DIR") {
        paths.push(PathBuf::from(dir));
    }

    // 2. 可执行文件同级的 libs 目录及同级目录
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());
        }
    }

    // 3. 工作目录
    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

/// 绑定 pdfium 库
fn bind_pdfium() -> Result<Pdfium, String> {
    for path in &get_pdfium_search_paths() {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(path);
        log::debug!("[Pdfium] 尝试加载: {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::info!("[Pdfium] 成功从 {:?} 加载", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("Pdfium 库不可用: {}", e))
}

/// 提取每页的内嵌文本。单页失败记录在该页的 error 上，
/// 不影响其余页面。
pub fn extract_page_texts(pdf_path: &Path) -> Result<Vec<PageText>, String> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(&pdf_path, None)
        .map_err(|e| format!("加载 PDF 失败: {}", e))?;

    let page_count = document.pages().len();
    let mut results = Vec::with_capacity(page_count as usize);

    for page_idx in 0..page_count {
        let entry = match document.pages().get(page_idx) {
            Ok(page) => match page.text() {
                Ok(text) => PageText {
                    index: page_idx as usize,
                    text: text.all(),
                    error: None,
                },
                Err(e) => PageText {
                    index: page_idx as usize,
                    text: String::new(),
                    error: Some(format!("提取文本失败: {}", e)),
                },
            },
            Err(e) => PageText {
                index: page_idx as usize,
                text: String::new(),
                error: Some(format!("获取页面失败: {}", e)),
            },
        };
        results.push(entry);
    }

    Ok(results)
}

/// 将页面渲染为位图。`zoom` 为线性缩放倍数（1.0 = 72 DPI）。
pub fn render_page_image(
    pdf_path: &Path,
    page_index: usize,
    zoom: f32,
) -> Result<DynamicImage, String> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(&pdf_path, None)
        .map_err(|e| format!("加载 PDF 失败: {}", e))?;

    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| format!("获取页面 {} 失败: {}", page_index, e))?;

    let page_width = page.width().value;
    let page_height = page.height().value;

    let target_width = (page_width * zoom) as i32;
    let target_height = (page_height * zoom) as i32;

    log::info!(
        "[Pdfium] 渲染页面 {}: {}x{} pt -> {}x{} px (zoom: {})",
        page_index,
        page_width,
        page_height,
        target_width,
        target_height,
        zoom
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(target_width)
        .set_target_height(target_height);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| format!("渲染页面失败: {}", e))?;

    Ok(bitmap.as_image())
}

/// 在单页上批量定位多个字面文本（一次打开文档，逐词搜索）。
/// 返回 (搜索词, 命中区域) 列表，坐标为页面相对坐标（0-1，左上原点），
/// 四周加 0.003 的余量。没有任何命中的词不出现在结果里。
pub fn batch_search_text(
    pdf_path: &Path,
    page_index: usize,
    search_terms: &[&str],
) -> Result<Vec<(String, Vec<Mask>)>, String> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(&pdf_path, None)
        .map_err(|e| format!("加载 PDF 失败: {}", e))?;

    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| format!("获取页面 {} 失败: {}", page_index, e))?;

    let page_width = page.width().value as f64;
    let page_height = page.height().value as f64;

    let text = page.text().map_err(|e| format!("提取文本失败: {}", e))?;
    let search_options = PdfSearchOptions::new();

    let mut all_results = Vec::new();

    for search_term in search_terms {
        let search = match text.search(search_term, &search_options) {
            Ok(s) => s,
            Err(_) => continue,
        };

        let mut results = Vec::new();

        for segments in search.iter(PdfSearchDirection::SearchForward) {
            for segment in segments.iter() {
                let bounds = segment.bounds();

                let pdf_left = bounds.left().value as f64;
                let pdf_bottom = bounds.bottom().value as f64;
                let pdf_right = bounds.right().value as f64;
                let pdf_top = bounds.top().value as f64;

                let x = pdf_left / page_width;
                let y = 1.0 - (pdf_top / page_height);
                let width = (pdf_right - pdf_left) / page_width;
                let height = (pdf_top - pdf_bottom) / page_height;

                let padding = 0.003;
                results.push(Mask {
                    x: (x - padding).max(0.0),
                    y: (y - padding).max(0.0),
                    width: (width + padding * 2.0).min(1.0),
                    height: (height + padding * 2.0).min(1.0),
                });
            }
        }

        if !results.is_empty() {
            all_results.push((search_term.to_string(), results));
        }
    }

    Ok(all_results)
}
