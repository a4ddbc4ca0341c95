use super::types::{Mask, MaskRect};
use lopdf::{Document, Object, Stream};

/// 从数组对象中提取边界框坐标
fn extract_box_values(arr: &[Object]) -> Option<(f32, f32, f32, f32)> {
    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();
    if values.len() == 4 {
        Some((values[0], values[1], values[2], values[3]))
    } else {
        None
    }
}

/// 获取页面旋转角度（页面自身优先，其次从父节点继承）
fn get_page_rotation(doc: &Document, page_id: lopdf::ObjectId) -> i32 {
    if let Ok(Object::Dictionary(dict)) = doc.get_object(page_id) {
        if let Ok(Object::Integer(rotate)) = dict.get(b"Rotate") {
            return *rotate as i32;
        }
        if let Ok(Object::Reference(parent_ref)) = dict.get(b"Parent") {
            if let Ok(Object::Dictionary(parent_dict)) = doc.get_object(*parent_ref) {
                if let Ok(Object::Integer(rotate)) = parent_dict.get(b"Rotate") {
                    return *rotate as i32;
                }
            }
        }
    }
    0
}

/// 获取页面的有效边界框（优先 CropBox，其次 MediaBox，可从父节点继承）
pub fn get_media_box(doc: &Document, page_id: lopdf::ObjectId) -> (f32, f32, f32, f32) {
    let raw_box = if let Ok(Object::Dictionary(dict)) = doc.get_object(page_id) {
        if let Ok(Object::Array(arr)) = dict.get(b"CropBox") {
            extract_box_values(arr)
        } else if let Ok(Object::Array(arr)) = dict.get(b"MediaBox") {
            extract_box_values(arr)
        } else if let Ok(Object::Reference(parent_ref)) = dict.get(b"Parent") {
            if let Ok(Object::Dictionary(parent_dict)) = doc.get_object(*parent_ref) {
                if let Ok(Object::Array(arr)) = parent_dict.get(b"MediaBox") {
                    extract_box_values(arr)
                } else {
                    None
                }
            } else {
                None
            }
        } else {
            None
        }
    } else {
        None
    };

    raw_box.unwrap_or_else(|| {
        log::warn!("[MediaBox] 未找到边界框，使用默认 Letter 尺寸");
        (0.0, 0.0, 612.0, 792.0)
    })
}

/// 获取页面边界框与旋转角度
pub fn get_media_box_with_rotation(
    doc: &Document,
    page_id: lopdf::ObjectId,
) -> (f32, f32, f32, f32, i32) {
    let rotation = get_page_rotation(doc, page_id);
    let (llx, lly, urx, ury) = get_media_box(doc, page_id);
    (llx, lly, urx, ury, rotation)
}

/// 将相对坐标（0-1，左上原点）的遮盖区域转换为 PDF 坐标系矩形。
///
/// 相对坐标是针对旋转后显示页面的，90°/270° 时宽高互换，
/// 这里换算回未旋转的 PDF 坐标。
pub fn convert_masks_to_pdf_coords(
    masks: &[Mask],
    media_box: (f32, f32, f32, f32),
    rotation: i32,
) -> Vec<MaskRect> {
    let page_width = media_box.2 - media_box.0;
    let page_height = media_box.3 - media_box.1;

    masks
        .iter()
        .map(|m| {
            let (pdf_x, pdf_y, pdf_w, pdf_h) = match rotation {
                90 => {
                    let pdf_y = media_box.1 + (m.x as f32) * page_height;
                    let pdf_x = media_box.0 + (1.0 - m.y as f32 - m.height as f32) * page_width;
                    (pdf_x, pdf_y, (m.height as f32) * page_width, (m.width as f32) * page_height)
                }
                180 => {
                    let pdf_x = media_box.0 + (1.0 - m.x as f32 - m.width as f32) * page_width;
                    let pdf_y = media_box.1 + (m.y as f32) * page_height;
                    (pdf_x, pdf_y, (m.width as f32) * page_width, (m.height as f32) * page_height)
                }
                270 => {
                    let pdf_y = media_box.1 + (1.0 - m.x as f32 - m.width as f32) * page_height;
                    let pdf_x = media_box.0 + (m.y as f32) * page_width;
                    (pdf_x, pdf_y, (m.height as f32) * page_width, (m.width as f32) * page_height)
                }
                _ => {
                    // PDF 坐标系 Y 轴从下往上，相对坐标从上往下
                    let pdf_x = media_box.0 + (m.x as f32) * page_width;
                    let pdf_y = media_box.1 + (1.0 - m.y as f32 - m.height as f32) * page_height;
                    (pdf_x, pdf_y, (m.width as f32) * page_width, (m.height as f32) * page_height)
                }
            };

            let rect = MaskRect {
                x: pdf_x,
                y: pdf_y,
                width: pdf_w,
                height: pdf_h,
            };

            log::debug!(
                "[坐标转换] ({:.4}, {:.4}, {:.4}, {:.4}) -> ({:.2}, {:.2}, {:.2}, {:.2})",
                m.x, m.y, m.width, m.height, rect.x, rect.y, rect.width, rect.height
            );

            rect
        })
        .collect()
}

/// 从 Object 获取数值
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// 获取流内容（压缩与未压缩均可）
pub fn get_stream_content(stream: &Stream) -> Result<Vec<u8>, String> {
    match stream.decompressed_content() {
        Ok(data) => Ok(data),
        Err(_) => Ok(stream.content.clone()),
    }
}

/// 获取页面的内容流数据（兼容引用、数组与内联流）
pub fn get_page_content(doc: &Document, page_id: lopdf::ObjectId) -> Result<Vec<u8>, String> {
    let page = doc.get_object(page_id).map_err(|e| e.to_string())?;

    if let Object::Dictionary(dict) = page {
        if let Ok(contents) = dict.get(b"Contents") {
            match contents {
                Object::Reference(ref_id) => {
                    if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                        return get_stream_content(stream);
                    }
                }
                Object::Array(arr) => {
                    let mut all_content = Vec::new();
                    for item in arr {
                        if let Object::Reference(ref_id) = item {
                            if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                                if let Ok(data) = get_stream_content(stream) {
                                    all_content.extend(data);
                                    all_content.push(b'\n');
                                }
                            }
                        }
                    }
                    return Ok(all_content);
                }
                Object::Stream(stream) => {
                    return get_stream_content(stream);
                }
                _ => {}
            }
        }
    }

    Err("无法获取页面内容".to_string())
}
