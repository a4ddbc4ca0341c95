//! 内容流处理
//!
//! 两类操作：
//! - 脱敏改写：把落在遮盖区域内的文字字符改写为空格并追加黑色矩形，
//!   使文字从文本层彻底消失，无法复制或重新提取。
//! - 回退文本提取：在 pdfium 不可用时直接从内容流解析括号/十六进制
//!   字符串，得到近似的页面文本。

use super::types::MaskRect;
use super::utils::get_number;
use lopdf::{
    content::{Content, Operation},
    Object,
};

/// 估算单个字符的宽度
fn estimate_char_width(byte: u8, font_size: f32) -> f32 {
    if byte < 128 {
        font_size * 0.55
    } else {
        font_size * 1.0
    }
}

/// 估算文字宽度
fn estimate_text_width(text: &[u8], font_size: f32) -> f32 {
    text.iter()
        .map(|&b| estimate_char_width(b, font_size))
        .sum()
}

/// 检查单个字符是否落在任一遮盖区域内
fn char_in_mask(
    char_x: f32,
    char_y: f32,
    char_width: f32,
    font_size: f32,
    masks: &[MaskRect],
) -> bool {
    let char_height = font_size.abs().max(12.0);
    masks
        .iter()
        .any(|m| m.intersects_text_bbox(char_x, char_y, char_width, char_height))
}

/// 字符级脱敏：把落在遮盖区域内的字符替换为空格。
/// 用空格而不是直接删除，保持后续字符位置不偏移，
/// 同时空格没有内容可复制。
fn redact_text_chars(
    text: &[u8],
    start_x: f32,
    start_y: f32,
    font_size: f32,
    masks: &[MaskRect],
) -> (Vec<u8>, bool) {
    let mut result = Vec::with_capacity(text.len());
    let mut current_x = start_x;
    let mut any_redacted = false;

    for &byte in text.iter() {
        let char_width = estimate_char_width(byte, font_size);

        if char_in_mask(current_x, start_y, char_width, font_size, masks) {
            result.push(b' ');
            any_redacted = true;
        } else {
            result.push(byte);
        }

        current_x += char_width;
    }

    (result, any_redacted)
}

/// 改写内容流：跟踪 CTM 与文本矩阵，把遮盖区域内的文字替换为空格
pub fn process_content_stream(content_data: &[u8], masks: &[MaskRect]) -> Result<Vec<u8>, String> {
    let content = Content::decode(content_data).map_err(|e| e.to_string())?;
    let mut new_operations: Vec<Operation> = Vec::new();

    let mut graphics_state_stack: Vec<[f32; 6]> = Vec::new();
    let mut text_matrix: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut line_matrix: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut ctm: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut in_text_object = false;
    let mut font_size: f32 = 12.0;

    for op in content.operations {
        let operator = op.operator.as_str();

        match operator {
            "q" => {
                graphics_state_stack.push(ctm);
                new_operations.push(op);
            }
            "Q" => {
                if let Some(saved_ctm) = graphics_state_stack.pop() {
                    ctm = saved_ctm;
                }
                new_operations.push(op);
            }
            "cm" if op.operands.len() >= 6 => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) = (
                    get_number(&op.operands[0]),
                    get_number(&op.operands[1]),
                    get_number(&op.operands[2]),
                    get_number(&op.operands[3]),
                    get_number(&op.operands[4]),
                    get_number(&op.operands[5]),
                ) {
                    ctm = [
                        ctm[0] * a + ctm[2] * b,
                        ctm[1] * a + ctm[3] * b,
                        ctm[0] * c + ctm[2] * d,
                        ctm[1] * c + ctm[3] * d,
                        ctm[0] * e + ctm[2] * f + ctm[4],
                        ctm[1] * e + ctm[3] * f + ctm[5],
                    ];
                }
                new_operations.push(op);
            }
            "BT" => {
                in_text_object = true;
                text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                new_operations.push(op);
            }
            "ET" => {
                in_text_object = false;
                new_operations.push(op);
            }
            "Tm" if in_text_object && op.operands.len() >= 6 => {
                if let (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f)) = (
                    get_number(&op.operands[0]),
                    get_number(&op.operands[1]),
                    get_number(&op.operands[2]),
                    get_number(&op.operands[3]),
                    get_number(&op.operands[4]),
                    get_number(&op.operands[5]),
                ) {
                    text_matrix = [a, b, c, d, e, f];
                    line_matrix = text_matrix;
                }
                new_operations.push(op);
            }
            "Td" | "TD" if in_text_object && op.operands.len() >= 2 => {
                if let (Some(tx), Some(ty)) =
                    (get_number(&op.operands[0]), get_number(&op.operands[1]))
                {
                    line_matrix[4] += tx;
                    line_matrix[5] += ty;
                    text_matrix = line_matrix;
                }
                new_operations.push(op);
            }
            "Tf" if op.operands.len() >= 2 => {
                if let Some(size) = get_number(&op.operands[1]) {
                    font_size = size.abs();
                }
                new_operations.push(op);
            }
            "Tj" | "'" if in_text_object => {
                let user_x = ctm[0] * text_matrix[4] + ctm[2] * text_matrix[5] + ctm[4];
                let user_y = ctm[1] * text_matrix[4] + ctm[3] * text_matrix[5] + ctm[5];

                let (text_bytes, str_format) =
                    if let Some(Object::String(s, fmt)) = op.operands.first() {
                        (s.clone(), *fmt)
                    } else {
                        (vec![], lopdf::StringFormat::Literal)
                    };

                let (redacted_text, any_redacted) =
                    redact_text_chars(&text_bytes, user_x, user_y, font_size, masks);

                if any_redacted {
                    log::debug!(
                        "[内容流脱敏] {} {:?} -> {:?}",
                        operator,
                        String::from_utf8_lossy(&text_bytes),
                        String::from_utf8_lossy(&redacted_text)
                    );
                    new_operations.push(Operation::new(
                        operator,
                        vec![Object::String(redacted_text, str_format)],
                    ));
                } else {
                    new_operations.push(op);
                }
            }
            "TJ" if in_text_object => {
                let mut current_x = ctm[0] * text_matrix[4] + ctm[2] * text_matrix[5] + ctm[4];
                let user_y = ctm[1] * text_matrix[4] + ctm[3] * text_matrix[5] + ctm[5];

                let mut new_array: Vec<Object> = Vec::new();
                let mut any_redacted = false;

                if let Some(Object::Array(arr)) = op.operands.first() {
                    for item in arr {
                        match item {
                            Object::String(s, fmt) => {
                                let (redacted, redacted_this) =
                                    redact_text_chars(s, current_x, user_y, font_size, masks);
                                if redacted_this {
                                    any_redacted = true;
                                }
                                current_x += estimate_text_width(s, font_size);
                                new_array.push(Object::String(redacted, *fmt));
                            }
                            Object::Integer(n) => {
                                current_x -= (*n as f32) / 1000.0 * font_size;
                                new_array.push(item.clone());
                            }
                            Object::Real(n) => {
                                current_x -= n / 1000.0 * font_size;
                                new_array.push(item.clone());
                            }
                            _ => {
                                new_array.push(item.clone());
                            }
                        }
                    }
                }

                if any_redacted {
                    new_operations.push(Operation::new("TJ", vec![Object::Array(new_array)]));
                } else {
                    new_operations.push(op);
                }
            }
            "\"" if in_text_object && op.operands.len() >= 3 => {
                let user_x = ctm[0] * text_matrix[4] + ctm[2] * text_matrix[5] + ctm[4];
                let user_y = ctm[1] * text_matrix[4] + ctm[3] * text_matrix[5] + ctm[5];

                let (text_bytes, str_format) = if let Object::String(s, fmt) = &op.operands[2] {
                    (s.clone(), *fmt)
                } else {
                    (vec![], lopdf::StringFormat::Literal)
                };

                let (redacted_text, any_redacted) =
                    redact_text_chars(&text_bytes, user_x, user_y, font_size, masks);

                if any_redacted {
                    let mut new_operands = op.operands.clone();
                    new_operands[2] = Object::String(redacted_text, str_format);
                    new_operations.push(Operation::new("\"", new_operands));
                } else {
                    new_operations.push(op);
                }
            }
            _ => {
                new_operations.push(op);
            }
        }
    }

    let new_content = Content {
        operations: new_operations,
    };
    new_content.encode().map_err(|e| e.to_string())
}

/// 在内容流末尾追加不透明黑色矩形填充
pub fn add_black_overlay(content_data: &[u8], masks: &[MaskRect]) -> Result<Vec<u8>, String> {
    let content = Content::decode(content_data).map_err(|e| e.to_string())?;
    let mut new_operations = content.operations;

    new_operations.push(Operation::new("q", vec![]));

    // 填充与描边都设为黑色
    new_operations.push(Operation::new(
        "rg",
        vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
    ));
    new_operations.push(Operation::new(
        "RG",
        vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
    ));

    for rect in masks {
        new_operations.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ));
        new_operations.push(Operation::new("f", vec![]));
    }

    new_operations.push(Operation::new("Q", vec![]));

    let new_content = Content {
        operations: new_operations,
    };
    new_content.encode().map_err(|e| e.to_string())
}

// ============ 回退文本提取 ============

/// 从内容流中提取纯文本（括号字符串与尖括号十六进制字符串）
pub fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();

    let mut in_literal = false; // (...)
    let mut in_hex = false; // <...>
    let mut escape_next = false;
    let mut current = String::new();
    let mut hex_buf = String::new();

    for ch in content_str.chars() {
        if escape_next {
            escape_next = false;
            if in_literal {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '\\' if in_literal => {
                escape_next = true;
                current.push('\\');
            }
            '(' if !in_literal && !in_hex => {
                in_literal = true;
                current.clear();
            }
            ')' if in_literal => {
                in_literal = false;
                let decoded = decode_pdf_string(&current);
                if !decoded.trim().is_empty() {
                    text.push_str(&decoded);
                    text.push(' ');
                }
            }
            '<' if !in_literal && !in_hex => {
                in_hex = true;
                hex_buf.clear();
            }
            '>' if in_hex => {
                in_hex = false;
                let decoded = decode_hex_string(&hex_buf);
                if !decoded.trim().is_empty() {
                    text.push_str(&decoded);
                    text.push(' ');
                }
            }
            _ if in_literal => {
                current.push(ch);
            }
            _ if in_hex => {
                if ch.is_ascii_hexdigit() {
                    hex_buf.push(ch);
                }
            }
            _ => {}
        }
    }

    text
}

/// 解码 PDF 字面字符串（处理转义与八进制序列）
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }

        let next = match chars.next() {
            Some(c) => c,
            None => break,
        };
        match next {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            '\\' => result.push('\\'),
            '(' => result.push('('),
            ')' => result.push(')'),
            '0'..='7' => {
                // 八进制转义 \nnn，最多三位
                let mut octal = String::new();
                octal.push(next);
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&c) if ('0'..='7').contains(&c) => {
                            octal.push(c);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Ok(val) = u8::from_str_radix(&octal, 8) {
                    if val < 128 {
                        result.push(val as char);
                    }
                }
            }
            other => result.push(other),
        }
    }

    result
}

/// 解码十六进制字符串。带 BOM 或高位字节全零时按 UTF-16BE，
/// 否则按 Latin-1 处理。
fn decode_hex_string(hex: &str) -> String {
    let hex_clean: String = hex.chars().filter(|c| c.is_ascii_hexdigit()).collect();

    let bytes: Vec<u8> = (0..hex_clean.len())
        .step_by(2)
        .filter_map(|i| {
            if i + 2 <= hex_clean.len() {
                u8::from_str_radix(&hex_clean[i..i + 2], 16).ok()
            } else {
                // 奇数长度按规范补 0
                u8::from_str_radix(&format!("{}0", &hex_clean[i..i + 1]), 16).ok()
            }
        })
        .collect();

    if bytes.len() >= 2 && bytes.len() % 2 == 0 {
        let has_bom = bytes[0] == 0xFE && bytes[1] == 0xFF;
        let high_bytes_zero = bytes.iter().step_by(2).all(|&b| b == 0);

        if has_bom || high_bytes_zero {
            let payload = if has_bom { &bytes[2..] } else { &bytes[..] };
            let u16_vec: Vec<u16> = payload
                .chunks(2)
                .filter(|c| c.len() == 2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();

            if let Ok(decoded) = String::from_utf16(&u16_vec) {
                if decoded
                    .chars()
                    .all(|c| !c.is_control() || c == '\n' || c == '\r' || c == '\t')
                {
                    return decoded;
                }
            }
        }
    }

    let mut result = String::new();
    for &b in &bytes {
        if (32..127).contains(&b) {
            result.push(b as char);
        } else if b >= 128 {
            result.push(char::from_u32(b as u32).unwrap_or('?'));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn text_content(ops: Vec<Operation>) -> Vec<u8> {
        Content { operations: ops }.encode().unwrap()
    }

    fn tj(text: &str) -> Operation {
        Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        )
    }

    fn tm(x: f32, y: f32) -> Operation {
        Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(x),
                Object::Real(y),
            ],
        )
    }

    #[test]
    fn test_extract_text_literal_strings() {
        let data = text_content(vec![
            Operation::new("BT", vec![]),
            tj("Hello"),
            tj("World"),
            Operation::new("ET", vec![]),
        ]);
        let text = extract_text_from_content(&data);
        assert_eq!(text, "Hello World ");
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_pdf_string(r"a\(b\)c"), "a(b)c");
        assert_eq!(decode_pdf_string(r"line\nbreak"), "line\nbreak");
        assert_eq!(decode_pdf_string(r"\101\102"), "AB");
    }

    #[test]
    fn test_decode_hex_latin() {
        assert_eq!(decode_hex_string("48656C6C6F"), "Hello");
    }

    #[test]
    fn test_decode_hex_utf16() {
        // UTF-16BE 高位字节全零
        assert_eq!(decode_hex_string("00480069"), "Hi");
        // 带 BOM
        assert_eq!(decode_hex_string("FEFF00480069"), "Hi");
    }

    #[test]
    fn test_redact_replaces_masked_text_with_spaces() {
        let data = text_content(vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(12.0)]),
            tm(100.0, 700.0),
            tj("SECRET"),
            tm(100.0, 100.0),
            tj("public"),
            Operation::new("ET", vec![]),
        ]);

        let masks = [MaskRect {
            x: 95.0,
            y: 690.0,
            width: 80.0,
            height: 20.0,
        }];
        let out = process_content_stream(&data, &masks).unwrap();

        let decoded = Content::decode(&out).unwrap();
        let strings: Vec<String> = decoded
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(s, _)) => Some(String::from_utf8_lossy(s).to_string()),
                _ => None,
            })
            .collect();

        assert_eq!(strings.len(), 2);
        assert_eq!(strings[0], "      ");
        assert_eq!(strings[1], "public");

        // 改写后的流里不再含有原文
        assert!(!extract_text_from_content(&out).contains("SECRET"));
    }

    #[test]
    fn test_redact_untouched_without_masks() {
        let data = text_content(vec![
            Operation::new("BT", vec![]),
            tm(100.0, 700.0),
            tj("keep me"),
            Operation::new("ET", vec![]),
        ]);
        let out = process_content_stream(&data, &[]).unwrap();
        assert!(extract_text_from_content(&out).contains("keep me"));
    }

    #[test]
    fn test_black_overlay_appends_fill_ops() {
        let data = text_content(vec![
            Operation::new("BT", vec![]),
            tj("text"),
            Operation::new("ET", vec![]),
        ]);
        let masks = [MaskRect {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
        }];
        let out = add_black_overlay(&data, &masks).unwrap();
        let decoded = Content::decode(&out).unwrap();

        let ops: Vec<&str> = decoded
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        assert!(ops.contains(&"re"));
        assert!(ops.contains(&"f"));
        // 原有文字操作保留，矩形在其后绘制
        assert!(ops.contains(&"Tj"));
        assert_eq!(ops.last(), Some(&"Q"));
    }
}
