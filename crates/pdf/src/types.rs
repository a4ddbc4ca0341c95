use serde::{Deserialize, Serialize};

/// 单页文本提取结果
#[derive(Debug, Clone)]
pub struct PageText {
    /// 页索引，从 0 开始
    pub index: usize,
    pub text: String,
    /// 本页提取失败时的错误信息
    pub error: Option<String>,
}

/// 页面相对坐标的遮盖区域（0-1，原点在左上角）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Mask {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// PDF 坐标系下的遮盖矩形（单位 pt，原点在左下角）
#[derive(Debug, Clone, Copy)]
pub struct MaskRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl MaskRect {
    /// 检查文字边界框是否与遮盖区域相交（留 5pt 容差）
    pub fn intersects_text_bbox(
        &self,
        text_x: f32,
        text_y: f32,
        text_width: f32,
        text_height: f32,
    ) -> bool {
        let text_left = text_x;
        let text_right = text_x + text_width;
        let text_bottom = text_y;
        let text_top = text_y + text_height;

        let margin: f32 = 5.0;
        let mask_left = self.x - margin;
        let mask_right = self.x + self.width + margin;
        let mask_bottom = self.y - margin;
        let mask_top = self.y + self.height + margin;

        let x_overlap = text_left < mask_right && text_right > mask_left;
        let y_overlap = text_bottom < mask_top && text_top > mask_bottom;

        x_overlap && y_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_within_margin() {
        let mask = MaskRect {
            x: 100.0,
            y: 700.0,
            width: 50.0,
            height: 12.0,
        };
        assert!(mask.intersects_text_bbox(110.0, 702.0, 20.0, 10.0));
        // 5pt 容差内仍算相交
        assert!(mask.intersects_text_bbox(152.0, 700.0, 20.0, 10.0));
        assert!(!mask.intersects_text_bbox(300.0, 700.0, 20.0, 10.0));
        assert!(!mask.intersects_text_bbox(110.0, 600.0, 20.0, 10.0));
    }
}
