//! 二值形态学：结构元素、腐蚀、膨胀及其顺序组合

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::MaskError;
use crate::core::video::MaskFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelShape {
    Rect,
    Cross,
    Ellipse,
}

/// 结构元素的可配置描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub shape: KernelShape,
    pub width: u32,
    pub height: u32,
}

impl KernelSpec {
    pub const fn rect(width: u32, height: u32) -> Self {
        Self {
            shape: KernelShape::Rect,
            width,
            height,
        }
    }
}

impl Default for KernelSpec {
    fn default() -> Self {
        Self::rect(7, 7)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MorphOp {
    Erode,
    Dilate,
}

/// 先开运算（腐蚀→膨胀）去除噪点，再闭运算（膨胀→腐蚀）填补空洞。顺序敏感。
pub const OPEN_THEN_CLOSE: [MorphOp; 4] = [
    MorphOp::Erode,
    MorphOp::Dilate,
    MorphOp::Dilate,
    MorphOp::Erode,
];

/// 构造后不可变，可在所有帧之间只读共享
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    spec: KernelSpec,
    anchor: (i32, i32),
    /// 相对锚点的有效偏移
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    pub fn new(spec: KernelSpec) -> Result<Self, MaskError> {
        if spec.width == 0 || spec.height == 0 {
            return Err(MaskError::InvalidKernel {
                width: spec.width,
                height: spec.height,
            });
        }

        let w = spec.width as i32;
        let h = spec.height as i32;
        let anchor = (w / 2, h / 2);
        let mut offsets = Vec::new();

        for row in 0..h {
            let (start, end) = Self::row_span(spec.shape, row, w, h, anchor);
            for col in start..end {
                offsets.push((col - anchor.0, row - anchor.1));
            }
        }

        Ok(Self {
            spec,
            anchor,
            offsets,
        })
    }

    pub fn rect(width: u32, height: u32) -> Result<Self, MaskError> {
        Self::new(KernelSpec::rect(width, height))
    }

    /// 每一行中被选中的列区间 [start, end)
    fn row_span(shape: KernelShape, row: i32, w: i32, h: i32, anchor: (i32, i32)) -> (i32, i32) {
        match shape {
            KernelShape::Rect => (0, w),
            KernelShape::Cross if row == anchor.1 => (0, w),
            KernelShape::Cross => (anchor.0, anchor.0 + 1),
            KernelShape::Ellipse => {
                let r = h / 2;
                let c = w / 2;
                let dy = row - r;
                if dy.abs() > r {
                    return (0, 0);
                }
                let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
                let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
                ((c - dx).max(0), (c + dx + 1).min(w))
            }
        }
    }

    pub fn spec(&self) -> KernelSpec {
        self.spec
    }

    pub fn anchor(&self) -> (i32, i32) {
        self.anchor
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn contains(&self, col: u32, row: u32) -> bool {
        let offset = (col as i32 - self.anchor.0, row as i32 - self.anchor.1);
        self.offsets.contains(&offset)
    }

    /// 1×1 元素，形态学操作退化为恒等变换
    pub fn is_identity(&self) -> bool {
        self.offsets == [(0, 0)]
    }
}

pub fn erode(mask: &MaskFrame, element: &StructuringElement) -> MaskFrame {
    // 图像外的邻居不参与计算，边界不会被腐蚀
    neighborhood_filter(mask, element, u8::MAX, |acc, v| acc.min(v))
}

pub fn dilate(mask: &MaskFrame, element: &StructuringElement) -> MaskFrame {
    neighborhood_filter(mask, element, u8::MIN, |acc, v| acc.max(v))
}

pub fn apply(mask: &MaskFrame, element: &StructuringElement, op: MorphOp) -> MaskFrame {
    match op {
        MorphOp::Erode => erode(mask, element),
        MorphOp::Dilate => dilate(mask, element),
    }
}

pub fn apply_sequence(mask: MaskFrame, element: &StructuringElement, ops: &[MorphOp]) -> MaskFrame {
    if element.is_identity() {
        return mask;
    }
    ops.iter().fold(mask, |current, &op| apply(&current, element, op))
}

fn neighborhood_filter<F>(mask: &MaskFrame, element: &StructuringElement, init: u8, combine: F) -> MaskFrame
where
    F: Fn(u8, u8) -> u8 + Sync,
{
    let w = mask.width as i32;
    let h = mask.height as i32;
    let mut out = vec![0u8; mask.data.len()];
    if w == 0 || h == 0 {
        return MaskFrame {
            width: mask.width,
            height: mask.height,
            data: out,
        };
    }

    out.par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i32;
            for (x, cell) in row.iter_mut().enumerate() {
                let x = x as i32;
                let mut acc = init;
                for &(dx, dy) in &element.offsets {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    acc = combine(acc, mask.data[(ny * w + nx) as usize]);
                }
                *cell = acc;
            }
        });

    MaskFrame {
        width: mask.width,
        height: mask.height,
        data: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> MaskFrame {
        MaskFrame::zeros(width, height)
    }

    fn with_blob(width: u32, height: u32, x0: u32, y0: u32, size: u32) -> MaskFrame {
        let mut mask = blank(width, height);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                mask.set(x, y, MaskFrame::ON);
            }
        }
        mask
    }

    fn shape_rows(element: &StructuringElement) -> Vec<String> {
        let spec = element.spec();
        (0..spec.height)
            .map(|row| {
                (0..spec.width)
                    .map(|col| if element.contains(col, row) { '1' } else { '0' })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_rect_element() {
        let element = StructuringElement::rect(7, 7).unwrap();
        assert_eq!(element.len(), 49);
        assert_eq!(element.anchor(), (3, 3));
        assert!(!element.is_identity());
    }

    #[test]
    fn test_cross_element() {
        let element = StructuringElement::new(KernelSpec {
            shape: KernelShape::Cross,
            width: 3,
            height: 3,
        })
        .unwrap();
        assert_eq!(shape_rows(&element), vec!["010", "111", "010"]);
    }

    #[test]
    fn test_ellipse_element() {
        let element = StructuringElement::new(KernelSpec {
            shape: KernelShape::Ellipse,
            width: 5,
            height: 5,
        })
        .unwrap();
        assert_eq!(
            shape_rows(&element),
            vec!["00100", "11111", "11111", "11111", "00100"]
        );
    }

    #[test]
    fn test_zero_sized_element_rejected() {
        assert_eq!(
            StructuringElement::rect(0, 3),
            Err(MaskError::InvalidKernel { width: 0, height: 3 })
        );
    }

    #[test]
    fn test_identity_element_is_noop() {
        let element = StructuringElement::rect(1, 1).unwrap();
        assert!(element.is_identity());

        let mask = MaskFrame::from_rows(&[[255u8, 0], [0, 255]]).unwrap();
        assert_eq!(erode(&mask, &element), mask);
        assert_eq!(dilate(&mask, &element), mask);
        assert_eq!(apply_sequence(mask.clone(), &element, &OPEN_THEN_CLOSE), mask);
    }

    #[test]
    fn test_erode_and_dilate_three_by_three() {
        let element = StructuringElement::rect(3, 3).unwrap();
        let mask = with_blob(9, 9, 2, 2, 5);

        let eroded = erode(&mask, &element);
        assert_eq!(eroded, with_blob(9, 9, 3, 3, 3));

        let dilated = dilate(&mask, &element);
        assert_eq!(dilated, with_blob(9, 9, 1, 1, 7));
    }

    #[test]
    fn test_border_does_not_erode() {
        let element = StructuringElement::rect(3, 3).unwrap();
        let mut full = blank(4, 4);
        full.data.fill(MaskFrame::ON);

        assert_eq!(erode(&full, &element), full);
    }

    #[test]
    fn test_all_zero_stays_zero() {
        let element = StructuringElement::rect(7, 7).unwrap();
        let mask = blank(32, 24);
        let cleaned = apply_sequence(mask.clone(), &element, &OPEN_THEN_CLOSE);
        assert!(cleaned.is_all_off());
    }

    #[test]
    fn test_single_pixel_noise_removed() {
        let element = StructuringElement::rect(7, 7).unwrap();
        let mut mask = blank(32, 32);
        mask.set(16, 16, MaskFrame::ON);
        mask.set(3, 28, MaskFrame::ON);

        let cleaned = apply_sequence(mask, &element, &OPEN_THEN_CLOSE);
        assert!(cleaned.is_all_off());
    }

    #[test]
    fn test_large_blob_survives() {
        let element = StructuringElement::rect(7, 7).unwrap();
        let mask = with_blob(48, 48, 12, 12, 20);

        let cleaned = apply_sequence(mask.clone(), &element, &OPEN_THEN_CLOSE);
        assert_eq!(cleaned, mask);
    }

    #[test]
    fn test_small_hole_filled() {
        let element = StructuringElement::rect(7, 7).unwrap();
        let mut mask = with_blob(48, 48, 12, 12, 20);
        mask.set(20, 20, MaskFrame::OFF);
        mask.set(21, 20, MaskFrame::OFF);

        let cleaned = apply_sequence(mask, &element, &OPEN_THEN_CLOSE);
        assert_eq!(cleaned, with_blob(48, 48, 12, 12, 20));
    }

    #[test]
    fn test_cleanup_idempotent_on_clean_mask() {
        let element = StructuringElement::rect(7, 7).unwrap();
        let mut mask = with_blob(64, 64, 5, 5, 16);
        for y in 30..50 {
            for x in 36..60 {
                mask.set(x, y, MaskFrame::ON);
            }
        }

        let once = apply_sequence(mask, &element, &OPEN_THEN_CLOSE);
        let twice = apply_sequence(once.clone(), &element, &OPEN_THEN_CLOSE);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_order_matters() {
        let element = StructuringElement::rect(3, 3).unwrap();
        // 两个 2 列宽的竖条，中间隔一列
        let mut mask = blank(12, 10);
        for y in 2..5 {
            for x in [2, 3, 5, 6] {
                mask.set(x, y, MaskFrame::ON);
            }
        }

        let open_close = apply_sequence(mask.clone(), &element, &OPEN_THEN_CLOSE);
        assert!(open_close.is_all_off());

        let close_open = apply_sequence(
            mask,
            &element,
            &[MorphOp::Dilate, MorphOp::Erode, MorphOp::Erode, MorphOp::Dilate],
        );
        let mut merged = blank(12, 10);
        for y in 2..5 {
            for x in 2..7 {
                merged.set(x, y, MaskFrame::ON);
            }
        }
        assert_eq!(close_open, merged);
    }
}
