use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::MaskError;
use super::hsv::{self, HsvFrame};
use super::morphology::{self, KernelSpec, MorphOp, StructuringElement, OPEN_THEN_CLOSE};
use super::range::{self, HueRange};
use crate::core::video::{ColorFrame, MaskFrame};

/// 分类器配置：色相区间表、结构元素与形态学步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub ranges: Vec<HueRange>,
    pub kernel: KernelSpec,
    pub sequence: Vec<MorphOp>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            ranges: range::red_ranges(),
            kernel: KernelSpec::default(),
            sequence: OPEN_THEN_CLOSE.to_vec(),
        }
    }
}

impl MaskConfig {
    /// 更窄的红色色相，较小的核，适合低分辨率视频
    pub fn strict_red() -> Self {
        Self {
            ranges: vec![
                HueRange::new((170, range::HUE_MAX), (200, 255), (80, 255)),
                HueRange::new((0, 10), (200, 255), (80, 255)),
            ],
            kernel: KernelSpec::rect(5, 5),
            sequence: OPEN_THEN_CLOSE.to_vec(),
        }
    }

    pub fn with_ranges(ranges: Vec<HueRange>) -> Self {
        Self {
            ranges,
            ..Self::default()
        }
    }
}

/// 颜色掩膜分类器：无状态，构造后可在帧之间只读共享
#[derive(Debug, Clone)]
pub struct ColorMaskClassifier {
    ranges: Vec<HueRange>,
    element: StructuringElement,
    sequence: Vec<MorphOp>,
}

impl ColorMaskClassifier {
    pub fn new(config: &MaskConfig) -> Result<Self, MaskError> {
        let element = StructuringElement::new(config.kernel)?;
        Self::with_element(config.ranges.clone(), element, config.sequence.clone())
    }

    pub fn with_element(
        ranges: Vec<HueRange>,
        element: StructuringElement,
        sequence: Vec<MorphOp>,
    ) -> Result<Self, MaskError> {
        if ranges.is_empty() {
            return Err(MaskError::EmptyRanges);
        }
        Ok(Self {
            ranges,
            element,
            sequence,
        })
    }

    pub fn ranges(&self) -> &[HueRange] {
        &self.ranges
    }

    pub fn element(&self) -> &StructuringElement {
        &self.element
    }

    pub fn sequence(&self) -> &[MorphOp] {
        &self.sequence
    }

    /// 每个区间各自的隶属掩膜（形态学处理前）
    pub fn range_masks(&self, frame: &ColorFrame) -> Result<Vec<MaskFrame>, MaskError> {
        let hsv = hsv::to_hsv(frame)?;
        Ok(self.ranges.iter().map(|r| range_mask(&hsv, r)).collect())
    }

    /// 所有区间掩膜按位或后的结果（形态学处理前）
    pub fn fused_mask(&self, frame: &ColorFrame) -> Result<MaskFrame, MaskError> {
        let masks = self.range_masks(frame)?;
        Ok(fuse(frame.width, frame.height, &masks))
    }

    pub fn classify(&self, frame: &ColorFrame) -> Result<MaskFrame, MaskError> {
        let fused = self.fused_mask(frame)?;
        let cleaned = morphology::apply_sequence(fused, &self.element, &self.sequence);
        debug!(
            "frame {}: {} of {} pixels matched",
            frame.frame_number,
            cleaned.count_on(),
            frame.pixel_count()
        );
        Ok(cleaned)
    }
}

/// 以给定区间与结构元素对单帧分类，使用默认的开-闭运算顺序
pub fn classify(
    frame: &ColorFrame,
    ranges: &[HueRange],
    element: &StructuringElement,
) -> Result<MaskFrame, MaskError> {
    if ranges.is_empty() {
        return Err(MaskError::EmptyRanges);
    }
    let hsv = hsv::to_hsv(frame)?;
    let masks: Vec<MaskFrame> = ranges.iter().map(|r| range_mask(&hsv, r)).collect();
    let fused = fuse(frame.width, frame.height, &masks);
    Ok(morphology::apply_sequence(fused, element, &OPEN_THEN_CLOSE))
}

/// 闭区间阈值：三个通道都在范围内为 255，否则为 0
pub fn range_mask(hsv: &HsvFrame, range: &HueRange) -> MaskFrame {
    let mut data = vec![MaskFrame::OFF; hsv.width as usize * hsv.height as usize];
    let row_len = hsv.width as usize;
    data.par_chunks_mut(row_len.max(1))
        .zip(hsv.data.par_chunks((row_len * 3).max(1)))
        .for_each(|(dst, src)| {
            for (out, px) in dst.iter_mut().zip(src.chunks_exact(3)) {
                if range.contains(px[0], px[1], px[2]) {
                    *out = MaskFrame::ON;
                }
            }
        });
    MaskFrame {
        width: hsv.width,
        height: hsv.height,
        data,
    }
}

/// 从全零累加器开始逐个按位或，结果与区间顺序无关
pub fn fuse(width: u32, height: u32, masks: &[MaskFrame]) -> MaskFrame {
    let mut acc = MaskFrame::zeros(width, height);
    for mask in masks {
        for (a, &m) in acc.data.iter_mut().zip(&mask.data) {
            *a |= m;
        }
    }
    acc
}
