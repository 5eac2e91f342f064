//! 并排拼接：左半为原始帧，右半为展开为三通道的掩膜

use image::{imageops, RgbImage};

use super::error::PipelineError;
use crate::core::video::{ColorFrame, MaskFrame};

/// 原图与掩膜各自持有缓冲区，写出时拼接到新分配的画布
pub fn side_by_side(original: &ColorFrame, mask: &MaskFrame) -> Result<ColorFrame, PipelineError> {
    let index = original.frame_number;
    if original.dimensions() != (mask.width, mask.height) {
        return Err(PipelineError::DimensionMismatch {
            index,
            expected: original.dimensions(),
            actual: (mask.width, mask.height),
        });
    }

    let left = original.to_image().ok_or_else(|| PipelineError::InvalidFrame {
        index,
        reason: "color buffer does not match frame size".to_string(),
    })?;
    let right = mask
        .to_color(original.order, index)
        .and_then(|frame| frame.to_image())
        .ok_or_else(|| PipelineError::InvalidFrame {
            index,
            reason: "mask buffer does not match frame size".to_string(),
        })?;

    let (width, height) = original.dimensions();
    let mut canvas = RgbImage::new(width * 2, height);
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, width as i64, 0);

    Ok(ColorFrame::from_image(canvas, original.order, index))
}
