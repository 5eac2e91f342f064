//! BGR/RGB → HSV 转换，采用 OpenCV 8 位约定（H: 0-179, S/V: 0-255）

use rayon::prelude::*;

use super::error::MaskError;
use crate::core::video::{ColorFrame, PixelOrder};

const HSV_SHIFT: u32 = 12;
const HALF: i32 = 1 << (HSV_SHIFT - 1);
/// 8 位编码下色相整圈为 180
const HUE_RANGE: i32 = 180;

/// HSV 编码的三通道帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsvFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl HsvFrame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

/// 单像素转换。除法使用与 OpenCV 相同的定点倒数表，保证阈值边界处结果一致。
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0 {
        0
    } else {
        let sdiv = ((255 << HSV_SHIFT) as f64 / v as f64).round() as i32;
        (diff * sdiv + HALF) >> HSV_SHIFT
    };

    let h = if diff == 0 {
        0
    } else {
        let raw = if v == r {
            g - b
        } else if v == g {
            b - r + 2 * diff
        } else {
            r - g + 4 * diff
        };
        let hdiv = ((HUE_RANGE << HSV_SHIFT) as f64 / (6.0 * diff as f64)).round() as i32;
        let h = (raw * hdiv + HALF) >> HSV_SHIFT;
        if h < 0 {
            h + HUE_RANGE
        } else {
            h
        }
    };

    [h as u8, s as u8, v as u8]
}

pub fn pixel_to_hsv(pixel: [u8; 3], order: PixelOrder) -> [u8; 3] {
    match order {
        PixelOrder::Bgr => rgb_to_hsv(pixel[2], pixel[1], pixel[0]),
        PixelOrder::Rgb => rgb_to_hsv(pixel[0], pixel[1], pixel[2]),
    }
}

/// 整帧转换，按行并行
pub fn to_hsv(frame: &ColorFrame) -> Result<HsvFrame, MaskError> {
    validate_color_frame(frame)?;

    let row_len = frame.width as usize * ColorFrame::CHANNELS;
    let mut data = vec![0u8; frame.data.len()];
    data.par_chunks_mut(row_len)
        .zip(frame.data.par_chunks(row_len))
        .for_each(|(dst, src)| {
            for (out, px) in dst.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
                out.copy_from_slice(&pixel_to_hsv([px[0], px[1], px[2]], frame.order));
            }
        });

    Ok(HsvFrame {
        width: frame.width,
        height: frame.height,
        data,
    })
}

pub(crate) fn validate_color_frame(frame: &ColorFrame) -> Result<(), MaskError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(MaskError::InvalidInput(format!(
            "zero-sized frame {}x{}",
            frame.width, frame.height
        )));
    }
    let pixels = frame.pixel_count();
    if frame.data.len() != pixels * ColorFrame::CHANNELS {
        return Err(MaskError::InvalidInput(format!(
            "expected {} channels for {} pixels, buffer holds {} bytes",
            ColorFrame::CHANNELS,
            pixels,
            frame.data.len()
        )));
    }
    Ok(())
}
