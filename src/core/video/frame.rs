use image::{DynamicImage, GrayImage, RgbImage};

use super::error::VideoError;

/// 三通道像素的排列顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    /// 设备原生顺序（OpenCV 默认）
    Bgr,
    Rgb,
}

/// 彩色帧：交错排列的 8 位三通道数据
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub order: PixelOrder,
    pub frame_number: u64,
}

impl ColorFrame {
    pub const CHANNELS: usize = 3;

    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        order: PixelOrder,
        frame_number: u64,
    ) -> Result<Self, VideoError> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(VideoError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            order,
            frame_number,
        })
    }

    /// 纯色帧，`pixel` 按 `order` 解释
    pub fn filled(width: u32, height: u32, pixel: [u8; 3], order: PixelOrder) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self {
            width,
            height,
            data,
            order,
            frame_number: 0,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 3]) {
        let idx = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        self.data[idx..idx + 3].copy_from_slice(&pixel);
    }

    /// 以 `RgbImage` 形式借出缓冲区（通道顺序保持不变）
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn from_image(img: RgbImage, order: PixelOrder, frame_number: u64) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
            order,
            frame_number,
        }
    }
}

/// 单通道二值掩膜，像素取值 {0, 255}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl MaskFrame {
    pub const ON: u8 = 255;
    pub const OFF: u8 = 0;

    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Self::OFF; width as usize * height as usize],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// 按行构造，便于测试书写 `[[255, 0], [0, 255]]`
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0) as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            if row.as_ref().len() != width as usize {
                return None;
            }
            data.extend_from_slice(row.as_ref());
        }
        Self::from_raw(width, height, data)
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&v| v != Self::OFF).count()
    }

    pub fn is_all_off(&self) -> bool {
        self.data.iter().all(|&v| v == Self::OFF)
    }

    pub fn to_gray_image(&self) -> Option<GrayImage> {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// 将单通道复制到三个通道，用于与原图并排显示
    pub fn to_color(&self, order: PixelOrder, frame_number: u64) -> Option<ColorFrame> {
        let rgb = DynamicImage::ImageLuma8(self.to_gray_image()?).to_rgb8();
        Some(ColorFrame::from_image(rgb, order, frame_number))
    }
}
