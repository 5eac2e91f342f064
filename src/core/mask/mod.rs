//! 红色物体隔离：HSV 多区间阈值、掩膜融合与形态学清理
//!
//! 处理流程：
//! 1. 色彩空间转换 - 原生 BGR/RGB 转为 HSV
//! 2. 区间阈值 - 每个色相区间生成一张二值掩膜
//! 3. 掩膜融合 - 按位或合并
//! 4. 形态学清理 - 默认腐蚀、膨胀、膨胀、腐蚀

pub mod classifier;
pub mod error;
pub mod hsv;
pub mod morphology;
pub mod range;

pub use classifier::{classify, fuse, range_mask, ColorMaskClassifier, MaskConfig};
pub use error::MaskError;
pub use hsv::{rgb_to_hsv, to_hsv, HsvFrame};
pub use morphology::{KernelShape, KernelSpec, MorphOp, StructuringElement, OPEN_THEN_CLOSE};
pub use range::{red_ranges, HueRange, RED_HIGH, RED_LOW};
