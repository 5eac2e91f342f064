use serde::{Deserialize, Serialize};

/// OpenCV 8 位 HSV 编码下色相的最大值（0-179）
pub const HUE_MAX: u8 = 179;

/// HSV 空间中的一个闭区间接受域
///
/// 红色跨越色相环的 0/180 边界，单个连续区间无法表达，因此分类器接受多个区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueRange {
    pub low_hue: u8,
    pub high_hue: u8,
    pub low_sat: u8,
    pub high_sat: u8,
    pub low_val: u8,
    pub high_val: u8,
}

impl HueRange {
    pub const fn new(hue: (u8, u8), sat: (u8, u8), val: (u8, u8)) -> Self {
        Self {
            low_hue: hue.0,
            high_hue: hue.1,
            low_sat: sat.0,
            high_sat: sat.1,
            low_val: val.0,
            high_val: val.1,
        }
    }

    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        h >= self.low_hue
            && h <= self.high_hue
            && s >= self.low_sat
            && s <= self.high_sat
            && v >= self.low_val
            && v <= self.high_val
    }

    pub fn lower(&self) -> [u8; 3] {
        [self.low_hue, self.low_sat, self.low_val]
    }

    pub fn upper(&self) -> [u8; 3] {
        [self.high_hue, self.high_sat, self.high_val]
    }
}

/// 色相环高端的红色（品红侧）
pub const RED_HIGH: HueRange = HueRange::new((165, HUE_MAX), (230, 255), (64, 255));
/// 色相环低端的红色（橙色侧）
pub const RED_LOW: HueRange = HueRange::new((0, 30), (230, 255), (64, 255));

pub fn red_ranges() -> Vec<HueRange> {
    vec![RED_HIGH, RED_LOW]
}
