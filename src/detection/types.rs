/// 检测区域数据结构定义
/// Data structures for detection regions
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// 区域最小尺寸 (像素, 严格大于)
/// 小于等于该尺寸的检测框必然产生无效长方体
pub const MIN_REGION_SIZE: u32 = 70;

// ========== 数据结构 ==========

/// 检测区域 (Region of interest, 图像像素坐标)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

/// 区域边界 (区域 → 几何提取)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionBounds {
    pub xmin: u32,
    pub xmax: u32,
    pub ymin: u32,
    pub ymax: u32,
}

impl Region {
    pub fn new(x_offset: u32, y_offset: u32, width: u32, height: u32) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    pub fn xmin(&self) -> u32 {
        self.x_offset
    }

    pub fn xmax(&self) -> u32 {
        self.x_offset.saturating_add(self.width)
    }

    pub fn ymin(&self) -> u32 {
        self.y_offset
    }

    pub fn ymax(&self) -> u32 {
        self.y_offset.saturating_add(self.height)
    }

    pub fn bounds(&self) -> RegionBounds {
        RegionBounds {
            xmin: self.xmin(),
            xmax: self.xmax(),
            ymin: self.ymin(),
            ymax: self.ymax(),
        }
    }

    /// 宽高是否都严格大于阈值
    pub fn exceeds(&self, min_size: u32) -> bool {
        self.width > min_size && self.height > min_size
    }

    /// 若 `self` (列表中的框) 落在 `other` (待加入的框) 之内, 返回 true
    ///
    /// 比较的是偏移量与宽高, 不是真正的几何包含:
    /// 偏移更大且宽高更小即视为被包含, 不检查右下角.
    pub fn is_within(&self, other: &Region) -> bool {
        self.x_offset >= other.x_offset
            && self.y_offset >= other.y_offset
            && self.width <= other.width
            && self.height <= other.height
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) {}x{}",
            self.x_offset, self.y_offset, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let r = Region::new(10, 20, 100, 80);
        assert_eq!(
            r.bounds(),
            RegionBounds {
                xmin: 10,
                xmax: 110,
                ymin: 20,
                ymax: 100
            }
        );
    }

    #[test]
    fn test_exceeds_is_strict() {
        assert!(!Region::new(0, 0, 70, 100).exceeds(MIN_REGION_SIZE));
        assert!(!Region::new(0, 0, 100, 70).exceeds(MIN_REGION_SIZE));
        assert!(Region::new(0, 0, 71, 71).exceeds(MIN_REGION_SIZE));
    }

    #[test]
    fn test_is_within_uses_offset_and_extent() {
        let outer = Region::new(10, 10, 200, 200);
        assert!(Region::new(50, 50, 80, 80).is_within(&outer));
        assert!(!outer.is_within(&Region::new(50, 50, 80, 80)));

        // 右下角超出外框, 但按偏移/宽高比较仍视为包含
        let spill = Region::new(190, 190, 150, 150);
        assert!(spill.is_within(&outer));
        assert!(spill.xmax() > outer.xmax());
    }
}
