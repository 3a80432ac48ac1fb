//! 点云数据结构
//! Point cloud data structures

use serde::{Deserialize, Serialize};

/// 三维点 (相机坐标系, 米)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn nan() -> Self {
        Self::new(f32::NAN, f32::NAN, f32::NAN)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 点云帧
///
/// 有序点云 (`height > 1`) 与图像像素一一对应, 按行存储:
/// 像素 (u, v) 的点位于 `points[v * width + u]`.
/// 无序点云 `height == 1`, `width == points.len()`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub frame_id: String,
    pub width: u32,
    pub height: u32,
    pub points: Vec<Point3>,
}

impl PointCloud {
    /// 有序点云
    pub fn organized(frame_id: impl Into<String>, width: u32, height: u32, points: Vec<Point3>) -> Self {
        Self {
            frame_id: frame_id.into(),
            width,
            height,
            points,
        }
    }

    /// 无序点云
    ///
    /// 点数超过 `u32::MAX` 时 `width` 饱和为 `u32::MAX`, 数据只按 `points` 访问.
    pub fn unorganized(frame_id: impl Into<String>, points: Vec<Point3>) -> Self {
        Self {
            frame_id: frame_id.into(),
            width: row_width(points.len()),
            height: 1,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 无数据
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_organized(&self) -> bool {
        self.height > 1 && self.points.len() == (self.width as usize) * (self.height as usize)
    }

    /// 像素 (u, v) 对应的点, 越界返回 None
    pub fn at(&self, u: u32, v: u32) -> Option<&Point3> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get(v as usize * self.width as usize + u as usize)
    }

    /// 轴对齐包围盒 (min, max), 只统计有效点
    pub fn extent(&self) -> Option<(Point3, Point3)> {
        let mut finite = self.points.iter().filter(|p| p.is_finite());
        let first = *finite.next()?;
        Some(finite.fold((first, first), |(lo, hi), p| {
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }

    /// 有效点的质心
    pub fn centroid(&self) -> Option<Point3> {
        let (mut sx, mut sy, mut sz, mut n) = (0.0f64, 0.0f64, 0.0f64, 0usize);
        for p in self.points.iter().filter(|p| p.is_finite()) {
            sx += p.x as f64;
            sy += p.y as f64;
            sz += p.z as f64;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(Point3::new((sx / n) as f32, (sy / n) as f32, (sz / n) as f32))
    }
}

fn row_width(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32) -> PointCloud {
        let points = (0..height)
            .flat_map(|v| (0..width).map(move |u| Point3::new(u as f32, v as f32, 1.0)))
            .collect();
        PointCloud::organized("camera", width, height, points)
    }

    #[test]
    fn test_at_row_major() {
        let cloud = grid(4, 3);
        assert!(cloud.is_organized());
        assert_eq!(cloud.at(2, 1), Some(&Point3::new(2.0, 1.0, 1.0)));
        assert_eq!(cloud.at(4, 0), None);
        assert_eq!(cloud.at(0, 3), None);
    }

    #[test]
    fn test_unorganized() {
        let cloud = PointCloud::unorganized("camera", vec![Point3::default(); 5]);
        assert!(!cloud.is_organized());
        assert_eq!(cloud.width, 5);
    }

    #[test]
    fn test_row_width_saturates() {
        assert_eq!(row_width(0), 0);
        assert_eq!(row_width(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(row_width(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn test_extent_and_centroid_skip_nan() {
        let cloud = PointCloud::unorganized(
            "camera",
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::nan(),
                Point3::new(2.0, 4.0, 3.0),
            ],
        );
        let (lo, hi) = cloud.extent().unwrap();
        assert_eq!(lo, Point3::new(0.0, 0.0, 1.0));
        assert_eq!(hi, Point3::new(2.0, 4.0, 3.0));
        assert_eq!(cloud.centroid().unwrap(), Point3::new(1.0, 2.0, 2.0));
        assert!(PointCloud::default().centroid().is_none());
    }
}
