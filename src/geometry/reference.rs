//! 参考几何实现 (裁剪 + 质心)
//!
//! 不做平面分割与 PCA, 只用于在没有外部几何库时跑通整个节点.

use super::{CuboidExtractor, GeometryFault, Marker, MarkerKind, PointCloud, PoseAligner, Transform};
use crate::detection::RegionBounds;
use crate::pipeline::FrameState;

/// 按像素窗口裁剪有序点云
#[derive(Clone, Debug, Default)]
pub struct CropExtractor;

impl CropExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl CuboidExtractor for CropExtractor {
    fn extract(&mut self, cloud: &PointCloud, bounds: RegionBounds) -> Result<PointCloud, GeometryFault> {
        if cloud.is_empty() {
            return Err(GeometryFault::new(
                "CropExtractor::extract",
                "input point cloud has no data",
            ));
        }
        if !cloud.is_organized() {
            return Err(GeometryFault::new(
                "CropExtractor::extract",
                format!(
                    "point cloud is not organized ({}x{}, {} points)",
                    cloud.width,
                    cloud.height,
                    cloud.len()
                ),
            ));
        }

        // 窗口裁剪到点云尺寸内
        let xmax = bounds.xmax.min(cloud.width);
        let ymax = bounds.ymax.min(cloud.height);

        let mut points = Vec::new();
        for v in bounds.ymin..ymax {
            for u in bounds.xmin..xmax {
                if let Some(p) = cloud.at(u, v) {
                    if p.is_finite() {
                        points.push(*p);
                    }
                }
            }
        }

        Ok(PointCloud::unorganized(cloud.frame_id.clone(), points))
    }
}

/// 以质心为位置, 单位旋转, 标记尺寸为轴对齐包围盒
#[derive(Clone, Debug)]
pub struct CentroidAligner {
    frame_id: String,
    min_points: usize,
}

impl CentroidAligner {
    pub fn new(frame_id: impl Into<String>, min_points: usize) -> Self {
        Self {
            frame_id: frame_id.into(),
            min_points,
        }
    }
}

impl PoseAligner for CentroidAligner {
    fn align(&mut self, cuboid: &PointCloud, state: &mut FrameState) -> Result<(), GeometryFault> {
        let too_few = || {
            GeometryFault::new(
                "CentroidAligner::align",
                format!(
                    "not enough points to estimate pose ({} < {})",
                    cuboid.len(),
                    self.min_points
                ),
            )
        };

        if cuboid.len() < self.min_points {
            return Err(too_few());
        }
        let (centroid, (lo, hi)) = match (cuboid.centroid(), cuboid.extent()) {
            (Some(c), Some(e)) => (c, e),
            _ => return Err(too_few()),
        };

        let pose = Transform::from_translation(centroid.x as f64, centroid.y as f64, centroid.z as f64);
        let index = state.push_transform(pose);
        state.push_marker(Marker {
            id: index as u32,
            ns: "rvip".to_string(),
            frame_id: self.frame_id.clone(),
            kind: MarkerKind::Cube,
            pose,
            scale: [
                (hi.x - lo.x) as f64,
                (hi.y - lo.y) as f64,
                (hi.z - lo.z) as f64,
            ],
            color: [0.0, 1.0, 0.0, 0.5],
            text: None,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Region;
    use crate::geometry::Point3;

    fn grid(width: u32, height: u32) -> PointCloud {
        let points = (0..height)
            .flat_map(|v| {
                (0..width).map(move |u| {
                    // 左上角 10x10 无效
                    if u < 10 && v < 10 {
                        Point3::nan()
                    } else {
                        Point3::new(u as f32 * 0.01, v as f32 * 0.01, 1.0)
                    }
                })
            })
            .collect();
        PointCloud::organized("camera", width, height, points)
    }

    #[test]
    fn test_crop_counts_finite_points() {
        let cloud = grid(200, 100);
        let mut extractor = CropExtractor::new();

        let out = extractor.extract(&cloud, Region::new(20, 20, 10, 5).bounds()).unwrap();
        assert_eq!(out.len(), 50);

        // 无效像素被跳过
        let out = extractor.extract(&cloud, Region::new(0, 0, 10, 10).bounds()).unwrap();
        assert!(out.is_empty());

        // 越界部分被裁掉
        let out = extractor.extract(&cloud, Region::new(190, 90, 100, 100).bounds()).unwrap();
        assert_eq!(out.len(), 100);
    }

    #[test]
    fn test_crop_faults_on_empty_or_unorganized() {
        let mut extractor = CropExtractor::new();
        let bounds = Region::new(0, 0, 100, 100).bounds();

        let fault = extractor.extract(&PointCloud::default(), bounds).unwrap_err();
        assert_eq!(fault.origin, "CropExtractor::extract");

        let flat = PointCloud::unorganized("camera", vec![Point3::default(); 10]);
        assert!(extractor.extract(&flat, bounds).is_err());
    }

    #[test]
    fn test_centroid_aligner() {
        let cuboid = PointCloud::unorganized(
            "camera",
            vec![
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(2.0, 0.0, 1.0),
                Point3::new(0.0, 2.0, 3.0),
                Point3::new(2.0, 2.0, 3.0),
            ],
        );
        let mut aligner = CentroidAligner::new("camera", 3);
        let mut state = FrameState::new();
        aligner.align(&cuboid, &mut state).unwrap();

        assert_eq!(state.transforms(), &[Transform::from_translation(1.0, 1.0, 2.0)]);
        let marker = &state.markers().markers[0];
        assert_eq!(marker.scale, [2.0, 2.0, 2.0]);
        assert_eq!(marker.frame_id, "camera");
    }

    #[test]
    fn test_centroid_aligner_faults_on_few_points() {
        let cuboid = PointCloud::unorganized("camera", vec![Point3::default(); 2]);
        let mut state = FrameState::new();
        let fault = CentroidAligner::new("camera", 3)
            .align(&cuboid, &mut state)
            .unwrap_err();
        assert_eq!(fault.origin, "CentroidAligner::align");
        assert!(state.is_empty());
    }
}
