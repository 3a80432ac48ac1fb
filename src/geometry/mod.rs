/// 几何流水线接口 (Geometry Pipeline)
///
/// 定位器只依赖以下两个接口, 具体算法由外部库提供:
/// - CuboidExtractor: 区域 + 原始点云 → 长方体点云 (顶面, 长宽高)
/// - PoseAligner:     长方体点云 → 物体位姿 + 可视化标记
///
/// `reference` 提供最简实现 (裁剪 + 质心), 仅用于节点联调与回放.
pub mod cloud;
pub mod reference;
pub mod transform;

pub use cloud::{Point3, PointCloud};
pub use reference::{CentroidAligner, CropExtractor};
pub use transform::{Marker, MarkerArray, MarkerKind, Transform};

use crate::detection::RegionBounds;
use crate::pipeline::FrameState;

/// 几何处理异常
///
/// 库级别可恢复, 但对当前帧是致命的: 定位器放弃本帧剩余区域.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{origin}: {detail}")]
pub struct GeometryFault {
    /// 出错的函数
    pub origin: String,
    /// 详细信息
    pub detail: String,
}

impl GeometryFault {
    pub fn new(origin: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            detail: detail.into(),
        }
    }
}

/// 长方体提取接口
pub trait CuboidExtractor {
    /// 从原始点云中提取区域对应的长方体点云
    ///
    /// # 返回
    /// - `Ok(空点云)`: 区域内没有可用数据, 定位器跳过该区域
    /// - `Err(GeometryFault)`: 本帧中止
    fn extract(&mut self, cloud: &PointCloud, bounds: RegionBounds) -> Result<PointCloud, GeometryFault>;
}

/// 位姿对齐接口
pub trait PoseAligner {
    /// 根据长方体点云估计位姿, 结果直接写入帧状态
    /// (0 或 1 个变换, 0 或多个标记)
    fn align(&mut self, cuboid: &PointCloud, state: &mut FrameState) -> Result<(), GeometryFault>;
}

// 闭包直接作为几何流水线 (测试桩与外部库适配)
impl<F> CuboidExtractor for F
where
    F: FnMut(&PointCloud, RegionBounds) -> Result<PointCloud, GeometryFault>,
{
    fn extract(&mut self, cloud: &PointCloud, bounds: RegionBounds) -> Result<PointCloud, GeometryFault> {
        self(cloud, bounds)
    }
}

impl<F> PoseAligner for F
where
    F: FnMut(&PointCloud, &mut FrameState) -> Result<(), GeometryFault>,
{
    fn align(&mut self, cuboid: &PointCloud, state: &mut FrameState) -> Result<(), GeometryFault> {
        self(cuboid, state)
    }
}
