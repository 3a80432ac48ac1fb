/// 检测区域系统 (Detection Regions)
///
/// 接收外部检测器的检测框, 维护下一帧的候选列表
/// - Region:       检测框 (像素坐标)
/// - RegionMerger: 尺寸过滤与包含合并
pub mod merger;
pub mod types;

pub use merger::{MergeAction, MergeStrategy, RegionMerger, RegionStore};
pub use types::{Region, RegionBounds, MIN_REGION_SIZE};
