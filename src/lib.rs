//! RVIP - 检测框 + 点云 三维物体定位核心
//!
//! 检测框合并成候选列表, 每帧逐个候选框提取长方体并对齐位姿,
//! 单个候选框失败不影响整帧 (几何异常除外).
pub mod config; // 配置参数
pub mod detection; // 检测框与合并
pub mod geometry; // 几何流水线接口
pub mod logging; // 日志初始化
pub mod node; // 事件循环节点
pub mod pipeline; // 帧状态机
pub mod scenario; // 场景回放
pub mod visualization; // 可视化输出

pub use crate::config::{Args, LocalizerConfig};
pub use crate::detection::{MergeStrategy, Region, RegionMerger};
pub use crate::geometry::{CuboidExtractor, GeometryFault, PointCloud, PoseAligner};
pub use crate::node::{LocalizerNode, NodeInputs, TickSource};
pub use crate::pipeline::{FrameOutcome, FrameState, Localizer, SharedLocalizer};
pub use crate::visualization::Visualizer;
