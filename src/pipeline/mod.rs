/// 定位流水线 (Localization Pipeline)
///
/// 每帧一次: 候选列表 → 长方体提取 → 位姿对齐 → 可视化
/// - Localizer:       帧状态机 (Idle → Scanning → PerRegion → Visualizing → Idle)
/// - FrameState:      本帧定位结果
/// - SharedLocalizer: 多线程宿主使用的加锁包装
pub mod frame_state;
pub mod localizer;
pub mod shared;

pub use frame_state::{object_label, FrameState};
pub use localizer::{FrameOutcome, FrameStats, Localizer};
pub use shared::SharedLocalizer;
