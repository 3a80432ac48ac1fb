//! 定位器 (Localizer)
//! 职责: 检测框合并 → 每帧逐区域提取长方体 + 位姿对齐 → 可视化
//!
//! 三个入口 (`consider_batch`, `update_cloud`, `run`) 都需要 `&mut self`,
//! 调用方必须保证它们互斥. 多线程宿主使用 [`super::SharedLocalizer`].

use chrono::Utc;
use tracing::{error, info, warn};

use super::frame_state::{object_label, FrameState};
use crate::config::LocalizerConfig;
use crate::detection::{MergeAction, Region, RegionMerger, RegionStore};
use crate::geometry::{
    CentroidAligner, CropExtractor, CuboidExtractor, GeometryFault, PointCloud, PoseAligner,
};
use crate::visualization::Visualizer;

/// 一帧的处理结果
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// 候选列表为空, 什么都不做
    NoRegions,
    /// 全部区域处理完成, 候选列表已清空
    Completed {
        regions: usize,
        localized: usize,
        /// 长方体为空而跳过的区域序号
        skipped: Vec<usize>,
    },
    /// 几何异常, 本帧中止. 未可视化, 候选列表保留到下一帧
    Aborted {
        region: usize,
        localized: usize,
        fault: GeometryFault,
    },
}

impl FrameOutcome {
    pub fn localized(&self) -> usize {
        match self {
            FrameOutcome::NoRegions => 0,
            FrameOutcome::Completed { localized, .. } | FrameOutcome::Aborted { localized, .. } => *localized,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FrameOutcome::Aborted { .. })
    }
}

/// 运行统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub localized_objects: u64,
    pub skipped_regions: u64,
    pub aborted_frames: u64,
    pub rejected_regions: u64,
}

impl FrameStats {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.ticks += 1;
        self.localized_objects += outcome.localized() as u64;
        match outcome {
            FrameOutcome::NoRegions => self.idle_ticks += 1,
            FrameOutcome::Completed { skipped, .. } => self.skipped_regions += skipped.len() as u64,
            FrameOutcome::Aborted { .. } => self.aborted_frames += 1,
        }
    }
}

pub struct Localizer {
    merger: RegionMerger,
    regions: RegionStore,
    raw_cloud: PointCloud,
    state: FrameState,
    frame_id: String,

    extractor: Box<dyn CuboidExtractor + Send>,
    aligner: Box<dyn PoseAligner + Send>,
    visualizer: Box<dyn Visualizer + Send>,

    // 统计
    stats: FrameStats,
}

impl Localizer {
    pub fn new(
        config: &LocalizerConfig,
        extractor: Box<dyn CuboidExtractor + Send>,
        aligner: Box<dyn PoseAligner + Send>,
        visualizer: Box<dyn Visualizer + Send>,
    ) -> Self {
        Self {
            merger: RegionMerger::new(config.merge_strategy, config.min_region_size),
            regions: RegionStore::new(),
            raw_cloud: PointCloud::default(),
            state: FrameState::new(),
            frame_id: config.frame_id.clone(),
            extractor,
            aligner,
            visualizer,
            stats: FrameStats::default(),
        }
    }

    /// 使用参考几何实现 (裁剪 + 质心)
    pub fn with_reference_geometry(config: &LocalizerConfig, visualizer: Box<dyn Visualizer + Send>) -> Self {
        Self::new(
            config,
            Box::new(CropExtractor::new()),
            Box::new(CentroidAligner::new(config.frame_id.clone(), config.min_pose_points)),
            visualizer,
        )
    }

    // ========== 入口1: 检测框 ==========

    pub fn consider(&mut self, candidate: Region) -> MergeAction {
        let action = self.merger.consider(candidate, &mut self.regions);
        if action == MergeAction::Rejected {
            self.stats.rejected_regions += 1;
        }
        action
    }

    /// 一批检测框, 按数组顺序合并
    pub fn consider_batch(&mut self, batch: &[Region]) {
        let rejected = self.merger.consider_batch(batch, &mut self.regions);
        self.stats.rejected_regions += rejected as u64;
    }

    // ========== 入口2: 点云 ==========

    /// 覆盖原始点云 (不缓存, 只保留最新一帧)
    pub fn update_cloud(&mut self, cloud: PointCloud) {
        self.raw_cloud = cloud;
    }

    // ========== 入口3: 定位 ==========

    /// 处理一帧
    ///
    /// 1. 清空帧状态, 候选列表为空则直接返回
    /// 2. 逐区域: 提取长方体 → 空结果跳过 → 位姿对齐
    /// 3. 几何异常: 立即返回, 剩余区域不处理, 不可视化, 候选列表不清空
    ///    (中止的候选框留到下一帧重新处理)
    /// 4. 有定位结果时广播位姿并发布标记
    /// 5. 清空候选列表
    pub fn run(&mut self) -> FrameOutcome {
        let outcome = self.run_frame();
        self.stats.record(&outcome);
        outcome
    }

    fn run_frame(&mut self) -> FrameOutcome {
        self.state.clear();

        let count = self.regions.len();
        if count == 0 {
            return FrameOutcome::NoRegions;
        }

        let mut skipped = Vec::new();
        for i in 0..count {
            // 按序号读取, 不持有列表引用
            let Some(region) = self.regions.get(i).copied() else {
                break;
            };

            match self.localize_region(region) {
                Ok(true) => {}
                Ok(false) => {
                    warn!("[ WARNING ] - Safeguard Triggered. 区域{} {} 长方体为空", i, region);
                    skipped.push(i);
                }
                Err(fault) => {
                    error!("{}", fault.origin);
                    error!("{}", fault.detail);
                    warn!("Exception caught. Exiting safe.");
                    return FrameOutcome::Aborted {
                        region: i,
                        localized: self.state.object_count(),
                        fault,
                    };
                }
            }
        }

        let localized = self.state.object_count();
        if localized > 0 {
            info!("[ No. of Localized Object ] = {}", localized);
            self.visualize();
        }

        self.regions.clear();

        FrameOutcome::Completed {
            regions: count,
            localized,
            skipped,
        }
    }

    /// 单个区域: 返回是否进入位姿对齐
    fn localize_region(&mut self, region: Region) -> Result<bool, GeometryFault> {
        let cuboid = self.extractor.extract(&self.raw_cloud, region.bounds())?;
        if cuboid.is_empty() {
            return Ok(false);
        }
        self.aligner.align(&cuboid, &mut self.state)?;
        Ok(true)
    }

    fn visualize(&mut self) {
        let stamp = Utc::now();
        for (i, transform) in self.state.transforms().iter().enumerate() {
            self.visualizer
                .broadcast_transform(transform, stamp, &self.frame_id, &object_label(i));
        }
        self.visualizer.publish_markers(self.state.markers());
    }

    // ========== 查询 ==========

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn frame_state(&self) -> &FrameState {
        &self.state
    }

    pub fn raw_cloud(&self) -> &PointCloud {
        &self.raw_cloud
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
}
