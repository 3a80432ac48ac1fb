//! 检测框合并器 (Region Merger)
//! 职责: 接收检测框 → 尺寸过滤 → 合并到候选列表
//!
//! 候选列表跨多个检测批次累积, 每帧由定位器读取并清空.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Region, MIN_REGION_SIZE};

/// 候选列表 (按插入顺序)
pub type RegionStore = Vec<Region>;

/// 合并策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// 逐个比较, 遇到第一个不被包含的框就追加并停止扫描.
    /// 列表超过两个框时不保证完全去重.
    #[default]
    Legacy,
    /// 完整扫描: 替换所有被包含的框, 候选框本身被包含时丢弃.
    FullScan,
}

/// 合并结果 (用于日志与统计)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeAction {
    /// 尺寸过小, 丢弃
    Rejected,
    /// 追加到列表末尾
    Appended,
    /// 替换了 n 个被包含的框 (可能同时追加)
    Replaced { replaced: usize, appended: bool },
    /// 已被列表中的框包含, 丢弃 (仅 FullScan)
    Absorbed,
}

#[derive(Clone, Debug)]
pub struct RegionMerger {
    strategy: MergeStrategy,
    min_size: u32,
}

impl Default for RegionMerger {
    fn default() -> Self {
        Self::new(MergeStrategy::default(), MIN_REGION_SIZE)
    }
}

impl RegionMerger {
    pub fn new(strategy: MergeStrategy, min_size: u32) -> Self {
        Self { strategy, min_size }
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    pub fn min_size(&self) -> u32 {
        self.min_size
    }

    /// 处理一个候选框
    pub fn consider(&self, candidate: Region, store: &mut RegionStore) -> MergeAction {
        // 1. 尺寸过滤 (小于等于阈值的框丢弃, 不修改列表)
        if !candidate.exceeds(self.min_size) {
            return MergeAction::Rejected;
        }

        // 2. 列表为空, 直接加入
        if store.is_empty() {
            store.push(candidate);
            return MergeAction::Appended;
        }

        // 3. 包含扫描
        match self.strategy {
            MergeStrategy::Legacy => consider_legacy(candidate, store),
            MergeStrategy::FullScan => consider_full_scan(candidate, store),
        }
    }

    /// 按数组顺序处理一个检测批次, 返回被尺寸过滤丢弃的数量
    pub fn consider_batch(&self, batch: &[Region], store: &mut RegionStore) -> usize {
        let mut rejected = 0;
        for &candidate in batch {
            let action = self.consider(candidate, store);
            if action == MergeAction::Rejected {
                rejected += 1;
            }
            debug!(region = %candidate, ?action, size = store.len(), "候选框合并");
        }
        rejected
    }
}

fn consider_legacy(candidate: Region, store: &mut RegionStore) -> MergeAction {
    let mut replaced = 0;
    let mut j = 0;
    while j < store.len() {
        if store[j].is_within(&candidate) {
            // 原位替换, 继续扫描下一个
            store[j] = candidate;
            replaced += 1;
            j += 1;
        } else {
            store.push(candidate);
            return if replaced == 0 {
                MergeAction::Appended
            } else {
                MergeAction::Replaced {
                    replaced,
                    appended: true,
                }
            };
        }
    }

    MergeAction::Replaced {
        replaced,
        appended: false,
    }
}

fn consider_full_scan(candidate: Region, store: &mut RegionStore) -> MergeAction {
    let first = store.iter().position(|stored| stored.is_within(&candidate));

    match first {
        Some(index) => {
            let before = store.len();
            store[index] = candidate;
            let mut j = 0;
            store.retain(|stored| {
                let keep = j <= index || !stored.is_within(&candidate);
                j += 1;
                keep
            });
            MergeAction::Replaced {
                replaced: before - store.len() + 1,
                appended: false,
            }
        }
        None if store.iter().any(|stored| candidate.is_within(stored)) => MergeAction::Absorbed,
        None => {
            store.push(candidate);
            MergeAction::Appended
        }
    }
}
