//! 共享定位器 (多线程宿主)
//!
//! 每个入口在整个调用期间持有锁, `run` 的计数快照与全部区域扫描
//! 相对并发的检测框合并是一个原子段.

use std::sync::Arc;

use parking_lot::Mutex;

use super::localizer::{FrameOutcome, FrameStats, Localizer};
use crate::detection::Region;
use crate::geometry::PointCloud;

#[derive(Clone)]
pub struct SharedLocalizer {
    inner: Arc<Mutex<Localizer>>,
}

impl SharedLocalizer {
    pub fn new(localizer: Localizer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(localizer)),
        }
    }

    pub fn consider_batch(&self, batch: &[Region]) {
        self.inner.lock().consider_batch(batch);
    }

    pub fn update_cloud(&self, cloud: PointCloud) {
        self.inner.lock().update_cloud(cloud);
    }

    pub fn run(&self) -> FrameOutcome {
        self.inner.lock().run()
    }

    pub fn stats(&self) -> FrameStats {
        self.inner.lock().stats().clone()
    }

    /// 在锁内读取定位器状态
    pub fn with<R>(&self, f: impl FnOnce(&Localizer) -> R) -> R {
        f(&self.inner.lock())
    }
}
