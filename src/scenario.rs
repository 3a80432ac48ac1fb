//! 场景回放 (Scenario Replay)
//!
//! JSON 场景文件按顺序描述三路输入:
//! ```json
//! { "events": [
//!     { "plane": { "width": 640, "height": 480, "depth": 0.9 } },
//!     { "rois": [ { "x_offset": 100, "y_offset": 80, "width": 120, "height": 90 } ] },
//!     "tick"
//! ] }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detection::Region;
use crate::geometry::{Point3, PointCloud};
use crate::node::NodeInputs;
use crate::pipeline::{FrameOutcome, Localizer};

/// 等待一帧结果的超时
const OUTCOME_TIMEOUT: Duration = Duration::from_secs(10);

/// 合成平面点云 (有序, 每像素 1mm, 固定深度)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneSpec {
    pub width: u32,
    pub height: u32,
    pub depth: f32,
    #[serde(default = "default_plane_frame")]
    pub frame_id: String,
    /// 无效像素区域 (NaN)
    #[serde(default)]
    pub holes: Vec<Region>,
}

fn default_plane_frame() -> String {
    crate::config::DEFAULT_FRAME_ID.to_string()
}

impl PlaneSpec {
    pub fn build(&self) -> PointCloud {
        let mut points = Vec::with_capacity(self.width as usize * self.height as usize);
        for v in 0..self.height {
            for u in 0..self.width {
                let in_hole = self
                    .holes
                    .iter()
                    .any(|h| u >= h.xmin() && u < h.xmax() && v >= h.ymin() && v < h.ymax());
                points.push(if in_hole {
                    Point3::nan()
                } else {
                    Point3::new(u as f32 * 0.001, v as f32 * 0.001, self.depth)
                });
            }
        }
        PointCloud::organized(self.frame_id.clone(), self.width, self.height, points)
    }
}

/// 场景事件
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioEvent {
    /// 一批检测框
    Rois(Vec<Region>),
    /// 完整点云
    Cloud(PointCloud),
    /// 合成点云
    Plane(PlaneSpec),
    /// 触发一次定位
    Tick,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub events: Vec<ScenarioEvent>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("场景文件格式错误")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).with_context(|| format!("读取场景文件 {} 失败", path.display()))?;
        Self::from_json(&json).with_context(|| format!("解析场景文件 {} 失败", path.display()))
    }

    pub fn tick_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ScenarioEvent::Tick))
            .count()
    }

    /// 在当前线程直接回放, 每个 tick 返回一个结果
    pub fn replay(&self, localizer: &mut Localizer) -> Vec<FrameOutcome> {
        let mut outcomes = Vec::with_capacity(self.tick_count());
        for event in &self.events {
            match event {
                ScenarioEvent::Rois(batch) => localizer.consider_batch(batch),
                ScenarioEvent::Cloud(cloud) => localizer.update_cloud(cloud.clone()),
                ScenarioEvent::Plane(plane) => localizer.update_cloud(plane.build()),
                ScenarioEvent::Tick => outcomes.push(localizer.run()),
            }
        }
        outcomes
    }

    /// 通过定位节点回放 (节点须为手动触发)
    pub fn replay_on(
        &self,
        inputs: &NodeInputs,
        outcomes: &crossbeam_channel::Receiver<FrameOutcome>,
    ) -> Result<Vec<FrameOutcome>> {
        let mut results = Vec::with_capacity(self.tick_count());
        for event in &self.events {
            match event {
                ScenarioEvent::Tick => {
                    inputs.tick()?;
                    let outcome = outcomes
                        .recv_timeout(OUTCOME_TIMEOUT)
                        .map_err(|e| anyhow!("等待定位结果超时: {}", e))?;
                    results.push(outcome);
                }
                other => forward_event(inputs, other.clone())?,
            }
        }
        Ok(results)
    }
}

/// 把非 tick 事件转发给节点
pub fn forward_event(inputs: &NodeInputs, event: ScenarioEvent) -> Result<()> {
    match event {
        ScenarioEvent::Rois(batch) => inputs.send_regions(batch),
        ScenarioEvent::Cloud(cloud) => inputs.send_cloud(cloud),
        ScenarioEvent::Plane(plane) => inputs.send_cloud(plane.build()),
        ScenarioEvent::Tick => inputs.tick(),
    }
}
