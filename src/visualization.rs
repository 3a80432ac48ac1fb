//! 可视化输出 (Visualization Emitter)
//!
//! 每个已定位物体广播一次位姿, 然后整批发布标记.

use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::geometry::{MarkerArray, Transform};

/// 可视化输出接口
pub trait Visualizer {
    /// 广播物体位姿 (`source_frame` → `child_frame`)
    fn broadcast_transform(
        &mut self,
        transform: &Transform,
        stamp: DateTime<Utc>,
        source_frame: &str,
        child_frame: &str,
    );

    /// 发布本帧全部标记
    fn publish_markers(&mut self, markers: &MarkerArray);
}

// ========== 日志输出 ==========

/// 只写日志
#[derive(Debug, Default)]
pub struct LogVisualizer;

impl Visualizer for LogVisualizer {
    fn broadcast_transform(
        &mut self,
        transform: &Transform,
        stamp: DateTime<Utc>,
        source_frame: &str,
        child_frame: &str,
    ) {
        let [x, y, z] = transform.translation;
        info!(
            "📍 {} → {} @ ({:.3}, {:.3}, {:.3}) [{}]",
            source_frame,
            child_frame,
            x,
            y,
            z,
            stamp.format("%H:%M:%S%.3f")
        );
    }

    fn publish_markers(&mut self, markers: &MarkerArray) {
        debug!("🟩 发布标记: {} 个", markers.len());
    }
}

// ========== JSON Lines 输出 ==========

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum VisualizationRecord<'a> {
    Transform {
        stamp: DateTime<Utc>,
        source_frame: &'a str,
        child_frame: &'a str,
        transform: &'a Transform,
    },
    Markers {
        markers: &'a MarkerArray,
    },
}

/// 每次调用写一行 JSON (回放结果可直接 diff)
pub struct JsonLinesVisualizer<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesVisualizer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &VisualizationRecord<'_>) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            warn!("⚠️  可视化输出写入失败: {}", e);
        }
    }
}

impl<W: Write> Visualizer for JsonLinesVisualizer<W> {
    fn broadcast_transform(
        &mut self,
        transform: &Transform,
        stamp: DateTime<Utc>,
        source_frame: &str,
        child_frame: &str,
    ) {
        self.write_record(&VisualizationRecord::Transform {
            stamp,
            source_frame,
            child_frame,
            transform,
        });
    }

    fn publish_markers(&mut self, markers: &MarkerArray) {
        self.write_record(&VisualizationRecord::Markers { markers });
        if let Err(e) = self.writer.flush() {
            warn!("⚠️  可视化输出刷新失败: {}", e);
        }
    }
}

// ========== 内存记录 ==========

/// 一次广播
#[derive(Clone, Debug, PartialEq)]
pub struct Broadcast {
    pub transform: Transform,
    pub stamp: DateTime<Utc>,
    pub source_frame: String,
    pub child_frame: String,
}

/// 记录全部调用 (测试与回放断言)
#[derive(Clone, Debug, Default)]
pub struct RecordingVisualizer {
    pub broadcasts: Vec<Broadcast>,
    pub marker_batches: Vec<MarkerArray>,
}

impl RecordingVisualizer {
    pub fn child_frames(&self) -> Vec<&str> {
        self.broadcasts.iter().map(|b| b.child_frame.as_str()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.broadcasts.len() + self.marker_batches.len()
    }
}

impl Visualizer for RecordingVisualizer {
    fn broadcast_transform(
        &mut self,
        transform: &Transform,
        stamp: DateTime<Utc>,
        source_frame: &str,
        child_frame: &str,
    ) {
        self.broadcasts.push(Broadcast {
            transform: *transform,
            stamp,
            source_frame: source_frame.to_string(),
            child_frame: child_frame.to_string(),
        });
    }

    fn publish_markers(&mut self, markers: &MarkerArray) {
        self.marker_batches.push(markers.clone());
    }
}

// 共享输出: 定位器持有一份, 调用方保留一份读取结果
impl<V: Visualizer> Visualizer for Arc<Mutex<V>> {
    fn broadcast_transform(
        &mut self,
        transform: &Transform,
        stamp: DateTime<Utc>,
        source_frame: &str,
        child_frame: &str,
    ) {
        self.lock()
            .broadcast_transform(transform, stamp, source_frame, child_frame);
    }

    fn publish_markers(&mut self, markers: &MarkerArray) {
        self.lock().publish_markers(markers);
    }
}
