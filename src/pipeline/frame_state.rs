//! 帧状态 (Frame State)
//! 每次 `run` 开始时清空, 保存本帧定位结果

use crate::geometry::{Marker, MarkerArray, Transform};

/// 本帧定位结果
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameState {
    transforms: Vec<Transform>,
    markers: MarkerArray,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空变换与标记
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.markers.clear();
    }

    /// 添加一个已定位物体的位姿, 返回其序号 (用于 "object_i" 标签)
    pub fn push_transform(&mut self, transform: Transform) -> usize {
        self.transforms.push(transform);
        self.transforms.len() - 1
    }

    pub fn push_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn markers(&self) -> &MarkerArray {
        &self.markers
    }

    /// 已定位物体数量
    pub fn object_count(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty() && self.markers.is_empty()
    }
}

/// 物体标签
pub fn object_label(index: usize) -> String {
    format!("object_{}", index)
}
