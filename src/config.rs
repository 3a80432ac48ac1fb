//! 定位器配置 - 通过JSON文件与命令行调整参数

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detection::{MergeStrategy, MIN_REGION_SIZE};

/// 默认坐标系 (广播的父坐标系)
pub const DEFAULT_FRAME_ID: &str = "camera_color_optical_frame";

/// 定位节点参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "RVIP - 检测框 + 点云 三维物体定位节点", long_about = None)]
pub struct Args {
    /// 配置文件 (不存在时写入默认配置)
    #[arg(short, long, default_value = "rvip.json")]
    pub config: PathBuf,

    /// 回放场景文件 (JSON). 不指定时从标准输入读取事件
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// 合并策略 (覆盖配置文件)
    #[arg(long, value_enum)]
    pub strategy: Option<MergeStrategy>,

    /// 广播坐标系 (覆盖配置文件)
    #[arg(long)]
    pub frame_id: Option<String>,

    /// 定位频率 Hz (覆盖配置文件)
    #[arg(long)]
    pub tick_hz: Option<f64>,

    /// 日志级别 (RUST_LOG 优先)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// 可视化结果以 JSON Lines 写到标准输出
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// 定位器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    // === 候选框 ===
    pub min_region_size: u32,          // 最小宽高 (严格大于)
    pub merge_strategy: MergeStrategy, // 合并策略

    // === 输出 ===
    pub frame_id: String, // 广播父坐标系

    // === 调度 ===
    pub tick_hz: f64, // 定位频率

    // === 参考几何 ===
    pub min_pose_points: usize, // 位姿估计最少点数
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            min_region_size: MIN_REGION_SIZE,
            merge_strategy: MergeStrategy::Legacy,
            frame_id: DEFAULT_FRAME_ID.to_string(),
            tick_hz: 10.0,
            min_pose_points: 3,
        }
    }
}

impl LocalizerConfig {
    /// 从JSON文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {:#}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| anyhow::anyhow!("写入 {} 失败: {}", path.display(), e))?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 命令行参数覆盖配置文件
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(strategy) = args.strategy {
            self.merge_strategy = strategy;
        }
        if let Some(frame_id) = &args.frame_id {
            self.frame_id = frame_id.clone();
        }
        if let Some(tick_hz) = args.tick_hz {
            self.tick_hz = tick_hz;
        }
    }

    /// 定位周期, 频率非法时退回 10Hz
    pub fn tick_period(&self) -> std::time::Duration {
        let hz = if self.tick_hz.is_finite() && self.tick_hz > 0.0 {
            self.tick_hz
        } else {
            warn!("⚠️  定位频率无效: {}, 使用 10Hz", self.tick_hz);
            10.0
        };
        std::time::Duration::from_secs_f64(1.0 / hz)
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前定位器配置:");
        info!("  最小区域尺寸: >{} px", self.min_region_size);
        info!("  合并策略: {:?}", self.merge_strategy);
        info!("  坐标系: {}", self.frame_id);
        info!("  定位频率: {:.1} Hz", self.tick_hz);
        info!("  位姿最少点数: {}", self.min_pose_points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rvip-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let config = LocalizerConfig::load(&path);
        assert_eq!(config, LocalizerConfig::default());
        assert!(path.exists());

        let reloaded = LocalizerConfig::load(&path);
        assert_eq!(reloaded, config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "merge_strategy": "full_scan", "tick_hz": 5.0 }"#).unwrap();

        let config = LocalizerConfig::load(&path);
        assert_eq!(config.merge_strategy, MergeStrategy::FullScan);
        assert_eq!(config.tick_hz, 5.0);
        assert_eq!(config.min_region_size, MIN_REGION_SIZE);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let path = temp_path("broken");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(LocalizerConfig::load(&path), LocalizerConfig::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_args_override() {
        let args = Args::parse_from([
            "rvip-node",
            "--strategy",
            "full-scan",
            "--frame-id",
            "base_link",
            "--tick-hz",
            "30",
        ]);
        let mut config = LocalizerConfig::default();
        config.apply_args(&args);
        assert_eq!(config.merge_strategy, MergeStrategy::FullScan);
        assert_eq!(config.frame_id, "base_link");
        assert_eq!(config.tick_hz, 30.0);
    }

    #[test]
    fn test_tick_period() {
        let mut config = LocalizerConfig::default();
        assert_eq!(config.tick_period().as_millis(), 100);
        config.tick_hz = 0.0;
        assert_eq!(config.tick_period().as_millis(), 100);
    }
}
