/// RVIP 定位节点
///
/// 系统架构:
/// 1. 输入线程: 从场景文件或标准输入读取检测框 / 点云事件
/// 2. 定位线程: 合并检测框, 定时逐区域定位 (独立工作线程)
/// 3. 可视化:   日志或 JSON Lines (标准输出)
use std::io::{self, BufRead};

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{info, warn};

use rvip::scenario::{forward_event, Scenario, ScenarioEvent};
use rvip::visualization::{JsonLinesVisualizer, LogVisualizer, Visualizer};
use rvip::{Args, Localizer, LocalizerConfig, LocalizerNode, TickSource};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = Args::parse();
    rvip::logging::setup_logging(&args.log_level, args.json);

    let mut config = LocalizerConfig::load(&args.config);
    config.apply_args(&args);
    config.print_summary();

    let visualizer: Box<dyn Visualizer + Send> = if args.json {
        Box::new(JsonLinesVisualizer::new(io::stdout()))
    } else {
        Box::new(LogVisualizer)
    };
    let localizer = Localizer::with_reference_geometry(&config, visualizer);

    info!("🚀 RVIP 定位节点启动");

    match &args.scenario {
        Some(path) => replay_scenario(localizer, path),
        None => stream_stdin(localizer, &config),
    }
}

/// 回放场景文件 (手动触发)
fn replay_scenario(localizer: Localizer, path: &std::path::Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        "📼 回放场景: {} ({} 个事件, {} 帧)",
        path.display(),
        scenario.events.len(),
        scenario.tick_count()
    );

    let node = LocalizerNode::spawn(localizer, TickSource::Manual)?;
    let outcomes = scenario.replay_on(&node.inputs(), node.outcomes())?;
    let aborted = outcomes.iter().filter(|o| o.is_aborted()).count();
    if aborted > 0 {
        warn!("⚠️  {} 帧因几何异常中止", aborted);
    }

    node.join()?;
    Ok(())
}

/// 从标准输入逐行读取事件 (每行一个 JSON), 定时触发定位
fn stream_stdin(localizer: Localizer, config: &LocalizerConfig) -> Result<()> {
    let node = LocalizerNode::spawn(localizer, TickSource::Periodic(config.tick_period()))?;
    let inputs = node.inputs();

    info!("🔍 等待标准输入事件 (Ctrl-D 结束)...");

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("读取标准输入失败")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ScenarioEvent>(line) {
            Ok(event) => forward_event(&inputs, event)?,
            Err(e) => warn!("⚠️  第{}行无法解析, 已忽略: {}", n + 1, e),
        }
    }

    // 结束前再定位一次, 处理最后一批检测框
    inputs.tick()?;
    node.join()?;
    Ok(())
}
