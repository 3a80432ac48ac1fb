//! 定位节点 (Localizer Node)
//!
//! 单线程事件循环独占 `Localizer`, 检测框 / 点云 / 定时触发三路输入
//! 通过 crossbeam 通道串行处理, 入口之间天然互斥.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, info};

use crate::detection::Region;
use crate::geometry::PointCloud;
use crate::pipeline::{FrameOutcome, FrameStats, Localizer};

/// 结果队列容量, 满了以后新结果被丢弃 (无人读取时不会无限增长)
pub const OUTCOME_CAPACITY: usize = 64;

/// 定时触发方式
#[derive(Clone, Copy, Debug)]
pub enum TickSource {
    /// 固定周期
    Periodic(Duration),
    /// 只响应 `NodeInputs::tick`
    Manual,
}

/// 节点输入端 (可克隆, 分发给各个数据源)
#[derive(Clone)]
pub struct NodeInputs {
    regions: Sender<Vec<Region>>,
    clouds: Sender<PointCloud>,
    ticks: Sender<()>,
    shutdown: Sender<()>,
}

impl NodeInputs {
    pub fn send_regions(&self, batch: Vec<Region>) -> Result<()> {
        self.regions
            .send(batch)
            .map_err(|_| anyhow!("定位节点已退出 (regions)"))
    }

    pub fn send_cloud(&self, cloud: PointCloud) -> Result<()> {
        self.clouds
            .send(cloud)
            .map_err(|_| anyhow!("定位节点已退出 (cloud)"))
    }

    pub fn tick(&self) -> Result<()> {
        self.ticks.send(()).map_err(|_| anyhow!("定位节点已退出 (tick)"))
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.try_send(());
    }
}

/// 运行中的节点
pub struct LocalizerNode {
    inputs: NodeInputs,
    outcomes: Receiver<FrameOutcome>,
    handle: JoinHandle<Localizer>,
}

impl LocalizerNode {
    /// 启动事件循环线程
    pub fn spawn(localizer: Localizer, tick_source: TickSource) -> Result<Self> {
        let (tx_regions, rx_regions) = unbounded::<Vec<Region>>();
        let (tx_clouds, rx_clouds) = unbounded::<PointCloud>();
        let (tx_ticks, rx_ticks) = unbounded::<()>();
        let (tx_shutdown, rx_shutdown) = bounded::<()>(1);
        let (tx_outcomes, rx_outcomes) = bounded::<FrameOutcome>(OUTCOME_CAPACITY);

        let handle = thread::Builder::new()
            .name("rvip-localizer".to_string())
            .spawn(move || {
                event_loop(
                    localizer,
                    tick_source,
                    rx_regions,
                    rx_clouds,
                    rx_ticks,
                    rx_shutdown,
                    tx_outcomes,
                )
            })?;

        Ok(Self {
            inputs: NodeInputs {
                regions: tx_regions,
                clouds: tx_clouds,
                ticks: tx_ticks,
                shutdown: tx_shutdown,
            },
            outcomes: rx_outcomes,
            handle,
        })
    }

    pub fn inputs(&self) -> NodeInputs {
        self.inputs.clone()
    }

    /// 每次定位的结果 (最多缓存 `OUTCOME_CAPACITY` 个)
    pub fn outcomes(&self) -> &Receiver<FrameOutcome> {
        &self.outcomes
    }

    /// 通知退出并等待线程结束, 返回定位器
    ///
    /// 已发送的检测框, 点云与触发在退出前全部处理.
    pub fn join(self) -> Result<Localizer> {
        self.inputs.shutdown();
        self.handle
            .join()
            .map_err(|_| anyhow!("定位线程异常退出"))
    }
}

fn event_loop(
    mut localizer: Localizer,
    tick_source: TickSource,
    rx_regions: Receiver<Vec<Region>>,
    rx_clouds: Receiver<PointCloud>,
    rx_ticks: Receiver<()>,
    rx_shutdown: Receiver<()>,
    tx_outcomes: Sender<FrameOutcome>,
) -> Localizer {
    info!("✅ 定位线程启动 ({:?})", tick_source);

    let periodic = match tick_source {
        TickSource::Periodic(period) => tick(period),
        TickSource::Manual => never(),
    };

    let on_tick = |localizer: &mut Localizer| {
        let outcome = localizer.run();
        if let Err(TrySendError::Full(_)) = tx_outcomes.try_send(outcome) {
            debug!("结果队列已满, 丢弃本帧结果");
        }
    };

    loop {
        // 先处理已到达的检测框与点云, 再响应定时触发
        drain_inputs(&mut localizer, &rx_regions, &rx_clouds);

        select! {
            recv(rx_regions) -> msg => match msg {
                Ok(batch) => localizer.consider_batch(&batch),
                Err(_) => break,
            },
            recv(rx_clouds) -> msg => match msg {
                Ok(cloud) => localizer.update_cloud(cloud),
                Err(_) => break,
            },
            recv(rx_ticks) -> msg => match msg {
                Ok(()) => {
                    drain_inputs(&mut localizer, &rx_regions, &rx_clouds);
                    on_tick(&mut localizer);
                }
                Err(_) => break,
            },
            recv(periodic) -> _ => {
                drain_inputs(&mut localizer, &rx_regions, &rx_clouds);
                on_tick(&mut localizer);
            },
            recv(rx_shutdown) -> _ => {
                // 退出前处理排队中的输入与触发
                drain_inputs(&mut localizer, &rx_regions, &rx_clouds);
                while rx_ticks.try_recv().is_ok() {
                    on_tick(&mut localizer);
                }
                break;
            },
        }
    }

    print_stats(localizer.stats());
    info!("✅ 定位线程退出");
    localizer
}

fn drain_inputs(localizer: &mut Localizer, rx_regions: &Receiver<Vec<Region>>, rx_clouds: &Receiver<PointCloud>) {
    while let Ok(batch) = rx_regions.try_recv() {
        localizer.consider_batch(&batch);
    }
    // 点云只保留最新一帧
    let mut latest = None;
    while let Ok(cloud) = rx_clouds.try_recv() {
        if latest.is_some() {
            debug!("点云覆盖: 上一帧未被使用");
        }
        latest = Some(cloud);
    }
    if let Some(cloud) = latest {
        localizer.update_cloud(cloud);
    }
}

/// 打印运行统计
pub fn print_stats(stats: &FrameStats) {
    info!(
        "📊 定位统计: {}帧 (空闲{}) | 定位{}个物体 | 跳过{}个区域 | 中止{}帧 | 过滤{}个小框",
        stats.ticks,
        stats.idle_ticks,
        stats.localized_objects,
        stats.skipped_regions,
        stats.aborted_frames,
        stats.rejected_regions
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::LocalizerConfig;
    use crate::geometry::Point3;
    use crate::visualization::RecordingVisualizer;

    fn grid_cloud(width: u32, height: u32) -> PointCloud {
        let points = (0..height)
            .flat_map(|v| (0..width).map(move |u| Point3::new(u as f32 * 0.001, v as f32 * 0.001, 0.8)))
            .collect();
        PointCloud::organized("camera", width, height, points)
    }

    fn reference_node() -> (LocalizerNode, Arc<Mutex<RecordingVisualizer>>) {
        let vis = Arc::new(Mutex::new(RecordingVisualizer::default()));
        let localizer = Localizer::with_reference_geometry(&LocalizerConfig::default(), Box::new(vis.clone()));
        let node = LocalizerNode::spawn(localizer, TickSource::Manual).unwrap();
        (node, vis)
    }

    #[test]
    fn test_manual_ticks_are_serialized_with_inputs() {
        let (node, vis) = reference_node();
        let inputs = node.inputs();

        // 还没有点云: 几何异常, 候选框保留
        inputs.send_regions(vec![Region::new(10, 10, 100, 100)]).unwrap();
        inputs.tick().unwrap();
        let first = node.outcomes().recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.is_aborted());

        // 点云到达后下一帧重新处理
        inputs.send_cloud(grid_cloud(320, 240)).unwrap();
        inputs.tick().unwrap();
        let second = node.outcomes().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.localized(), 1);

        inputs.tick().unwrap();
        let third = node.outcomes().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(third, FrameOutcome::NoRegions);

        let localizer = node.join().unwrap();
        assert_eq!(localizer.stats().ticks, 3);
        assert_eq!(localizer.stats().aborted_frames, 1);
        assert_eq!(vis.lock().child_frames(), vec!["object_0"]);
    }

    #[test]
    fn test_periodic_ticks() {
        let vis = Arc::new(Mutex::new(RecordingVisualizer::default()));
        let localizer = Localizer::with_reference_geometry(&LocalizerConfig::default(), Box::new(vis.clone()));
        let node = LocalizerNode::spawn(localizer, TickSource::Periodic(Duration::from_millis(5))).unwrap();
        let inputs = node.inputs();

        inputs.send_cloud(grid_cloud(320, 240)).unwrap();
        inputs
            .send_regions(vec![Region::new(0, 0, 100, 100), Region::new(150, 100, 100, 100)])
            .unwrap();

        // 等到有物体被定位
        let mut localized = 0;
        while localized == 0 {
            let outcome = node.outcomes().recv_timeout(Duration::from_secs(5)).unwrap();
            localized = outcome.localized();
        }
        assert_eq!(localized, 2);

        let localizer = node.join().unwrap();
        assert!(localizer.regions().is_empty());
        assert_eq!(vis.lock().marker_batches.len(), 1);
    }

    #[test]
    fn test_final_tick_survives_join() {
        for _ in 0..50 {
            let (node, vis) = reference_node();
            let inputs = node.inputs();
            inputs.send_cloud(grid_cloud(320, 240)).unwrap();
            inputs.send_regions(vec![Region::new(10, 10, 100, 100)]).unwrap();
            inputs.tick().unwrap();

            let localizer = node.join().unwrap();
            assert_eq!(localizer.stats().ticks, 1);
            assert_eq!(localizer.stats().localized_objects, 1);
            assert!(localizer.regions().is_empty());
            assert_eq!(vis.lock().child_frames(), vec!["object_0"]);
        }
    }

    #[test]
    fn test_unread_outcomes_are_bounded() {
        let vis = Arc::new(Mutex::new(RecordingVisualizer::default()));
        let localizer = Localizer::with_reference_geometry(&LocalizerConfig::default(), Box::new(vis));
        let node = LocalizerNode::spawn(localizer, TickSource::Periodic(Duration::from_millis(1))).unwrap();

        std::thread::sleep(Duration::from_millis(300));
        let queued = node.outcomes().len();
        assert!(queued <= OUTCOME_CAPACITY);

        let localizer = node.join().unwrap();
        assert!(localizer.stats().ticks as usize >= queued);
        assert_eq!(localizer.stats().ticks, localizer.stats().idle_ticks);
    }

    #[test]
    fn test_inputs_fail_after_join() {
        let (node, _vis) = reference_node();
        let inputs = node.inputs();
        node.join().unwrap();
        assert!(inputs.tick().is_err());
    }
}
