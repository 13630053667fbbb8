//! Rolling local costmap derived from laser scans.
//!
//! Each tick converts the latest scan into two products:
//! - a map-frame obstacle cloud (input to the planner and to absorption)
//! - an ego-centered occupancy grid published as the local costmap

use crate::SharedWorld;
use nalgebra::Point2;
use std::f64::consts::FRAC_PI_2;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use transforms::FrameId;
use types::{GridMsg, Point2d, PointCloud, Pose};

/// How long missing preconditions are tolerated before a warning.
const WAIT_WARN_INTERVAL: Duration = Duration::from_secs(10);

/// Local costmap configuration.
#[derive(Debug, Clone)]
pub struct LocalMapConfig {
    /// Side length of the local costmap in meters
    pub length: f64,
    /// Loop frequency in Hz
    pub frequency: f64,
    /// Expected scan rate in Hz, used to flag stale scans
    pub frequency_scan: f64,
}

impl Default for LocalMapConfig {
    fn default() -> Self {
        Self {
            length: 3.3,
            frequency: 10.0,
            frequency_scan: 10.0,
        }
    }
}

/// Local costmap loop state.
pub struct LocalCostmap {
    config: LocalMapConfig,
    world: SharedWorld,
    global_rx: watch::Receiver<GridMsg>,
    grid_tx: watch::Sender<GridMsg>,
    cloud_tx: watch::Sender<PointCloud>,
    stamp: u64,
    waiting_since: Option<Instant>,
}

impl LocalCostmap {
    pub fn new(
        config: LocalMapConfig,
        world: SharedWorld,
        global_rx: watch::Receiver<GridMsg>,
        grid_tx: watch::Sender<GridMsg>,
        cloud_tx: watch::Sender<PointCloud>,
    ) -> Self {
        Self {
            config,
            world,
            global_rx,
            grid_tx,
            cloud_tx,
            stamp: 0,
            waiting_since: None,
        }
    }

    /// Run the loop until shutdown. Overruns compress the sleep to zero
    /// instead of dropping ticks.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs_f64(1.0 / self.config.frequency.max(1e-3));
        info!(
            frequency = self.config.frequency,
            length = self.config.length,
            "Local costmap loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            let start = Instant::now();
            self.tick();
            let elapsed = start.elapsed();
            if elapsed < period {
                tokio::select! {
                    _ = tokio::time::sleep(period - elapsed) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
        info!("Local costmap loop stopped");
    }

    /// One cycle: snapshot, convert, publish. Missing preconditions skip
    /// the tick without aborting the loop.
    fn tick(&mut self) {
        let (scan, pose, tf, scan_age) = {
            let world = self.world.lock().unwrap();
            if world.scan.is_none() || !world.tf.is_ready() {
                drop(world);
                self.note_waiting();
                return;
            }
            (
                world.scan.clone().unwrap(),
                world.state.pose,
                world.tf.clone(),
                world.scan_received.map(|t| t.elapsed()),
            )
        };
        self.waiting_since = None;

        if let Some(age) = scan_age {
            if age.as_secs_f64() > 2.0 / self.config.frequency_scan {
                debug!(age_ms = age.as_millis() as u64, "Scan is stale");
            }
        }

        let resolution = self.global_rx.borrow().resolution;
        if resolution <= 0.0 {
            self.note_waiting();
            return;
        }

        let laser_to_map = match tf.lookup(FrameId::Laser, FrameId::Map) {
            Ok(tf) => tf,
            Err(e) => {
                warn!(error = %e, "Transform unavailable, skipping local costmap tick");
                return;
            }
        };

        let mut side = (self.config.length / resolution).ceil() as usize;
        if side % 2 == 0 {
            side += 1;
        }
        let center = (side / 2) as i32;
        let half = self.config.length / 2.0;

        let mut data = vec![costmap::costs::FREE; side * side];
        let mut obstacles = Vec::new();

        for (i, &range) in scan.ranges.iter().enumerate() {
            if !range.is_finite() || range >= half {
                continue;
            }
            let theta = scan.angle(i);

            let sensor_point = Point2::new(range * theta.cos(), range * theta.sin());
            let map_point = laser_to_map.transform_point(sensor_point);
            obstacles.push(Point2d::new(map_point.x, map_point.y));

            let a = FRAC_PI_2 - theta - pose.yaw;
            let dx = range * a.sin();
            let dy = range * a.cos();
            // Truncation toward zero keeps near-zero offsets in the center cell
            let gx = center + (dx / resolution) as i32;
            let gy = center + (dy / resolution) as i32;
            if gx >= 0 && gy >= 0 && (gx as usize) < side && (gy as usize) < side {
                data[gy as usize * side + gx as usize] = costmap::costs::OCCUPIED;
            }
        }

        {
            let mut world = self.world.lock().unwrap();
            world.obstacles = obstacles.clone();
        }

        self.stamp += 1;
        let _ = self.cloud_tx.send(PointCloud { points: obstacles });
        let _ = self.grid_tx.send(GridMsg {
            width: side as u32,
            height: side as u32,
            resolution,
            origin: Pose {
                x: pose.x - half,
                y: pose.y - half,
                yaw: 0.0,
            },
            data,
            stamp: self.stamp,
        });
    }

    fn note_waiting(&mut self) {
        match self.waiting_since {
            None => self.waiting_since = Some(Instant::now()),
            Some(since) if since.elapsed() > WAIT_WARN_INTERVAL => {
                warn!("Local costmap still waiting for scan, odometry, and global map");
                self.waiting_since = Some(Instant::now());
            }
            Some(_) => {}
        }
    }
}
