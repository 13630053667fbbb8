//! Dynamic window local planner.
//!
//! Each tick samples the reachable velocity window around the current
//! twist, rolls out every candidate pair, scores the rollouts against the
//! global path and the live obstacle set, and publishes the cheapest pair
//! as the velocity command. A recovery monitor watches the selected
//! commands for stuck conditions and, when one fires, absorbs the local
//! obstacles into the global costmap and reissues the goal.

use mapserver::{MapClient, SharedWorld};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use types::{Point2d, PointCloud, Twist};

mod cost;
mod recovery;
mod rollout;
mod window;

pub use cost::Evaluator;
pub use recovery::{RecoveryConfig, RecoveryMonitor, StuckReason};
pub use rollout::{rollout, Trajectory};
pub use window::{linspace, DynamicWindow};

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Gain {name} must be non-negative, got {value}")]
    NegativeGain { name: &'static str, value: f64 },
    #[error("Velocity limits are inverted: [{min}, {max}]")]
    InvertedLimits { min: f64, max: f64 },
    #[error("Frequency must be positive, got {0}")]
    InvalidFrequency(f64),
}

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub min_linear_vel: f64,
    pub max_linear_vel: f64,
    pub min_angular_vel: f64,
    pub max_angular_vel: f64,
    /// Acceleration bound used to build the window, in m/s^2
    pub max_acc: f64,
    /// Deceleration bound used for the stopping distance, in m/s^2
    pub max_dec: f64,
    /// Goal acceptance radius in meters
    pub min_dist_goal: f64,
    /// Rollout horizon in seconds
    pub lookahead: f64,
    /// Samples along the linear velocity axis
    pub res_lin_vel_space: usize,
    /// Samples along the angular velocity axis
    pub res_ang_vel_space: usize,
    /// Rollout sample count per trajectory
    pub rollout_steps: usize,
    pub gain_vel: f64,
    pub gain_glob_path: f64,
    pub gain_goal_angle: f64,
    pub gain_clearance: f64,
    /// Robot body radius in meters
    pub robot_radius: f64,
    /// Extra clearance margin in meters
    pub safety_distance: f64,
    /// Local costmap side length in meters (clearance default)
    pub local_length: f64,
    /// Planner loop frequency in Hz
    pub frequency: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_linear_vel: 0.0,
            max_linear_vel: 0.22,
            min_angular_vel: -2.75,
            max_angular_vel: 2.75,
            max_acc: 0.5,
            max_dec: 0.5,
            min_dist_goal: 0.1,
            lookahead: 0.3,
            res_lin_vel_space: 5,
            res_ang_vel_space: 21,
            rollout_steps: 10,
            gain_vel: 1.0,
            gain_glob_path: 1.0,
            gain_goal_angle: 1.0,
            gain_clearance: 1.0,
            robot_radius: 0.12,
            safety_distance: 0.05,
            local_length: 3.3,
            frequency: 10.0,
        }
    }
}

impl PlannerConfig {
    /// Check limits and gains before entering the loop.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.min_linear_vel > self.max_linear_vel {
            return Err(PlannerError::InvertedLimits {
                min: self.min_linear_vel,
                max: self.max_linear_vel,
            });
        }
        if self.min_angular_vel > self.max_angular_vel {
            return Err(PlannerError::InvertedLimits {
                min: self.min_angular_vel,
                max: self.max_angular_vel,
            });
        }
        if self.frequency <= 0.0 {
            return Err(PlannerError::InvalidFrequency(self.frequency));
        }
        for (name, value) in [
            ("gain_vel", self.gain_vel),
            ("gain_glob_path", self.gain_glob_path),
            ("gain_goal_angle", self.gain_goal_angle),
            ("gain_clearance", self.gain_clearance),
        ] {
            if value < 0.0 {
                return Err(PlannerError::NegativeGain { name, value });
            }
        }
        Ok(())
    }
}

/// Dynamic window planner loop.
pub struct DwaPlanner {
    config: PlannerConfig,
    recovery: RecoveryMonitor,
    world: SharedWorld,
    map_client: MapClient,
    cmd_tx: watch::Sender<Twist>,
    traj_tx: watch::Sender<PointCloud>,
    goal_tx: watch::Sender<Option<Point2d>>,
    active: bool,
    seen_path_seq: u64,
}

impl DwaPlanner {
    pub fn new(
        config: PlannerConfig,
        recovery_config: RecoveryConfig,
        world: SharedWorld,
        map_client: MapClient,
        cmd_tx: watch::Sender<Twist>,
        traj_tx: watch::Sender<PointCloud>,
        goal_tx: watch::Sender<Option<Point2d>>,
    ) -> Result<Self, PlannerError> {
        config.validate()?;
        let dt = 1.0 / config.frequency;
        Ok(Self {
            config,
            recovery: RecoveryMonitor::new(recovery_config, dt),
            world,
            map_client,
            cmd_tx,
            traj_tx,
            goal_tx,
            active: false,
            seen_path_seq: 0,
        })
    }

    /// Run until shutdown; publishes a final zero twist on exit.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = Duration::from_secs_f64(1.0 / self.config.frequency);
        info!(frequency = self.config.frequency, "Planner loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let start = Instant::now();
            self.tick().await;
            let elapsed = start.elapsed();
            if elapsed < period {
                tokio::select! {
                    _ = tokio::time::sleep(period - elapsed) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        let _ = self.cmd_tx.send(Twist::default());
        info!("Planner loop stopped");
    }

    /// Whether a plan is currently being executed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// One planner cycle.
    pub async fn tick(&mut self) {
        let (state, path, obstacles, path_seq) = {
            let world = self.world.lock().unwrap();
            (
                world.state,
                world.path.clone(),
                world.obstacles.clone(),
                world.path_seq,
            )
        };

        if path_seq != self.seen_path_seq {
            self.seen_path_seq = path_seq;
            self.active = !path.is_empty();
            self.recovery.reset();
            if self.active {
                info!(waypoints = path.len(), "New global path, plan active");
            }
        }
        if !self.active || path.is_empty() {
            return;
        }

        let window = DynamicWindow::build(&self.config, &state.twist);
        let evaluator = Evaluator::new(&self.config, state.pose, &path.points, &obstacles);

        let mut best: Option<(f64, Twist, Trajectory)> = None;
        for &omega in &window.angular {
            for &v in &window.linear {
                let (cost, traj) = evaluator.score(v, omega);
                if best.as_ref().map_or(true, |(c, _, _)| cost < *c) {
                    best = Some((
                        cost,
                        Twist {
                            linear: v,
                            angular: omega,
                        },
                        traj,
                    ));
                }
            }
        }
        let Some((best_cost, best_twist, best_traj)) = best else {
            return;
        };
        if best_cost.is_infinite() {
            warn!("Every candidate trajectory collides, commanding the least bad");
        }

        if let Some(reason) = self.recovery.observe(best_twist.linear, best_twist.angular, path.len())
        {
            self.trigger_recovery(reason, path.goal()).await;
            return;
        }

        // Command first, then visualization
        let _ = self.cmd_tx.send(best_twist);
        let _ = self.traj_tx.send(PointCloud {
            points: best_traj
                .points
                .iter()
                .map(|p| Point2d::new(p.x, p.y))
                .collect(),
        });

        if let Some(goal) = path.goal() {
            let dx = state.pose.x - goal.x;
            let dy = state.pose.y - goal.y;
            if (dx * dx + dy * dy).sqrt() < self.config.min_dist_goal {
                info!(x = goal.x, y = goal.y, "Goal reached");
                self.active = false;
                self.recovery.reset();
                let _ = self.cmd_tx.send(Twist::default());
            }
        }
    }

    async fn trigger_recovery(&mut self, reason: StuckReason, goal: Option<Point2d>) {
        warn!(?reason, "Recovery triggered, abandoning plan");
        self.active = false;
        let _ = self.cmd_tx.send(Twist::default());

        if !self.map_client.add_local_map("stuck").await {
            warn!("Local obstacle absorption was rejected");
        }
        if let Some(goal) = goal {
            let _ = self.goal_tx.send(Some(goal));
        }
    }
}
