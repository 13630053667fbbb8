//! Stuck detection for the planner loop.
//!
//! Three independent triggers, checked once per planner tick:
//! - low-velocity stall: the selected linear velocity stays below a floor
//! - circling: the selected angular velocity keeps one sign
//! - path timeout: the plan has been active longer than its length warrants

use tracing::info;

/// Recovery trigger thresholds.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Linear velocity floor in m/s
    pub min_lin_vel: f64,
    /// Seconds below the floor before a stall triggers
    pub min_lin_vel_time: f64,
    /// Seconds of one-signed rotation before circling triggers
    pub circling_time: f64,
    /// Seconds allowed per path waypoint before timeout triggers
    pub path_time_factor: f64,
    /// Minimum path length (waypoints) for the timeout to apply
    pub path_length: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            min_lin_vel: 0.05,
            min_lin_vel_time: 2.0,
            circling_time: 3.0,
            path_time_factor: 0.4,
            path_length: 15,
        }
    }
}

/// Why the planner considered itself stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckReason {
    LowVelocity,
    Circling,
    PathTimeout,
}

/// Tick counters feeding the three triggers.
#[derive(Debug)]
pub struct RecoveryMonitor {
    config: RecoveryConfig,
    dt: f64,
    low_vel_ticks: u32,
    circling_pos_ticks: u32,
    circling_neg_ticks: u32,
    path_ticks: u32,
}

impl RecoveryMonitor {
    pub fn new(config: RecoveryConfig, dt: f64) -> Self {
        Self {
            config,
            dt,
            low_vel_ticks: 0,
            circling_pos_ticks: 0,
            circling_neg_ticks: 0,
            path_ticks: 0,
        }
    }

    /// Feed the selected velocity pair for this tick. Returns the trigger
    /// that fired, if any; all counters reset on a trigger.
    pub fn observe(&mut self, v: f64, omega: f64, path_len: usize) -> Option<StuckReason> {
        self.path_ticks += 1;

        if v < self.config.min_lin_vel {
            self.low_vel_ticks += 1;
        } else {
            self.low_vel_ticks = 0;
        }

        if omega > 0.0 {
            self.circling_pos_ticks += 1;
            self.circling_neg_ticks = 0;
        } else if omega < 0.0 {
            self.circling_neg_ticks += 1;
            self.circling_pos_ticks = 0;
        } else {
            self.circling_pos_ticks = 0;
            self.circling_neg_ticks = 0;
        }

        let stall_ticks = (self.config.min_lin_vel_time / self.dt).round() as u32;
        if self.low_vel_ticks >= stall_ticks {
            info!(ticks = self.low_vel_ticks, "Low-velocity stall detected");
            self.reset();
            return Some(StuckReason::LowVelocity);
        }

        let circling_ticks = (self.config.circling_time / self.dt).round() as u32;
        if self.circling_pos_ticks >= circling_ticks || self.circling_neg_ticks >= circling_ticks {
            info!("Circling detected");
            self.reset();
            return Some(StuckReason::Circling);
        }

        if path_len > self.config.path_length {
            let limit = (self.config.path_time_factor * path_len as f64 / self.dt).floor() as u32;
            if self.path_ticks >= limit {
                info!(ticks = self.path_ticks, waypoints = path_len, "Path timeout");
                self.reset();
                return Some(StuckReason::PathTimeout);
            }
        }

        None
    }

    /// Clear all counters (trigger fired, goal reached, or new plan).
    pub fn reset(&mut self) {
        self.low_vel_ticks = 0;
        self.circling_pos_ticks = 0;
        self.circling_neg_ticks = 0;
        self.path_ticks = 0;
    }

    #[cfg(test)]
    fn counters(&self) -> (u32, u32, u32, u32) {
        (
            self.low_vel_ticks,
            self.circling_pos_ticks,
            self.circling_neg_ticks,
            self.path_ticks,
        )
    }
}
