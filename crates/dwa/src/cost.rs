//! Candidate trajectory scoring.
//!
//! Total cost is the gain-weighted sum of four terms: velocity,
//! goal-heading, path-proximity, and obstacle-clearance. A trajectory that
//! comes closer to an obstacle than the stopping distance scores infinite.

use crate::rollout::{rollout, Trajectory};
use crate::PlannerConfig;
use std::f64::consts::PI;
use transforms::wrap_angle;
use types::{Point2d, Pose};

/// Scores velocity pairs against one snapshot of the world.
pub struct Evaluator<'a> {
    config: &'a PlannerConfig,
    pose: Pose,
    path: &'a [Point2d],
    obstacles: &'a [Point2d],
}

impl<'a> Evaluator<'a> {
    pub fn new(
        config: &'a PlannerConfig,
        pose: Pose,
        path: &'a [Point2d],
        obstacles: &'a [Point2d],
    ) -> Self {
        Self {
            config,
            pose,
            path,
            obstacles,
        }
    }

    /// Roll out the pair and return its total cost with the trajectory.
    pub fn score(&self, v: f64, omega: f64) -> (f64, Trajectory) {
        let traj = rollout(
            &self.pose,
            v,
            omega,
            self.config.lookahead,
            self.config.rollout_steps,
        );

        let cost = self.config.gain_vel * self.velocity_cost(v)
            + self.config.gain_goal_angle * self.goal_heading_cost(&traj.terminal)
            + self.config.gain_glob_path * self.path_cost(&traj.terminal)
            + self.config.gain_clearance * self.clearance_cost(v, &traj);
        (cost, traj)
    }

    /// Prefers fast candidates: 0 at max velocity, 1 at min.
    fn velocity_cost(&self, v: f64) -> f64 {
        let span = self.config.max_linear_vel - self.config.min_linear_vel;
        if span <= 0.0 {
            return 0.0;
        }
        (self.config.max_linear_vel - v) / span
    }

    /// Misalignment between the terminal heading and the goal bearing,
    /// normalized to [0, 1].
    fn goal_heading_cost(&self, terminal: &Pose) -> f64 {
        let Some(goal) = self.path.last() else {
            return 0.0;
        };
        let bearing = (goal.y - terminal.y).atan2(goal.x - terminal.x);
        wrap_angle(bearing - terminal.yaw).abs() / PI
    }

    /// Distance from the terminal point to the nearest path waypoint.
    fn path_cost(&self, terminal: &Pose) -> f64 {
        self.path
            .iter()
            .map(|p| {
                let dx = p.x - terminal.x;
                let dy = p.y - terminal.y;
                (dx * dx + dy * dy).sqrt()
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Inverse clearance to the nearest obstacle along the trajectory;
    /// infinite when any point is within stopping distance.
    fn clearance_cost(&self, v: f64, traj: &Trajectory) -> f64 {
        if self.obstacles.is_empty() {
            // No obstacle in reach of the local costmap
            return 2.0 / self.config.local_length;
        }

        let mut min_dist = f64::INFINITY;
        for point in &traj.points {
            for obstacle in self.obstacles {
                let dx = obstacle.x - point.x;
                let dy = obstacle.y - point.y;
                let d = (dx * dx + dy * dy).sqrt();
                if d < min_dist {
                    min_dist = d;
                }
            }
        }

        let stopping = v * v / (2.0 * self.config.max_dec);
        let threshold = self.config.robot_radius + self.config.safety_distance + stopping;
        if min_dist < threshold {
            f64::INFINITY
        } else {
            1.0 / min_dist
        }
    }
}
