//! Reachable velocity window sampling.

use crate::PlannerConfig;
use types::Twist;

/// Evenly spaced samples over `[lo, hi]`, endpoints included.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

/// The set of (linear, angular) velocity pairs reachable within one
/// lookahead horizon under the acceleration limit.
#[derive(Debug, Clone)]
pub struct DynamicWindow {
    pub linear: Vec<f64>,
    pub angular: Vec<f64>,
}

impl DynamicWindow {
    /// Build the window around the current twist.
    pub fn build(config: &PlannerConfig, twist: &Twist) -> Self {
        Self {
            linear: axis_samples(
                twist.linear,
                config.min_linear_vel,
                config.max_linear_vel,
                config.max_acc,
                config.lookahead,
                config.res_lin_vel_space,
            ),
            angular: axis_samples(
                twist.angular,
                config.min_angular_vel,
                config.max_angular_vel,
                config.max_acc,
                config.lookahead,
                config.res_ang_vel_space,
            ),
        }
    }

    /// Number of candidate pairs.
    pub fn len(&self) -> usize {
        self.linear.len() * self.angular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty() || self.angular.is_empty()
    }
}

/// One velocity axis clamped to its limits.
///
/// If the current velocity is so far outside the limits that the reachable
/// band misses them entirely, fall back to the full configured range so the
/// search space stays non-empty.
fn axis_samples(x: f64, lo_limit: f64, hi_limit: f64, accel: f64, tau: f64, n: usize) -> Vec<f64> {
    let reach = accel * tau;
    if x - reach > hi_limit || x + reach < lo_limit {
        return linspace(lo_limit, hi_limit, n);
    }
    let lo = (x - reach).max(lo_limit);
    let hi = (x + reach).min(hi_limit);
    linspace(lo, hi, n)
}
