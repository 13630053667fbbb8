//! Constant-twist forward rollout.

use nalgebra::Point2;
use transforms::wrap_angle;
use types::Pose;

/// Angular velocities below this magnitude integrate as a straight line.
const OMEGA_STRAIGHT_EPS: f64 = 1e-3;

/// Sampled rollout of one velocity pair.
#[derive(Debug, Clone)]
pub struct Trajectory {
    /// Sampled points, excluding the starting state
    pub points: Vec<Point2<f64>>,
    /// Pose at the end of the horizon
    pub terminal: Pose,
}

/// Integrate a constant twist (v, omega) for `tau` seconds in `steps`
/// samples from the given pose.
pub fn rollout(pose: &Pose, v: f64, omega: f64, tau: f64, steps: usize) -> Trajectory {
    let m = steps.max(1);
    let psi = pose.yaw;
    let mut points = Vec::with_capacity(m);

    if omega.abs() < OMEGA_STRAIGHT_EPS {
        let (dir_x, dir_y) = (psi.cos(), psi.sin());
        for k in 1..=m {
            let t = tau * k as f64 / m as f64;
            points.push(Point2::new(pose.x + v * dir_x * t, pose.y + v * dir_y * t));
        }
    } else {
        let r = v / omega;
        for k in 1..=m {
            let phi = psi + omega * tau * k as f64 / m as f64;
            points.push(Point2::new(
                pose.x - r * psi.sin() + r * phi.sin(),
                pose.y + r * psi.cos() - r * phi.cos(),
            ));
        }
    }

    let end = points[m - 1];
    Trajectory {
        points,
        terminal: Pose {
            x: end.x,
            y: end.y,
            yaw: wrap_angle(psi + omega * tau),
        },
    }
}
