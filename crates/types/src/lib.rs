//! Shared message types for the navigation stack.

use serde::{Deserialize, Serialize};

/// 2D world-frame pose (meters, radians).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Heading in radians (positive = counter-clockwise from X axis)
    pub yaw: f64,
}

/// Velocity command: linear (m/s) and angular (rad/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// Linear velocity in m/s (positive = forward)
    pub linear: f64,
    /// Angular velocity in rad/s (positive = counter-clockwise)
    pub angular: f64,
}

/// Orientation quaternion as carried by odometry messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Quaternion {
    /// Build a pure-yaw quaternion.
    pub fn from_yaw(yaw: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: (yaw / 2.0).sin(),
            w: (yaw / 2.0).cos(),
        }
    }

    /// Extract the yaw angle (rotation about Z).
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Odometry sample: planar position, orientation, and body twist.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Odometry {
    pub x: f64,
    pub y: f64,
    pub orientation: Quaternion,
    pub twist: Twist,
}

impl Odometry {
    /// Collapse the sample into a planar pose.
    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            y: self.y,
            yaw: self.orientation.yaw(),
        }
    }
}

/// Robot state snapshot: pose plus twist, written by the odometry intake.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RobotState {
    pub pose: Pose,
    pub twist: Twist,
}

/// A single planar range scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaserScan {
    /// Angle of the first beam, in the sensor frame (radians)
    pub angle_min: f64,
    /// Angular step between consecutive beams (radians)
    pub angle_increment: f64,
    /// Range per beam (meters)
    pub ranges: Vec<f64>,
}

impl LaserScan {
    /// Beam angle for index `i`.
    pub fn angle(&self, i: usize) -> f64 {
        self.angle_min + i as f64 * self.angle_increment
    }
}

/// A 2D world-frame point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Ordered world-frame waypoints produced by the global planner.
///
/// Immutable once received; a new path replaces the old one atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<Point2d>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// The goal is the last waypoint.
    pub fn goal(&self) -> Option<Point2d> {
        self.points.last().copied()
    }
}

/// Unordered set of world-frame points (map frame).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point2d>,
}

/// Occupancy grid message.
///
/// Row-major signed cell costs: `-1` unknown, `0` free, `1..=98` graded
/// soft cost, `99` hard-padded, `100` occupied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridMsg {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Cell resolution in meters
    pub resolution: f64,
    /// World pose of the grid origin (cell (0, 0) corner)
    pub origin: Pose,
    /// Row-major cell costs
    pub data: Vec<i8>,
    /// Monotonic publication stamp
    pub stamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_twist_serde_roundtrip() {
        let twist = Twist {
            linear: 0.22,
            angular: -0.5,
        };
        let json = serde_json::to_string(&twist).unwrap();
        let decoded: Twist = serde_json::from_str(&json).unwrap();
        assert!((decoded.linear - twist.linear).abs() < 1e-9);
        assert!((decoded.angular - twist.angular).abs() < 1e-9);
    }

    #[test]
    fn test_pose_serde_roundtrip() {
        let pose = Pose {
            x: 100.5,
            y: -50.25,
            yaw: PI / 4.0,
        };
        let json = serde_json::to_string(&pose).unwrap();
        let decoded: Pose = serde_json::from_str(&json).unwrap();
        assert!((decoded.x - pose.x).abs() < 1e-9);
        assert!((decoded.y - pose.y).abs() < 1e-9);
        assert!((decoded.yaw - pose.yaw).abs() < 1e-9);
    }

    #[test]
    fn test_quaternion_yaw_roundtrip() {
        for yaw in [-3.0, -PI / 2.0, 0.0, 0.7, PI / 2.0, 3.0] {
            let q = Quaternion::from_yaw(yaw);
            assert!((q.yaw() - yaw).abs() < 1e-12, "yaw {} decoded {}", yaw, q.yaw());
        }
    }

    #[test]
    fn test_quaternion_default_is_identity() {
        let q = Quaternion::default();
        assert!((q.yaw() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_odometry_pose_extraction() {
        let odom = Odometry {
            x: 1.5,
            y: -2.0,
            orientation: Quaternion::from_yaw(1.0),
            twist: Twist {
                linear: 0.1,
                angular: 0.0,
            },
        };
        let pose = odom.pose();
        assert!((pose.x - 1.5).abs() < 1e-12);
        assert!((pose.y + 2.0).abs() < 1e-12);
        assert!((pose.yaw - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scan_beam_angle() {
        let scan = LaserScan {
            angle_min: -PI / 2.0,
            angle_increment: 0.01,
            ranges: vec![1.0; 100],
        };
        assert!((scan.angle(0) + PI / 2.0).abs() < 1e-12);
        assert!((scan.angle(10) - (-PI / 2.0 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_path_goal_is_last_point() {
        let path = Path {
            points: vec![
                Point2d::new(0.0, 0.0),
                Point2d::new(1.0, 1.0),
                Point2d::new(2.0, 0.5),
            ],
        };
        assert_eq!(path.len(), 3);
        assert_eq!(path.goal(), Some(Point2d::new(2.0, 0.5)));
        assert!(Path::default().goal().is_none());
    }

    #[test]
    fn test_grid_msg_serde_roundtrip() {
        let msg = GridMsg {
            width: 2,
            height: 2,
            resolution: 0.05,
            origin: Pose::default(),
            data: vec![-1, 0, 99, 100],
            stamp: 7,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: GridMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.data, vec![-1, 0, 99, 100]);
        assert_eq!(decoded.stamp, 7);
    }
}
