//! Shared robot world state.
//!
//! One coarse mutex guards the snapshot written by the sensor intakes and
//! read by the planner and local-costmap loops. Intake writes and loop
//! snapshot copies are the only critical sections; no computation happens
//! under the lock.

use std::sync::{Arc, Mutex};
use std::time::Instant;
use transforms::{wrap_angle, Transform2D, TransformTree};
use types::{LaserScan, Odometry, Path, Point2d, RobotState};

/// Latest sensor and plan state, guarded by a single mutex.
#[derive(Debug)]
pub struct World {
    /// Map-frame pose and body twist, written by the odometry intake
    pub state: RobotState,
    /// Latest laser scan
    pub scan: Option<LaserScan>,
    /// When the latest scan arrived
    pub scan_received: Option<Instant>,
    /// Current global path; replaced atomically on arrival
    pub path: Path,
    /// Incremented whenever a new path is stored
    pub path_seq: u64,
    /// Latest map-frame obstacle points from the local-costmap loop
    pub obstacles: Vec<Point2d>,
    /// Frame chain: map <- odom <- base_link <- laser
    pub tf: TransformTree,
}

impl World {
    pub fn new(laser_mount: Transform2D) -> Self {
        Self {
            state: RobotState::default(),
            scan: None,
            scan_received: None,
            path: Path::default(),
            path_seq: 0,
            obstacles: Vec::new(),
            tf: TransformTree::new(laser_mount),
        }
    }

    /// Store an odometry sample: updates the transform tree and the
    /// map-frame robot state.
    pub fn apply_odometry(&mut self, odom: &Odometry) {
        let pose = odom.pose();
        self.tf.update_odom(Transform2D::from_pose(&pose));

        let mut map_pose = self.tf.base_in_map().to_pose();
        map_pose.yaw = wrap_angle(map_pose.yaw);
        self.state.pose = map_pose;
        self.state.twist = odom.twist;
    }

    /// Store a laser scan.
    pub fn apply_scan(&mut self, scan: LaserScan) {
        self.scan = Some(scan);
        self.scan_received = Some(Instant::now());
    }

    /// Replace the global path.
    pub fn apply_path(&mut self, path: Path) {
        self.path = path;
        self.path_seq += 1;
    }
}

pub type SharedWorld = Arc<Mutex<World>>;

/// Create the shared world container.
pub fn shared_world(laser_mount: Transform2D) -> SharedWorld {
    Arc::new(Mutex::new(World::new(laser_mount)))
}
