//! Integration tests for the navigation stack.
//!
//! Wires the costmap generator, local-costmap loop, and planner loop the
//! way the daemon does, drives them with synthetic odometry and scans over
//! the world container, and observes the published channels.

use dwa::{DwaPlanner, PlannerConfig, RecoveryConfig};
use mapserver::{
    shared_world, CostmapGenerator, GeneratorConfig, LocalCostmap, LocalMapConfig, MapClient,
    SharedWorld,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use transforms::Transform2D;
use types::{GridMsg, LaserScan, Odometry, Path, Point2d, PointCloud, Quaternion, Twist};

mod common;
use common::{wait_for, FakeMapProvider};
use costmap::costs;

const WAIT: Duration = Duration::from_secs(3);

/// The full stack as the daemon wires it.
struct Stack {
    world: SharedWorld,
    client: MapClient,
    global_rx: watch::Receiver<GridMsg>,
    local_rx: watch::Receiver<GridMsg>,
    cloud_rx: watch::Receiver<PointCloud>,
    cmd_rx: watch::Receiver<Twist>,
    traj_rx: watch::Receiver<PointCloud>,
    goal_rx: watch::Receiver<Option<Point2d>>,
    shutdown_tx: watch::Sender<bool>,
}

fn launch(
    provider: FakeMapProvider,
    planner_config: PlannerConfig,
    recovery_config: RecoveryConfig,
) -> Stack {
    let world = shared_world(Transform2D::identity());
    let (global_tx, global_rx) = watch::channel(GridMsg::default());
    let (local_tx, local_rx) = watch::channel(GridMsg::default());
    let (cloud_tx, cloud_rx) = watch::channel(PointCloud::default());
    let (cmd_tx, cmd_rx) = watch::channel(Twist::default());
    let (traj_tx, traj_rx) = watch::channel(PointCloud::default());
    let (goal_tx, goal_rx) = watch::channel(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let generator = CostmapGenerator::new(
        provider,
        GeneratorConfig::default(),
        world.clone(),
        global_tx,
    )
    .expect("startup map fetch");
    let (req_tx, req_rx) = mpsc::channel(8);
    let client = MapClient::new(req_tx);
    tokio::spawn(generator.run(req_rx));

    let local = LocalCostmap::new(
        LocalMapConfig {
            length: 3.3,
            frequency: 50.0,
            frequency_scan: 50.0,
        },
        world.clone(),
        global_rx.clone(),
        local_tx,
        cloud_tx,
    );
    tokio::spawn(local.run(shutdown_rx.clone()));

    let planner = DwaPlanner::new(
        planner_config,
        recovery_config,
        world.clone(),
        client.clone(),
        cmd_tx,
        traj_tx,
        goal_tx,
    )
    .expect("planner config");
    tokio::spawn(planner.run(shutdown_rx));

    Stack {
        world,
        client,
        global_rx,
        local_rx,
        cloud_rx,
        cmd_rx,
        traj_rx,
        goal_rx,
        shutdown_tx,
    }
}

fn apply_odom(world: &SharedWorld, x: f64, y: f64, yaw: f64) {
    world.lock().unwrap().apply_odometry(&Odometry {
        x,
        y,
        orientation: Quaternion::from_yaw(yaw),
        twist: Twist::default(),
    });
}

fn apply_scan(world: &SharedWorld, ranges: Vec<f64>) {
    world.lock().unwrap().apply_scan(LaserScan {
        angle_min: 0.0,
        angle_increment: 0.01,
        ranges,
    });
}

fn apply_path(world: &SharedWorld, points: Vec<Point2d>) {
    world.lock().unwrap().apply_path(Path { points });
}

#[tokio::test]
async fn map_services_round_trip() {
    let provider = FakeMapProvider::new()
        .with_map(0, 40, 0.05)
        .occupy(0, 20, 20)
        .with_map(1, 30, 0.05);
    let world = shared_world(Transform2D::identity());
    let (global_tx, mut global_rx) = watch::channel(GridMsg::default());
    let generator =
        CostmapGenerator::new(provider, GeneratorConfig::default(), world.clone(), global_tx)
            .unwrap();
    let (req_tx, req_rx) = mpsc::channel(8);
    let client = MapClient::new(req_tx);
    tokio::spawn(generator.run(req_rx));

    let startup = global_rx.borrow_and_update().clone();
    assert_eq!(startup.stamp, 1);
    assert_eq!(startup.data[20 * 40 + 20], costs::OCCUPIED);
    // The hard disk around the obstacle is forbidden
    assert_eq!(startup.data[20 * 40 + 21], costs::PADDED);

    // Switching maps replaces the published grid
    assert!(client.switch_map(1).await);
    let switched = wait_for(&mut global_rx, WAIT, |g| g.stamp == 2)
        .await
        .unwrap();
    assert_eq!(switched.width, 30);

    // An unknown map id fails and leaves the grid alone
    assert!(!client.switch_map(7).await);
    assert_eq!(global_rx.borrow().stamp, 2);

    assert!(client.switch_map(0).await);
    let restored = wait_for(&mut global_rx, WAIT, |g| g.stamp == 3)
        .await
        .unwrap();
    assert_eq!(restored.data, startup.data);

    // Absorb dirties the grid, clear restores the startup bytes
    world.lock().unwrap().obstacles = vec![Point2d::new(0.3, 0.3)];
    assert!(client.add_local_map("stuck").await);
    let dirty = wait_for(&mut global_rx, WAIT, |g| g.stamp == 4)
        .await
        .unwrap();
    assert_ne!(dirty.data, startup.data);

    // Command mismatches change nothing
    assert!(!client.clear_map("wipe").await);
    assert!(!client.add_local_map("nope").await);
    assert_eq!(global_rx.borrow().stamp, 4);

    assert!(client.clear_map("clear").await);
    let cleared = wait_for(&mut global_rx, WAIT, |g| g.stamp == 5)
        .await
        .unwrap();
    assert_eq!(cleared.data, startup.data);
}

#[tokio::test]
async fn local_costmap_tracks_scan() {
    let provider = FakeMapProvider::new().with_map(0, 80, 0.05);
    let mut stack = launch(
        provider,
        PlannerConfig::default(),
        RecoveryConfig::default(),
    );

    apply_odom(&stack.world, 0.0, 0.0, 0.0);
    apply_scan(&stack.world, vec![1.0]);

    let grid = wait_for(&mut stack.local_rx, WAIT, |g| g.stamp > 0)
        .await
        .unwrap();
    // 3.3m at 0.05m/cell rounds to 66, bumped to odd 67
    assert_eq!(grid.width, 67);
    assert_eq!(grid.height, 67);
    let center = 33usize;
    // The beam lands 20 cells along +X from the robot
    assert_eq!(grid.data[center * 67 + center + 20], costs::OCCUPIED);

    let cloud = wait_for(&mut stack.cloud_rx, WAIT, |c| !c.points.is_empty())
        .await
        .unwrap();
    assert_eq!(cloud.points.len(), 1);
    assert!((cloud.points[0].x - 1.0).abs() < 1e-9);
    assert!(cloud.points[0].y.abs() < 1e-9);

    // The absorption set matches the published cloud
    assert_eq!(stack.world.lock().unwrap().obstacles, cloud.points);

    let _ = stack.shutdown_tx.send(true);
}

#[tokio::test]
async fn planner_commands_on_clear_path() {
    let provider = FakeMapProvider::new().with_map(0, 80, 0.05);
    let mut stack = launch(
        provider,
        PlannerConfig::default(),
        RecoveryConfig::default(),
    );

    apply_odom(&stack.world, 0.0, 0.0, 0.0);
    // Beam beyond the local reach: no obstacles
    apply_scan(&stack.world, vec![10.0]);
    apply_path(
        &stack.world,
        vec![Point2d::new(1.0, 0.0), Point2d::new(2.0, 0.0)],
    );

    let limits = PlannerConfig::default();
    let cmd = wait_for(&mut stack.cmd_rx, WAIT, |c| c.linear > 0.0)
        .await
        .unwrap();
    assert!(cmd.linear <= limits.max_linear_vel + 1e-12);
    assert!(cmd.angular >= limits.min_angular_vel - 1e-12);
    assert!(cmd.angular <= limits.max_angular_vel + 1e-12);

    // The selected trajectory is published for visualization
    let traj = wait_for(&mut stack.traj_rx, WAIT, |t| !t.points.is_empty())
        .await
        .unwrap();
    assert_eq!(traj.points.len(), limits.rollout_steps);

    // Shutdown publishes a final zero twist
    let _ = stack.shutdown_tx.send(true);
    let cmd = wait_for(&mut stack.cmd_rx, WAIT, |c| {
        c.linear == 0.0 && c.angular == 0.0
    })
    .await;
    assert!(cmd.is_ok());
}

#[tokio::test]
async fn goal_reached_latches_zero_twist() {
    let provider = FakeMapProvider::new().with_map(0, 80, 0.05);
    let mut stack = launch(
        provider,
        PlannerConfig::default(),
        RecoveryConfig::default(),
    );

    apply_odom(&stack.world, 1.0, 1.0, 0.0);
    apply_scan(&stack.world, vec![10.0]);
    // Goal within the acceptance radius of the current pose
    apply_path(&stack.world, vec![Point2d::new(1.05, 1.05)]);

    // The goal-reached tick still publishes its trajectory, then zeroes
    wait_for(&mut stack.traj_rx, WAIT, |t| !t.points.is_empty())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let cmd = *stack.cmd_rx.borrow();
    assert_eq!(cmd.linear, 0.0);
    assert_eq!(cmd.angular, 0.0);

    // Latched: later ticks do not resume motion without a new path
    tokio::time::sleep(Duration::from_millis(300)).await;
    let cmd = *stack.cmd_rx.borrow();
    assert_eq!(cmd.linear, 0.0);

    let _ = stack.shutdown_tx.send(true);
}

#[tokio::test]
async fn stall_recovery_absorbs_local_obstacles() {
    let provider = FakeMapProvider::new().with_map(0, 80, 0.05);
    // Cap the velocity below the stall floor so every tick counts toward
    // recovery, and shorten the window so the test stays fast
    let planner_config = PlannerConfig {
        max_linear_vel: 0.04,
        frequency: 20.0,
        ..PlannerConfig::default()
    };
    let recovery_config = RecoveryConfig {
        min_lin_vel: 0.05,
        min_lin_vel_time: 0.3,
        ..RecoveryConfig::default()
    };
    let mut stack = launch(provider, planner_config, recovery_config);

    apply_odom(&stack.world, 0.0, 0.0, 0.0);
    // One obstacle a meter ahead, well clear of the rollouts
    apply_scan(&stack.world, vec![1.0]);
    apply_path(
        &stack.world,
        vec![Point2d::new(2.0, 0.0), Point2d::new(3.0, 0.0)],
    );

    // Recovery republishes the goal for the global planner
    let goal = wait_for(&mut stack.goal_rx, WAIT, |g| g.is_some())
        .await
        .unwrap();
    assert_eq!(goal, Some(Point2d::new(3.0, 0.0)));

    // The obstacle was absorbed into the global costmap: world (1, 0) is
    // cell (60, 40) of the 80x80 grid with origin (-2, -2)
    let grid = wait_for(&mut stack.global_rx, WAIT, |g| g.stamp >= 2)
        .await
        .unwrap();
    assert_eq!(grid.data[40 * 80 + 60], costs::OCCUPIED);
    assert_eq!(grid.data[40 * 80 + 61], costs::PADDED);

    // And the robot was stopped
    let cmd = *stack.cmd_rx.borrow();
    assert_eq!(cmd.linear, 0.0);
    assert_eq!(cmd.angular, 0.0);

    // Clearing the map drops the absorbed obstacle again
    assert!(stack.client.clear_map("clear").await);
    let cleared = wait_for(&mut stack.global_rx, WAIT, |g| g.stamp >= 3)
        .await
        .unwrap();
    assert_eq!(cleared.data[40 * 80 + 60], costs::FREE);

    let _ = stack.shutdown_tx.send(true);
}
