//! navd — navigation daemon: costmap generator + dynamic window planner.

use anyhow::{Context, Result};
use clap::Parser;
use costmap::DecayKind;
use dwa::{DwaPlanner, PlannerConfig, RecoveryConfig};
use mapserver::{
    shared_world, CostmapGenerator, GeneratorConfig, LocalCostmap, LocalMapConfig, MapClient,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transforms::Transform2D;
use types::{GridMsg, PointCloud, Twist};

mod io;
mod maps;

use io::{Bridge, IoConfig};
use maps::FileMapProvider;

/// Configuration file structure (navd.toml).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    init_map_nr: i8,
    debug_mode: bool,
    log_times: bool,
    global_costmap: GlobalCostmapFileConfig,
    local_costmap: LocalCostmapFileConfig,
    planner: PlannerFileConfig,
    frames: FramesFileConfig,
    io: IoFileConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalCostmapFileConfig {
    robot_diameter: f64,
    safety_distance: f64,
    padded_val: i8,
    decay_type: String,
    decay_distance: f64,
    apply_soft_padding: bool,
}

impl Default for GlobalCostmapFileConfig {
    fn default() -> Self {
        Self {
            robot_diameter: 0.40,
            safety_distance: 0.10,
            padded_val: 99,
            decay_type: "exponential".to_string(),
            decay_distance: 0.30,
            apply_soft_padding: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LocalCostmapFileConfig {
    length: f64,
    frequency: f64,
    frequency_scan: f64,
}

impl Default for LocalCostmapFileConfig {
    fn default() -> Self {
        Self {
            length: 3.3,
            frequency: 10.0,
            frequency_scan: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PlannerFileConfig {
    min_linear_vel: f64,
    max_linear_vel: f64,
    min_angular_vel: f64,
    max_angular_vel: f64,
    max_acc: f64,
    max_dec: f64,
    min_dist_goal: f64,
    lookahead: f64,
    res_lin_vel_space: usize,
    res_ang_vel_space: usize,
    rollout_steps: usize,
    gain_vel: f64,
    gain_glob_path: f64,
    gain_goal_angle: f64,
    gain_clearance: f64,
    frequency: f64,
    rec_min_lin_vel: f64,
    rec_min_lin_vel_time: f64,
    rec_circling_time: f64,
    rec_path_time_factor: f64,
    rec_path_length: usize,
}

impl Default for PlannerFileConfig {
    fn default() -> Self {
        let planner = PlannerConfig::default();
        let recovery = RecoveryConfig::default();
        Self {
            min_linear_vel: planner.min_linear_vel,
            max_linear_vel: planner.max_linear_vel,
            min_angular_vel: planner.min_angular_vel,
            max_angular_vel: planner.max_angular_vel,
            max_acc: planner.max_acc,
            max_dec: planner.max_dec,
            min_dist_goal: planner.min_dist_goal,
            lookahead: planner.lookahead,
            res_lin_vel_space: planner.res_lin_vel_space,
            res_ang_vel_space: planner.res_ang_vel_space,
            rollout_steps: planner.rollout_steps,
            gain_vel: planner.gain_vel,
            gain_glob_path: planner.gain_glob_path,
            gain_goal_angle: planner.gain_goal_angle,
            gain_clearance: planner.gain_clearance,
            frequency: planner.frequency,
            rec_min_lin_vel: recovery.min_lin_vel,
            rec_min_lin_vel_time: recovery.min_lin_vel_time,
            rec_circling_time: recovery.circling_time,
            rec_path_time_factor: recovery.path_time_factor,
            rec_path_length: recovery.path_length,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FramesFileConfig {
    laser_x: f64,
    laser_y: f64,
    laser_yaw: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct IoFileConfig {
    listen_port: u16,
}

impl Default for IoFileConfig {
    fn default() -> Self {
        Self { listen_port: 4870 }
    }
}

impl FileConfig {
    fn load(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: FileConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(FileConfig::default())
        }
    }
}

#[derive(Parser)]
#[command(name = "navd", about = "Navigation daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/navd.toml")]
    config: PathBuf,

    /// Directory holding map_<id>.json grids
    #[arg(long, default_value = "maps")]
    map_dir: PathBuf,

    /// UDP bridge port. Overrides config file.
    #[arg(long)]
    listen_port: Option<u16>,

    /// Log directory for text logs
    #[arg(long, default_value = "/var/log/navd")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let file_config = FileConfig::load(&args.config)?;

    let level = if file_config.debug_mode && args.log_level == "info" {
        "debug"
    } else {
        args.log_level.as_str()
    };
    // The guard must be held for the lifetime of the program so logs flush
    let _log_guard = init_logging(&args.log_dir, level)?;
    if args.config.exists() {
        info!(path = %args.config.display(), "Loaded config");
    } else {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
    }

    let decay_kind: DecayKind = file_config
        .global_costmap
        .decay_type
        .parse()
        .context("invalid decay_type in [global_costmap]")?;

    let generator_config = GeneratorConfig {
        robot_diameter: file_config.global_costmap.robot_diameter,
        safety_distance: file_config.global_costmap.safety_distance,
        padded_val: file_config.global_costmap.padded_val,
        decay_kind,
        decay_distance: file_config.global_costmap.decay_distance,
        apply_soft_padding: file_config.global_costmap.apply_soft_padding,
        init_map_nr: file_config.init_map_nr,
    };
    let local_config = LocalMapConfig {
        length: file_config.local_costmap.length,
        frequency: file_config.local_costmap.frequency,
        frequency_scan: file_config.local_costmap.frequency_scan,
    };
    let p = &file_config.planner;
    let planner_config = PlannerConfig {
        min_linear_vel: p.min_linear_vel,
        max_linear_vel: p.max_linear_vel,
        min_angular_vel: p.min_angular_vel,
        max_angular_vel: p.max_angular_vel,
        max_acc: p.max_acc,
        max_dec: p.max_dec,
        min_dist_goal: p.min_dist_goal,
        lookahead: p.lookahead,
        res_lin_vel_space: p.res_lin_vel_space,
        res_ang_vel_space: p.res_ang_vel_space,
        rollout_steps: p.rollout_steps,
        gain_vel: p.gain_vel,
        gain_glob_path: p.gain_glob_path,
        gain_goal_angle: p.gain_goal_angle,
        gain_clearance: p.gain_clearance,
        robot_radius: file_config.global_costmap.robot_diameter / 2.0,
        safety_distance: file_config.global_costmap.safety_distance,
        local_length: file_config.local_costmap.length,
        frequency: p.frequency,
    };
    planner_config
        .validate()
        .context("invalid [planner] configuration")?;
    let recovery_config = RecoveryConfig {
        min_lin_vel: p.rec_min_lin_vel,
        min_lin_vel_time: p.rec_min_lin_vel_time,
        circling_time: p.rec_circling_time,
        path_time_factor: p.rec_path_time_factor,
        path_length: p.rec_path_length,
    };

    let laser_mount = Transform2D::new(
        file_config.frames.laser_x,
        file_config.frames.laser_y,
        file_config.frames.laser_yaw,
    );
    let world = shared_world(laser_mount);

    // Publication channels: latest value wins, late subscribers see it
    let (global_tx, global_rx) = watch::channel(GridMsg::default());
    let (local_tx, local_rx) = watch::channel(GridMsg::default());
    let (cloud_tx, cloud_rx) = watch::channel(PointCloud::default());
    let (cmd_tx, cmd_rx) = watch::channel(Twist::default());
    let (traj_tx, traj_rx) = watch::channel(PointCloud::default());
    let (goal_tx, goal_rx) = watch::channel(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Startup map fetch is fatal if the provider cannot serve it
    let provider = FileMapProvider::new(&args.map_dir);
    let generator = CostmapGenerator::new(provider, generator_config, world.clone(), global_tx)
        .context("failed to build the initial global costmap")?;

    let (req_tx, req_rx) = mpsc::channel(16);
    let map_client = MapClient::new(req_tx);

    let generator_task = tokio::spawn(generator.run(req_rx));

    let local = LocalCostmap::new(
        local_config,
        world.clone(),
        global_rx.clone(),
        local_tx,
        cloud_tx,
    );
    let local_task = tokio::spawn(local.run(shutdown_rx.clone()));

    let planner = DwaPlanner::new(
        planner_config,
        recovery_config,
        world.clone(),
        map_client.clone(),
        cmd_tx,
        traj_tx,
        goal_tx,
    )?;
    let planner_task = tokio::spawn(planner.run(shutdown_rx));

    if file_config.log_times {
        spawn_command_timer(cmd_rx.clone());
    }

    let io_config = IoConfig {
        listen_port: args.listen_port.unwrap_or(file_config.io.listen_port),
    };
    let bridge = Bridge::new(
        io_config,
        world,
        map_client,
        cmd_rx,
        goal_rx,
        traj_rx,
        cloud_rx,
        global_rx,
        local_rx,
    );
    let bridge_task = tokio::spawn(async move {
        if let Err(e) = bridge.run().await {
            error!(error = %e, "Bridge error");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Loops exit at their next iteration boundary; the planner publishes a
    // final zero twist which the bridge relays before it stops
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(local_task, planner_task, bridge_task);
    let _ = generator_task.await;

    info!("navd stopped");
    Ok(())
}

/// Log the interval between consecutive velocity commands.
fn spawn_command_timer(mut cmd_rx: watch::Receiver<Twist>) {
    tokio::spawn(async move {
        let mut last = Instant::now();
        while cmd_rx.changed().await.is_ok() {
            let _ = cmd_rx.borrow_and_update();
            let now = Instant::now();
            info!(
                interval_ms = now.duration_since(last).as_millis() as u64,
                "Velocity command interval"
            );
            last = now;
        }
    });
}

/// Initialize logging with stdout and rolling file output.
fn init_logging(
    log_dir: &std::path::Path,
    level: &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "navd.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "navd={level},mapserver={level},dwa={level},costmap={level}",
        ))
    });

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
