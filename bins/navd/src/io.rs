//! UDP message bridge.
//!
//! Sensor inputs arrive as JSON datagrams (odometry, scans, paths) and the
//! stack's publications are relayed back to the most recent peer. Map
//! service requests ride the same socket and get a JSON acknowledgement.

use anyhow::Result;
use mapserver::{MapClient, SharedWorld};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use types::{GridMsg, LaserScan, Odometry, Path, Point2d, PointCloud, Twist};

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct IoConfig {
    pub listen_port: u16,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self { listen_port: 4870 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Inbound {
    Odom(Odometry),
    Scan(LaserScan),
    Path(Path),
    SwitchMap { id: i8 },
    ClearMap { command: String },
    AddLocalMap { command: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Outbound<'a> {
    ServiceReply { ok: bool },
    CmdVel(&'a Twist),
    Goal(&'a Point2d),
    Trajectory(&'a PointCloud),
    LocalObstacles(&'a PointCloud),
    GlobalCostmap(&'a GridMsg),
    LocalCostmap(&'a GridMsg),
}

/// Relays between the UDP socket and the stack's channels.
pub struct Bridge {
    config: IoConfig,
    world: SharedWorld,
    map_client: MapClient,
    cmd_rx: watch::Receiver<Twist>,
    goal_rx: watch::Receiver<Option<Point2d>>,
    traj_rx: watch::Receiver<PointCloud>,
    cloud_rx: watch::Receiver<PointCloud>,
    global_rx: watch::Receiver<GridMsg>,
    local_rx: watch::Receiver<GridMsg>,
}

impl Bridge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: IoConfig,
        world: SharedWorld,
        map_client: MapClient,
        cmd_rx: watch::Receiver<Twist>,
        goal_rx: watch::Receiver<Option<Point2d>>,
        traj_rx: watch::Receiver<PointCloud>,
        cloud_rx: watch::Receiver<PointCloud>,
        global_rx: watch::Receiver<GridMsg>,
        local_rx: watch::Receiver<GridMsg>,
    ) -> Self {
        Self {
            config,
            world,
            map_client,
            cmd_rx,
            goal_rx,
            traj_rx,
            cloud_rx,
            global_rx,
            local_rx,
        }
    }

    /// Run the bridge until the command channel closes.
    pub async fn run(mut self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.config.listen_port);
        let socket = UdpSocket::bind(&addr).await?;
        info!(addr, "Bridge listening on UDP");

        let mut buf = vec![0u8; 65536];
        let mut peer: Option<SocketAddr> = None;

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            peer = Some(addr);
                            self.handle_datagram(&socket, &buf[..len], addr).await;
                        }
                        Err(e) => warn!(error = %e, "Socket receive error"),
                    }
                }
                changed = self.cmd_rx.changed() => {
                    if changed.is_err() {
                        // Planner gone: the stack is shutting down
                        return Ok(());
                    }
                    let twist = *self.cmd_rx.borrow_and_update();
                    if let Some(addr) = peer {
                        send(&socket, addr, &Outbound::CmdVel(&twist)).await;
                    }
                }
                changed = self.goal_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let goal = *self.goal_rx.borrow_and_update();
                    if let (Some(addr), Some(goal)) = (peer, goal) {
                        send(&socket, addr, &Outbound::Goal(&goal)).await;
                    }
                }
                changed = self.traj_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let traj = self.traj_rx.borrow_and_update().clone();
                    if let Some(addr) = peer {
                        send(&socket, addr, &Outbound::Trajectory(&traj)).await;
                    }
                }
                changed = self.cloud_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let cloud = self.cloud_rx.borrow_and_update().clone();
                    if let Some(addr) = peer {
                        send(&socket, addr, &Outbound::LocalObstacles(&cloud)).await;
                    }
                }
                changed = self.global_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let grid = self.global_rx.borrow_and_update().clone();
                    if let Some(addr) = peer {
                        send(&socket, addr, &Outbound::GlobalCostmap(&grid)).await;
                    }
                }
                changed = self.local_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    let grid = self.local_rx.borrow_and_update().clone();
                    if let Some(addr) = peer {
                        send(&socket, addr, &Outbound::LocalCostmap(&grid)).await;
                    }
                }
            }
        }
    }

    async fn handle_datagram(&self, socket: &UdpSocket, data: &[u8], addr: SocketAddr) {
        let msg: Inbound = match serde_json::from_slice(data) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, bytes = data.len(), "Dropping unparseable datagram");
                return;
            }
        };

        match msg {
            Inbound::Odom(odom) => {
                self.world.lock().unwrap().apply_odometry(&odom);
            }
            Inbound::Scan(scan) => {
                self.world.lock().unwrap().apply_scan(scan);
            }
            Inbound::Path(path) => {
                info!(waypoints = path.len(), "Global path received");
                self.world.lock().unwrap().apply_path(path);
            }
            Inbound::SwitchMap { id } => {
                let ok = self.map_client.switch_map(id).await;
                send(socket, addr, &Outbound::ServiceReply { ok }).await;
            }
            Inbound::ClearMap { command } => {
                let ok = self.map_client.clear_map(&command).await;
                send(socket, addr, &Outbound::ServiceReply { ok }).await;
            }
            Inbound::AddLocalMap { command } => {
                let ok = self.map_client.add_local_map(&command).await;
                send(socket, addr, &Outbound::ServiceReply { ok }).await;
            }
        }
    }
}

async fn send(socket: &UdpSocket, addr: SocketAddr, msg: &Outbound<'_>) {
    match serde_json::to_vec(msg) {
        Ok(bytes) => {
            if let Err(e) = socket.send_to(&bytes, addr).await {
                warn!(error = %e, "Failed to send datagram");
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode outbound message"),
    }
}
