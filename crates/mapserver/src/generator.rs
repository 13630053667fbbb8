//! Global costmap generator task.
//!
//! Single writer of the padded global grid: all mutation goes through the
//! request channel drained by [`CostmapGenerator::run`], so handlers never
//! contend with each other.

use crate::{MapProvider, MapRequest, MapServerError, SharedWorld};
use costmap::{costs, CostGrid, DecayKind, DecayProfile, Padding};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use types::GridMsg;

/// Global costmap configuration.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Robot footprint diameter in meters
    pub robot_diameter: f64,
    /// Extra clearance beyond the footprint in meters
    pub safety_distance: f64,
    /// Cell value for hard-padded cells
    pub padded_val: i8,
    /// Soft-padding decay law
    pub decay_kind: DecayKind,
    /// Soft-padding reach in meters
    pub decay_distance: f64,
    /// Whether to apply graded soft padding beyond the hard disk
    pub apply_soft_padding: bool,
    /// Map id fetched at startup
    pub init_map_nr: i8,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            robot_diameter: 0.40,
            safety_distance: 0.10,
            padded_val: costs::PADDED,
            decay_kind: DecayKind::Exponential,
            decay_distance: 0.30,
            apply_soft_padding: true,
            init_map_nr: 0,
        }
    }
}

impl GeneratorConfig {
    /// Hard-padding radius in meters.
    fn hard_radius(&self) -> f64 {
        self.robot_diameter / 2.0 + self.safety_distance
    }

    /// Build the padding stamp for a grid of the given resolution.
    fn padding(&self, resolution: f64) -> Result<Padding, MapServerError> {
        let profile = if self.apply_soft_padding {
            DecayProfile::new(self.decay_kind, self.decay_distance, resolution)?
        } else {
            DecayProfile::empty()
        };
        Ok(Padding::new(
            self.hard_radius(),
            resolution,
            self.padded_val,
            &profile,
        )?)
    }
}

/// Owns the padded global costmap and serves map requests.
pub struct CostmapGenerator<P: MapProvider> {
    provider: P,
    config: GeneratorConfig,
    world: SharedWorld,
    grid: CostGrid,
    padding: Padding,
    current_map: i8,
    stamp: u64,
    grid_tx: watch::Sender<GridMsg>,
}

impl<P: MapProvider> CostmapGenerator<P> {
    /// Fetch the initial map, pad it, and publish. A provider failure here
    /// is fatal; after startup failures only fail the individual request.
    pub fn new(
        provider: P,
        config: GeneratorConfig,
        world: SharedWorld,
        grid_tx: watch::Sender<GridMsg>,
    ) -> Result<Self, MapServerError> {
        let map_id = config.init_map_nr;
        let msg = provider.get_map(map_id)?;
        let mut grid = CostGrid::from_msg(&msg)?;
        let padding = config.padding(grid.resolution)?;
        padding.pad_grid(&mut grid);

        let mut generator = Self {
            provider,
            config,
            world,
            grid,
            padding,
            current_map: map_id,
            stamp: 0,
            grid_tx,
        };
        generator.publish();
        info!(
            map = map_id,
            width = generator.grid.width,
            height = generator.grid.height,
            "Global costmap ready"
        );
        Ok(generator)
    }

    /// Drain map requests until the channel closes.
    pub async fn run(mut self, mut requests: mpsc::Receiver<MapRequest>) {
        while let Some(request) = requests.recv().await {
            match request {
                MapRequest::SwitchMap { id, reply } => {
                    let _ = reply.send(self.switch_map(id));
                }
                MapRequest::ClearMap { command, reply } => {
                    let _ = reply.send(self.clear_map(&command));
                }
                MapRequest::AddLocalMap { command, reply } => {
                    let _ = reply.send(self.add_local_map(&command));
                }
            }
        }
        info!("Map request channel closed, generator stopping");
    }

    /// Current padded grid (latest published state).
    pub fn grid(&self) -> &CostGrid {
        &self.grid
    }

    fn switch_map(&mut self, id: i8) -> bool {
        let msg = match self.provider.get_map(id) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(map = id, error = %e, "Map switch failed, keeping current grid");
                return false;
            }
        };
        let mut grid = match CostGrid::from_msg(&msg) {
            Ok(grid) => grid,
            Err(e) => {
                warn!(map = id, error = %e, "Provider returned a malformed grid");
                return false;
            }
        };
        let padding = match self.config.padding(grid.resolution) {
            Ok(padding) => padding,
            Err(e) => {
                warn!(map = id, error = %e, "Cannot build padding for grid");
                return false;
            }
        };
        padding.pad_grid(&mut grid);

        self.grid = grid;
        self.padding = padding;
        self.current_map = id;
        self.publish();
        info!(map = id, "Switched global costmap");
        true
    }

    fn clear_map(&mut self, command: &str) -> bool {
        if command != "clear" {
            warn!(command, "Rejecting clear request");
            return false;
        }
        let id = self.current_map;
        if self.switch_map(id) {
            info!(map = id, "Cleared global costmap");
            true
        } else {
            false
        }
    }

    fn add_local_map(&mut self, command: &str) -> bool {
        if command != "stuck" {
            warn!(command, "Rejecting absorb request");
            return false;
        }

        let obstacles = {
            let world = self.world.lock().unwrap();
            world.obstacles.clone()
        };

        let mut absorbed = 0usize;
        for point in &obstacles {
            if let Some((gx, gy)) = self.grid.world_to_grid(point.x, point.y) {
                self.padding.pad_point(&mut self.grid, gx, gy);
                absorbed += 1;
            }
        }
        self.publish();
        info!(
            absorbed,
            skipped = obstacles.len() - absorbed,
            "Absorbed local obstacles into global costmap"
        );
        true
    }

    fn publish(&mut self) {
        self.stamp += 1;
        let _ = self.grid_tx.send(self.grid.to_msg(self.stamp));
    }
}
