//! Costmap generator for the navigation stack.
//!
//! Owns the padded global costmap and the rolling local costmap:
//! - map services (switch, clear, absorb-local) served over a request
//!   channel, one handler task as the single writer of the global grid
//! - local-costmap loop converting laser scans into an ego-centered grid
//!   and a map-frame obstacle cloud
//!
//! Published grids flow through `watch` channels, so late subscribers
//! always observe the most recent (latched) value.

use costmap::CostmapError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use transforms::TransformError;
use types::GridMsg;

mod generator;
mod local;
mod world;

pub use generator::{CostmapGenerator, GeneratorConfig};
pub use local::{LocalCostmap, LocalMapConfig};
pub use world::{shared_world, SharedWorld, World};

#[derive(Error, Debug)]
pub enum MapServerError {
    #[error("Map provider call failed: {0}")]
    Provider(String),
    #[error(transparent)]
    Costmap(#[from] CostmapError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Source of static occupancy grids (external map store).
pub trait MapProvider: Send + Sync + 'static {
    /// Fetch the map with the given id. The call may block.
    fn get_map(&self, id: i8) -> Result<GridMsg, MapServerError>;
}

/// Requests served by the costmap generator task.
#[derive(Debug)]
pub enum MapRequest {
    /// Replace the stored grid with map `id`, re-pad, republish.
    SwitchMap { id: i8, reply: oneshot::Sender<bool> },
    /// For `"clear"`: refetch the current map, re-pad, republish.
    ClearMap {
        command: String,
        reply: oneshot::Sender<bool>,
    },
    /// For `"stuck"`: absorb the latest local obstacles into the global grid.
    AddLocalMap {
        command: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Handle for calling the generator's services from other tasks.
#[derive(Debug, Clone)]
pub struct MapClient {
    tx: mpsc::Sender<MapRequest>,
}

impl MapClient {
    pub fn new(tx: mpsc::Sender<MapRequest>) -> Self {
        Self { tx }
    }

    pub async fn switch_map(&self, id: i8) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(MapRequest::SwitchMap { id, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn clear_map(&self, command: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(MapRequest::ClearMap {
                command: command.to_string(),
                reply,
            })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn add_local_map(&self, command: &str) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(MapRequest::AddLocalMap {
                command: command.to_string(),
                reply,
            })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }
}
