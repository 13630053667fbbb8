//! Shared fixtures for the navigation integration tests.

use mapserver::{MapProvider, MapServerError};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use types::{GridMsg, Pose};

/// In-memory map store standing in for the external map provider.
pub struct FakeMapProvider {
    maps: HashMap<i8, GridMsg>,
}

impl FakeMapProvider {
    pub fn new() -> Self {
        Self {
            maps: HashMap::new(),
        }
    }

    /// Add an all-free square map.
    pub fn with_map(mut self, id: i8, side: u32, resolution: f64) -> Self {
        self.maps.insert(id, free_grid(side, resolution));
        self
    }

    /// Mark one cell of a stored map occupied.
    pub fn occupy(mut self, id: i8, gx: u32, gy: u32) -> Self {
        let msg = self.maps.get_mut(&id).expect("map must exist");
        msg.data[(gy * msg.width + gx) as usize] = 100;
        self
    }
}

impl MapProvider for FakeMapProvider {
    fn get_map(&self, id: i8) -> Result<GridMsg, MapServerError> {
        self.maps
            .get(&id)
            .cloned()
            .ok_or_else(|| MapServerError::Provider(format!("no map {}", id)))
    }
}

/// An all-free square grid message.
pub fn free_grid(side: u32, resolution: f64) -> GridMsg {
    GridMsg {
        width: side,
        height: side,
        resolution,
        origin: Pose {
            x: -(side as f64) * resolution / 2.0,
            y: -(side as f64) * resolution / 2.0,
            yaw: 0.0,
        },
        data: vec![0; (side * side) as usize],
        stamp: 0,
    }
}

/// Wait until the watched value satisfies the predicate.
pub async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<T>,
    timeout: Duration,
    mut predicate: impl FnMut(&T) -> bool,
) -> Result<T, &'static str> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        {
            let value = rx.borrow_and_update();
            if predicate(&value) {
                return Ok(value.clone());
            }
        }
        match tokio::time::timeout_at(deadline, rx.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err("channel closed"),
            Err(_) => return Err("timed out"),
        }
    }
}
