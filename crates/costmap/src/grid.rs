//! Flat row-major cost grid with world-frame origin.

use crate::{costs, CostmapError};
use types::{GridMsg, Pose};

/// Row-major signed cost grid.
///
/// The origin is the world pose of the corner of cell (0, 0); grids are
/// axis-aligned, so the origin yaw is carried through but not applied to
/// cell indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct CostGrid {
    pub(crate) data: Vec<i8>,
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
    /// Cell resolution in meters
    pub resolution: f64,
    /// World pose of the grid origin
    pub origin: Pose,
}

impl CostGrid {
    /// Create a grid filled with free cells.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f64,
        origin: Pose,
    ) -> Result<Self, CostmapError> {
        if resolution <= 0.0 {
            return Err(CostmapError::InvalidResolution(resolution));
        }
        Ok(Self {
            data: vec![costs::FREE; width * height],
            width,
            height,
            resolution,
            origin,
        })
    }

    /// Build from an occupancy grid message, validating dimensions.
    pub fn from_msg(msg: &GridMsg) -> Result<Self, CostmapError> {
        if msg.resolution <= 0.0 {
            return Err(CostmapError::InvalidResolution(msg.resolution));
        }
        let expected = msg.width as usize * msg.height as usize;
        if msg.data.len() != expected {
            return Err(CostmapError::DimensionMismatch {
                width: msg.width,
                height: msg.height,
                actual: msg.data.len(),
            });
        }
        Ok(Self {
            data: msg.data.clone(),
            width: msg.width as usize,
            height: msg.height as usize,
            resolution: msg.resolution,
            origin: msg.origin,
        })
    }

    /// Convert to a publishable message with the given stamp.
    pub fn to_msg(&self, stamp: u64) -> GridMsg {
        GridMsg {
            width: self.width as u32,
            height: self.height as u32,
            resolution: self.resolution,
            origin: self.origin,
            data: self.data.clone(),
            stamp,
        }
    }

    /// Convert world coordinates to a grid cell, `None` out of bounds.
    pub fn world_to_grid(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let local_x = x - self.origin.x;
        let local_y = y - self.origin.y;

        if local_x < 0.0 || local_y < 0.0 {
            return None;
        }

        let gx = (local_x / self.resolution).floor() as usize;
        let gy = (local_y / self.resolution).floor() as usize;

        if gx < self.width && gy < self.height {
            Some((gx, gy))
        } else {
            None
        }
    }

    /// Convert grid cell to world coordinates (cell center).
    pub fn grid_to_world(&self, gx: usize, gy: usize) -> (f64, f64) {
        let x = self.origin.x + (gx as f64 + 0.5) * self.resolution;
        let y = self.origin.y + (gy as f64 + 0.5) * self.resolution;
        (x, y)
    }

    pub(crate) fn index(&self, gx: usize, gy: usize) -> Option<usize> {
        if gx < self.width && gy < self.height {
            Some(gy * self.width + gx)
        } else {
            None
        }
    }

    /// Cell value at grid coordinates, `None` out of bounds.
    pub fn get(&self, gx: usize, gy: usize) -> Option<i8> {
        self.index(gx, gy).map(|i| self.data[i])
    }

    /// Set a cell value; writes out of bounds are dropped.
    pub fn set(&mut self, gx: usize, gy: usize, value: i8) {
        if let Some(i) = self.index(gx, gy) {
            self.data[i] = value;
        }
    }

    /// Grid coordinates of all occupied cells.
    pub fn occupied_cells(&self) -> Vec<(usize, usize)> {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == costs::OCCUPIED)
            .map(|(i, _)| (i % self.width, i / self.width))
            .collect()
    }

    /// Raw row-major cell data.
    pub fn data(&self) -> &[i8] {
        &self.data
    }
}
