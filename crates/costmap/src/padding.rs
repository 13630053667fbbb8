//! Disk-mask padding around occupied cells.
//!
//! Every occupied cell imprints a radial cost disk: cells within the hard
//! radius become forbidden, cells in the soft rings beyond take the decay
//! profile value of their ring. Each write only ever raises a cell, so the
//! result is independent of the order occupied cells are visited.

use crate::{costs, CostGrid, CostmapError, DecayProfile};

#[derive(Debug, Clone, Copy)]
struct StampCell {
    dx: i32,
    dy: i32,
    value: i8,
    hard: bool,
}

/// Precomputed radial stamp applied around occupied cells.
#[derive(Debug, Clone)]
pub struct Padding {
    padded_val: i8,
    stamp: Vec<StampCell>,
}

impl Padding {
    /// Build from a hard radius in meters and a soft decay profile.
    pub fn new(
        hard_radius_m: f64,
        resolution: f64,
        padded_val: i8,
        profile: &DecayProfile,
    ) -> Result<Self, CostmapError> {
        if resolution <= 0.0 {
            return Err(CostmapError::InvalidResolution(resolution));
        }
        let hard_cells = (hard_radius_m / resolution).ceil() as i32;
        Ok(Self::from_cells(hard_cells, padded_val, profile))
    }

    /// Build from a hard radius given directly in cells.
    pub fn from_cells(hard_cells: i32, padded_val: i8, profile: &DecayProfile) -> Self {
        let rings = profile.len() as i32;
        let reach = hard_cells + rings;

        let mut stamp = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                if d <= hard_cells as f64 {
                    stamp.push(StampCell {
                        dx,
                        dy,
                        value: padded_val,
                        hard: true,
                    });
                } else {
                    // Smallest ring index i with d <= hard + i
                    let ring = (d - hard_cells as f64).ceil() as i32;
                    if ring >= 1 && ring <= rings {
                        stamp.push(StampCell {
                            dx,
                            dy,
                            value: profile.values()[(ring - 1) as usize],
                            hard: false,
                        });
                    }
                }
            }
        }

        Self { padded_val, stamp }
    }

    /// Pad every occupied cell of the grid.
    pub fn pad_grid(&self, grid: &mut CostGrid) {
        let occupied = grid.occupied_cells();
        for (gx, gy) in occupied {
            self.stamp_at(grid, gx as i32, gy as i32);
        }
    }

    /// Mark one cell occupied and pad its neighborhood.
    ///
    /// Used when absorbing individual obstacle points into an existing grid.
    pub fn pad_point(&self, grid: &mut CostGrid, gx: usize, gy: usize) {
        if grid.index(gx, gy).is_none() {
            return;
        }
        grid.set(gx, gy, costs::OCCUPIED);
        self.stamp_at(grid, gx as i32, gy as i32);
    }

    fn stamp_at(&self, grid: &mut CostGrid, cx: i32, cy: i32) {
        let w = grid.width as i32;
        let h = grid.height as i32;

        for cell in &self.stamp {
            let x = cx + cell.dx;
            let y = cy + cell.dy;
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            let idx = (y * w + x) as usize;
            let current = grid.data[idx];
            if cell.hard {
                if current < self.padded_val {
                    grid.data[idx] = self.padded_val;
                }
            } else if current > costs::UNKNOWN && current < cell.value {
                grid.data[idx] = cell.value;
            }
        }
    }
}
