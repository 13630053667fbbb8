//! Cost grid model and obstacle padding for navigation.
//!
//! Provides:
//! - Signed cost grid with world origin and resolution
//! - Decay profiles for graded soft padding (exponential, reciprocal, linear)
//! - Disk-mask padding engine stamping hard and soft costs around obstacles
//!
//! The padded grid is what the planners consume: `99` cells are forbidden,
//! `1..=98` cells discourage proximity without forbidding it.

use thiserror::Error;

mod decay;
mod grid;
mod padding;

pub use decay::{DecayKind, DecayProfile};
pub use grid::CostGrid;
pub use padding::Padding;

#[derive(Error, Debug)]
pub enum CostmapError {
    #[error("Invalid resolution: {0}")]
    InvalidResolution(f64),
    #[error("Unknown decay type: {0:?}")]
    UnknownDecayType(String),
    #[error("Grid data length {actual} does not match {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual: usize,
    },
}

/// Cell values for the cost grid.
pub mod costs {
    /// No information about the cell
    pub const UNKNOWN: i8 = -1;
    /// Traversable
    pub const FREE: i8 = 0;
    /// Hard-padded, forbidden to plan through
    pub const PADDED: i8 = 99;
    /// Occupied by an obstacle
    pub const OCCUPIED: i8 = 100;
}
