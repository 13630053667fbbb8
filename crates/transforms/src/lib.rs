//! Coordinate frame management for the navigation stack.
//!
//! Frames, following standard robotics conventions:
//! - `map`: global fixed frame the costmap and path live in
//! - `odom`: continuous odometry frame, drifts over time
//! - `base_link`: robot body frame, X forward, Y left
//! - `laser`: scanner frame, fixed mount offset from base_link
//!
//! Transform chain: map <- odom <- base_link <- laser

use nalgebra::{Isometry2, Point2, Vector2};
use std::f64::consts::PI;
use thiserror::Error;
use types::Pose;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("No transform from {from:?} to {to:?}")]
    NotFound { from: FrameId, to: FrameId },
    #[error("Transform tree not ready: no {frame:?} update received")]
    NotReady { frame: FrameId },
}

/// Coordinate frame identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameId {
    /// Global/map frame (fixed)
    Map,
    /// Odometry frame (continuous, drifts over time)
    Odom,
    /// Robot body frame (X forward, Y left)
    BaseLink,
    /// Scanner frame (fixed mount transform from base_link)
    Laser,
}

/// A 2D rigid body transform (translation + rotation).
#[derive(Debug, Clone, Copy)]
pub struct Transform2D {
    inner: Isometry2<f64>,
}

impl Transform2D {
    /// Create identity transform.
    pub fn identity() -> Self {
        Self {
            inner: Isometry2::identity(),
        }
    }

    /// Create transform from translation and rotation angle.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            inner: Isometry2::new(Vector2::new(x, y), theta),
        }
    }

    /// Create from a Pose: the pose of the child frame in the parent frame.
    pub fn from_pose(pose: &Pose) -> Self {
        Self::new(pose.x, pose.y, pose.yaw)
    }

    /// Convert to a Pose struct.
    pub fn to_pose(&self) -> Pose {
        Pose {
            x: self.inner.translation.x,
            y: self.inner.translation.y,
            yaw: self.inner.rotation.angle(),
        }
    }

    /// Get translation component.
    pub fn translation(&self) -> Vector2<f64> {
        self.inner.translation.vector
    }

    /// Get rotation angle in radians.
    pub fn rotation(&self) -> f64 {
        self.inner.rotation.angle()
    }

    /// Compute inverse transform.
    pub fn inverse(&self) -> Self {
        Self {
            inner: self.inner.inverse(),
        }
    }

    /// Compose transforms: self * other.
    /// If self is A->B and other is B->C, result is A->C.
    pub fn compose(&self, other: &Transform2D) -> Transform2D {
        Transform2D {
            inner: self.inner * other.inner,
        }
    }

    /// Transform a point from child frame to parent frame.
    pub fn transform_point(&self, point: Point2<f64>) -> Point2<f64> {
        self.inner.transform_point(&point)
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform2D {
    type Output = Transform2D;

    fn mul(self, rhs: Transform2D) -> Transform2D {
        self.compose(&rhs)
    }
}

impl std::ops::Mul<&Transform2D> for &Transform2D {
    type Output = Transform2D;

    fn mul(self, rhs: &Transform2D) -> Transform2D {
        self.compose(rhs)
    }
}

/// Transform tree for the `map <- odom <- base_link <- laser` chain.
///
/// The laser mount transform is fixed and cached at construction; looking up
/// `laser -> map` composes the cached mount with the live odometry and map
/// correction, so no per-beam queries are needed.
#[derive(Debug, Clone)]
pub struct TransformTree {
    /// odom -> map correction (updated by the localization source)
    odom_to_map: Transform2D,
    /// base_link -> odom (updated by odometry)
    base_to_odom: Transform2D,
    /// laser -> base_link (static mount)
    laser_to_base: Transform2D,
    /// Whether an odometry update has arrived yet
    have_odom: bool,
}

impl TransformTree {
    /// Create a tree with the given laser mount transform.
    pub fn new(laser_to_base: Transform2D) -> Self {
        Self {
            odom_to_map: Transform2D::identity(),
            base_to_odom: Transform2D::identity(),
            laser_to_base,
            have_odom: false,
        }
    }

    /// Update base_link pose in the odom frame (from odometry).
    pub fn update_odom(&mut self, base_in_odom: Transform2D) {
        self.base_to_odom = base_in_odom;
        self.have_odom = true;
    }

    /// Update the odom -> map correction (from the localization source).
    pub fn update_map_correction(&mut self, odom_to_map: Transform2D) {
        self.odom_to_map = odom_to_map;
    }

    /// Whether the chain below `map` is populated.
    pub fn is_ready(&self) -> bool {
        self.have_odom
    }

    /// Current base_link pose in the map frame.
    pub fn base_in_map(&self) -> Transform2D {
        &self.odom_to_map * &self.base_to_odom
    }

    /// Current laser pose in the map frame (full chain composition).
    pub fn laser_in_map(&self) -> Transform2D {
        &(&self.odom_to_map * &self.base_to_odom) * &self.laser_to_base
    }

    /// Lookup transform from child frame to parent frame.
    pub fn lookup(&self, from: FrameId, to: FrameId) -> Result<Transform2D, TransformError> {
        use FrameId::*;

        if from == to {
            return Ok(Transform2D::identity());
        }
        if !self.have_odom && (from != Laser || to != BaseLink) && (from != BaseLink || to != Laser)
        {
            return Err(TransformError::NotReady { frame: Odom });
        }

        match (from, to) {
            (Laser, BaseLink) => Ok(self.laser_to_base),
            (BaseLink, Odom) => Ok(self.base_to_odom),
            (Odom, Map) => Ok(self.odom_to_map),

            (BaseLink, Laser) => Ok(self.laser_to_base.inverse()),
            (Odom, BaseLink) => Ok(self.base_to_odom.inverse()),
            (Map, Odom) => Ok(self.odom_to_map.inverse()),

            (Laser, Odom) => Ok(&self.base_to_odom * &self.laser_to_base),
            (Laser, Map) => Ok(self.laser_in_map()),
            (BaseLink, Map) => Ok(self.base_in_map()),

            (Odom, Laser) => Ok((&self.base_to_odom * &self.laser_to_base).inverse()),
            (Map, Laser) => Ok(self.laser_in_map().inverse()),
            (Map, BaseLink) => Ok(self.base_in_map().inverse()),

            (Map, Map) | (Odom, Odom) | (BaseLink, BaseLink) | (Laser, Laser) => {
                unreachable!("Same-frame case handled above")
            }
        }
    }

    /// Transform a point from one frame to another.
    pub fn transform_point(
        &self,
        point: Point2<f64>,
        from: FrameId,
        to: FrameId,
    ) -> Result<Point2<f64>, TransformError> {
        let tf = self.lookup(from, to)?;
        Ok(tf.transform_point(point))
    }
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new(Transform2D::identity())
    }
}

/// Wrap an angle to (-PI, PI].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest angular difference from `a` to `b`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    wrap_angle(b - a)
}
