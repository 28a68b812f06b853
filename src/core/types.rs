//! Core type definitions used throughout the codebase

use glam::Vec3;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Generation-checked handle for a creature owned by the registry.
    ///
    /// A handle to a removed creature never resolves again, even if its slot
    /// is reused by a later spawn.
    pub struct EntityId;
}

/// Simulation tick counter
pub type Tick = u64;

/// Gender for species that take part in social encounters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Unit forward vector on the ground plane for a yaw angle (radians)
#[inline]
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Yaw angle (radians) pointing along `dir` on the ground plane
#[inline]
pub fn yaw_from_direction(dir: Vec3) -> Option<f32> {
    if dir.x.abs() < 1e-6 && dir.z.abs() < 1e-6 {
        None
    } else {
        Some(dir.x.atan2(dir.z))
    }
}

/// Direction projected to the ground plane and normalized, zero if degenerate
#[inline]
pub fn planar_direction(from: Vec3, to: Vec3) -> Vec3 {
    Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalize_or_zero()
}

/// Horizontal distance ignoring height
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}
