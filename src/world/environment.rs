//! Terrain, water and vegetation as seen by the simulation
//!
//! These are pull-based, read-only views of systems owned elsewhere in the
//! game. The simple implementations here back tests, benches and the
//! headless runner.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::planar_distance;

/// Ground height and steepness
pub trait Terrain {
    fn height(&self, x: f32, z: f32) -> f32;
    /// 0 = flat, 1 = vertical
    fn slope(&self, x: f32, z: f32) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterKind {
    Lake,
    Pond,
    River,
}

/// A circular body of water
///
/// `center` is optional because upstream data can be incomplete; bodies
/// without one are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBody {
    pub center: Option<Vec3>,
    pub radius: f32,
    pub kind: WaterKind,
}

impl WaterBody {
    pub fn new(center: Vec3, radius: f32, kind: WaterKind) -> Self {
        Self {
            center: Some(center),
            radius,
            kind,
        }
    }

    /// Ground-plane distance from `point` to the shoreline, negative inside
    ///
    /// Returns `None` for malformed bodies.
    pub fn distance_to_perimeter(&self, point: Vec3) -> Option<f32> {
        let center = self.center?;
        if !center.is_finite() || !self.radius.is_finite() {
            return None;
        }
        Some(planar_distance(point, center) - self.radius.max(0.0))
    }
}

pub trait WaterSystem {
    fn water_bodies(&self) -> Vec<WaterBody>;
}

pub trait VegetationSystem {
    /// Local density estimate in [0, 1]
    fn density(&self, x: f32, z: f32) -> f32;
}

/// Borrowed bundle of the collaborators one tick reads from
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub terrain: &'a dyn Terrain,
    pub water: &'a dyn WaterSystem,
    pub vegetation: &'a dyn VegetationSystem,
}

impl<'a> Environment<'a> {
    pub fn new(
        terrain: &'a dyn Terrain,
        water: &'a dyn WaterSystem,
        vegetation: &'a dyn VegetationSystem,
    ) -> Self {
        Self {
            terrain,
            water,
            vegetation,
        }
    }

    /// Height with non-finite samples treated as sea level
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        let h = self.terrain.height(x, z);
        if h.is_finite() {
            h
        } else {
            0.0
        }
    }

    /// Slope with non-finite samples treated as impassable
    pub fn ground_slope(&self, x: f32, z: f32) -> f32 {
        let s = self.terrain.slope(x, z);
        if s.is_finite() {
            s.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Vegetation density clamped to [0, 1]; non-finite samples read as bare ground
    pub fn vegetation_density(&self, x: f32, z: f32) -> f32 {
        let d = self.vegetation.density(x, z);
        if d.is_finite() {
            d.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Distance from `point` to the nearest water perimeter, skipping malformed bodies
    pub fn nearest_water_distance(&self, point: Vec3) -> Option<f32> {
        self.water
            .water_bodies()
            .iter()
            .filter_map(|body| {
                let distance = body.distance_to_perimeter(point);
                if distance.is_none() {
                    tracing::warn!(?body, "skipping water body without a usable center");
                }
                distance
            })
            .reduce(f32::min)
    }
}

/// Level ground at a fixed height
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    pub height: f32,
}

impl Terrain for FlatTerrain {
    fn height(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }

    fn slope(&self, _x: f32, _z: f32) -> f32 {
        0.0
    }
}

/// Terrain defined by closures, for ridges and hills in tests
pub struct HeightFn<H, S>
where
    H: Fn(f32, f32) -> f32,
    S: Fn(f32, f32) -> f32,
{
    pub height: H,
    pub slope: S,
}

impl<H, S> Terrain for HeightFn<H, S>
where
    H: Fn(f32, f32) -> f32,
    S: Fn(f32, f32) -> f32,
{
    fn height(&self, x: f32, z: f32) -> f32 {
        (self.height)(x, z)
    }

    fn slope(&self, x: f32, z: f32) -> f32 {
        (self.slope)(x, z)
    }
}

/// Gently rolling hills, used by the headless runner
#[derive(Debug, Clone, Copy)]
pub struct RollingHills {
    pub amplitude: f32,
    pub wavelength: f32,
}

impl Terrain for RollingHills {
    fn height(&self, x: f32, z: f32) -> f32 {
        let k = std::f32::consts::TAU / self.wavelength;
        self.amplitude * ((x * k).sin() + (z * k).cos()) * 0.5
    }

    fn slope(&self, x: f32, z: f32) -> f32 {
        let k = std::f32::consts::TAU / self.wavelength;
        let dx = self.amplitude * 0.5 * k * (x * k).cos();
        let dz = -self.amplitude * 0.5 * k * (z * k).sin();
        let gradient = (dx * dx + dz * dz).sqrt();
        // Normalize rise-over-run into [0, 1)
        gradient / (1.0 + gradient)
    }
}

/// A fixed list of water bodies
#[derive(Debug, Clone, Default)]
pub struct StaticWater {
    pub bodies: Vec<WaterBody>,
}

impl WaterSystem for StaticWater {
    fn water_bodies(&self) -> Vec<WaterBody> {
        self.bodies.clone()
    }
}

/// The same density everywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformVegetation {
    pub density: f32,
}

impl VegetationSystem for UniformVegetation {
    fn density(&self, _x: f32, _z: f32) -> f32 {
        self.density
    }
}
