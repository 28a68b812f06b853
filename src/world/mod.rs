//! External world collaborators

pub mod environment;

pub use environment::{
    Environment, FlatTerrain, HeightFn, RollingHills, StaticWater, Terrain, UniformVegetation,
    VegetationSystem, WaterBody, WaterKind, WaterSystem,
};
