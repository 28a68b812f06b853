//! Headless Wildlife Runner
//!
//! Walks a protagonist around a seeded forest and reports what happened,
//! as JSON for tooling or as a short text summary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use glam::Vec3;
use serde::Serialize;

use wildlife_sim::core::error::Result;
use wildlife_sim::entity::PhysicalState;
use wildlife_sim::simulation::{PopulationStats, SimulationEvent, ThreatLevel};
use wildlife_sim::world::{RollingHills, StaticWater, UniformVegetation, WaterBody, WaterKind};
use wildlife_sim::{Environment, Protagonist, SimulationConfig, WildlifeEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Run the wildlife simulation without a renderer
#[derive(Parser, Debug)]
#[command(name = "wildlife-sim")]
#[command(about = "Run the wildlife simulation headless and summarize the outcome")]
struct Args {
    /// Random seed; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// TOML file with simulation overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Protagonist stealth effectiveness, 0-100
    #[arg(long, default_value_t = 40.0)]
    stealth: f32,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    population: PopulationStats,
    events: BTreeMap<&'static str, usize>,
    hunts: usize,
    meals: usize,
    final_awareness: f32,
    final_threat: ThreatLevel,
    protagonist_health: f32,
    protagonist_hunger: f32,
    protagonist_experience: u32,
}

fn event_name(event: &SimulationEvent) -> &'static str {
    match event {
        SimulationEvent::Spawned { .. } => "spawned",
        SimulationEvent::StateChanged { .. } => "state_changed",
        SimulationEvent::Alarm { .. } => "alarm",
        SimulationEvent::Struck { .. } => "struck",
        SimulationEvent::Encounter { .. } => "encounter",
        SimulationEvent::Hunted(_) => "hunted",
        SimulationEvent::Consumed(_) => "consumed",
        SimulationEvent::Decayed { .. } => "decayed",
    }
}

/// Patrol point on a slow circle around the map center
fn patrol(t: f32) -> Vec3 {
    let angle = t * 0.05;
    Vec3::new(angle.sin() * 80.0, 0.0, angle.cos() * 80.0)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wildlife_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;
    let seed = config.seed;

    let terrain = RollingHills {
        amplitude: 6.0,
        wavelength: 140.0,
    };
    let water = StaticWater {
        bodies: vec![
            WaterBody::new(Vec3::new(60.0, 0.0, -40.0), 25.0, WaterKind::Lake),
            WaterBody::new(Vec3::new(-120.0, 0.0, 90.0), 8.0, WaterKind::Pond),
        ],
    };
    let vegetation = UniformVegetation { density: 0.35 };
    let env = Environment::new(&terrain, &water, &vegetation);

    let mut engine = WildlifeEngine::new(config);
    let mut protagonist = Protagonist::at(patrol(0.0));
    protagonist.stealth = args.stealth;
    protagonist.physical = PhysicalState::Crouching;

    tracing::info!(seed, ticks = args.ticks, "wildlife run starting");

    let mut events: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut hunts = 0;
    let mut meals = 0;
    let mut elapsed = 0.0f32;
    for _ in 0..args.ticks {
        elapsed += args.dt;
        let next = patrol(elapsed);
        if let Some(yaw) = wildlife_sim::core::types::yaw_from_direction(next - protagonist.position) {
            protagonist.facing = yaw;
        }
        protagonist.position = Vec3::new(next.x, env.ground_height(next.x, next.z), next.z);

        engine.update(args.dt, &mut protagonist, &env);

        if engine.attempt_hunt(&mut protagonist).is_some() {
            hunts += 1;
        }
        if engine.attempt_eat(&mut protagonist).is_some() {
            meals += 1;
        }
        for event in engine.drain_events() {
            *events.entry(event_name(&event)).or_insert(0) += 1;
        }

        if protagonist.vitals.is_depleted() {
            tracing::info!(tick = engine.tick(), "protagonist was killed");
            break;
        }
    }

    let summary = RunSummary {
        seed,
        ticks: engine.tick(),
        population: engine.statistics(),
        events,
        hunts,
        meals,
        final_awareness: engine.awareness().score(),
        final_threat: engine.threat_level(),
        protagonist_health: protagonist.vitals.health(),
        protagonist_hunger: protagonist.hunger,
        protagonist_experience: protagonist.experience,
    };
    engine.dispose();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!("=== WILDLIFE RUN (seed {}) ===", summary.seed);
            println!("Ticks:       {}", summary.ticks);
            println!(
                "Population:  {} total, {} alive, {} dead",
                summary.population.total, summary.population.alive, summary.population.dead
            );
            for (species, count) in &summary.population.by_species {
                println!("  {:?}: {}", species, count);
            }
            println!("Hunts:       {}", summary.hunts);
            println!("Meals:       {}", summary.meals);
            println!(
                "Awareness:   {:.2} ({:?})",
                summary.final_awareness, summary.final_threat
            );
            println!(
                "Protagonist: {:.0} health, {:.0} hunger, {} xp",
                summary.protagonist_health, summary.protagonist_hunger, summary.protagonist_experience
            );
            for (name, count) in &summary.events {
                println!("  {}: {}", name, count);
            }
        }
    }
    Ok(())
}
