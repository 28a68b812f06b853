use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use glam::Vec3;
use wildlife_sim::entity::PhysicalState;
use wildlife_sim::world::{RollingHills, StaticWater, UniformVegetation, WaterBody, WaterKind};
use wildlife_sim::{Environment, Protagonist, SimulationConfig, WildlifeEngine};

fn bench_update(c: &mut Criterion) {
    let terrain = RollingHills {
        amplitude: 6.0,
        wavelength: 140.0,
    };
    let water = StaticWater {
        bodies: vec![WaterBody::new(Vec3::new(60.0, 0.0, -40.0), 25.0, WaterKind::Lake)],
    };
    let vegetation = UniformVegetation { density: 0.4 };
    let env = Environment::new(&terrain, &water, &vegetation);

    let mut group = c.benchmark_group("wildlife_update");
    for cap in [20_usize, 80, 200] {
        group.bench_function(format!("cap{}_100_ticks", cap), |b| {
            b.iter_batched(
                || {
                    let config = SimulationConfig {
                        population_cap: cap,
                        min_entity_spacing: 5.0,
                        ..Default::default()
                    };
                    let mut engine = WildlifeEngine::new(config);
                    while engine.spawn_group(&env).is_some() {}
                    let mut protagonist = Protagonist::at(Vec3::new(0.0, 0.0, 0.0));
                    protagonist.physical = PhysicalState::Walking;
                    (engine, protagonist)
                },
                |(mut engine, mut protagonist)| {
                    for _ in 0..100 {
                        engine.update(black_box(0.1), &mut protagonist, &env);
                        engine.drain_events();
                    }
                    engine
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update);
criterion_main!(benches);
