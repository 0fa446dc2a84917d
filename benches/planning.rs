//! Criterion benchmarks for full trip-planning runs.
//!
//! Run with: cargo bench --bench planning

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use harvest_planner::agent::{AgentSnapshot, AlwaysAllowed, DeviceReading, ModelClock};
use harvest_planner::attraction::{LocationValueMaps, LocationValueStore};
use harvest_planner::core::types::{Cell, DeviceId};
use harvest_planner::geography::{BanLayer, Euclidean};
use harvest_planner::planning::{ActionKind, PlanningEnv, TripPlanner};
use harvest_planner::PlannerConfig;

fn fixture(devices: u32) -> (AgentSnapshot, LocationValueMaps) {
    let config = PlannerConfig::default();
    let mut agent = AgentSnapshot::new(Cell::new(0, 25), 10.0);
    agent.sets_allowance = 200;
    agent.sets_remaining = 200;
    agent.devices_in_stock = 100;
    agent.deployed_devices = (0..devices)
        .map(|i| DeviceReading {
            device: DeviceId::new(i),
            cell: Cell::new((i as i32 * 17) % 50, (i as i32 * 31) % 50),
            value: 5_000.0 + (i % 13) as f64 * 400.0,
        })
        .collect();

    let mut maps = LocationValueMaps::new();
    for kind in [ActionKind::Deploy, ActionKind::FishUnassociated, ActionKind::SetForeign] {
        let seed = (0..config.location_values.capacity as i32)
            .map(|i| (Cell::new((i * 7) % 50, (i * 11) % 50), 50.0 + i as f64));
        maps.insert(LocationValueStore::from_config(kind, &config.location_values).seeded(seed));
    }
    (agent, maps)
}

fn bench_plan_new_trip(c: &mut Criterion) {
    let config = PlannerConfig::default();
    let mut group = c.benchmark_group("plan_new_trip");

    for devices in [10u32, 100, 500] {
        let (agent, maps) = fixture(devices);
        group.bench_with_input(BenchmarkId::from_parameter(devices), &devices, |b, _| {
            let mut planner = TripPlanner::from_config(&config, &BanLayer::new()).unwrap();
            let env = PlanningEnv {
                agent: &agent,
                location_values: &maps,
                distance: &Euclidean::default(),
                oracle: &AlwaysAllowed,
                clock: ModelClock::default(),
            };
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            b.iter(|| black_box(planner.plan_new_trip(&env, &mut rng)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan_new_trip);
criterion_main!(benches);
