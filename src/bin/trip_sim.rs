//! Headless Trip Simulator
//!
//! Plans and sails trips for one agent over a synthetic value landscape,
//! feeding every outcome back into the agent's location values.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use harvest_planner::agent::{AgentSnapshot, AlwaysAllowed, DeviceReading, ModelClock};
use harvest_planner::attraction::{
    total_attraction, AttractionField, FieldContext, GlobalModulator, LocalModulator, LocationValueMaps,
    LocationValueStore, Observation,
};
use harvest_planner::core::types::{Cell, DeviceId, Hours};
use harvest_planner::geography::{BanLayer, BannedArea, Distance, Euclidean};
use harvest_planner::planning::{ActionKind, Plan, PlannedAction, PlanningEnv, TripPlanner};
use harvest_planner::{PlannerConfig, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Headless Trip Simulator - plan, sail and learn from fishing trips
#[derive(Parser, Debug)]
#[command(name = "trip_sim")]
#[command(about = "Plan and execute fishing trips against a synthetic value landscape")]
struct Args {
    /// TOML scenario file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of trips to sail
    #[arg(long, default_value_t = 12)]
    trips: u32,

    /// Trips per simulated year; location values decay once a year
    #[arg(long, default_value_t = 6)]
    trips_per_year: u32,

    /// Number of value hotspots in the landscape
    #[arg(long, default_value_t = 5)]
    hotspots: usize,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Serialize)]
struct TripReport {
    trip: u32,
    target_hours: Hours,
    planned: BTreeMap<ActionKind, usize>,
    executed: BTreeMap<ActionKind, usize>,
    hours_at_sea: Hours,
    catch: f64,
    replanned: bool,
    heading: [f64; 2],
}

#[derive(Serialize)]
struct SimReport {
    seed: u64,
    trips: Vec<TripReport>,
    total_catch: f64,
    devices_at_sea: usize,
    known_cells: BTreeMap<ActionKind, usize>,
}

/// Ground truth the agent only learns about by fishing
struct Landscape {
    hotspots: Vec<(Cell, f64, f64)>,
}

impl Landscape {
    fn generate(config: &PlannerConfig, count: usize, rng: &mut ChaCha8Rng) -> Self {
        let hotspots = (0..count)
            .map(|_| {
                let cell = Cell::new(
                    rng.gen_range(0..config.map.width as i32),
                    rng.gen_range(0..config.map.height as i32),
                );
                (cell, rng.gen_range(2_000.0..8_000.0), rng.gen_range(2.0..6.0))
            })
            .collect();
        Self { hotspots }
    }

    fn value_at(&self, cell: Cell) -> f64 {
        self.hotspots
            .iter()
            .map(|(centre, peak, radius)| {
                let d = Euclidean::default().distance(cell, *centre);
                peak * (-(d * d) / (2.0 * radius * radius)).exp()
            })
            .sum()
    }

    /// Noisy first impressions used to cold-start the value stores
    fn survey(&self, config: &PlannerConfig, samples: usize, rng: &mut ChaCha8Rng) -> Vec<(Cell, f64)> {
        (0..samples)
            .map(|_| {
                let cell = Cell::new(
                    rng.gen_range(0..config.map.width as i32),
                    rng.gen_range(0..config.map.height as i32),
                );
                (cell, self.value_at(cell) * rng.gen_range(0.5..1.5))
            })
            .collect()
    }
}

struct Voyage {
    agent: AgentSnapshot,
    maps: LocationValueMaps,
    landscape: Landscape,
    next_device: u32,
    hold_capacity: f64,
}

impl Voyage {
    fn new(config: &PlannerConfig, hotspots: usize, rng: &mut ChaCha8Rng) -> Self {
        let home = Cell::new(0, (config.map.height / 2) as i32);
        let mut agent = AgentSnapshot::new(home, 10.0);
        agent.max_trip_hours = config.trip.max_trip_hours;
        agent.sets_allowance = 60;
        agent.sets_remaining = 60;
        agent.devices_in_stock = 150;
        agent.active_devices_limit = 30;

        let landscape = Landscape::generate(config, hotspots, rng);
        let mut maps = LocationValueMaps::new();
        for kind in [ActionKind::Deploy, ActionKind::FishUnassociated, ActionKind::SetForeign] {
            let survey = landscape.survey(config, config.location_values.capacity, rng);
            maps.insert(LocationValueStore::from_config(kind, &config.location_values).seeded(survey));
        }

        Self {
            agent,
            maps,
            landscape,
            next_device: 0,
            hold_capacity: 200_000.0,
        }
    }

    fn clock(&self) -> ModelClock {
        ModelClock::new((self.agent.now / 24.0).floor() as u64, 24.0)
    }

    /// Pull of the known values as seen from port, for the report
    fn heading(&self, config: &PlannerConfig) -> [f64; 2] {
        let a = &config.attraction;
        let mut fields = Vec::new();
        if let Some(store) = self.maps.get(ActionKind::Deploy) {
            fields.push(AttractionField::from_config(
                store,
                LocalModulator::can_act_there(),
                GlobalModulator::for_deployments(a),
                a,
            ));
        }
        if let Some(store) = self.maps.get(ActionKind::FishUnassociated) {
            fields.push(AttractionField::from_config(
                store,
                LocalModulator::can_act_there().with_time_since_last_visit(a.unassociated_time_since_visit),
                GlobalModulator::for_sets(a),
                a,
            ));
        }
        if let Some(store) = self.maps.get(ActionKind::SetForeign) {
            fields.push(AttractionField::from_config(
                store,
                LocalModulator::can_act_there().with_time_since_last_visit(a.foreign_time_since_visit),
                GlobalModulator::for_sets(a),
                a,
            ));
        }

        let ctx = FieldContext {
            agent: &self.agent,
            distance: &Euclidean::default(),
            oracle: &AlwaysAllowed,
            clock: self.clock(),
        };
        let pull = total_attraction(&fields, &ctx);
        [pull.x, pull.y]
    }

    /// Carry out one action and report what was found
    fn execute(&mut self, action: &PlannedAction, rng: &mut ChaCha8Rng) -> f64 {
        let cell = action.cell();
        let truth = self.landscape.value_at(cell);
        let catch = match action {
            PlannedAction::Deploy { .. } => {
                self.agent.devices_in_stock = self.agent.devices_in_stock.saturating_sub(1);
                self.agent.active_devices += 1;
                self.agent.deployed_devices.push(DeviceReading {
                    device: DeviceId::new(self.next_device),
                    cell,
                    value: 0.0,
                });
                self.next_device += 1;
                self.maps.observe(&Observation::new(ActionKind::Deploy, cell, truth * 0.1));
                0.0
            }
            PlannedAction::FishUnassociated { .. } => {
                let catch = truth * rng.gen_range(0.0..1.0);
                self.maps.observe(&Observation::new(ActionKind::FishUnassociated, cell, catch));
                catch
            }
            PlannedAction::SetOwn { device, .. } => {
                let mut catch = 0.0;
                if let Some(reading) = self.agent.deployed_devices.iter_mut().find(|r| r.device == *device) {
                    catch = reading.value;
                    reading.value = 0.0;
                }
                self.maps.observe(&Observation::new(ActionKind::Deploy, cell, catch * 0.1));
                catch
            }
            PlannedAction::SetForeign { minimum_value, .. } => {
                let found = truth * rng.gen_range(0.0..0.8);
                let catch = if found >= *minimum_value { found } else { 0.0 };
                self.maps.observe(&Observation::new(ActionKind::SetForeign, cell, catch));
                catch
            }
        };

        if action.kind() != ActionKind::Deploy {
            self.agent.sets_remaining = self.agent.sets_remaining.saturating_sub(1);
        }
        self.agent.record_visit(cell, self.agent.now);
        self.agent.hold_fill_fraction = (self.agent.hold_fill_fraction + catch / self.hold_capacity).min(1.0);
        tracing::debug!(kind = %action.kind(), %cell, catch, "action executed");
        catch
    }

    /// Devices aggregate value between trips
    fn soak_devices(&mut self) {
        for reading in &mut self.agent.deployed_devices {
            reading.value += self.landscape.value_at(reading.cell) * 0.5;
        }
    }

    fn new_year(&mut self) {
        self.maps.step();
        self.agent.sets_remaining = self.agent.sets_allowance;
        tracing::info!(
            deploy_cells = self.maps.get(ActionKind::Deploy).map_or(0, LocationValueStore::len),
            "new fishing year"
        );
    }

    fn sail(
        &mut self,
        trip: u32,
        planner: &mut TripPlanner,
        config: &PlannerConfig,
        distance: &dyn Distance,
        rng: &mut ChaCha8Rng,
    ) -> TripReport {
        self.soak_devices();
        let heading = self.heading(config);

        let mut plan = {
            let env = PlanningEnv {
                agent: &self.agent,
                location_values: &self.maps,
                distance,
                oracle: &AlwaysAllowed,
                clock: self.clock(),
            };
            planner.plan_new_trip(&env, rng)
        };
        let planned = count_kinds(&plan);

        let mut executed = BTreeMap::new();
        let mut catch = 0.0;
        let mut replanned = false;
        while let Some(action) = plan.poll_next_action() {
            let hours = distance.distance(self.agent.position, action.cell()) / self.agent.speed
                + action.duration_hours();
            self.agent.position = action.cell();
            self.agent.hours_at_sea += hours;
            self.agent.now += hours;

            catch += self.execute(&action, rng);
            *executed.entry(action.kind()).or_insert(0) += 1;

            // once staying out loses its appeal, rebuild the rest of the trip
            let stay_out = GlobalModulator::for_time_at_sea(&config.attraction).modulate(&self.agent);
            if !replanned && stay_out < 0.5 && !plan.is_empty() {
                replanned = true;
                let env = PlanningEnv {
                    agent: &self.agent,
                    location_values: &self.maps,
                    distance,
                    oracle: &AlwaysAllowed,
                    clock: self.clock(),
                };
                plan = planner.replan(&plan, self.agent.hours_at_sea, &env, rng);
            }
        }

        let home_leg = distance.distance(self.agent.position, self.agent.home) / self.agent.speed;
        self.agent.now += home_leg;
        let hours_at_sea = self.agent.hours_at_sea + home_leg;
        self.agent.position = self.agent.home;
        self.agent.hours_at_sea = 0.0;
        self.agent.hold_fill_fraction = 0.0;

        TripReport {
            trip,
            target_hours: planner.target_hours(),
            planned,
            executed,
            hours_at_sea,
            catch,
            replanned,
            heading,
        }
    }
}

fn count_kinds(plan: &Plan) -> BTreeMap<ActionKind, usize> {
    let mut counts = BTreeMap::new();
    for action in plan.pending() {
        *counts.entry(action.kind()).or_insert(0) += 1;
    }
    counts
}

fn run(args: &Args, seed: u64) -> Result<SimReport> {
    let config = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    // keep the fleet off the home port approaches
    let bans = BanLayer::new().with_area(BannedArea::new(
        Cell::new(0, 0),
        Cell::new(1, config.map.height.saturating_sub(1) as i32),
    ));
    let mut planner = TripPlanner::from_config(&config, &bans)?;
    let distance = Euclidean::default();
    let mut voyage = Voyage::new(&config, args.hotspots, &mut rng);

    let mut trips = Vec::with_capacity(args.trips as usize);
    for trip in 0..args.trips {
        if trip > 0 && args.trips_per_year > 0 && trip % args.trips_per_year == 0 {
            voyage.new_year();
        }
        let report = voyage.sail(trip, &mut planner, &config, &distance, &mut rng);
        tracing::info!(
            trip,
            catch = report.catch,
            hours = report.hours_at_sea,
            replanned = report.replanned,
            "trip complete"
        );
        trips.push(report);
    }

    let total_catch = trips.iter().map(|t| t.catch).sum();
    let known_cells = voyage.maps.iter().map(|store| (store.kind(), store.len())).collect();
    Ok(SimReport {
        seed,
        trips,
        total_catch,
        devices_at_sea: voyage.agent.deployed_devices.len(),
        known_cells,
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("harvest_planner=info,trip_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let report = match run(&args, seed) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("trip_sim failed: {}", e);
            std::process::exit(1);
        }
    };

    if args.format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Seed: {}", report.seed);
        for trip in &report.trips {
            println!(
                "Trip {:>3}: {:>6.1}h of {:>6.1}h, {} actions, catch {:>10.1}{}",
                trip.trip,
                trip.hours_at_sea,
                trip.target_hours,
                trip.executed.values().sum::<usize>(),
                trip.catch,
                if trip.replanned { " (replanned)" } else { "" }
            );
        }
        println!("Total catch: {:.1}", report.total_catch);
        println!("Devices at sea: {}", report.devices_at_sea);
    }
}
