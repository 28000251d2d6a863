// benches/bench_observation.rs

use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use queue_grid::config::{GridConfig, ObservationConfig};
use queue_grid::control_system::traffic_light_controller::{PhaseTiming, TrafficLightController};
use queue_grid::flow_analyzer::observation::ObservationBuilder;
use queue_grid::simulation_engine::grid::Grid;
use queue_grid::simulation_engine::in_memory::InMemorySimulator;
use std::time::Duration;

const TIMING: PhaseTiming = PhaseTiming {
    min_yellow_time: 2.0,
    min_green_time: 0.0,
};

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("observation_build");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    let grid = Grid::from_config(&GridConfig {
        rows: 5,
        cols: 5,
        ..GridConfig::default()
    })
    .expect("valid grid");
    let controller = TrafficLightController::initialize(&grid, TIMING);

    for &vehicles in [50, 200, 800].iter() {
        let mut sim = InMemorySimulator::new(&grid, 35.0);
        sim.populate(vehicles, 42);

        let modes = [
            ("full", ObservationConfig::Full),
            ("partial", ObservationConfig::Partial { num_observed: 3 }),
        ];
        for (name, mode) in modes {
            let mut builder = ObservationBuilder::new(&grid, mode);
            group.bench_function(format!("{}_{}_vehicles", name, vehicles), |b| {
                b.iter(|| {
                    black_box(builder.build(&sim, &controller).expect("known edges"));
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
