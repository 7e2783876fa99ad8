use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use thermostat_mdp::{value_iteration, CycleBound, ThermostatConfig, ThermostatMdp, TransitionTable};

fn bundled_mdp(config: ThermostatConfig) -> ThermostatMdp {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let on = TransitionTable::from_path(data.join("prob_on.csv")).unwrap();
    let off = TransitionTable::from_path(data.join("prob_off.csv")).unwrap();
    ThermostatMdp::new(config, on, off).unwrap()
}

fn bench_value_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_iteration");

    let mdp = bundled_mdp(ThermostatConfig::default());
    group.bench_function("until_converged", |b| {
        b.iter(|| value_iteration(black_box(&mdp)).unwrap())
    });

    for cycles in [10, 100, 1000] {
        let config =
            ThermostatConfig::new(22.0, 6.7793, 0.610137, CycleBound::exactly(cycles).unwrap())
                .unwrap();
        let mdp = bundled_mdp(config);
        group.bench_with_input(BenchmarkId::new("fixed_cycles", cycles), &mdp, |b, mdp| {
            b.iter(|| value_iteration(black_box(mdp)).unwrap())
        });
    }

    group.finish();
}

fn bench_table_parsing(c: &mut Criterion) {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/prob_on.csv");
    let text = std::fs::read_to_string(path).unwrap();
    c.bench_function("parse_transition_table", |b| {
        b.iter(|| black_box(&text).parse::<TransitionTable>().unwrap())
    });
}

criterion_group!(benches, bench_value_iteration, bench_table_parsing);
criterion_main!(benches);
