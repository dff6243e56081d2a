use criterion::{Criterion, criterion_group, criterion_main};
use firing_solution::ballistics::Trajectory;
use firing_solution::equipment::EquipmentRegistry;
use firing_solution::solution::{FiringQuery, SolutionFinder};
use firing_solution::table::{RangeTableLoader, RangeTableStore, StoreConfig};
use std::hint::black_box;
use std::sync::Arc;

fn write_tables(root: &std::path::Path) {
    let loader = RangeTableLoader::new(root.to_path_buf());
    for charge in 0..8u32 {
        let path = loader.table_path("M109A6", Trajectory::Low, charge);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let max_range = 4000.0 + 2000.0 * charge as f64;
        let mut text = String::from("range,mill,diff100m,eta\n");
        let mut range = 500.0;
        while range <= max_range {
            let mill = 50.0 + 0.12 * range + 2e-6 * range * range;
            text.push_str(&format!("{range},{mill},{},{}\n", 1.0 + range / 4000.0, range / 300.0));
            range += 100.0;
        }
        std::fs::write(path, text).unwrap();
    }
}

fn solutions_benchmark(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_tables(dir.path());

    let config = StoreConfig {
        root: dir.path().to_path_buf(),
        ..StoreConfig::default()
    };
    let store = Arc::new(RangeTableStore::new(config, EquipmentRegistry::builtin()));
    let finder = SolutionFinder::new(store);
    let query = FiringQuery::new("M109A6", Trajectory::Low, 9_750.0, 35.0);

    // Warm the table cache so the loop measures lookup and interpolation.
    assert_eq!(finder.find_solutions(&query, 3, None).len(), 3);

    c.bench_function("find_solutions", |b| {
        b.iter(|| finder.find_solutions(black_box(&query), black_box(3), None))
    });

    c.bench_function("find_solutions_explicit_charges", |b| {
        b.iter(|| finder.find_solutions(black_box(&query), black_box(3), Some(&[7, 6, 5, 4])))
    });
}

criterion_group!(benches, solutions_benchmark);
criterion_main!(benches);
