//! Benchmarks for the ACO-CVRP algorithm.

#[cfg(feature = "bench")]
extern crate criterion;

use aco_cvrp::colony::AntColony;
use aco_cvrp::config::Config;
use aco_cvrp::local_search::LocalSearch;
use aco_cvrp::problem::{Node, Problem};
use aco_cvrp::AcoAlgorithm;
#[cfg(feature = "bench")]
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Create a benchmark problem of specified size.
fn create_benchmark_problem(size: usize) -> Problem {
    let mut nodes = vec![Node::new(0, 0.0, 0.0, 0)];

    // Customers in a grid arrangement
    let grid_size = (size as f64).sqrt().ceil() as usize;
    for i in 1..=size {
        let row = (i - 1) / grid_size;
        let col = (i - 1) % grid_size;
        nodes.push(Node::new(i, col as f64 * 10.0, row as f64 * 10.0, 1 + (i % 3) as u64));
    }

    Problem::new(format!("BenchProblem_{}", size), nodes, 20)
}

#[cfg(feature = "bench")]
fn benchmark_initialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialization");

    for size in [50, 100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let problem = create_benchmark_problem(size);
            let config = Config::new().with_n_ants(25).with_nn_ants(20);

            b.iter(|| {
                let mut colony = AntColony::new(problem.clone(), config.clone());
                colony.initialize();
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
fn benchmark_local_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_search");

    for size in [50, 100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let problem = create_benchmark_problem(size);
            let config = Config::new()
                .with_n_ants(1)
                .with_nn_ants(20)
                .with_local_search(false);

            let mut colony = AntColony::new(problem.clone(), config);
            colony.initialize();
            let solution = colony.best().clone();

            let mut local_search = LocalSearch::new(20, true);
            let mut rng = ChaCha8Rng::seed_from_u64(7);

            b.iter(|| {
                let mut solution_clone = solution.clone();
                local_search.improve(&mut solution_clone, &problem, &mut rng);
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
fn benchmark_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("convergence");
    group.measurement_time(Duration::from_secs(30));

    for size in [100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let problem = create_benchmark_problem(size);
            let config = Config::new()
                .with_n_ants(25)
                .with_nn_ants(20)
                .with_num_subproblems(2)
                .with_sub_problem_iterations(10)
                .with_max_iterations(10)
                .with_time_limit(Duration::from_secs(10));

            b.iter(|| {
                let mut algorithm = AcoAlgorithm::new(problem.clone(), config.clone());
                algorithm.run();
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
criterion_group!(
    benches,
    benchmark_initialization,
    benchmark_local_search,
    benchmark_convergence
);

#[cfg(feature = "bench")]
criterion_main!(benches);
