//! Integration tests for the complete ACO-CVRP algorithm.

use aco_cvrp::config::Config;
use aco_cvrp::problem::{Node, Problem};
use aco_cvrp::AcoAlgorithm;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Creates a random test problem of the given size.
fn create_test_problem(customers: usize) -> Problem {
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let mut nodes = vec![Node::new(0, 50.0, 50.0, 0)];
    for id in 1..=customers {
        nodes.push(Node::new(
            id,
            rng.gen_range(0.0..100.0),
            rng.gen_range(0.0..100.0),
            rng.gen_range(1..=10),
        ));
    }

    Problem::new(format!("TestProblem{}", customers), nodes, 50)
}

fn quick_config() -> Config {
    Config::new()
        .with_n_ants(10)
        .with_nn_ants(10)
        .with_max_iterations(5)
        .with_decomposition(false)
        .with_seed(42)
}

#[test]
fn test_algorithm_initialization() {
    let problem = create_test_problem(20);
    let mut algorithm = AcoAlgorithm::new(problem, quick_config());

    assert!(algorithm.best_solution().is_empty());
    algorithm.initialize();

    let best = algorithm.best_solution();
    assert!(!best.is_empty());
    assert_eq!(best.validate(algorithm.problem()), Ok(()));
    assert_eq!(algorithm.iterations, 0);
}

#[test]
fn test_algorithm_short_run() {
    let problem = create_test_problem(20);
    let mut algorithm = AcoAlgorithm::new(problem, quick_config());

    let best = algorithm.run().clone();
    assert_eq!(best.validate(algorithm.problem()), Ok(()));

    let stats = algorithm.statistics();
    assert_eq!(stats.iterations, 5);
    assert_eq!(stats.best_length, best.length);
    assert_eq!(stats.best_routes, best.route_count());
    assert!(stats.best_iteration <= stats.colony_iterations);
}

#[test]
fn test_algorithm_termination_iterations() {
    let problem = create_test_problem(15);
    let config = quick_config().with_max_iterations(3).without_time_limit();
    let mut algorithm = AcoAlgorithm::new(problem, config);

    algorithm.run();
    assert_eq!(algorithm.iterations, 3);
    assert!(algorithm.should_terminate());
}

#[test]
fn test_algorithm_termination_time_limit() {
    let problem = create_test_problem(30);
    let config = quick_config()
        .with_max_iterations(usize::MAX)
        .with_time_limit(Duration::from_millis(300));
    let mut algorithm = AcoAlgorithm::new(problem, config);

    algorithm.run();
    assert!(algorithm.run_time >= Duration::from_millis(300));
    assert!(algorithm.run_time < Duration::from_secs(60));
    assert_eq!(
        algorithm.best_solution().validate(algorithm.problem()),
        Ok(())
    );
}

#[test]
fn test_algorithm_stops_at_known_optimum() {
    let problem = create_test_problem(15);

    let mut first_run = AcoAlgorithm::new(problem.clone(), quick_config().with_max_iterations(0));
    let initial = first_run.run().length;

    // the same seed finds the same initial best, which is declared optimal
    let config = quick_config().with_max_iterations(1000).with_optimum(initial);
    let mut algorithm = AcoAlgorithm::new(problem, config);

    algorithm.run();
    assert_eq!(algorithm.iterations, 0);
    assert!((algorithm.best_solution().length - initial).abs() < 1e-9);
}

#[test]
fn test_unreachable_optimum_does_not_stop_the_run() {
    let problem = create_test_problem(15);
    let config = quick_config().with_max_iterations(3).with_optimum(1.0);
    let mut algorithm = AcoAlgorithm::new(problem, config);

    algorithm.run();
    assert_eq!(algorithm.iterations, 3);
}

#[test]
fn test_algorithm_improvement() {
    let problem = create_test_problem(30);
    let mut algorithm = AcoAlgorithm::new(problem, quick_config().with_max_iterations(20));

    algorithm.initialize();
    let initial = algorithm.best_solution().length;
    while !algorithm.should_terminate() {
        algorithm.run_iteration();
        assert!(algorithm.best_solution().length <= initial + 1e-9);
    }
}

#[test]
fn test_algorithm_multiple_runs_consistency() {
    let problem = create_test_problem(20);

    let mut first = AcoAlgorithm::new(problem.clone(), quick_config());
    let mut second = AcoAlgorithm::new(problem, quick_config());

    let a = first.run().clone();
    let b = second.run().clone();
    assert_eq!(a.tour, b.tour);
    assert_eq!(a.length, b.length);
}

#[test]
fn test_algorithm_with_decomposition() {
    let problem = create_test_problem(60);
    let config = quick_config()
        .with_decomposition(true)
        .with_num_subproblems(2)
        .with_sub_problem_iterations(5)
        .with_max_iterations(3);
    let mut algorithm = AcoAlgorithm::new(problem, config);

    assert!(algorithm.decomposer.is_some());
    let best = algorithm.run().clone();
    assert_eq!(best.validate(algorithm.problem()), Ok(()));
    assert_eq!(algorithm.iterations, 3);
}

#[test]
fn test_small_instances_skip_decomposition() {
    let problem = create_test_problem(20);
    let config = quick_config().with_decomposition(true);
    let algorithm = AcoAlgorithm::new(problem, config);

    assert!(algorithm.decomposer.is_none());
}

#[test]
fn test_algorithm_with_different_configs() {
    let problem = create_test_problem(20);
    let configs = vec![
        quick_config().with_local_search(false),
        quick_config().with_dont_look_bits(false),
        quick_config().with_annealing(false),
        quick_config().with_stagnation_limit(1),
        quick_config().with_ras_ranks(2).with_rho(0.3),
    ];

    for config in configs {
        let mut algorithm = AcoAlgorithm::new(problem.clone(), config);
        let best = algorithm.run().clone();
        assert_eq!(best.validate(algorithm.problem()), Ok(()));
    }
}
