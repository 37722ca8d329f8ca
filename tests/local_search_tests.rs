//! Unit tests for the local search components of the ACO-CVRP algorithm.

use aco_cvrp::construction::Constructor;
use aco_cvrp::local_search::LocalSearch;
use aco_cvrp::pheromone::PheromoneField;
use aco_cvrp::problem::{Node, Problem};
use aco_cvrp::solution::Solution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Creates a simple test problem with a depot and some customers in a grid.
fn create_test_problem() -> Problem {
    let nodes = vec![
        // Depot at (0, 0)
        Node::new(0, 0.0, 0.0, 0),
        Node::new(1, 10.0, 0.0, 1),
        Node::new(2, 10.0, 10.0, 1),
        Node::new(3, 0.0, 10.0, 1),
        Node::new(4, -10.0, 0.0, 2),
        Node::new(5, -10.0, -10.0, 2),
        Node::new(6, 0.0, -10.0, 2),
    ];

    Problem::new("TestProblem".to_string(), nodes, 6)
}

/// Random instance with clustered demand, built from a fixed seed.
fn create_random_problem(customers: usize, seed: u64) -> Problem {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut nodes = vec![Node::new(0, 50.0, 50.0, 0)];
    for id in 1..=customers {
        nodes.push(Node::new(
            id,
            rng.gen_range(0.0..100.0),
            rng.gen_range(0.0..100.0),
            rng.gen_range(1..10),
        ));
    }

    Problem::new(format!("Random{}", customers), nodes, 30)
}

/// An ant's tour on a uniform pheromone field.
fn construct(problem: &Problem, seed: u64) -> Solution {
    let pheromone = PheromoneField::new(problem, 1.0, 2.0, 1.0);
    let mut constructor = Constructor::new(10);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    constructor.construct(&pheromone, problem, &mut rng)
}

#[test]
fn test_two_opt_uncrosses_route() {
    let problem = create_test_problem();
    // 0 -> 2 -> 1 -> 3 -> 0 crosses itself
    let mut solution = Solution::new(vec![0, 2, 1, 3, 0, 4, 5, 6, 0], &problem);
    let before = solution.length;

    let mut local_search = LocalSearch::new(6, true);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let changed = local_search.two_opt_solution(&mut solution.tour, &problem, &mut rng);
    solution.compute_length(&problem);

    assert!(changed);
    assert!(solution.length < before);
    // the square 0-1-2-3 has perimeter 40
    let route = &solution.routes(&problem)[0];
    assert!((route.distance - 40.0).abs() < 1e-9);
    assert_eq!(solution.validate(&problem), Ok(()));
}

#[test]
fn test_two_opt_keeps_depots_in_place() {
    let problem = create_test_problem();
    let mut tour = vec![0, 2, 1, 3, 0, 6, 4, 5, 0];

    let mut local_search = LocalSearch::new(6, false);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    local_search.two_opt_solution(&mut tour, &problem, &mut rng);

    assert_eq!(tour[0], 0);
    assert_eq!(tour[4], 0);
    assert_eq!(tour[8], 0);
    let mut first: Vec<usize> = tour[1..4].to_vec();
    first.sort_unstable();
    assert_eq!(first, vec![1, 2, 3]);
}

#[test]
fn test_swap_moves_customers_between_routes() {
    let problem = create_test_problem();
    // 3 and 4 sit in each other's natural route
    let mut solution = Solution::new(vec![0, 1, 2, 4, 0, 3, 5, 6, 0], &problem);
    let before = solution.length;

    let mut local_search = LocalSearch::new(6, true);
    let changed = local_search.swap_pass(&mut solution.tour, &problem);
    solution.compute_length(&problem);

    assert!(changed);
    assert!(solution.length < before);
    assert_eq!(solution.validate(&problem), Ok(()));
}

#[test]
fn test_improve_never_increases_length() {
    for seed in 0..5 {
        let problem = create_random_problem(40, seed);
        let mut solution = construct(&problem, seed);
        let before = solution.length;

        let mut local_search = LocalSearch::new(10, true);
        let mut rng = ChaCha8Rng::seed_from_u64(seed + 100);
        local_search.improve(&mut solution, &problem, &mut rng);

        assert!(solution.length <= before + 1e-9);
        assert_eq!(solution.validate(&problem), Ok(()));
    }
}

#[test]
fn test_improve_is_idempotent() {
    let problem = create_random_problem(30, 9);
    let mut solution = construct(&problem, 9);

    let mut local_search = LocalSearch::new(10, true);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    local_search.improve(&mut solution, &problem, &mut rng);

    let tour = solution.tour.clone();
    let length = solution.length;
    local_search.improve(&mut solution, &problem, &mut rng);

    assert_eq!(solution.tour, tour);
    assert!((solution.length - length).abs() < 1e-9);
}

#[test]
fn test_improve_respects_distance_limit() {
    let problem = create_random_problem(30, 4).with_max_route_distance(160.0);
    let mut solution = construct(&problem, 4);
    assert_eq!(solution.validate(&problem), Ok(()));

    let mut local_search = LocalSearch::new(10, false);
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    local_search.improve(&mut solution, &problem, &mut rng);

    assert_eq!(solution.validate(&problem), Ok(()));
    for route in solution.routes(&problem) {
        assert!(route.distance <= 160.0 + 1e-9);
    }
}
