//! Unit tests for the solution construction of a single ant.

use aco_cvrp::construction::Constructor;
use aco_cvrp::pheromone::PheromoneField;
use aco_cvrp::problem::{Node, Problem};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Five customers on a unit grid next to the depot.
fn create_grid_problem() -> Problem {
    let nodes = vec![
        Node::new(0, 0.0, 0.0, 0),
        Node::new(1, 1.0, 0.0, 3),
        Node::new(2, 2.0, 0.0, 4),
        Node::new(3, 0.0, 1.0, 3),
        Node::new(4, 1.0, 1.0, 2),
        Node::new(5, 2.0, 1.0, 5),
    ];

    Problem::new("Grid".to_string(), nodes, 10)
}

#[test]
fn test_construct_feasible_solution() {
    let problem = create_grid_problem();
    let pheromone = PheromoneField::new(&problem, 1.0, 2.0, 0.5);
    let mut constructor = Constructor::new(4);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..50 {
        let solution = constructor.construct(&pheromone, &problem, &mut rng);

        assert_eq!(solution.validate(&problem), Ok(()));
        assert_eq!(solution.tour.first(), Some(&0));
        assert_eq!(solution.tour.last(), Some(&0));
        // 17 units of demand need at least two vehicles
        assert!(solution.route_count() >= 2);
        for route in solution.routes(&problem) {
            assert!(route.load <= 10);
        }
    }
}

#[test]
fn test_ant_memory_after_construction() {
    let problem = create_grid_problem();
    let pheromone = PheromoneField::new(&problem, 1.0, 2.0, 0.5);
    let mut constructor = Constructor::new(4);
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let solution = constructor.construct(&pheromone, &problem, &mut rng);
    let ant = constructor.ant();

    assert_eq!(ant.tour, solution.tour);
    assert!(ant.visited[1..].iter().all(|&visited| visited));
}

#[test]
fn test_distance_limit_is_respected() {
    // the farthest customer needs a round trip of about 4.47
    let problem = create_grid_problem().with_max_route_distance(5.0);
    let pheromone = PheromoneField::new(&problem, 1.0, 2.0, 0.5);
    let mut constructor = Constructor::new(4);
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..50 {
        let solution = constructor.construct(&pheromone, &problem, &mut rng);
        assert_eq!(solution.validate(&problem), Ok(()));
        for route in solution.routes(&problem) {
            assert!(route.distance <= 5.0 + 1e-9);
        }
    }
}

#[test]
fn test_full_vehicles_open_new_routes() {
    let nodes = vec![
        Node::new(0, 0.0, 0.0, 0),
        Node::new(1, 1.0, 0.0, 5),
        Node::new(2, 0.0, 1.0, 5),
        Node::new(3, -1.0, 0.0, 5),
    ];
    let problem = Problem::new("Full".to_string(), nodes, 5);
    let pheromone = PheromoneField::new(&problem, 1.0, 2.0, 0.5);
    let mut constructor = Constructor::new(2);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let solution = constructor.construct(&pheromone, &problem, &mut rng);
    assert_eq!(solution.route_count(), 3);
    assert_eq!(solution.validate(&problem), Ok(()));
}

#[test]
fn test_strong_trail_is_followed() {
    let problem = create_grid_problem();
    let mut pheromone = PheromoneField::new(&problem, 1.0, 0.0, 1e-6);
    for (from, to) in [(0, 5), (5, 2), (2, 0), (0, 1), (1, 4), (4, 3), (3, 0)] {
        pheromone.set_trail(from, to, 1e6);
    }
    pheromone.compute_desirability();

    let mut constructor = Constructor::new(5);
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let solution = constructor.construct(&pheromone, &problem, &mut rng);

    let routes = solution.customer_sequences();
    assert!(routes.contains(&vec![5, 2]) || routes.contains(&vec![1, 4, 3]));
}
