//! Local search applied to the ants' solutions: intra-route 2-opt followed by
//! a pairwise customer swap across the whole tour.

pub mod swap;
pub mod two_opt;

use crate::problem::{Problem, DEPOT};
use crate::solution::Solution;
use rand::Rng;

/// Minimal gain treated as an improvement.
pub(crate) const EPSILON: f64 = 1e-9;

/// Reusable scratch space for the local search operators.
#[derive(Debug, Clone)]
pub struct LocalSearch {
    /// Candidate list depth scanned by 2-opt
    pub nn_ls: usize,
    /// Use don't-look bits in 2-opt
    pub dlb_flag: bool,
    dont_look: Vec<bool>,
    in_route: Vec<bool>,
    /// Tour position of every node of the route under 2-opt
    position: Vec<usize>,
}

impl LocalSearch {
    /// Create a new local search instance.
    pub fn new(nn_ls: usize, dlb_flag: bool) -> Self {
        LocalSearch {
            nn_ls: nn_ls.max(1),
            dlb_flag,
            dont_look: Vec::new(),
            in_route: Vec::new(),
            position: Vec::new(),
        }
    }

    /// Improve a solution until neither 2-opt nor swap finds an improving move.
    ///
    /// Feasibility is preserved and the length never increases. Running it a
    /// second time on its own output leaves the tour unchanged.
    pub fn improve<R: Rng + ?Sized>(
        &mut self,
        solution: &mut Solution,
        problem: &Problem,
        rng: &mut R,
    ) {
        if solution.tour.len() < 3 {
            return;
        }

        loop {
            let mut improvement = self.two_opt_solution(&mut solution.tour, problem, rng);
            improvement |= self.swap_pass(&mut solution.tour, problem);
            if !improvement {
                break;
            }
        }

        solution.compute_length(problem);
        if cfg!(debug_assertions) {
            solution.assert_valid(problem);
        }
    }

    /// Size the scratch buffers for `node_count` nodes and clear them.
    fn prepare(&mut self, node_count: usize) {
        self.dont_look.clear();
        self.dont_look.resize(node_count, false);
        self.in_route.clear();
        self.in_route.resize(node_count, false);
        self.position.clear();
        self.position.resize(node_count, 0);
    }
}

/// Load and distance of every route, indexed by route, plus the route index
/// of every tour position.
pub(crate) fn route_index(tour: &[usize], problem: &Problem) -> (Vec<usize>, Vec<u64>, Vec<f64>) {
    let mut route_of = vec![0; tour.len()];
    let mut loads = Vec::new();
    let mut distances = Vec::new();
    let mut load = 0;
    let mut distance = 0.0;

    for position in 1..tour.len() {
        let node = tour[position];
        distance += problem.get_distance(tour[position - 1], node);
        route_of[position] = loads.len();

        if node == DEPOT {
            loads.push(load);
            distances.push(distance);
            load = 0;
            distance = 0.0;
        } else {
            load += problem.demand(node);
            distance += problem.service_time;
        }
    }

    (route_of, loads, distances)
}
