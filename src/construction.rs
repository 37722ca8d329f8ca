//! Probabilistic tour construction by a single ant.

use crate::pheromone::PheromoneField;
use crate::problem::{Problem, DEPOT};
use crate::solution::Solution;
use rand::Rng;

/// Construction memory of one ant.
#[derive(Debug, Clone, Default)]
pub struct Ant {
    /// The partial tour built so far
    pub tour: Vec<usize>,
    /// Nodes already placed in the tour
    pub visited: Vec<bool>,
    /// Unvisited nodes that can legally extend the current route
    pub feasible_next: Vec<bool>,
    route_load: u64,
    route_distance: f64,
}

impl Ant {
    /// Empty the memory and place the ant on the depot.
    fn reset(&mut self, node_count: usize) {
        self.tour.clear();
        self.visited.clear();
        self.visited.resize(node_count, false);
        self.feasible_next.clear();
        self.feasible_next.resize(node_count, false);
        self.start_route();
    }

    /// Return to the depot and open a new route.
    fn start_route(&mut self) {
        self.tour.push(DEPOT);
        self.visited[DEPOT] = true;
        self.route_load = 0;
        self.route_distance = 0.0;
    }

    fn current(&self) -> usize {
        *self.tour.last().unwrap_or(&DEPOT)
    }

    fn move_to(&mut self, next: usize, problem: &Problem) {
        let current = self.current();
        self.route_load += problem.demand(next);
        self.route_distance += problem.get_distance(current, next) + problem.service_time;
        self.visited[next] = true;
        self.tour.push(next);
    }

    /// Mark the nodes that fit the remaining capacity and, when the route
    /// length is bounded, can still be served before returning to the depot.
    fn mark_feasible(&mut self, problem: &Problem) -> usize {
        let current = self.current();
        let mut count = 0;

        for node in 0..problem.node_count() {
            let feasible = !self.visited[node]
                && self.route_load + problem.demand(node) <= problem.vehicle_capacity
                && problem.within_distance_limit(
                    self.route_distance
                        + problem.get_distance(current, node)
                        + problem.service_time
                        + problem.get_distance(node, DEPOT),
                );
            self.feasible_next[node] = feasible;
            if feasible {
                count += 1;
            }
        }

        count
    }
}

/// Builds one solution per call following the pheromone field.
#[derive(Debug, Clone)]
pub struct Constructor {
    /// Candidate list size used for roulette-wheel selection
    pub nn_ants: usize,
    ant: Ant,
    prob_of_selection: Vec<f64>,
}

impl Constructor {
    pub fn new(nn_ants: usize) -> Self {
        Constructor {
            nn_ants,
            ant: Ant::default(),
            prob_of_selection: Vec::with_capacity(nn_ants),
        }
    }

    /// Build a complete solution.
    ///
    /// A dead end never fails: the route is closed and a new one starts at
    /// the depot.
    pub fn construct<R: Rng + ?Sized>(
        &mut self,
        pheromone: &PheromoneField,
        problem: &Problem,
        rng: &mut R,
    ) -> Solution {
        let customers = problem.get_customer_count();
        self.ant.reset(problem.node_count());

        let mut placed = 0;
        while placed < customers {
            if self.ant.mark_feasible(problem) == 0 {
                assert_ne!(
                    self.ant.current(),
                    DEPOT,
                    "a remaining customer cannot be served by any single route"
                );
                self.ant.start_route();
                continue;
            }

            let next = self.choose_and_move_to_next(pheromone, problem, rng);
            self.ant.move_to(next, problem);
            placed += 1;
        }
        self.ant.tour.push(DEPOT);

        let solution = Solution::new(self.ant.tour.clone(), problem);
        if cfg!(debug_assertions) {
            solution.assert_valid(problem);
        }
        solution
    }

    /// Roulette-wheel selection over the feasible part of the candidate list.
    fn choose_and_move_to_next<R: Rng + ?Sized>(
        &mut self,
        pheromone: &PheromoneField,
        problem: &Problem,
        rng: &mut R,
    ) -> usize {
        let current = self.ant.current();
        let candidates = problem.nearest(current, self.nn_ants);

        self.prob_of_selection.clear();
        let mut sum_prob = 0.0;
        for &node in candidates {
            let prob = if self.ant.feasible_next[node] {
                pheromone.desirability(current, node)
            } else {
                0.0
            };
            sum_prob += prob;
            self.prob_of_selection.push(prob);
        }

        if sum_prob <= 0.0 {
            // every candidate is infeasible
            return self.choose_best_next(pheromone, problem);
        }

        let rnd = rng.gen::<f64>() * sum_prob;
        let mut partial_sum = 0.0;
        for (index, &prob) in self.prob_of_selection.iter().enumerate() {
            partial_sum += prob;
            if partial_sum > rnd && prob > 0.0 {
                return candidates[index];
            }
        }

        // rounding pushed `rnd` past the last partial sum
        self.neighbour_choose_best_next(pheromone, problem)
    }

    /// The feasible candidate with maximal desirability.
    fn neighbour_choose_best_next(&self, pheromone: &PheromoneField, problem: &Problem) -> usize {
        let current = self.ant.current();
        let best = problem
            .nearest(current, self.nn_ants)
            .iter()
            .copied()
            .filter(|&node| self.ant.feasible_next[node])
            .max_by(|&a, &b| {
                pheromone
                    .desirability(current, a)
                    .total_cmp(&pheromone.desirability(current, b))
            });

        match best {
            Some(node) => node,
            None => self.choose_best_next(pheromone, problem),
        }
    }

    /// The feasible node with maximal desirability over all nodes.
    fn choose_best_next(&self, pheromone: &PheromoneField, problem: &Problem) -> usize {
        let current = self.ant.current();
        let mut next = None;
        let mut value_best = -1.0;

        for node in 0..problem.node_count() {
            if !self.ant.feasible_next[node] {
                continue;
            }
            let value = pheromone.desirability(current, node);
            if value > value_best {
                value_best = value;
                next = Some(node);
            }
        }

        next.expect("choose_best_next called without a feasible node")
    }

    /// Read-only view of the last ant's memory.
    pub fn ant(&self) -> &Ant {
        &self.ant
    }
}
