//! Sweep-based decomposition of the best-so-far solution into independent
//! sub-problems, solved in parallel and merged back into the master colony.

use crate::colony::AntColony;
use crate::config::Config;
use crate::matrix::Matrix;
use crate::problem::{Problem, DEPOT};
use crate::solution::Solution;
use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;

/// A merged tour longer than the master's best by less than this still counts as a tie.
const EPSILON: f64 = 1e-6;

/// Demand-weighted center of a route and its polar angle about the depot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCenter {
    /// Position of the opening depot of the route in the master tour
    pub begin: usize,
    /// Position of the closing depot
    pub end: usize,
    pub x: f64,
    pub y: f64,
    /// Degrees in `(-180, 180]`
    pub angle: f64,
}

/// Angle of `(dx, dy)` in degrees, normalized to `(-180, 180]`.
pub fn polar_angle(dx: f64, dy: f64) -> f64 {
    let angle = dy.atan2(dx).to_degrees();
    if angle <= -180.0 {
        angle + 360.0
    } else {
        angle
    }
}

/// Centers of every route of `solution`, in tour order.
///
/// Customers are weighted by demand; a route without demand uses the plain
/// mean of its coordinates.
pub fn route_centers(solution: &Solution, problem: &Problem) -> Vec<RouteCenter> {
    let depot = problem.get_depot();

    solution
        .routes(problem)
        .iter()
        .map(|route| {
            let customers = &solution.tour[route.begin + 1..route.end];
            let total: f64 = customers.iter().map(|&c| problem.demand(c) as f64).sum();
            let weight = |c: usize| {
                if total > 0.0 {
                    problem.demand(c) as f64 / total
                } else {
                    1.0 / customers.len() as f64
                }
            };

            let x: f64 = customers.iter().map(|&c| weight(c) * problem.nodes[c].x).sum();
            let y: f64 = customers.iter().map(|&c| weight(c) * problem.nodes[c].y).sum();

            RouteCenter {
                begin: route.begin,
                end: route.end,
                x,
                y,
                angle: polar_angle(x - depot.x, y - depot.y),
            }
        })
        .collect()
}

/// Split `count` items into `groups` contiguous sizes, the first groups
/// taking one extra item each until the remainder is used up.
pub fn group_sizes(count: usize, groups: usize) -> Vec<usize> {
    let groups = groups.clamp(1, count.max(1));
    let base = count / groups;
    let remainder = count % groups;

    (0..groups)
        .map(|group| base + usize::from(group < remainder))
        .collect()
}

/// A self-contained slice of the master problem.
#[derive(Debug, Clone)]
pub struct SubProblem {
    pub index: usize,
    /// Master index of every local node; `real_nodes[0]` is the depot
    pub real_nodes: Vec<usize>,
    pub problem: Problem,
    /// The master's routes of this group, in local indices
    pub initial: Solution,
    /// Master trails restricted to the sub-problem and scaled by `1 / ratio`
    pub trails: Matrix<f64>,
    /// Sub-tour length over master length at decomposition time
    pub ratio: f64,
    pub seed: u64,
}

/// What a sub-problem returns to the coordinator.
#[derive(Debug, Clone)]
pub struct SubSolution {
    pub index: usize,
    pub real_nodes: Vec<usize>,
    /// Best tour found, in local indices
    pub best: Solution,
    /// Trails at the time `best` was found
    pub best_pheromone: Matrix<f64>,
    pub ratio: f64,
}

impl SubSolution {
    /// The best tour translated back to master indices.
    pub fn real_tour(&self) -> Vec<usize> {
        self.best.tour.iter().map(|&local| self.real_nodes[local]).collect()
    }
}

impl SubProblem {
    /// Run a sub-problem colony for `iterations` iterations.
    pub fn solve(self, config: &Config, iterations: usize) -> SubSolution {
        let mut colony = AntColony::for_sub_problem(
            self.problem,
            config.clone(),
            self.seed,
            self.initial,
            self.trails,
        );
        colony.start_clock();

        for _ in 0..iterations {
            colony.run_iteration();
        }

        debug!(
            "sub-problem {}: {} nodes, best {:.2} after {} iterations",
            self.index,
            self.real_nodes.len(),
            colony.best_length(),
            iterations
        );

        let best_pheromone = colony
            .best_pheromone()
            .cloned()
            .unwrap_or_else(|| colony.pheromone.trails().clone());

        SubSolution {
            index: self.index,
            real_nodes: self.real_nodes,
            best: colony.best().clone(),
            best_pheromone,
            ratio: self.ratio,
        }
    }
}

/// Splits a solution by the sweep algorithm and merges the solved parts back.
#[derive(Debug, Clone)]
pub struct ProblemDecomposer {
    pub num_subproblems: usize,
    pub sub_problem_iterations: usize,
    config: Config,
}

impl ProblemDecomposer {
    pub fn new(config: &Config, node_count: usize) -> Self {
        ProblemDecomposer {
            num_subproblems: config.subproblem_count(node_count),
            sub_problem_iterations: config.sub_problem_iterations,
            config: config.clone(),
        }
    }

    /// Whether this decomposer produces any sub-problem.
    pub fn is_active(&self) -> bool {
        self.num_subproblems > 0
    }

    /// Group the routes of `solution` by polar angle and carve one
    /// sub-problem per group.
    pub fn decompose<R: Rng + ?Sized>(
        &self,
        solution: &Solution,
        problem: &Problem,
        trails: &Matrix<f64>,
        rng: &mut R,
    ) -> Vec<SubProblem> {
        let mut centers = route_centers(solution, problem);
        if centers.is_empty() || self.num_subproblems == 0 {
            return Vec::new();
        }

        centers.sort_by(|a, b| a.angle.total_cmp(&b.angle));
        let offset = rng.gen_range(0..centers.len());
        centers.rotate_right(offset);

        let mut subs = Vec::new();
        let mut start = 0;
        for (index, size) in group_sizes(centers.len(), self.num_subproblems)
            .into_iter()
            .enumerate()
        {
            let group = &centers[start..start + size];
            start += size;
            subs.push(self.build_sub_problem(index, group, solution, problem, trails, rng));
        }

        subs
    }

    fn build_sub_problem<R: Rng + ?Sized>(
        &self,
        index: usize,
        group: &[RouteCenter],
        solution: &Solution,
        problem: &Problem,
        trails: &Matrix<f64>,
        rng: &mut R,
    ) -> SubProblem {
        let mut real_nodes = vec![DEPOT];
        let mut local_tour = vec![DEPOT];
        for center in group {
            for &node in &solution.tour[center.begin + 1..center.end] {
                local_tour.push(real_nodes.len());
                real_nodes.push(node);
            }
            local_tour.push(DEPOT);
        }

        let sub_problem = problem.sub_problem(format!("{}-sub{}", problem.name, index), &real_nodes);
        let initial = Solution::new(local_tour, &sub_problem);

        let ratio = if solution.length > 0.0 && initial.length > 0.0 {
            initial.length / solution.length
        } else {
            1.0
        };
        let n = real_nodes.len();
        let sub_trails = Matrix::from_fn(n, n, |i, j| {
            trails[(real_nodes[i], real_nodes[j])] / ratio
        });

        SubProblem {
            index,
            real_nodes,
            problem: sub_problem,
            initial,
            trails: sub_trails,
            ratio,
            seed: rng.gen(),
        }
    }

    /// Solve every sub-problem on its own worker. Results keep the input order.
    pub fn solve(&self, subs: Vec<SubProblem>) -> Vec<SubSolution> {
        let iterations = self.sub_problem_iterations;
        let config = &self.config;

        subs.into_par_iter()
            .map(|sub| sub.solve(config, iterations))
            .collect()
    }

    /// Concatenate the sub-problem tours and, if the result is no longer than
    /// the master's best, install it together with the sub-problem trails.
    /// Returns whether the master was updated.
    pub fn merge_back(&self, colony: &mut AntColony, results: &[SubSolution]) -> bool {
        if results.is_empty() {
            return false;
        }

        let mut tour = vec![DEPOT];
        for result in results {
            tour.extend(result.real_tour().into_iter().skip(1));
        }
        let merged = Solution::new(tour, &colony.problem);

        if cfg!(debug_assertions) {
            merged.assert_valid(&colony.problem);
        }

        let master_length = colony.best_length();
        if merged.length > master_length + EPSILON {
            debug!(
                "merge rejected: {:.2} is longer than {:.2}",
                merged.length, master_length
            );
            return false;
        }

        for result in results {
            let n = result.real_nodes.len();
            for i in 0..n {
                for j in 0..n {
                    if i != j {
                        colony.pheromone.set_trail(
                            result.real_nodes[i],
                            result.real_nodes[j],
                            result.best_pheromone[(i, j)] * result.ratio,
                        );
                    }
                }
            }
        }
        colony.pheromone.compute_desirability();

        info!(
            "merged {} sub-problems: {:.2} -> {:.2}",
            results.len(),
            master_length,
            merged.length
        );
        colony.offer_best(merged)
    }

    /// Decompose the colony's best solution, solve the parts in parallel and
    /// merge them back.
    pub fn run_round<R: Rng + ?Sized>(&self, colony: &mut AntColony, rng: &mut R) -> bool {
        let subs = self.decompose(colony.best(), &colony.problem, colony.pheromone.trails(), rng);
        if subs.is_empty() {
            return false;
        }

        debug!(
            "decomposed {} routes into {} sub-problems",
            colony.best().route_count(),
            subs.len()
        );

        let results = self.solve(subs);
        self.merge_back(colony, &results)
    }
}
