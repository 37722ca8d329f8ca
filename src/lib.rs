//! # ACO-CVRP
//!
//! A Rust implementation of a rank-based Ant System for the Capacitated
//! Vehicle Routing Problem (CVRP).
//!
//! Ants build solutions from a pheromone field, each solution is refined by
//! 2-opt and a customer swap, and the trails are reinforced by the best ants
//! of every iteration. When the best-so-far solution stagnates, a simulated
//! annealing episode perturbs it; on larger instances the best-so-far
//! solution is periodically split by the sweep algorithm into sub-problems
//! that are solved in parallel and merged back.

pub mod annealing;
pub mod colony;
pub mod config;
pub mod construction;
pub mod decomposition;
pub mod error;
pub mod local_search;
pub mod matrix;
pub mod moves;
pub mod pheromone;
pub mod problem;
pub mod solution;
pub mod utils;

use crate::colony::AntColony;
use crate::config::Config;
use crate::decomposition::ProblemDecomposer;
use crate::problem::Problem;
use crate::solution::Solution;
use crate::utils::SearchStatistics;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

/// Distance under which the best-so-far length counts as the known optimum.
const OPTIMUM_EPSILON: f64 = 1e-6;

/// The main algorithm structure driving the colony and the decomposition.
pub struct AcoAlgorithm {
    pub colony: AntColony,
    pub config: Config,
    /// `None` when decomposition is disabled or the instance is too small
    pub decomposer: Option<ProblemDecomposer>,
    pub run_time: Duration,
    /// Completed outer iterations
    pub iterations: usize,
    pub start_time: Instant,
    /// Drives the rotation offsets and sub-problem seeds
    rng: ChaCha8Rng,
}

impl AcoAlgorithm {
    /// Create a new instance for the given problem and configuration.
    pub fn new(problem: Problem, config: Config) -> Self {
        let decomposer = if config.decomposition {
            Some(ProblemDecomposer::new(&config, problem.node_count()))
                .filter(ProblemDecomposer::is_active)
        } else {
            None
        };

        AcoAlgorithm {
            rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1)),
            colony: AntColony::new(problem, config.clone()),
            config,
            decomposer,
            run_time: Duration::from_secs(0),
            iterations: 0,
            start_time: Instant::now(),
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.colony.problem
    }

    /// Find the first best solution and reset the pheromone trails.
    pub fn initialize(&mut self) {
        self.start_time = Instant::now();
        self.colony.start_clock();
        self.colony.initialize();
        self.iterations = 0;
    }

    /// Run the algorithm until the termination criteria are met.
    pub fn run(&mut self) -> &Solution {
        self.initialize();

        while !self.should_terminate() {
            self.run_iteration();
        }

        self.run_time = self.start_time.elapsed();
        info!(
            "finished after {} iterations: best {:.2} found at iteration {}",
            self.iterations,
            self.colony.best_length(),
            self.colony.statistics.best_iteration
        );
        self.colony.best()
    }

    /// One outer iteration: a plain colony iteration, or the configured
    /// number of master iterations followed by a decomposition round.
    pub fn run_iteration(&mut self) {
        match &self.decomposer {
            Some(decomposer) => {
                for _ in 0..self.config.master_iterations {
                    self.colony.run_iteration();
                }
                decomposer.run_round(&mut self.colony, &mut self.rng);
            }
            None => self.colony.run_iteration(),
        }

        self.iterations += 1;
    }

    /// Check if the termination criteria are met: the iteration budget, the
    /// time limit, or a best length within `OPTIMUM_EPSILON` of the known optimum.
    pub fn should_terminate(&self) -> bool {
        if self.iterations >= self.config.max_iterations {
            return true;
        }

        if let Some(time_limit) = self.config.time_limit {
            if self.start_time.elapsed() >= time_limit {
                return true;
            }
        }

        if let Some(optimum) = self.config.optimum {
            let best = self.colony.best_length();
            if (best - optimum).abs() < OPTIMUM_EPSILON {
                return true;
            }
        }

        false
    }

    pub fn best_solution(&self) -> &Solution {
        self.colony.best()
    }

    /// Summary of the search so far.
    pub fn statistics(&self) -> SearchStatistics {
        let best = self.colony.best();
        SearchStatistics {
            iterations: self.iterations,
            colony_iterations: self.colony.iteration(),
            runtime: self.run_time,
            best_length: best.length,
            best_routes: best.route_count(),
            best_iteration: self.colony.statistics.best_iteration,
            best_time: self.colony.statistics.best_time,
            annealing_episodes: self.colony.statistics.annealing_episodes,
            disturbances: self.colony.statistics.disturbances,
        }
    }
}
