//! Pheromone trails and the derived desirability used by the ants.

use crate::matrix::Matrix;
use crate::problem::Problem;
use crate::solution::Solution;
use itertools::Itertools;
use log::debug;

/// Offset keeping the heuristic finite on zero-length arcs.
const HEURISTIC_OFFSET: f64 = 0.1;

/// The trail matrix together with `trail^alpha * (1 / (d + 0.1))^beta`.
#[derive(Debug, Clone)]
pub struct PheromoneField {
    alpha: f64,
    beta: f64,
    trail: Matrix<f64>,
    /// `heuristic^beta`, fixed for the lifetime of the field
    heuristic: Matrix<f64>,
    desirability: Matrix<f64>,
}

impl PheromoneField {
    /// Create a field with every trail set to `initial_trail`.
    pub fn new(problem: &Problem, alpha: f64, beta: f64, initial_trail: f64) -> Self {
        let n = problem.node_count();
        let heuristic = Matrix::from_fn(n, n, |i, j| {
            (1.0 / (problem.get_distance(i, j) + HEURISTIC_OFFSET)).powf(beta)
        });

        let mut field = PheromoneField {
            alpha,
            beta,
            trail: Matrix::new(n, n, initial_trail),
            heuristic,
            desirability: Matrix::new(n, n, 0.0),
        };
        field.compute_desirability();
        field
    }

    /// Create a field from an existing trail matrix.
    pub fn from_trails(problem: &Problem, alpha: f64, beta: f64, trail: Matrix<f64>) -> Self {
        assert_eq!(trail.rows(), problem.node_count());
        let mut field = Self::new(problem, alpha, beta, 0.0);
        field.trail = trail;
        field.compute_desirability();
        field
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    #[inline]
    pub fn trail(&self, from: usize, to: usize) -> f64 {
        self.trail[(from, to)]
    }

    #[inline]
    pub fn desirability(&self, from: usize, to: usize) -> f64 {
        self.desirability[(from, to)]
    }

    pub fn trails(&self) -> &Matrix<f64> {
        &self.trail
    }

    /// Overwrite a single trail. Desirability is not refreshed.
    pub fn set_trail(&mut self, from: usize, to: usize, value: f64) {
        debug_assert!(value >= 0.0);
        self.trail[(from, to)] = value;
    }

    /// Reset all trails to `initial_trail`.
    pub fn reset(&mut self, initial_trail: f64) {
        self.trail.fill(initial_trail);
    }

    /// Multiply every off-diagonal trail by `1 - rho`.
    pub fn evaporate(&mut self, rho: f64) {
        let n = self.trail.rows();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    self.trail[(i, j)] *= 1.0 - rho;
                }
            }
        }
    }

    /// Evaporate only the arcs to the first `depth` candidates of each node.
    pub fn evaporate_candidates(&mut self, rho: f64, problem: &Problem, depth: usize) {
        for i in 0..problem.node_count() {
            for &j in problem.nearest(i, depth) {
                self.trail[(i, j)] *= 1.0 - rho;
            }
        }
    }

    /// Add `weight / length` on every arc of the tour.
    pub fn deposit(&mut self, solution: &Solution, weight: f64) {
        let d_tau = weight / solution.length;
        for (&from, &to) in solution.tour.iter().tuple_windows() {
            self.trail[(from, to)] += d_tau;
        }
    }

    /// Rank-based deposit: the `ranks - 1` best ants deposit with weights
    /// `ranks - 1, ranks - 2, ..., 1` and the best-so-far ant with weight `ranks`.
    pub fn rank_based_update(&mut self, ants: &[Solution], best_so_far: &Solution, ranks: usize) {
        let ranked = ants
            .iter()
            .sorted_by(|a, b| a.length.total_cmp(&b.length))
            .take(ranks.saturating_sub(1));

        for (rank, ant) in ranked.enumerate() {
            let weight = (ranks - 1 - rank) as f64;
            self.deposit(ant, weight);
        }

        self.deposit(best_so_far, ranks as f64);
    }

    /// Pull every trail towards the matrix mean: `(1 - delta) * mean + delta * trail`.
    pub fn disturb(&mut self, delta: f64) {
        let cells = self.trail.iter().count() as f64;
        let mean = self.trail.iter().sum::<f64>() / cells;
        debug!("pheromone disturbance: mean trail {:.6}", mean);

        for trail in self.trail.iter_mut() {
            *trail = (1.0 - delta) * mean + delta * *trail;
        }
    }

    #[inline]
    fn combine(&self, from: usize, to: usize) -> f64 {
        self.trail[(from, to)].powf(self.alpha) * self.heuristic[(from, to)]
    }

    /// Recompute the desirability of every off-diagonal arc.
    pub fn compute_desirability(&mut self) {
        let n = self.trail.rows();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    self.desirability[(i, j)] = self.combine(i, j);
                }
            }
        }
    }

    /// Recompute desirability only on candidate arcs.
    pub fn compute_candidate_desirability(&mut self, problem: &Problem, depth: usize) {
        for i in 0..problem.node_count() {
            for &j in problem.nearest(i, depth) {
                self.desirability[(i, j)] = self.combine(i, j);
            }
        }
    }
}
