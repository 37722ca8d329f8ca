//! Configuration parameters for the ant colony, annealing and decomposition.

use crate::error::AcoResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Parameters of a simulated annealing episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    /// Initial temperature
    pub t0: f64,
    /// Factor applied to the temperature after each epoch
    pub cooling_factor: f64,
    /// Trials per epoch; `None` uses `max(4 * nodes, 250)`
    pub epoch_length: Option<usize>,
    /// The episode stops once the temperature falls to `t0 / terminal_ratio`
    pub terminal_ratio: f64,
    /// Number of trials a move stays tabu
    pub tabu_tenure: usize,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        AnnealingConfig {
            t0: 5.0,
            cooling_factor: 0.97,
            epoch_length: None,
            terminal_ratio: 50.0,
            tabu_tenure: 3,
        }
    }
}

impl AnnealingConfig {
    /// Epoch length for a problem with `node_count` nodes.
    pub fn epoch_length_for(&self, node_count: usize) -> usize {
        self.epoch_length.unwrap_or((node_count * 4).max(250)).max(1)
    }
}

/// Parameters of the pheromone disturbance applied when iterations repeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisturbanceConfig {
    /// Iterations with an unchanged iteration-best before disturbing
    pub threshold: usize,
    /// Weight kept by the current trail; the rest moves to the mean
    pub delta: f64,
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        DisturbanceConfig {
            threshold: 5,
            delta: 0.7,
        }
    }
}

/// Configuration settings for the ACO-CVRP algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Importance of the pheromone trail (α)
    pub alpha: f64,
    /// Importance of the heuristic information (β)
    pub beta: f64,
    /// Evaporation rate (ρ)
    pub rho: f64,
    /// Number of ranked ants depositing pheromone, best-so-far included
    pub ras_ranks: usize,
    /// Number of ants; `None` uses the node count
    pub n_ants: Option<usize>,
    /// Candidate list size used during construction; `None` uses all customers
    pub nn_ants: Option<usize>,
    /// Candidate list depth scanned by 2-opt; `None` uses `nn_ants`
    pub nn_ls: Option<usize>,
    /// Apply local search to every ant
    pub ls_flag: bool,
    /// Use don't-look bits in 2-opt
    pub dlb_flag: bool,
    /// Maximum number of outer iterations
    pub max_iterations: usize,
    /// Optional time limit for the algorithm
    pub time_limit: Option<Duration>,
    /// Known optimum or bound; reaching it stops the run
    pub optimum: Option<f64>,
    /// Seed of the run's random generators
    pub seed: u64,
    /// Split the best-so-far solution into sub-problems each outer iteration
    pub decomposition: bool,
    /// Number of sub-problems; `None` uses `nodes / 50`
    pub num_subproblems: Option<usize>,
    /// Master colony iterations before each decomposition round
    pub master_iterations: usize,
    /// Iterations spent on each sub-problem per round
    pub sub_problem_iterations: usize,
    /// Run simulated annealing when the best-so-far stagnates
    pub sa_flag: bool,
    /// Iterations without improvement triggering annealing; `None` uses the node count
    pub stagnation_limit: Option<usize>,
    pub annealing: AnnealingConfig,
    pub disturbance: DisturbanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            alpha: 1.0,
            beta: 2.0,
            rho: 0.1,
            ras_ranks: 6,
            n_ants: None,
            nn_ants: None,
            nn_ls: None,
            ls_flag: true,
            dlb_flag: true,
            max_iterations: 100,
            time_limit: Some(Duration::from_secs(600)),
            optimum: None,
            seed: 1,
            decomposition: true,
            num_subproblems: None,
            master_iterations: 1,
            sub_problem_iterations: 75,
            sa_flag: true,
            stagnation_limit: None,
            annealing: AnnealingConfig::default(),
            disturbance: DisturbanceConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> AcoResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Number of ants for a problem with `node_count` nodes.
    pub fn ant_count(&self, node_count: usize) -> usize {
        self.n_ants.unwrap_or(node_count).max(1)
    }

    /// Construction candidate list size for a problem with `node_count` nodes.
    pub fn construction_depth(&self, node_count: usize) -> usize {
        let all = node_count.saturating_sub(2).max(1);
        self.nn_ants.unwrap_or(all).clamp(1, all)
    }

    /// 2-opt candidate list depth for a problem with `node_count` nodes.
    pub fn local_search_depth(&self, node_count: usize) -> usize {
        self.nn_ls
            .unwrap_or_else(|| self.construction_depth(node_count))
            .max(1)
    }

    /// Number of sub-problems for a problem with `node_count` nodes.
    pub fn subproblem_count(&self, node_count: usize) -> usize {
        self.num_subproblems.unwrap_or(node_count / 50)
    }

    /// Set the trail importance.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the heuristic importance.
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set the evaporation rate.
    pub fn with_rho(mut self, rho: f64) -> Self {
        assert!(rho > 0.0 && rho < 1.0, "rho must lie in (0, 1)");
        self.rho = rho;
        self
    }

    /// Set the number of ranked ants.
    pub fn with_ras_ranks(mut self, ranks: usize) -> Self {
        self.ras_ranks = ranks;
        self
    }

    /// Set the number of ants.
    pub fn with_n_ants(mut self, n: usize) -> Self {
        self.n_ants = Some(n);
        self
    }

    /// Set the construction candidate list size.
    pub fn with_nn_ants(mut self, n: usize) -> Self {
        self.nn_ants = Some(n);
        self
    }

    /// Set the 2-opt candidate list depth.
    pub fn with_nn_ls(mut self, n: usize) -> Self {
        self.nn_ls = Some(n);
        self
    }

    /// Enable or disable local search.
    pub fn with_local_search(mut self, enabled: bool) -> Self {
        self.ls_flag = enabled;
        self
    }

    /// Enable or disable don't-look bits.
    pub fn with_dont_look_bits(mut self, enabled: bool) -> Self {
        self.dlb_flag = enabled;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }

    /// Remove the time limit.
    pub fn without_time_limit(mut self) -> Self {
        self.time_limit = None;
        self
    }

    /// Set the known optimum or bound.
    pub fn with_optimum(mut self, optimum: f64) -> Self {
        self.optimum = Some(optimum);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable decomposition.
    pub fn with_decomposition(mut self, enabled: bool) -> Self {
        self.decomposition = enabled;
        self
    }

    /// Set the number of sub-problems.
    pub fn with_num_subproblems(mut self, n: usize) -> Self {
        self.num_subproblems = Some(n);
        self
    }

    /// Set the master iterations per decomposition round.
    pub fn with_master_iterations(mut self, iterations: usize) -> Self {
        self.master_iterations = iterations;
        self
    }

    /// Set the sub-problem iteration budget.
    pub fn with_sub_problem_iterations(mut self, iterations: usize) -> Self {
        self.sub_problem_iterations = iterations;
        self
    }

    /// Enable or disable simulated annealing.
    pub fn with_annealing(mut self, enabled: bool) -> Self {
        self.sa_flag = enabled;
        self
    }

    /// Set the stagnation limit triggering annealing.
    pub fn with_stagnation_limit(mut self, iterations: usize) -> Self {
        self.stagnation_limit = Some(iterations);
        self
    }

    /// Replace the annealing parameters.
    pub fn with_annealing_config(mut self, annealing: AnnealingConfig) -> Self {
        self.annealing = annealing;
        self
    }

    /// Replace the disturbance parameters.
    pub fn with_disturbance(mut self, disturbance: DisturbanceConfig) -> Self {
        self.disturbance = disturbance;
        self
    }
}
