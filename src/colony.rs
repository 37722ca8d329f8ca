//! The rank-based ant colony: construction, local search, statistics,
//! pheromone update and the annealing trigger.

use std::time::{Duration, Instant};

use crate::annealing::SimulatedAnnealing;
use crate::config::Config;
use crate::construction::Constructor;
use crate::local_search::LocalSearch;
use crate::matrix::Matrix;
use crate::pheromone::PheromoneField;
use crate::problem::Problem;
use crate::solution::Solution;
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Trail value used for the first construction pass.
const INITIAL_TRAIL: f64 = 0.5;
/// Two lengths closer than this are considered equal.
const EPSILON: f64 = 1e-6;
/// Default stagnation limit of a sub-problem colony.
const SUB_PROBLEM_STAGNATION_LIMIT: usize = 30;

/// Counters describing the progress of a colony.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColonyStatistics {
    /// Completed iterations, the initial pass included
    pub iteration: usize,
    /// Iteration the best-so-far solution was found in
    pub best_iteration: usize,
    /// Elapsed time when the best-so-far solution was found
    pub best_time: Duration,
    /// Iterations since the best-so-far solution last improved
    pub best_stagnation: usize,
    /// Consecutive iterations whose best length did not change
    pub iteration_stagnation: usize,
    /// Best length of the previous iteration
    pub last_iteration_length: f64,
    /// Number of annealing episodes run
    pub annealing_episodes: usize,
    /// Number of pheromone disturbances applied
    pub disturbances: usize,
}

/// An ant colony owning its problem, pheromone field and random generator.
///
/// A master colony starts from scratch through [`AntColony::initialize`];
/// a sub-problem colony starts from a given solution and trail matrix.
#[derive(Debug, Clone)]
pub struct AntColony {
    pub problem: Problem,
    pub config: Config,
    pub pheromone: PheromoneField,
    /// Solutions of the last iteration
    pub ants: Vec<Solution>,
    pub statistics: ColonyStatistics,
    best_so_far: Solution,
    /// Trail matrix at the time the best-so-far solution was found
    best_pheromone: Option<Matrix<f64>>,
    track_best_pheromone: bool,
    constructor: Constructor,
    local_search: LocalSearch,
    rng: ChaCha8Rng,
    n_ants: usize,
    nn_ants: usize,
    stagnation_limit: usize,
    start_time: Instant,
}

impl AntColony {
    /// Create a master colony seeded from the configuration.
    pub fn new(problem: Problem, config: Config) -> Self {
        let seed = config.seed;
        let stagnation_limit = config.stagnation_limit.unwrap_or(problem.node_count());
        Self::build(problem, config, seed, stagnation_limit, false)
    }

    /// Create a colony for a sub-problem, starting from `initial` and `trails`.
    pub fn for_sub_problem(
        problem: Problem,
        config: Config,
        seed: u64,
        initial: Solution,
        trails: Matrix<f64>,
    ) -> Self {
        let stagnation_limit = config
            .stagnation_limit
            .unwrap_or(SUB_PROBLEM_STAGNATION_LIMIT);
        let mut colony = Self::build(problem, config, seed, stagnation_limit, true);

        colony.pheromone = PheromoneField::from_trails(
            &colony.problem,
            colony.config.alpha,
            colony.config.beta,
            trails,
        );
        colony.best_pheromone = Some(colony.pheromone.trails().clone());
        colony.best_so_far = initial;
        colony.statistics.last_iteration_length = colony.best_so_far.length;
        colony
    }

    fn build(
        problem: Problem,
        config: Config,
        seed: u64,
        stagnation_limit: usize,
        track_best_pheromone: bool,
    ) -> Self {
        let n = problem.node_count();
        let nn_ants = config.construction_depth(n);
        let local_search = LocalSearch::new(config.local_search_depth(n), config.dlb_flag);
        let pheromone = PheromoneField::new(&problem, config.alpha, config.beta, INITIAL_TRAIL);

        AntColony {
            n_ants: config.ant_count(n),
            nn_ants,
            stagnation_limit,
            pheromone,
            ants: Vec::new(),
            statistics: ColonyStatistics::default(),
            best_so_far: Solution::empty(),
            best_pheromone: None,
            track_best_pheromone,
            constructor: Constructor::new(nn_ants),
            local_search,
            rng: ChaCha8Rng::seed_from_u64(seed),
            start_time: Instant::now(),
            problem,
            config,
        }
    }

    /// The best solution found so far; empty before the first iteration.
    pub fn best(&self) -> &Solution {
        &self.best_so_far
    }

    pub fn best_length(&self) -> f64 {
        self.best_so_far.length
    }

    /// Trail snapshot taken when the best-so-far solution was last improved.
    pub fn best_pheromone(&self) -> Option<&Matrix<f64>> {
        self.best_pheromone.as_ref()
    }

    pub fn iteration(&self) -> usize {
        self.statistics.iteration
    }

    pub fn stagnation_limit(&self) -> usize {
        self.stagnation_limit
    }

    /// Restart the clock used to time best-so-far discoveries.
    pub fn start_clock(&mut self) {
        self.start_time = Instant::now();
    }

    /// Find a first best solution with uniform trails, then reset every
    /// trail to `1 / (rho * best_length)`.
    pub fn initialize(&mut self) {
        self.statistics = ColonyStatistics::default();
        self.best_so_far = Solution::empty();

        self.pheromone.reset(INITIAL_TRAIL);
        self.pheromone.compute_desirability();

        self.construct_solutions();
        if self.config.ls_flag {
            self.local_search_all();
        }
        self.update_statistics();

        let trail_0 = 1.0 / (self.config.rho * self.best_so_far.length);
        self.pheromone.reset(trail_0);
        self.pheromone.compute_desirability();
        self.statistics.iteration += 1;

        info!(
            "{}: initial best {:.2}, trails reset to {:.6}",
            self.problem.name, self.best_so_far.length, trail_0
        );
    }

    /// Run one iteration: construct, improve, update statistics and trails,
    /// and anneal the best-so-far solution if it has stagnated.
    pub fn run_iteration(&mut self) {
        self.construct_solutions();
        if self.config.ls_flag {
            self.local_search_all();
        }
        self.update_statistics();
        self.pheromone_trail_update();

        if self.config.sa_flag && self.statistics.best_stagnation >= self.stagnation_limit {
            self.anneal();
            self.statistics.best_stagnation = 0;
        }

        self.statistics.iteration += 1;
    }

    fn construct_solutions(&mut self) {
        self.ants.clear();
        for _ in 0..self.n_ants {
            let solution = self
                .constructor
                .construct(&self.pheromone, &self.problem, &mut self.rng);
            self.ants.push(solution);
        }
    }

    fn local_search_all(&mut self) {
        for ant in self.ants.iter_mut() {
            self.local_search.improve(ant, &self.problem, &mut self.rng);
        }
    }

    fn iteration_best(&self) -> Option<&Solution> {
        self.ants
            .iter()
            .min_by(|a, b| a.length.total_cmp(&b.length))
    }

    /// Track the iteration best and the stagnation counters.
    fn update_statistics(&mut self) {
        let iteration_best = match self.iteration_best() {
            Some(best) => best.clone(),
            None => return,
        };

        let length = iteration_best.length;
        debug!(
            "{}: iteration {} best {:.2} (best so far {:.2})",
            self.problem.name,
            self.statistics.iteration,
            length,
            self.best_so_far.length
        );

        if length - self.best_so_far.length < -EPSILON {
            self.statistics.best_stagnation = 0;
            self.set_best(iteration_best);
        } else {
            self.statistics.best_stagnation += 1;
            if (self.statistics.last_iteration_length - length).abs() < EPSILON {
                self.statistics.iteration_stagnation += 1;
            } else {
                self.statistics.iteration_stagnation = 0;
            }
        }

        self.statistics.last_iteration_length = length;
    }

    /// Record a new best-so-far solution.
    fn set_best(&mut self, solution: Solution) {
        self.best_so_far = solution;
        self.statistics.best_iteration = self.statistics.iteration;
        self.statistics.best_time = self.start_time.elapsed();
        if self.track_best_pheromone {
            self.best_pheromone = Some(self.pheromone.trails().clone());
        }

        info!(
            "{}: new best {:.2} at iteration {} ({:.2}s)",
            self.problem.name,
            self.best_so_far.length,
            self.statistics.iteration,
            self.statistics.best_time.as_secs_f64()
        );
    }

    /// Evaporate, then either deposit rank-based or disturb when the
    /// iteration best keeps repeating.
    fn pheromone_trail_update(&mut self) {
        let depth = self.nn_ants;
        if self.config.ls_flag {
            self.pheromone
                .evaporate_candidates(self.config.rho, &self.problem, depth);
        } else {
            self.pheromone.evaporate(self.config.rho);
        }

        if self.statistics.iteration_stagnation >= self.config.disturbance.threshold {
            debug!(
                "{}: pheromone disturbance at iteration {} (best stagnation {}, iteration stagnation {})",
                self.problem.name,
                self.statistics.iteration,
                self.statistics.best_stagnation,
                self.statistics.iteration_stagnation
            );
            self.pheromone.disturb(self.config.disturbance.delta);
            self.statistics.iteration_stagnation =
                self.statistics.iteration_stagnation.saturating_sub(2);
            self.statistics.disturbances += 1;
        } else {
            self.pheromone
                .rank_based_update(&self.ants, &self.best_so_far, self.config.ras_ranks);
        }

        if self.config.ls_flag {
            self.pheromone
                .compute_candidate_desirability(&self.problem, depth);
        } else {
            self.pheromone.compute_desirability();
        }
    }

    /// Run one annealing episode on the best-so-far solution.
    fn anneal(&mut self) {
        let mut annealer =
            SimulatedAnnealing::from_config(&self.config.annealing, self.problem.node_count());
        let weight = 2.0 * self.config.ras_ranks as f64;
        let mut best = self.best_so_far.clone();

        let improved = annealer.run(
            &mut best,
            &mut self.pheromone,
            &self.problem,
            weight,
            &mut self.rng,
        );
        self.statistics.annealing_episodes += 1;

        if improved {
            self.set_best(best);
        }
    }

    /// Replace the best-so-far solution with one produced outside the colony
    /// unless it is longer. Returns whether it was replaced.
    ///
    /// A tour of equal length is installed without touching the discovery
    /// statistics.
    pub fn offer_best(&mut self, solution: Solution) -> bool {
        if solution.length > self.best_so_far.length + EPSILON {
            return false;
        }
        if solution.length < self.best_so_far.length - EPSILON {
            self.statistics.best_stagnation = 0;
            self.set_best(solution);
        } else {
            self.best_so_far = solution;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Node;

    fn ring_problem() -> Problem {
        let mut nodes = vec![Node::new(0, 0.0, 0.0, 0)];
        for i in 1..=12 {
            let angle = i as f64 * std::f64::consts::PI / 6.0;
            nodes.push(Node::new(i, 10.0 * angle.cos(), 10.0 * angle.sin(), 2));
        }
        Problem::new("ring".to_string(), nodes, 8)
    }

    fn small_config() -> Config {
        Config::new()
            .with_n_ants(6)
            .with_seed(9)
            .with_decomposition(false)
    }

    #[test]
    fn test_initialization_resets_trails() {
        let mut colony = AntColony::new(ring_problem(), small_config());
        colony.initialize();

        let best = colony.best().length;
        assert!(best.is_finite());
        assert_eq!(colony.iteration(), 1);
        let expected = 1.0 / (0.1 * best);
        assert!((colony.pheromone.trail(0, 1) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_best_so_far_never_worsens() {
        let mut colony = AntColony::new(ring_problem(), small_config());
        colony.initialize();

        let mut previous = colony.best_length();
        for _ in 0..10 {
            colony.run_iteration();
            assert!(colony.best_length() <= previous);
            assert!(colony.best().validate(&colony.problem).is_ok());
            previous = colony.best_length();
        }
        assert_eq!(colony.iteration(), 11);
    }

    #[test]
    fn test_stagnation_triggers_annealing() {
        let config = small_config()
            .with_stagnation_limit(1)
            .with_annealing_config(crate::config::AnnealingConfig {
                epoch_length: Some(20),
                cooling_factor: 0.8,
                ..Default::default()
            });
        let mut colony = AntColony::new(ring_problem(), config);
        colony.initialize();
        for _ in 0..15 {
            colony.run_iteration();
        }
        assert!(colony.statistics.annealing_episodes > 0);
        assert!(colony.best().validate(&colony.problem).is_ok());
    }

    #[test]
    fn test_offer_best_rejects_longer_solution() {
        let problem = ring_problem();
        let mut colony = AntColony::new(problem.clone(), small_config());
        colony.initialize();

        let worse = Solution::from_routes(
            &(1..=12).map(|customer| vec![customer]).collect::<Vec<_>>(),
            &problem,
        );
        assert!(worse.length > colony.best_length());
        assert!(!colony.offer_best(worse));
    }

    #[test]
    fn test_equal_length_offer_keeps_discovery_statistics() {
        let mut colony = AntColony::new(ring_problem(), small_config());
        colony.initialize();
        for _ in 0..3 {
            colony.run_iteration();
        }
        let statistics = colony.statistics.clone();

        let mut routes = colony.best().customer_sequences();
        routes.reverse();
        let same = Solution::from_routes(&routes, &colony.problem);

        assert!(colony.offer_best(same.clone()));
        assert_eq!(colony.best().tour, same.tour);
        assert_eq!(colony.statistics, statistics);
    }

    #[test]
    fn test_sub_problem_snapshots_trails_on_improvement() {
        let problem = ring_problem();
        let n = problem.node_count();
        let singletons: Vec<Vec<usize>> = (1..n).map(|customer| vec![customer]).collect();
        let initial = Solution::from_routes(&singletons, &problem);
        let trails = Matrix::new(n, n, 1.0);

        let mut colony =
            AntColony::for_sub_problem(problem, small_config(), 3, initial.clone(), trails.clone());
        assert_eq!(colony.best_pheromone(), Some(&trails));

        colony.run_iteration();

        // the first iteration beats one vehicle per customer before its trail update
        assert!(colony.best_length() < initial.length);
        assert_eq!(colony.best_pheromone(), Some(&trails));
        assert_ne!(colony.pheromone.trails(), &trails);
    }
}
