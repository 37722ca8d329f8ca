//! Simulated annealing episodes run on the best-so-far solution when the
//! colony stagnates.

use std::collections::VecDeque;

use crate::config::AnnealingConfig;
use crate::moves::{Move, MoveGenerator, MoveKind};
use crate::pheromone::PheromoneField;
use crate::problem::Problem;
use crate::solution::Solution;
use log::{debug, info, trace};
use rand::Rng;

/// Two gains of opposite sign are considered the same move within this tolerance.
const GAIN_TOLERANCE: f64 = 1e-9;
/// Draws allowed per trial before an epoch is cut short.
const MAX_DRAWS_PER_TRIAL: usize = 100;

/// Metropolis criterion: improvements always pass, a deterioration passes
/// with probability `exp(-gain / temperature)`.
pub fn metropolis_accept<R: Rng + ?Sized>(gain: f64, temperature: f64, rng: &mut R) -> bool {
    if gain < 0.0 {
        return true;
    }
    rng.gen::<f64>() < (-gain / temperature).exp()
}

#[derive(Debug, Clone, Copy)]
struct TabuEntry {
    kind: MoveKind,
    positions: (usize, usize),
    gain: f64,
    expires: usize,
}

/// Recently applied moves, forbidden from being undone for a few trials.
#[derive(Debug, Clone)]
pub struct TabuList {
    tenure: usize,
    entries: VecDeque<TabuEntry>,
}

impl TabuList {
    /// Create a list where every entry lives for `tenure` trials.
    pub fn new(tenure: usize) -> Self {
        TabuList {
            tenure,
            entries: VecDeque::new(),
        }
    }

    /// Record an applied move at trial `now`.
    pub fn push(&mut self, mv: &Move, now: usize) {
        if self.tenure == 0 {
            return;
        }
        let (a, b) = mv.positions();
        self.entries.push_back(TabuEntry {
            kind: mv.kind(),
            positions: (a.min(b), a.max(b)),
            gain: mv.gain(),
            expires: now + self.tenure,
        });
    }

    /// Drop the entries whose lifetime ended by trial `now`.
    pub fn expire(&mut self, now: usize) {
        while matches!(self.entries.front(), Some(entry) if entry.expires <= now) {
            self.entries.pop_front();
        }
    }

    /// Whether `mv` would revert a recorded move: same kind, same positions
    /// and the opposite gain.
    pub fn is_tabu(&self, mv: &Move) -> bool {
        let (a, b) = mv.positions();
        let positions = (a.min(b), a.max(b));
        let gain = mv.gain();

        self.entries.iter().any(|entry| {
            entry.kind == mv.kind()
                && entry.positions == positions
                && (entry.gain + gain).abs() < GAIN_TOLERANCE
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Counters of one cooling epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochStatistics {
    pub trials: usize,
    pub accepted: usize,
    pub improvements: usize,
}

impl EpochStatistics {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepted as f64 / self.trials as f64
        }
    }

    pub fn improvement_ratio(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.improvements as f64 / self.trials as f64
        }
    }
}

/// A bounded annealing episode with geometric cooling and a tabu list.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    t0: f64,
    cooling_factor: f64,
    epoch_length: usize,
    terminal_ratio: f64,
    temperature: f64,
    generator: MoveGenerator,
    tabu: TabuList,
    statistics: EpochStatistics,
    /// Counters of every finished epoch of the last episode
    history: Vec<EpochStatistics>,
}

impl SimulatedAnnealing {
    pub fn new(
        t0: f64,
        cooling_factor: f64,
        epoch_length: usize,
        terminal_ratio: f64,
        tabu_tenure: usize,
    ) -> Self {
        assert!(t0 > 0.0, "initial temperature must be positive");
        assert!(
            cooling_factor > 0.0 && cooling_factor < 1.0,
            "cooling factor must lie in (0, 1)"
        );
        assert!(terminal_ratio > 1.0, "terminal ratio must exceed 1");

        SimulatedAnnealing {
            t0,
            cooling_factor,
            epoch_length: epoch_length.max(1),
            terminal_ratio,
            temperature: t0,
            generator: MoveGenerator::new(),
            tabu: TabuList::new(tabu_tenure),
            statistics: EpochStatistics::default(),
            history: Vec::new(),
        }
    }

    /// Build an annealer for a problem with `node_count` nodes.
    pub fn from_config(config: &AnnealingConfig, node_count: usize) -> Self {
        Self::new(
            config.t0,
            config.cooling_factor,
            config.epoch_length_for(node_count),
            config.terminal_ratio,
            config.tabu_tenure,
        )
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Per-epoch counters of the last episode.
    pub fn epoch_statistics(&self) -> &[EpochStatistics] {
        &self.history
    }

    /// Number of cooling epochs an episode runs.
    pub fn epoch_count(&self) -> usize {
        let mut t = self.t0;
        let mut epochs = 0;
        while t > self.t0 / self.terminal_ratio {
            t *= self.cooling_factor;
            epochs += 1;
        }
        epochs
    }

    /// Anneal a copy of `best` and copy the result back if it is shorter.
    ///
    /// Each time the working tour beats the episode's best, its arcs receive
    /// an extra deposit of `deposit_weight / length`. Returns whether `best`
    /// was replaced.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        best: &mut Solution,
        pheromone: &mut PheromoneField,
        problem: &Problem,
        deposit_weight: f64,
        rng: &mut R,
    ) -> bool {
        info!(
            "starting simulated annealing on {} (length {:.2})",
            problem.name, best.length
        );

        self.temperature = self.t0;
        self.tabu.clear();
        self.statistics = EpochStatistics::default();
        self.history.clear();

        let mut current = best.clone();
        let mut best_found = best.clone();
        let mut deposited = false;
        let terminal = self.t0 / self.terminal_ratio;
        let mut trial = 0;

        while self.temperature > terminal {
            let max_draws = self.epoch_length.saturating_mul(MAX_DRAWS_PER_TRIAL);
            let mut draws = 0;
            while self.statistics.trials < self.epoch_length && draws < max_draws {
                draws += 1;
                self.tabu.expire(trial + 1);
                let applied = match self.step(&mut current, problem, trial + 1, rng) {
                    Some(applied) => applied,
                    None => continue,
                };
                trial += 1;
                if applied && current.length < best_found.length {
                    best_found.clone_from(&current);
                    pheromone.deposit(&best_found, deposit_weight);
                    deposited = true;
                }
            }
            self.cool();
        }

        best_found.compute_length(problem);
        if cfg!(debug_assertions) {
            best_found.assert_valid(problem);
        }
        if deposited {
            pheromone.compute_desirability();
        }

        let improved = best_found.length < best.length;
        if improved {
            *best = best_found;
        }
        info!(
            "simulated annealing finished on {} (length {:.2}, improved: {})",
            problem.name, best.length, improved
        );

        improved
    }

    /// Draw a move and apply it if it is not tabu and passes the Metropolis test.
    ///
    /// Returns `None` when no feasible move was drawn; such draws are not
    /// trials. Otherwise returns whether the move was applied.
    fn step<R: Rng + ?Sized>(
        &mut self,
        current: &mut Solution,
        problem: &Problem,
        trial: usize,
        rng: &mut R,
    ) -> Option<bool> {
        let mv = self
            .generator
            .generate(current, problem, rng)
            .filter(Move::is_valid)?;

        self.statistics.trials += 1;
        if self.tabu.is_tabu(&mv) || !metropolis_accept(mv.gain(), self.temperature, rng) {
            return Some(false);
        }

        if mv.gain() < 0.0 {
            self.statistics.improvements += 1;
        }
        self.statistics.accepted += 1;

        mv.apply(current);
        self.tabu.push(&mv, trial);
        trace!("accepted {:?} move {:?}, gain {:.3}", mv.kind(), mv.positions(), mv.gain());

        Some(true)
    }

    fn cool(&mut self) {
        self.temperature *= self.cooling_factor;
        debug!(
            "annealing epoch: T {:.4}, ar {:.3}, ir {:.3}, trials {}",
            self.temperature,
            self.statistics.acceptance_ratio(),
            self.statistics.improvement_ratio(),
            self.statistics.trials
        );
        self.history.push(std::mem::take(&mut self.statistics));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Node;
    use crate::solution::Route;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn problem() -> Problem {
        let nodes = vec![
            Node::new(0, 0.0, 0.0, 0),
            Node::new(1, 1.0, 0.0, 1),
            Node::new(2, 2.0, 0.0, 1),
            Node::new(3, 2.0, 1.0, 1),
            Node::new(4, 1.0, 1.0, 1),
        ];
        Problem::new("annealing".to_string(), nodes, 10)
    }

    fn exchange(solution: &Solution, problem: &Problem, routes: &[Route]) -> Move {
        Move::exchange(solution, problem, routes, 1, 3)
    }

    #[test]
    fn test_improvement_always_accepted() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for &t in &[1e-6, 0.5, 5.0, 1e6] {
            for _ in 0..100 {
                assert!(metropolis_accept(-5.0, t, &mut rng));
            }
        }
    }

    #[test]
    fn test_acceptance_rate_matches_boltzmann() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let (gain, t) = (1.0, 2.0);
        let trials = 20_000;
        let accepted = (0..trials)
            .filter(|_| metropolis_accept(gain, t, &mut rng))
            .count();

        let expected = (-gain / t).exp();
        let observed = accepted as f64 / trials as f64;
        assert!((observed - expected).abs() < 0.02, "{} vs {}", observed, expected);
    }

    #[test]
    fn test_tabu_blocks_reversal_until_expiry() {
        let problem = problem();
        let solution = Solution::new(vec![0, 1, 2, 3, 4, 0], &problem);
        let routes = solution.routes(&problem);
        let mv = exchange(&solution, &problem, &routes);

        let mut tabu = TabuList::new(3);
        tabu.push(&mv, 1);

        let mut swapped = solution.clone();
        mv.apply(&mut swapped);
        let routes = swapped.routes(&problem);
        let reverse = exchange(&swapped, &problem, &routes);
        assert!((reverse.gain() + mv.gain()).abs() < 1e-9);
        assert!(tabu.is_tabu(&reverse));
        assert!(!tabu.is_tabu(&mv) || mv.gain().abs() < 1e-9);

        tabu.expire(3);
        assert!(tabu.is_tabu(&reverse));
        tabu.expire(4);
        assert!(tabu.is_empty());
        assert!(!tabu.is_tabu(&reverse));
    }

    #[test]
    fn test_episode_never_worsens_best() {
        let problem = problem();
        let mut best = Solution::new(vec![0, 3, 1, 0, 4, 2, 0], &problem);
        let initial = best.length;
        let mut pheromone = PheromoneField::new(&problem, 1.0, 2.0, 1.0);
        let mut annealer = SimulatedAnnealing::new(5.0, 0.9, 50, 50.0, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(23);

        let improved = annealer.run(&mut best, &mut pheromone, &problem, 12.0, &mut rng);

        assert!(best.length <= initial + 1e-9);
        assert_eq!(improved, best.length < initial);
        assert!(best.validate(&problem).is_ok());
        assert!(annealer.temperature() <= 5.0 / 50.0);
    }

    #[test]
    fn test_epoch_count() {
        let annealer = SimulatedAnnealing::new(5.0, 0.5, 10, 8.0, 3);
        // 5 -> 2.5 -> 1.25 -> 0.625 which is the terminal temperature
        assert_eq!(annealer.epoch_count(), 3);
    }
}
