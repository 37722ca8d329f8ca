//! Random neighborhood moves used by simulated annealing.
//!
//! A [`Move`] is evaluated against a tour without touching it: the gain is
//! computed from the arcs it changes and the feasibility from the routes it
//! touches. Applying it is a separate step.

use crate::problem::Problem;
use crate::solution::{Route, Solution};
use rand::Rng;

/// Discriminant of a [`Move`], used to compare moves in the tabu list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Exchange,
    Insertion,
    Inversion,
}

/// Load and length of a route once a move is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteUpdate {
    /// Index of the route in tour order
    pub route: usize,
    pub load: u64,
    pub distance: f64,
}

/// A neighborhood move on a depot-delimited tour.
///
/// `gain` is the signed change of the tour length; negative is an improvement.
#[derive(Debug, Clone, PartialEq)]
pub enum Move {
    /// Swap the customers at `pos_n1 < pos_n2`.
    Exchange {
        pos_n1: usize,
        pos_n2: usize,
        gain: f64,
        valid: bool,
        first: RouteUpdate,
        second: RouteUpdate,
    },
    /// Move the customer at `pos_n1` right after the node at `pos_n2`.
    Insertion {
        pos_n1: usize,
        pos_n2: usize,
        gain: f64,
        valid: bool,
        source: RouteUpdate,
        target: RouteUpdate,
    },
    /// Reverse the customers between `pos_n1 < pos_n2`, both included.
    Inversion {
        pos_n1: usize,
        pos_n2: usize,
        gain: f64,
        valid: bool,
        route: RouteUpdate,
    },
}

/// Index of the route whose customers or outgoing depot arc cover `position`.
fn route_at(routes: &[Route], position: usize) -> usize {
    routes.partition_point(|route| route.end <= position)
}

impl Move {
    /// Evaluate swapping the customers at two positions.
    pub fn exchange(
        solution: &Solution,
        problem: &Problem,
        routes: &[Route],
        pos_n1: usize,
        pos_n2: usize,
    ) -> Move {
        let (pos_n1, pos_n2) = (pos_n1.min(pos_n2), pos_n1.max(pos_n2));
        let tour = &solution.tour;
        let d = |a: usize, b: usize| problem.get_distance(a, b);

        let (n1, n2) = (tour[pos_n1], tour[pos_n2]);
        let (p_n1, s_n1) = (tour[pos_n1 - 1], tour[pos_n1 + 1]);
        let (p_n2, s_n2) = (tour[pos_n2 - 1], tour[pos_n2 + 1]);

        let (delta1, delta2) = if pos_n2 == pos_n1 + 1 {
            (d(p_n1, n2) + d(n1, s_n2) - d(p_n1, n1) - d(n2, s_n2), 0.0)
        } else {
            (
                d(p_n1, n2) + d(n2, s_n1) - d(p_n1, n1) - d(n1, s_n1),
                d(p_n2, n1) + d(n1, s_n2) - d(p_n2, n2) - d(n2, s_n2),
            )
        };
        let gain = delta1 + delta2;

        let (r1, r2) = (route_at(routes, pos_n1), route_at(routes, pos_n2));
        let (first, second) = if r1 == r2 {
            let update = RouteUpdate {
                route: r1,
                load: routes[r1].load,
                distance: routes[r1].distance + gain,
            };
            (update, update)
        } else {
            (
                RouteUpdate {
                    route: r1,
                    load: routes[r1].load - problem.demand(n1) + problem.demand(n2),
                    distance: routes[r1].distance + delta1,
                },
                RouteUpdate {
                    route: r2,
                    load: routes[r2].load - problem.demand(n2) + problem.demand(n1),
                    distance: routes[r2].distance + delta2,
                },
            )
        };

        Move::Exchange {
            pos_n1,
            pos_n2,
            gain,
            valid: problem.is_route_feasible(first.load, first.distance)
                && problem.is_route_feasible(second.load, second.distance),
            first,
            second,
        }
    }

    /// Evaluate moving the customer at `pos_n1` behind the node at `pos_n2`.
    ///
    /// `pos_n2` may hold a depot, in which case the customer opens the route
    /// leaving that depot. `pos_n2` must differ from `pos_n1` and `pos_n1 - 1`
    /// and cannot be the final depot.
    pub fn insertion(
        solution: &Solution,
        problem: &Problem,
        routes: &[Route],
        pos_n1: usize,
        pos_n2: usize,
    ) -> Move {
        debug_assert!(pos_n2 != pos_n1 && pos_n2 + 1 != pos_n1);
        let tour = &solution.tour;
        let d = |a: usize, b: usize| problem.get_distance(a, b);

        let n1 = tour[pos_n1];
        let (p_n1, s_n1) = (tour[pos_n1 - 1], tour[pos_n1 + 1]);
        let (n2, s_n2) = (tour[pos_n2], tour[pos_n2 + 1]);

        let removal = d(p_n1, s_n1) - d(p_n1, n1) - d(n1, s_n1);
        let addition = d(n2, n1) + d(n1, s_n2) - d(n2, s_n2);
        let gain = removal + addition;

        let (r1, r2) = (route_at(routes, pos_n1), route_at(routes, pos_n2));
        let (source, target) = if r1 == r2 {
            let update = RouteUpdate {
                route: r1,
                load: routes[r1].load,
                distance: routes[r1].distance + gain,
            };
            (update, update)
        } else {
            (
                RouteUpdate {
                    route: r1,
                    load: routes[r1].load - problem.demand(n1),
                    distance: routes[r1].distance + removal - problem.service_time,
                },
                RouteUpdate {
                    route: r2,
                    load: routes[r2].load + problem.demand(n1),
                    distance: routes[r2].distance + addition + problem.service_time,
                },
            )
        };

        Move::Insertion {
            pos_n1,
            pos_n2,
            gain,
            valid: problem.is_route_feasible(target.load, target.distance)
                && problem.within_distance_limit(source.distance),
            source,
            target,
        }
    }

    /// Evaluate reversing the customers between two positions of one route.
    pub fn inversion(
        solution: &Solution,
        problem: &Problem,
        routes: &[Route],
        pos_n1: usize,
        pos_n2: usize,
    ) -> Move {
        let (pos_n1, pos_n2) = (pos_n1.min(pos_n2), pos_n1.max(pos_n2));
        let tour = &solution.tour;
        let d = |a: usize, b: usize| problem.get_distance(a, b);

        let (n1, n2) = (tour[pos_n1], tour[pos_n2]);
        let (p_n1, s_n2) = (tour[pos_n1 - 1], tour[pos_n2 + 1]);
        let gain = d(p_n1, n2) + d(n1, s_n2) - d(p_n1, n1) - d(n2, s_n2);

        let index = route_at(routes, pos_n1);
        debug_assert!(routes[index].contains_position(pos_n2));
        let route = RouteUpdate {
            route: index,
            load: routes[index].load,
            distance: routes[index].distance + gain,
        };

        Move::Inversion {
            pos_n1,
            pos_n2,
            gain,
            valid: problem.within_distance_limit(route.distance),
            route,
        }
    }

    pub fn kind(&self) -> MoveKind {
        match self {
            Move::Exchange { .. } => MoveKind::Exchange,
            Move::Insertion { .. } => MoveKind::Insertion,
            Move::Inversion { .. } => MoveKind::Inversion,
        }
    }

    pub fn positions(&self) -> (usize, usize) {
        match *self {
            Move::Exchange { pos_n1, pos_n2, .. }
            | Move::Insertion { pos_n1, pos_n2, .. }
            | Move::Inversion { pos_n1, pos_n2, .. } => (pos_n1, pos_n2),
        }
    }

    pub fn gain(&self) -> f64 {
        match *self {
            Move::Exchange { gain, .. }
            | Move::Insertion { gain, .. }
            | Move::Inversion { gain, .. } => gain,
        }
    }

    /// Whether every touched route respects capacity and distance limits.
    pub fn is_valid(&self) -> bool {
        match *self {
            Move::Exchange { valid, .. }
            | Move::Insertion { valid, .. }
            | Move::Inversion { valid, .. } => valid,
        }
    }

    /// The routes touched by the move with their new load and length.
    pub fn route_updates(&self) -> Vec<RouteUpdate> {
        match *self {
            Move::Exchange { first, second, .. } if first.route == second.route => vec![first],
            Move::Exchange { first, second, .. } => vec![first, second],
            Move::Insertion { source, target, .. } if source.route == target.route => {
                vec![source]
            }
            Move::Insertion { source, target, .. } => vec![source, target],
            Move::Inversion { route, .. } => vec![route],
        }
    }

    /// Apply the move to the tour it was evaluated on.
    ///
    /// Panics on an invalid move. A route emptied by an insertion is dropped.
    pub fn apply(&self, solution: &mut Solution) {
        assert!(self.is_valid(), "attempt to apply an infeasible move: {:?}", self);
        let tour = &mut solution.tour;

        match *self {
            Move::Exchange { pos_n1, pos_n2, .. } => tour.swap(pos_n1, pos_n2),
            Move::Insertion { pos_n1, pos_n2, .. } => {
                if pos_n1 < pos_n2 {
                    tour[pos_n1..=pos_n2].rotate_left(1);
                } else {
                    tour[pos_n2 + 1..=pos_n1].rotate_right(1);
                }
                tour.dedup();
            }
            Move::Inversion { pos_n1, pos_n2, .. } => tour[pos_n1..=pos_n2].reverse(),
        }

        solution.length += self.gain();
    }
}

/// Draws random moves from the three neighborhoods.
#[derive(Debug, Clone, Default)]
pub struct MoveGenerator {
    routes: Vec<Route>,
    customers: Vec<usize>,
}

impl MoveGenerator {
    pub fn new() -> Self {
        MoveGenerator::default()
    }

    /// Draw a move with the neighborhood chosen uniformly.
    ///
    /// Returns `None` when the chosen neighborhood is empty for this tour.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        solution: &Solution,
        problem: &Problem,
        rng: &mut R,
    ) -> Option<Move> {
        self.routes = solution.routes(problem);
        self.customers.clear();
        for route in &self.routes {
            self.customers.extend(route.begin + 1..route.end);
        }

        match rng.gen_range(0..3) {
            0 => self.exchange(solution, problem, rng),
            1 => self.insertion(solution, problem, rng),
            _ => self.inversion(solution, problem, rng),
        }
    }

    fn exchange<R: Rng + ?Sized>(
        &self,
        solution: &Solution,
        problem: &Problem,
        rng: &mut R,
    ) -> Option<Move> {
        let count = self.customers.len();
        if count < 2 {
            return None;
        }

        let a = rng.gen_range(0..count);
        let mut b = rng.gen_range(0..count - 1);
        if b >= a {
            b += 1;
        }

        Some(Move::exchange(
            solution,
            problem,
            &self.routes,
            self.customers[a],
            self.customers[b],
        ))
    }

    fn insertion<R: Rng + ?Sized>(
        &self,
        solution: &Solution,
        problem: &Problem,
        rng: &mut R,
    ) -> Option<Move> {
        let last = solution.tour.len() - 1;
        if self.customers.is_empty() || last < 3 {
            return None;
        }

        let pos_n1 = self.customers[rng.gen_range(0..self.customers.len())];
        // every position before the final depot except pos_n1 - 1 and pos_n1
        let k = rng.gen_range(0..last - 2);
        let pos_n2 = if k + 1 < pos_n1 { k } else { k + 2 };

        Some(Move::insertion(
            solution,
            problem,
            &self.routes,
            pos_n1,
            pos_n2,
        ))
    }

    fn inversion<R: Rng + ?Sized>(
        &self,
        solution: &Solution,
        problem: &Problem,
        rng: &mut R,
    ) -> Option<Move> {
        let eligible: Vec<&Route> = self.routes.iter().filter(|route| route.len() >= 2).collect();
        if eligible.is_empty() {
            return None;
        }

        let route = eligible[rng.gen_range(0..eligible.len())];
        let len = route.len();
        let a = rng.gen_range(0..len);
        let mut b = rng.gen_range(0..len - 1);
        if b >= a {
            b += 1;
        }

        Some(Move::inversion(
            solution,
            problem,
            &self.routes,
            route.begin + 1 + a,
            route.begin + 1 + b,
        ))
    }
}
