//! Solution representation for the CVRP.
//!
//! A solution is a single depot-delimited tour: `[0, 1, 4, 2, 0, 5, 3, 0]`
//! holds the two routes `{1, 4, 2}` and `{5, 3}`.

use crate::error::SolutionError;
use crate::problem::{Problem, DEPOT};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A route inside a tour, described by the positions of its two depot visits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Position of the opening depot visit
    pub begin: usize,
    /// Position of the closing depot visit
    pub end: usize,
    /// The total demand served by the route
    pub load: u64,
    /// Travel distance plus service time of the route
    pub distance: f64,
}

impl Route {
    /// Number of customers served.
    pub fn len(&self) -> usize {
        self.end - self.begin - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the tour position belongs to a customer of this route.
    pub fn contains_position(&self, position: usize) -> bool {
        position > self.begin && position < self.end
    }
}

/// Represents a complete solution to a CVRP instance.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Concatenated depot-to-depot routes
    pub tour: Vec<usize>,
    /// Total travel distance plus service time
    pub length: f64,
}

impl Solution {
    /// Create a solution from a tour, computing its length.
    pub fn new(tour: Vec<usize>, problem: &Problem) -> Self {
        let length = Self::tour_length(&tour, problem);
        Solution { tour, length }
    }

    /// Placeholder worse than any real solution.
    pub fn empty() -> Self {
        Solution {
            tour: Vec::new(),
            length: f64::INFINITY,
        }
    }

    /// Build a tour from a list of routes given as customer sequences.
    pub fn from_routes(routes: &[Vec<usize>], problem: &Problem) -> Self {
        let mut tour = vec![DEPOT];
        for route in routes {
            tour.extend(route);
            tour.push(DEPOT);
        }
        Self::new(tour, problem)
    }

    /// Sum of consecutive arc lengths plus the service time of every customer.
    pub fn tour_length(tour: &[usize], problem: &Problem) -> f64 {
        let travel: f64 = tour
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| problem.get_distance(a, b))
            .sum();
        let customers = tour.iter().filter(|&&node| node != DEPOT).count();

        travel + problem.service_time * customers as f64
    }

    /// Recompute the cached length from scratch.
    pub fn compute_length(&mut self, problem: &Problem) {
        self.length = Self::tour_length(&self.tour, problem);
    }

    pub fn is_empty(&self) -> bool {
        self.tour.is_empty()
    }

    /// Derive the route views of the tour.
    pub fn routes(&self, problem: &Problem) -> Vec<Route> {
        let mut routes = Vec::new();
        let mut begin = 0;
        let mut load = 0;
        let mut distance = 0.0;

        for position in 1..self.tour.len() {
            let node = self.tour[position];
            distance += problem.get_distance(self.tour[position - 1], node);

            if node == DEPOT {
                routes.push(Route {
                    begin,
                    end: position,
                    load,
                    distance,
                });
                begin = position;
                load = 0;
                distance = 0.0;
            } else {
                load += problem.demand(node);
                distance += problem.service_time;
            }
        }

        routes
    }

    /// Get the number of routes.
    pub fn route_count(&self) -> usize {
        self.tour.iter().filter(|&&node| node == DEPOT).count().saturating_sub(1)
    }

    /// The customers of every route, depot excluded.
    pub fn customer_sequences(&self) -> Vec<Vec<usize>> {
        self.tour
            .split(|&node| node == DEPOT)
            .filter(|route| !route.is_empty())
            .map(|route| route.to_vec())
            .collect()
    }

    /// Check every structural and constraint invariant of the tour.
    pub fn validate(&self, problem: &Problem) -> Result<(), SolutionError> {
        if self.tour.len() < 2
            || self.tour.first() != Some(&DEPOT)
            || self.tour.last() != Some(&DEPOT)
        {
            return Err(SolutionError::MissingDepot);
        }

        let mut visited = vec![false; problem.node_count()];
        for (position, &node) in self.tour.iter().enumerate() {
            if node >= problem.node_count() {
                return Err(SolutionError::UnknownNode { node, position });
            }
            if node == DEPOT {
                if position > 0 && self.tour[position - 1] == DEPOT {
                    return Err(SolutionError::EmptyRoute { position });
                }
                continue;
            }
            if visited[node] {
                return Err(SolutionError::DuplicateNode { node, position });
            }
            visited[node] = true;
        }

        if let Some(node) = (1..problem.node_count()).find(|&node| !visited[node]) {
            return Err(SolutionError::UnvisitedNode { node });
        }

        for (index, route) in self.routes(problem).iter().enumerate() {
            if route.load > problem.vehicle_capacity {
                return Err(SolutionError::CapacityExceeded {
                    route: index,
                    load: route.load,
                    capacity: problem.vehicle_capacity,
                });
            }
            if let Some(limit) = problem.max_route_distance {
                if !problem.within_distance_limit(route.distance) {
                    return Err(SolutionError::DistanceExceeded {
                        route: index,
                        distance: route.distance,
                        limit,
                    });
                }
            }
        }

        Ok(())
    }

    /// Panic if the solution is corrupted.
    pub fn assert_valid(&self, problem: &Problem) {
        if let Err(err) = self.validate(problem) {
            panic!("corrupted solution: {} (tour: {:?})", err, self.tour);
        }
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        writeln!(f, "  Length: {:.2}", self.length)?;
        writeln!(f, "  Routes: {}", self.route_count())?;

        for (i, route) in self.customer_sequences().iter().enumerate() {
            writeln!(f, "  Route {}: {:?}", i, route)?;
        }

        Ok(())
    }
}
