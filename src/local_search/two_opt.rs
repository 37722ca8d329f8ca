//! 2-opt on each route of a tour.
//!
//! A route `tour[begin..=end]` is treated as a cycle anchored at the depot in
//! position `begin`; the depot is never moved.

use crate::problem::{Problem, DEPOT};
use rand::seq::SliceRandom;
use rand::Rng;

use super::{LocalSearch, EPSILON};

/// The two arcs `(h1, h2)` and `(h3, h4)` replaced by `(h1, h3)` and `(h2, h4)`.
type Exchange = (usize, usize, usize, usize);

impl LocalSearch {
    /// Run 2-opt on every route of the tour. Returns whether the tour changed.
    pub fn two_opt_solution<R: Rng + ?Sized>(
        &mut self,
        tour: &mut [usize],
        problem: &Problem,
        rng: &mut R,
    ) -> bool {
        self.prepare(problem.node_count());

        let mut improvement = false;
        let mut begin = 0;
        for position in 1..tour.len() {
            if tour[position] == DEPOT {
                improvement |= self.two_opt_single_route(tour, begin, position - 1, problem, rng);
                begin = position;
            }
        }

        improvement
    }

    /// 2-opt on the route occupying positions `begin..=end`, where `begin`
    /// holds the depot and `end` the last customer.
    pub fn two_opt_single_route<R: Rng + ?Sized>(
        &mut self,
        tour: &mut [usize],
        begin: usize,
        end: usize,
        problem: &Problem,
        rng: &mut R,
    ) -> bool {
        let route_nodes = end + 1 - begin;
        if route_nodes < 4 {
            // a cycle of three nodes has a single orientation
            return false;
        }

        for position in begin..=end {
            let node = tour[position];
            self.position[node] = position;
            self.dont_look[node] = false;
            if node != DEPOT {
                self.in_route[node] = true;
            }
        }
        self.in_route[DEPOT] = true;

        let mut order: Vec<usize> = (0..route_nodes).collect();
        order.shuffle(rng);

        let mut changed = false;
        let mut improvement = true;
        while improvement {
            improvement = false;

            for &offset in &order {
                let n1 = tour[begin + offset];
                if self.dlb_flag && self.dont_look[n1] {
                    continue;
                }

                match self.find_exchange(tour, begin, end, n1, problem) {
                    Some(exchange) => {
                        self.apply_exchange(tour, exchange);
                        improvement = true;
                        changed = true;
                    }
                    None => self.dont_look[n1] = true,
                }
            }
        }

        for position in begin..=end {
            self.in_route[tour[position]] = false;
        }

        changed
    }

    #[inline]
    fn successor(&self, tour: &[usize], begin: usize, end: usize, position: usize) -> usize {
        if position == end {
            tour[begin]
        } else {
            tour[position + 1]
        }
    }

    #[inline]
    fn predecessor(&self, tour: &[usize], begin: usize, end: usize, position: usize) -> usize {
        if position == begin {
            tour[end]
        } else {
            tour[position - 1]
        }
    }

    /// First improving exchange around `n1`, looking at its successor arc
    /// then at its predecessor arc.
    fn find_exchange(
        &mut self,
        tour: &[usize],
        begin: usize,
        end: usize,
        n1: usize,
        problem: &Problem,
    ) -> Option<Exchange> {
        let d = |a: usize, b: usize| problem.get_distance(a, b);
        let pos_n1 = self.position[n1];

        let s_n1 = self.successor(tour, begin, end, pos_n1);
        let radius = d(n1, s_n1);
        for &n2 in problem.nearest(n1, self.nn_ls) {
            if !self.in_route[n2] {
                continue;
            }
            if radius <= d(n1, n2) {
                break;
            }
            let s_n2 = self.successor(tour, begin, end, self.position[n2]);
            let gain = -radius + d(n1, n2) + d(s_n1, s_n2) - d(n2, s_n2);
            if gain < -EPSILON {
                self.dont_look[s_n1] = false;
                self.dont_look[n2] = false;
                self.dont_look[s_n2] = false;
                return Some((n1, s_n1, n2, s_n2));
            }
        }

        let p_n1 = self.predecessor(tour, begin, end, pos_n1);
        let radius = d(p_n1, n1);
        for &n2 in problem.nearest(n1, self.nn_ls) {
            if !self.in_route[n2] {
                continue;
            }
            if radius <= d(n1, n2) {
                break;
            }
            let p_n2 = self.predecessor(tour, begin, end, self.position[n2]);
            if p_n2 == n1 || p_n1 == n2 {
                continue;
            }
            let gain = -radius + d(n1, n2) + d(p_n1, p_n2) - d(p_n2, n2);
            if gain < -EPSILON {
                self.dont_look[p_n1] = false;
                self.dont_look[n2] = false;
                self.dont_look[p_n2] = false;
                return Some((p_n1, n1, p_n2, n2));
            }
        }

        None
    }

    /// Reverse the path between `h2` and `h3`, whichever comes first in the tour.
    fn apply_exchange(&mut self, tour: &mut [usize], (h1, h2, h3, h4): Exchange) {
        let (h2, h3) = if self.position[h3] < self.position[h1] {
            (h4, h1)
        } else {
            (h2, h3)
        };

        let mut i = self.position[h2];
        let mut j = self.position[h3];
        while i < j {
            tour.swap(i, j);
            self.position[tour[i]] = i;
            self.position[tour[j]] = j;
            i += 1;
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Node;
    use crate::solution::Solution;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn square_problem() -> Problem {
        let nodes = vec![
            Node::new(0, 0.0, 0.0, 0),
            Node::new(1, 0.0, 10.0, 1),
            Node::new(2, 10.0, 10.0, 1),
            Node::new(3, 10.0, 0.0, 1),
        ];
        Problem::new("square".to_string(), nodes, 10)
    }

    #[test]
    fn test_crossed_square_is_uncrossed() {
        let problem = square_problem();
        let mut tour = vec![0, 2, 1, 3, 0];
        let before = Solution::tour_length(&tour, &problem);

        let mut ls = LocalSearch::new(3, true);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(ls.two_opt_solution(&mut tour, &problem, &mut rng));

        let after = Solution::tour_length(&tour, &problem);
        assert!(after < before);
        assert!((after - 40.0).abs() < 1e-9);
        assert_eq!(tour[0], DEPOT);
        assert_eq!(tour[4], DEPOT);
    }

    #[test]
    fn test_short_route_is_left_alone() {
        let problem = square_problem();
        let mut tour = vec![0, 2, 1, 0, 3, 0];
        let mut ls = LocalSearch::new(3, false);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(!ls.two_opt_solution(&mut tour, &problem, &mut rng));
        assert_eq!(tour, vec![0, 2, 1, 0, 3, 0]);
    }
}
