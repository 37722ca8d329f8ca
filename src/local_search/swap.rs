//! Pairwise customer swap over the whole tour, within or across routes.

use crate::problem::{Problem, DEPOT};

use super::{route_index, LocalSearch, EPSILON};

impl LocalSearch {
    /// Exchange two customers whenever it shortens the tour and both routes
    /// stay feasible. Returns whether the tour changed.
    ///
    /// After a swap the same position is examined again with its new customer.
    pub fn swap_pass(&mut self, tour: &mut [usize], problem: &Problem) -> bool {
        if tour.len() < 4 {
            return false;
        }

        let d = |a: usize, b: usize| problem.get_distance(a, b);
        let (route_of, mut loads, mut distances) = route_index(tour, problem);
        let last = tour.len() - 1;
        let mut changed = false;

        let mut i = 1;
        while i < last {
            let n1 = tour[i];
            if n1 == DEPOT {
                i += 1;
                continue;
            }

            let mut swapped = false;
            for j in i + 1..last {
                let n2 = tour[j];
                if n2 == DEPOT {
                    continue;
                }

                let (p_n1, s_n1) = (tour[i - 1], tour[i + 1]);
                let (p_n2, s_n2) = (tour[j - 1], tour[j + 1]);
                let (r1, r2) = (route_of[i], route_of[j]);

                let (delta1, delta2) = if j == i + 1 {
                    let delta = d(p_n1, n2) + d(n1, s_n2) - d(p_n1, n1) - d(n2, s_n2);
                    (delta, 0.0)
                } else {
                    (
                        d(p_n1, n2) + d(n2, s_n1) - d(p_n1, n1) - d(n1, s_n1),
                        d(p_n2, n1) + d(n1, s_n2) - d(p_n2, n2) - d(n2, s_n2),
                    )
                };
                if delta1 + delta2 >= -EPSILON {
                    continue;
                }

                if r1 != r2 {
                    let load1 = loads[r1] - problem.demand(n1) + problem.demand(n2);
                    let load2 = loads[r2] - problem.demand(n2) + problem.demand(n1);
                    if !problem.is_route_feasible(load1, distances[r1] + delta1)
                        || !problem.is_route_feasible(load2, distances[r2] + delta2)
                    {
                        continue;
                    }
                    loads[r1] = load1;
                    loads[r2] = load2;
                    distances[r1] += delta1;
                    distances[r2] += delta2;
                } else {
                    distances[r1] += delta1 + delta2;
                }

                tour.swap(i, j);
                swapped = true;
                changed = true;
                break;
            }

            if !swapped {
                i += 1;
            }
        }

        changed
    }
}
