//! Problem definition and data structures for CVRP.

use crate::error::{AcoError, AcoResult};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::f64;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

/// Index of the depot in every problem, master or sub-problem.
pub const DEPOT: usize = 0;

/// Represents a node (customer or depot) in the CVRP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub demand: u64,
}

impl Node {
    /// Create a new node.
    pub fn new(id: usize, x: f64, y: f64, demand: u64) -> Self {
        Node { id, x, y, demand }
    }

    pub fn is_depot(&self) -> bool {
        self.id == DEPOT
    }
}

/// How arc lengths are derived from node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceType {
    /// Euclidean distance without rounding.
    Exact,
    /// Euclidean distance rounded to the nearest integer (VRPLIB `EUC_2D`).
    Euclidean,
    /// Euclidean distance rounded up (VRPLIB `CEIL_2D`).
    Ceil,
    /// Geographical distance on an idealized sphere (VRPLIB `GEO`).
    Geo,
    /// Pseudo-Euclidean distance (VRPLIB `ATT`).
    Att,
}

impl DistanceType {
    /// Parse a VRPLIB `EDGE_WEIGHT_TYPE` value.
    pub fn from_vrplib(value: &str) -> Option<Self> {
        match value {
            "EUC_2D" => Some(DistanceType::Euclidean),
            "CEIL_2D" => Some(DistanceType::Ceil),
            "GEO" => Some(DistanceType::Geo),
            "ATT" => Some(DistanceType::Att),
            "EXACT_2D" => Some(DistanceType::Exact),
            _ => None,
        }
    }

    /// Compute the distance between two nodes.
    pub fn distance(&self, a: &Node, b: &Node) -> f64 {
        let dx = a.x - b.x;
        let dy = a.y - b.y;

        match self {
            DistanceType::Exact => (dx * dx + dy * dy).sqrt(),
            DistanceType::Euclidean => ((dx * dx + dy * dy).sqrt() + 0.5).trunc(),
            DistanceType::Ceil => (dx * dx + dy * dy).sqrt().ceil(),
            DistanceType::Geo => geo_distance(a, b),
            DistanceType::Att => {
                let r = ((dx * dx + dy * dy) / 10.0).sqrt();
                let t = r.trunc();
                if t < r {
                    t + 1.0
                } else {
                    t
                }
            }
        }
    }
}

fn geo_radians(coordinate: f64) -> f64 {
    let degrees = coordinate.trunc();
    let minutes = coordinate - degrees;
    f64::consts::PI * (degrees + 5.0 * minutes / 3.0) / 180.0
}

fn geo_distance(a: &Node, b: &Node) -> f64 {
    const EARTH_RADIUS: f64 = 6378.388;

    let (lat_a, lat_b) = (geo_radians(a.x), geo_radians(b.x));
    let (long_a, long_b) = (geo_radians(a.y), geo_radians(b.y));

    let q1 = (long_a - long_b).cos();
    let q2 = (lat_a - lat_b).cos();
    let q3 = (lat_a + lat_b).cos();

    (EARTH_RADIUS * (0.5 * ((1.0 + q1) * q2 - (1.0 - q1) * q3)).acos() + 1.0).trunc()
}

/// Represents a CVRP problem instance.
///
/// The depot is always node 0. The model is immutable once the colony starts;
/// sub-problems are carved out with [`Problem::sub_problem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,
    pub nodes: Vec<Node>,
    pub vehicle_capacity: u64,
    /// Upper bound on a single route's length (service time included).
    pub max_route_distance: Option<f64>,
    /// Time spent at every customer, counted towards route length.
    pub service_time: f64,
    pub distance_type: DistanceType,
    distance_matrix: Matrix<f64>,
    /// For every node, all customers except itself, nearest first.
    candidates: Vec<Vec<usize>>,
}

impl Problem {
    /// Create a new CVRP problem with exact Euclidean distances.
    pub fn new(name: String, nodes: Vec<Node>, vehicle_capacity: u64) -> Self {
        Self::with_distance_type(name, nodes, vehicle_capacity, DistanceType::Exact)
    }

    /// Create a new CVRP problem using the given distance function.
    pub fn with_distance_type(
        name: String,
        nodes: Vec<Node>,
        vehicle_capacity: u64,
        distance_type: DistanceType,
    ) -> Self {
        assert!(!nodes.is_empty(), "a problem needs at least a depot");
        assert_eq!(nodes[DEPOT].demand, 0, "the depot cannot have a demand");

        let distance_matrix = Self::compute_distance_matrix(&nodes, distance_type);
        Self::from_matrix(name, nodes, vehicle_capacity, distance_type, distance_matrix)
    }

    fn from_matrix(
        name: String,
        nodes: Vec<Node>,
        vehicle_capacity: u64,
        distance_type: DistanceType,
        distance_matrix: Matrix<f64>,
    ) -> Self {
        let candidates = Self::compute_candidates(&distance_matrix);

        Problem {
            name,
            nodes,
            vehicle_capacity,
            max_route_distance: None,
            service_time: 0.0,
            distance_type,
            distance_matrix,
            candidates,
        }
    }

    /// Limit the length of every route.
    pub fn with_max_route_distance(mut self, max_route_distance: f64) -> Self {
        self.max_route_distance = Some(max_route_distance);
        self
    }

    /// Set the service time spent at each customer.
    pub fn with_service_time(mut self, service_time: f64) -> Self {
        self.service_time = service_time;
        self
    }

    /// Distance between two node indices.
    #[inline]
    pub fn get_distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix[(from, to)]
    }

    pub fn distance_matrix(&self) -> &Matrix<f64> {
        &self.distance_matrix
    }

    /// Number of nodes, depot included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of customers (excluding the depot).
    pub fn get_customer_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Get the depot node.
    pub fn get_depot(&self) -> &Node {
        &self.nodes[DEPOT]
    }

    pub fn demand(&self, node: usize) -> u64 {
        self.nodes[node].demand
    }

    /// The nearest customers of `node`, ascending by distance.
    pub fn candidates(&self, node: usize) -> &[usize] {
        &self.candidates[node]
    }

    /// The first `depth` entries of the candidate list of `node`.
    pub fn nearest(&self, node: usize, depth: usize) -> &[usize] {
        let list = &self.candidates[node];
        &list[..depth.min(list.len())]
    }

    /// Whether a route with this load and length respects every constraint.
    pub fn is_route_feasible(&self, load: u64, distance: f64) -> bool {
        load <= self.vehicle_capacity && self.within_distance_limit(distance)
    }

    /// Whether a route length respects the distance constraint, if any.
    pub fn within_distance_limit(&self, distance: f64) -> bool {
        match self.max_route_distance {
            Some(limit) => distance <= limit + 1e-9,
            None => true,
        }
    }

    /// Build a problem restricted to `real_nodes`, renumbered densely.
    ///
    /// `real_nodes[0]` must be the depot. Distances are copied from this
    /// problem rather than recomputed.
    pub fn sub_problem(&self, name: String, real_nodes: &[usize]) -> Problem {
        assert_eq!(real_nodes.first(), Some(&DEPOT), "sub-problems keep the depot first");

        let nodes: Vec<Node> = real_nodes
            .iter()
            .enumerate()
            .map(|(local, &real)| {
                let node = &self.nodes[real];
                Node::new(local, node.x, node.y, node.demand)
            })
            .collect();

        let n = real_nodes.len();
        let distance_matrix = Matrix::from_fn(n, n, |i, j| {
            self.distance_matrix[(real_nodes[i], real_nodes[j])]
        });

        let mut sub = Self::from_matrix(
            name,
            nodes,
            self.vehicle_capacity,
            self.distance_type,
            distance_matrix,
        );
        sub.max_route_distance = self.max_route_distance;
        sub.service_time = self.service_time;
        sub
    }

    /// Generate the full distance matrix for all nodes.
    fn compute_distance_matrix(nodes: &[Node], distance_type: DistanceType) -> Matrix<f64> {
        let n = nodes.len();

        Matrix::from_fn(n, n, |i, j| {
            if i == j {
                0.0
            } else {
                distance_type.distance(&nodes[i], &nodes[j])
            }
        })
    }

    /// Neighbor lists exclude the depot and the node itself.
    fn compute_candidates(distance_matrix: &Matrix<f64>) -> Vec<Vec<usize>> {
        let n = distance_matrix.rows();

        (0..n)
            .map(|i| {
                let mut neighbors: Vec<usize> =
                    (1..n).filter(|&j| j != i).collect();
                neighbors.sort_by(|&a, &b| {
                    distance_matrix[(i, a)]
                        .total_cmp(&distance_matrix[(i, b)])
                        .then(a.cmp(&b))
                });
                neighbors
            })
            .collect()
    }

    /// Load a problem from a VRPLIB file.
    ///
    /// Supports `NAME`, `CAPACITY`, `DISTANCE`, `SERVICE_TIME`, `EDGE_WEIGHT_TYPE`,
    /// `NODE_COORD_SECTION`, `DEMAND_SECTION` and `DEPOT_SECTION`. The declared
    /// depot is moved to index 0.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AcoResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(io::BufReader::new(file))
    }

    /// Parse a VRPLIB instance from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> AcoResult<Self> {
        #[derive(PartialEq)]
        enum Section {
            Header,
            Coords,
            Demands,
            Depots,
        }

        let mut name = String::from("unnamed");
        let mut capacity = None;
        let mut max_distance = None;
        let mut service_time = 0.0;
        let mut distance_type = DistanceType::Euclidean;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut demands: Vec<(usize, u64)> = Vec::new();
        let mut depot_id = None;
        let mut section = Section::Header;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = Some(index + 1);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match trimmed {
                "NODE_COORD_SECTION" => {
                    section = Section::Coords;
                    continue;
                }
                "DEMAND_SECTION" => {
                    section = Section::Demands;
                    continue;
                }
                "DEPOT_SECTION" => {
                    section = Section::Depots;
                    continue;
                }
                "EOF" => break,
                _ => {}
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                let value = value.trim();
                section = Section::Header;
                match key.trim() {
                    "NAME" => name = value.to_string(),
                    "CAPACITY" => capacity = Some(parse_value::<u64>(value, line_no)?),
                    "DISTANCE" => max_distance = Some(parse_value::<f64>(value, line_no)?),
                    "SERVICE_TIME" => service_time = parse_value::<f64>(value, line_no)?,
                    "EDGE_WEIGHT_TYPE" => {
                        distance_type = DistanceType::from_vrplib(value).ok_or_else(|| {
                            AcoError::parse(line_no, format!("unsupported edge weight type {}", value))
                        })?
                    }
                    _ => {}
                }
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            match section {
                Section::Coords => {
                    if parts.len() < 3 {
                        return Err(AcoError::parse(line_no, "expected `id x y`"));
                    }
                    coords.push((
                        parse_value::<usize>(parts[0], line_no)?,
                        parse_value::<f64>(parts[1], line_no)?,
                        parse_value::<f64>(parts[2], line_no)?,
                    ));
                }
                Section::Demands => {
                    if parts.len() < 2 {
                        return Err(AcoError::parse(line_no, "expected `id demand`"));
                    }
                    demands.push((
                        parse_value::<usize>(parts[0], line_no)?,
                        parse_value::<u64>(parts[1], line_no)?,
                    ));
                }
                Section::Depots => {
                    let id = parse_value::<i64>(parts[0], line_no)?;
                    if id >= 0 && depot_id.is_none() {
                        depot_id = Some(id as usize);
                    }
                }
                Section::Header => {}
            }
        }

        let capacity = capacity.ok_or_else(|| AcoError::parse(None, "missing CAPACITY"))?;
        if coords.len() < 2 {
            return Err(AcoError::parse(None, "instance needs a depot and at least one customer"));
        }
        let depot_id = depot_id.unwrap_or(coords[0].0);

        let demand_of = |id: usize| {
            demands
                .iter()
                .find(|(d_id, _)| *d_id == id)
                .map(|(_, demand)| *demand)
                .ok_or_else(|| AcoError::parse(None, format!("missing demand for node {}", id)))
        };

        let (x, y) = coords
            .iter()
            .find(|(id, _, _)| *id == depot_id)
            .map(|&(_, x, y)| (x, y))
            .ok_or_else(|| AcoError::parse(None, format!("unknown depot {}", depot_id)))?;

        let mut nodes = vec![Node::new(DEPOT, x, y, 0)];
        for &(id, x, y) in coords.iter().filter(|(id, _, _)| *id != depot_id) {
            let demand = demand_of(id)?;
            if demand > capacity {
                return Err(AcoError::parse(
                    None,
                    format!("demand of node {} exceeds vehicle capacity", id),
                ));
            }
            nodes.push(Node::new(nodes.len(), x, y, demand));
        }

        let mut problem = Problem::with_distance_type(name, nodes, capacity, distance_type);
        problem.max_route_distance = max_distance;
        problem.service_time = service_time;

        Ok(problem)
    }
}

fn parse_value<T: std::str::FromStr>(value: &str, line: Option<usize>) -> AcoResult<T> {
    value
        .parse::<T>()
        .map_err(|_| AcoError::parse(line, format!("invalid value `{}`", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = "NAME : tiny
COMMENT : test instance
TYPE : CVRP
DIMENSION : 4
EDGE_WEIGHT_TYPE : EUC_2D
CAPACITY : 10
NODE_COORD_SECTION
1 0 0
2 3 4
3 6 8
4 0 1
DEMAND_SECTION
1 0
2 4
3 5
4 1
DEPOT_SECTION
1
-1
EOF
";

    #[test]
    fn test_parse_vrplib() {
        let problem = Problem::from_reader(INSTANCE.as_bytes()).unwrap();
        assert_eq!(problem.name, "tiny");
        assert_eq!(problem.node_count(), 4);
        assert_eq!(problem.vehicle_capacity, 10);
        assert_eq!(problem.demand(2), 5);
        assert_eq!(problem.get_distance(0, 1), 5.0);
        assert_eq!(problem.get_distance(1, 2), 5.0);
    }

    #[test]
    fn test_missing_capacity_is_rejected() {
        let text = INSTANCE.replace("CAPACITY : 10\n", "");
        assert!(matches!(
            Problem::from_reader(text.as_bytes()),
            Err(AcoError::Parse { .. })
        ));
    }

    #[test]
    fn test_rounding_modes() {
        let a = Node::new(0, 0.0, 0.0, 0);
        let b = Node::new(1, 1.0, 1.0, 1);
        assert_eq!(DistanceType::Euclidean.distance(&a, &b), 1.0);
        assert_eq!(DistanceType::Ceil.distance(&a, &b), 2.0);
        assert!((DistanceType::Exact.distance(&a, &b) - 2f64.sqrt()).abs() < 1e-12);
    }
}
