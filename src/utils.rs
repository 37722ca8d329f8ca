//! Reporting helpers for the ACO-CVRP binary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::error::AcoResult;
use crate::problem::Problem;
use crate::solution::Solution;

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
}

/// Write a solution as a readable route listing.
pub fn write_solution<W: Write>(
    solution: &Solution,
    problem: &Problem,
    mut out: W,
) -> std::io::Result<()> {
    writeln!(out, "CVRP Solution for instance: {}", problem.name)?;
    writeln!(out, "Total Length: {:.2}", solution.length)?;
    writeln!(out, "Number of Routes: {}", solution.route_count())?;
    writeln!(out)?;

    for (i, route) in solution.routes(problem).iter().enumerate() {
        write!(out, "Route #{}: 0", i + 1)?;
        for &customer in &solution.tour[route.begin + 1..route.end] {
            write!(out, " -> {}", customer)?;
        }
        writeln!(out, " -> 0")?;

        writeln!(out, "  Distance: {:.2}", route.distance)?;
        writeln!(out, "  Load: {} / {}", route.load, problem.vehicle_capacity)?;
        writeln!(out)?;
    }

    Ok(())
}

/// Save a solution to a file.
pub fn save_solution<P: AsRef<Path>>(
    solution: &Solution,
    problem: &Problem,
    path: P,
) -> std::io::Result<()> {
    let file = File::create(path)?;
    write_solution(solution, problem, BufWriter::new(file))
}

#[derive(Serialize)]
struct SolutionRecord<'a> {
    instance: &'a str,
    length: f64,
    tour: &'a [usize],
    routes: Vec<Vec<usize>>,
}

/// Save a solution as JSON with its flat tour and its routes.
pub fn save_solution_json<P: AsRef<Path>>(
    solution: &Solution,
    problem: &Problem,
    path: P,
) -> AcoResult<()> {
    let record = SolutionRecord {
        instance: &problem.name,
        length: solution.length,
        tour: &solution.tour,
        routes: solution.customer_sequences(),
    };

    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &record)?;
    Ok(())
}

/// Statistics about the search process.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStatistics {
    /// Outer iterations of the driver
    pub iterations: usize,
    /// Iterations of the master colony
    pub colony_iterations: usize,
    pub runtime: Duration,
    pub best_length: f64,
    pub best_routes: usize,
    pub best_iteration: usize,
    pub best_time: Duration,
    pub annealing_episodes: usize,
    pub disturbances: usize,
}

impl SearchStatistics {
    /// Format the statistics as a string.
    pub fn format(&self) -> String {
        format!(
            "Search Statistics:
- Iterations: {} ({} colony iterations)
- Runtime: {}
- Best Length: {:.2}
- Best Routes: {}
- Best Found At: iteration {} ({:.2}s)
- Annealing Episodes: {}
- Pheromone Disturbances: {}",
            self.iterations,
            self.colony_iterations,
            format_duration(self.runtime),
            self.best_length,
            self.best_routes,
            self.best_iteration,
            self.best_time.as_secs_f64(),
            self.annealing_episodes,
            self.disturbances
        )
    }
}
