use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use aco_cvrp::config::Config;
use aco_cvrp::error::AcoResult;
use aco_cvrp::problem::Problem;
use aco_cvrp::utils;
use aco_cvrp::AcoAlgorithm;

/// Solve a CVRP instance with a rank-based ant system.
#[derive(Parser, Debug)]
#[command(name = "aco-cvrp", about, version)]
struct Args {
    /// VRPLIB instance file
    #[arg(short, long)]
    instance: PathBuf,

    /// JSON parameter file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Maximum number of outer iterations
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Time limit in seconds
    #[arg(short, long)]
    time_limit: Option<u64>,

    /// Known optimum; the run stops once it is reached
    #[arg(long)]
    optimum: Option<f64>,

    /// Number of sub-problems per decomposition round
    #[arg(long)]
    subproblems: Option<usize>,

    /// Disable the decomposition rounds
    #[arg(long)]
    no_decomposition: bool,

    /// Write the best solution as a route listing
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the best solution as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> AcoResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::new(),
        };

        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(iterations) = self.max_iterations {
            config = config.with_max_iterations(iterations);
        }
        if let Some(seconds) = self.time_limit {
            config = config.with_time_limit(Duration::from_secs(seconds));
        }
        if let Some(optimum) = self.optimum {
            config = config.with_optimum(optimum);
        }
        if let Some(n) = self.subproblems {
            config = config.with_num_subproblems(n);
        }
        if self.no_decomposition {
            config = config.with_decomposition(false);
        }

        Ok(config)
    }
}

fn run(args: Args) -> AcoResult<()> {
    let config = args.config()?;

    info!("Loading problem file: {}", args.instance.display());
    let problem = Problem::from_file(&args.instance)?;
    info!(
        "Loaded {}: {} customers, capacity {}",
        problem.name,
        problem.get_customer_count(),
        problem.vehicle_capacity
    );

    let mut algorithm = AcoAlgorithm::new(problem, config);
    let best = algorithm.run().clone();
    let problem = algorithm.problem();

    println!("{}", algorithm.statistics().format());
    println!("{:?}", best);

    if let Some(path) = &args.output {
        utils::save_solution(&best, problem, path)?;
        info!("Solution written to {}", path.display());
    }
    if let Some(path) = &args.json {
        utils::save_solution_json(&best, problem, path)?;
        info!("Solution written to {}", path.display());
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_module_path(false)
        .init();

    if let Err(err) = run(Args::parse()) {
        error!("{}", err);
        process::exit(1);
    }
}
