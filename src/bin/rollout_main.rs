// rollout_main.rs
//
// Runs random-policy episodes on copies of the grid environment, one
// blocking task per copy, and logs each episode's return.

use clap::Parser;
use log::{info, warn};
use queue_grid::environment::QueueGridEnv;
use queue_grid::simulation_engine::in_memory::InMemorySimulator;
use queue_grid::{EnvConfig, GridEnvError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rollout_main", about = "Random-policy rollouts on the queue grid")]
struct Args {
    /// JSON environment config; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parallel environment copies.
    #[arg(short = 'n', long, default_value_t = 4)]
    envs: usize,

    /// Episodes per copy.
    #[arg(short, long, default_value_t = 3)]
    episodes: usize,

    /// Vehicles placed on the entrance edges of each copy.
    #[arg(long, default_value_t = 60)]
    vehicles: usize,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn run_copy(
    copy: usize,
    config: EnvConfig,
    vehicles: usize,
    episodes: usize,
    seed: u64,
) -> Result<Vec<f64>, GridEnvError> {
    let mut sim = InMemorySimulator::from_config(&config.grid)?;
    sim.populate(vehicles, seed);
    let mut env = QueueGridEnv::new(config, sim)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut returns = Vec::with_capacity(episodes);

    for episode in 0..episodes {
        env.reset()?;
        let mut total = 0.0;
        loop {
            let action = env.action_space().sample(&mut rng);
            let result = env.step(&action)?;
            total += result.reward;
            if result.done {
                break;
            }
        }
        info!("env {} episode {}: return {:.2}", copy, episode, total);
        returns.push(total);
    }
    Ok(returns)
}

async fn run(args: Args) -> Result<(), GridEnvError> {
    let config = match &args.config {
        Some(path) => EnvConfig::from_json_file(path)?,
        None => EnvConfig::default(),
    };
    config.validate()?;
    info!(
        "starting {} copies x {} episodes on a {}x{} grid",
        args.envs, args.episodes, config.grid.rows, config.grid.cols
    );

    let mut handles = Vec::with_capacity(args.envs);
    for copy in 0..args.envs {
        let config = config.clone();
        let (vehicles, episodes) = (args.vehicles, args.episodes);
        let seed = args.seed.wrapping_add(copy as u64);
        handles.push(tokio::task::spawn_blocking(move || {
            run_copy(copy, config, vehicles, episodes, seed)
        }));
    }

    let mut all_returns = Vec::new();
    for (copy, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(returns) => all_returns.extend(returns?),
            Err(e) => warn!("env {} task failed: {}", copy, e),
        }
    }

    if all_returns.is_empty() {
        println!("No episodes completed.");
    } else {
        let mean = all_returns.iter().sum::<f64>() / all_returns.len() as f64;
        println!(
            "Completed {} episodes, mean return {:.2}",
            all_returns.len(),
            mean
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("Rollout error: {}", e);
        std::process::exit(1);
    }
}
