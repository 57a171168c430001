//! Aviary flight-task CLI.
//!
//! Provides four modes of operation:
//! - `run`: Run N episodes against the in-memory simulator and print statistics
//! - `check`: Validate a task configuration file
//! - `catalog`: List the property catalog
//! - `info`: Print the workspace version and task variants

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aviary_core::prelude::*;
use aviary_env::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Episodic flight-control tasks over a property-bus simulator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run episodes against the in-memory point-mass simulator.
    Run {
        /// Task configuration file (TOML).
        #[arg(short, long)]
        config: Option<String>,

        /// Task variant, used when no configuration file is given.
        #[arg(short, long, default_value = "heading_control")]
        kind: String,

        /// Number of episodes to run.
        #[arg(short = 'n', long, default_value_t = 1)]
        episodes: u32,

        /// Random seed for the first episode.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Override the episode length in simulated seconds.
        #[arg(short, long)]
        episode_time: Option<f64>,
    },

    /// Validate a task configuration file and print its layout.
    Check {
        /// Task configuration file (TOML).
        path: String,
    },

    /// List every property in the catalog.
    Catalog,

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn parse_kind(kind: &str) -> Result<TaskKind, ConfigError> {
    TaskKind::ALL
        .into_iter()
        .find(|k| k.as_str() == kind)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "kind".into(),
            message: format!("unknown task kind {kind:?}"),
        })
}

fn load_config(
    path: Option<&str>,
    kind: &str,
    episode_time_s: Option<f64>,
) -> Result<TaskConfig, ConfigError> {
    let mut config = match path {
        Some(path) => TaskConfig::from_file(path)?,
        None => TaskConfig::for_kind(parse_kind(kind)?),
    };
    if episode_time_s.is_some() {
        config.episode_time_s = episode_time_s;
        config.validate()?;
    }
    Ok(config)
}

/// Neutral surfaces with the configured throttle command.
fn cruise_action(env: &FlightEnv<MemorySimulation>) -> Action {
    let throttle = env.task().config().controls.throttle_cmd;
    let values = env
        .task()
        .layout()
        .action()
        .iter()
        .map(|p| {
            if p.name == catalog::THROTTLE_CMD.name {
                throttle
            } else {
                0.0
            }
        })
        .collect();
    Action::new(values)
}

fn run_episodes(config: TaskConfig, episodes: u32, seed: Option<u64>) -> Result<(), AviaryError> {
    let mut env = FlightEnv::point_mass(config)?;
    info!(
        kind = %env.task().kind(),
        step_budget = env.task().step_budget(),
        sim_steps = env.task().sim_steps(),
        "environment ready"
    );
    let action = cruise_action(&env);

    for ep in 0..episodes {
        // Later episodes continue the seeded streams.
        let reset = env.reset(if ep == 0 { seed } else { None })?;
        let targets = reset.info.targets.unwrap_or(Targets::new(0.0, 0.0));
        let result = loop {
            let result = env.step(&action)?;
            if result.done() {
                break result;
            }
        };
        let ending = result
            .info
            .termination
            .as_ref()
            .map_or("-", |t| t.name.as_str());
        println!(
            "episode {}: steps={}, reward={:.3}, target=({:.1} deg, {:.0} ft), ended by {}",
            ep + 1,
            result.info.episode_length,
            result.info.episode_reward,
            targets.heading_deg,
            targets.altitude_ft,
            ending
        );
    }

    let stats = env.stats();
    println!(
        "\ntotal: episodes={}, steps={}, mean length={:.1}, mean return={:.3}",
        stats.episodes_completed,
        stats.total_steps,
        stats.mean_episode_length().unwrap_or(0.0),
        stats.mean_return().unwrap_or(0.0)
    );
    for (name, count) in &stats.terminations {
        println!("  {name}: {count}");
    }
    Ok(())
}

fn run_check(path: &str) -> Result<(), AviaryError> {
    let config = TaskConfig::from_file(path)?;
    let task = build_task(config)?;
    println!("{path}: ok");
    println!("  kind:         {}", task.kind());
    println!("  step budget:  {}", task.step_budget());
    println!("  sim steps:    {}", task.sim_steps());
    println!("  scheduler:    {}", task.scheduler_name());
    println!("  reward:       {}", task.reward_name());
    println!("  terminations: {}", task.termination_names().join(", "));
    let layout = task.layout();
    let names = |props: &[Property]| {
        props
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("  state:        {}", names(layout.state()));
    println!("  action:       {}", names(layout.action()));
    Ok(())
}

fn run_catalog() {
    for (key, property) in catalog::ALL {
        let bounds = property
            .bounds
            .map_or_else(|| "unbounded".to_string(), |[lo, hi]| format!("[{lo}, {hi}]"));
        println!(
            "{key:<28} {:<40} {:<6} {bounds}",
            property.name,
            property.unit.symbol()
        );
    }
}

fn info_text() -> String {
    use std::fmt::Write;

    // Every member inherits the workspace version.
    let mut out = format!("aviary workspace v{}\n\n", env!("CARGO_PKG_VERSION"));
    out.push_str("crates: aviary-core, aviary-domain-rand, aviary-env\n\n");
    out.push_str("task variants:\n");
    for kind in TaskKind::ALL {
        let _ = writeln!(out, "  {kind}");
    }
    out.push_str("\nedition: 2024");
    out
}

fn run_info() {
    println!("{}", info_text());
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Commands::Run {
            config,
            kind,
            episodes,
            seed,
            episode_time,
        }) => load_config(config.as_deref(), &kind, episode_time)
            .map_err(AviaryError::from)
            .and_then(|config| run_episodes(config, episodes, seed)),
        Some(Commands::Check { path }) => run_check(&path),
        Some(Commands::Catalog) => {
            run_catalog();
            Ok(())
        }
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => {
            // Default: one short heading-control episode
            load_config(None, TaskKind::HeadingControl.as_str(), Some(10.0))
                .map_err(AviaryError::from)
                .and_then(|config| run_episodes(config, 1, None))
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
