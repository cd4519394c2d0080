use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cholera_sim::{
    frame::{JsonLinesRenderer, Renderer},
    scenario::{Scenario, ScenarioLoader, Variant},
    SimulationController,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless runner for the cholera transmission simulations")]
struct Cli {
    /// Path to a scenario YAML file; takes precedence over --variant
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Built-in layout to run when no scenario file is given (sim1..sim5)
    #[arg(long, default_value = "sim5")]
    variant: Variant,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override real milliseconds per frame
    #[arg(long)]
    frame_ms: Option<f64>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of active agents, as set by the population slider
    #[arg(long)]
    active: Option<usize>,

    /// Write one JSON frame per line to this file
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Only write every Nth frame
    #[arg(long, default_value_t = 1)]
    frame_interval: u64,

    /// Write the hourly infection series as JSON to this file
    #[arg(long)]
    series: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::preset(cli.variant),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(frame_ms) = cli.frame_ms {
        scenario.frame_ms = frame_ms;
    }
    let ticks = scenario.ticks(cli.ticks);

    let mut controller =
        SimulationController::from_scenario(&scenario).context("build simulation")?;
    if let Some(active) = cli.active {
        controller.set_active_count(active);
    }
    let mut renderer = cli
        .frames
        .as_ref()
        .map(|path| JsonLinesRenderer::create(path, cli.frame_interval))
        .transpose()?;

    if let Some(renderer) = renderer.as_mut() {
        renderer.render(&controller.frame())?;
    }
    controller.start();
    for _ in 0..ticks {
        controller.tick(scenario.frame_ms)?;
        if let Some(renderer) = renderer.as_mut() {
            renderer.render(&controller.frame())?;
        }
    }

    if let Some(renderer) = renderer.as_mut() {
        renderer.finish().context("write frames")?;
    }
    if let Some(path) = &cli.series {
        controller.series().write_json(path)?;
    }
    let state = controller.state();
    println!(
        "Scenario '{}' completed for {} ticks (day {}, {}). Infected agents: {}/{}, infected houses: {}/{}, contaminated water: {}",
        scenario.name,
        ticks,
        state.time().current_day(),
        state.time().clock_label(),
        state.infected_agents(),
        state.agents().len(),
        state.infected_houses(),
        state.houses().len(),
        state.contaminated_water(),
    );
    Ok(())
}
