use surfroll::{ScenarioConfig, Scenario};
use surfroll::run_viewer;
use surfroll::{bench_curvature, bench_update};

use clap::Parser;
use anyhow::{Context, Result};
use log::info;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Balls rolling on z = f(x, y)")]
struct Args {
    /// Scenario file under scenarios/
    #[arg(short, default_value = "sin_waves.yaml")]
    file_name: String,

    /// Run without the viewer even if the scenario asks for it
    #[arg(long)]
    headless: bool,

    /// Override the number of headless steps
    #[arg(long)]
    steps: Option<usize>,

    /// Run the benchmarks and exit
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("cannot open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("cannot parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.bench {
        bench_update();
        bench_curvature();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;

    if let Some(steps) = args.steps {
        scenario.run.steps = steps;
    }

    if scenario.run.viewer && !args.headless {
        run_viewer(scenario);
        return Ok(());
    }

    scenario.run_headless();

    let snapshot = scenario.engine.snapshot();
    info!(
        "t = {:.3} s, {}/{} bodies active",
        scenario.t, snapshot.active, snapshot.capacity
    );
    for (i, (s, v)) in snapshot.positions.iter().zip(snapshot.velocities.iter()).enumerate() {
        info!(
            "body {i}: s = ({:.4}, {:.4}, {:.4}), |v| = {:.4}",
            s.x,
            s.y,
            s.z,
            v.norm()
        );
    }

    Ok(())
}
