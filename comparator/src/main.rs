use clap::Parser;
use plots::backend::init_fonts;
use std::path::PathBuf;
use std::process::ExitCode;
use workflow::config::{ConfigOverrides, WorkflowConfig};
use workflow::runner::Runner;

mod plots;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Compare InSAR displacement with GNSS stations")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Directory holding the InSAR, station and GNSS inputs
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    stations_file: Option<PathBuf>,
    /// InSAR CSV; the aligned dataset is expected next to it as `<stem>_aligned.csv`
    #[arg(long)]
    insar_file: Option<PathBuf>,
    /// Matching radius around each station, in meters
    #[arg(long)]
    radius: Option<u32>,
    #[arg(long)]
    min_coherence: Option<f64>,
    /// Only produce the combined time-series plots
    #[arg(long, default_value_t = false)]
    skip_maps: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let base = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    let config = base.with_overrides(&ConfigOverrides {
        data_directory: args.data_dir,
        stations_file: args.stations_file,
        insar_file: args.insar_file,
        min_temporal_coherence: args.min_coherence,
        insar_radius_meters: args.radius,
        skip_maps: args.skip_maps,
    });

    init_fonts(config.font_file.as_deref());
    let runner = Runner::new(config)?;
    let result = runner.execute()?;

    println!(
        "Run finished -> {} plots written, {} stations",
        result.plots.len(),
        result.report.stations.len()
    );
    if result.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Some stations or maps were skipped; see run_summary.json");
        Ok(ExitCode::from(2))
    }
}
