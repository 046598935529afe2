mod cli;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use turnout::{Pipeline, PipelineConfig};

use cli::{Cli, Commands, StageArgs};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &StageArgs) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_path(&args.config)?;
    if let Some(out) = &args.out {
        config.output.dir = out.clone();
    }
    Ok(config)
}

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Reconcile(args) => {
            let pipeline = Pipeline::new(load_config(args)?)?;
            let out = &pipeline.config().output.dir;
            pipeline.reconcile()?.write(out)?;
            info!("crosswalks written to {}", out.display());
        }
        Commands::Build(args) => {
            let pipeline = Pipeline::new(load_config(args)?)?;
            let out = &pipeline.config().output.dir;
            pipeline.build(pipeline.reconcile()?)?.write(out)?;
            info!("feature table written to {}", out.display());
        }
        Commands::Run(args) => {
            let mut config = load_config(&args.stage)?;
            if let Some(year) = args.holdout_year {
                config.model.holdout_year = Some(year);
            }
            if let Some(year) = args.target_year {
                config.forecast.target_year = year;
            }
            let outcome = Pipeline::new(config)?.run()?;
            if let Some(mae) = outcome.evaluation.as_ref().and_then(|e| e.mae) {
                println!("holdout MAE: {mae:.4}");
            }
            println!(
                "{} counties predicted, {} without prediction",
                outcome.forecast.predictions.len(),
                outcome.forecast.excluded.len(),
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> { run() }
