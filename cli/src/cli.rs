use std::path::PathBuf;

/// County-level turnout forecasting pipeline
#[derive(clap::Parser, Debug)]
#[command(name = "turnout", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Compute historical-to-current crosswalks
    Reconcile(StageArgs),

    /// Reconcile, load and impute indicators, and build the feature table
    Build(StageArgs),

    /// Run the full pipeline: features, model, forecast and map
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct StageArgs {
    /// Pipeline configuration (JSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Output directory, overrides `output.dir` from the config
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    /// Election year held out for evaluation
    #[arg(long)]
    pub holdout_year: Option<i32>,

    /// Election year to forecast
    #[arg(long)]
    pub target_year: Option<i32>,
}
