use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::SimulationConfig;
use crate::resampler::{MissingWindowPolicy, SampleSize};

#[derive(Parser, Debug)]
#[command(
    name = "promo-sim",
    version,
    about = "Promotional window detection and discount revenue simulation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the days where the mean discount met the promotion threshold
    Detect(DetectArgs),
    /// Bootstrap net revenue per discount level
    Simulate(SimulateArgs),
    /// Simulate revenue with discount-driven conversion uplift
    Uplift(UpliftArgs),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    #[default]
    InMemory,
    Partitioned,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Delimited transaction log
    #[arg(long)]
    pub transactions: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Backend::InMemory)]
    pub backend: Backend,

    #[arg(long, default_value_t = 4)]
    pub partitions: usize,

    #[arg(long)]
    pub threshold: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Discount level in percent, repeat for several levels
    #[arg(long = "discount")]
    pub discounts: Vec<f64>,

    #[arg(long)]
    pub trials: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum)]
    pub missing_window: Option<MissingWindowPolicy>,

    #[arg(long, value_enum)]
    pub sample_size: Option<SampleSize>,

    /// Result records for the chart renderer (.csv or .json)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UpliftArgs {
    #[command(flatten)]
    pub simulate: SimulateArgs,

    #[arg(long)]
    pub max_buyers: Option<u64>,

    /// Per-discount distribution summary (.csv or .json)
    #[arg(long)]
    pub summary_output: Option<PathBuf>,
}

impl CommonArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
    }
}

impl SimulateArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        self.common.apply(config);
        if !self.discounts.is_empty() {
            config.discount_levels = self.discounts.clone();
        }
        if let Some(trials) = self.trials {
            config.n_trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(policy) = self.missing_window {
            config.missing_window = policy;
        }
        if let Some(sample_size) = self.sample_size {
            config.sample_size = sample_size;
        }
    }
}

impl UpliftArgs {
    pub fn apply(&self, config: &mut SimulationConfig) {
        self.simulate.apply(config);
        if let Some(max_buyers) = self.max_buyers {
            config.uplift.max_potential_buyers = max_buyers;
        }
    }
}
