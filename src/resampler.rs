/// Bootstrap revenue resampling
/// Builds an empirical distribution of net revenue per discount level by
/// resampling observed gross values with replacement

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::TransactionSource;
use crate::error::{SimError, SimResult};
use crate::models::{DateRange, DiscountSummary, PromotionWindow};
use crate::stats::{mean, percentile, sort_samples};

/// Source of uniform draws used for resampling.
/// Only `pick` is required; the default `resample_sum` draws `n` values with replacement.
pub trait Resampler {
    /// Uniform index in `0..len`, `len` is never zero
    fn pick(&mut self, len: usize) -> usize;

    fn resample_sum(&mut self, values: &[f64], n: usize) -> f64 {
        (0..n).map(|_| values[self.pick(values.len())]).sum()
    }
}

/// Resampler backed by an explicitly owned random generator
pub struct RandomResampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomResampler<R> {
    pub fn new(rng: R) -> Self {
        RandomResampler { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl<R: Rng> Resampler for RandomResampler<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// How many values each trial draws
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SampleSize {
    /// Same size as the filtered set (classic bootstrap)
    #[default]
    MatchObserved,
    /// Transaction count of a randomly drawn observed day in the window
    DailyVolume,
}

/// What to do when no promotional window was detected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingWindowPolicy {
    #[default]
    UseFullDataset,
    Fail,
}

/// Which transactions the resampler draws from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowSelection {
    Range(DateRange),
    FullDataset,
}

impl WindowSelection {
    /// Turn a detection result into an explicit selection
    pub fn resolve(window: &PromotionWindow, policy: MissingWindowPolicy) -> SimResult<Self> {
        match (window.as_range(), policy) {
            (Some(range), _) => Ok(WindowSelection::Range(range)),
            (None, MissingWindowPolicy::UseFullDataset) => Ok(WindowSelection::FullDataset),
            (None, MissingWindowPolicy::Fail) => Err(SimError::NoPromotionWindow),
        }
    }

    pub fn as_range(&self) -> Option<DateRange> {
        match self {
            WindowSelection::Range(range) => Some(*range),
            WindowSelection::FullDataset => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WindowSelection::Range(range) => format!("{}..={}", range.start, range.end),
            WindowSelection::FullDataset => "the full dataset".to_string(),
        }
    }
}

pub(crate) fn validate_discounts(discount_levels: &[f64]) -> SimResult<()> {
    match discount_levels
        .iter()
        .find(|d| !d.is_finite() || **d < 0.0 || **d > 100.0)
    {
        Some(&bad) => Err(SimError::DiscountOutOfRange(bad)),
        None => Ok(()),
    }
}

/// Fraction of gross revenue kept after a discount given in percent
pub fn net_multiplier(discount: f64) -> f64 {
    1.0 - discount / 100.0
}

/// Net revenue of every trial for one discount level
pub(crate) fn trial_revenues<R: Resampler + ?Sized>(
    values: &[f64],
    daily_counts: &[usize],
    discount: f64,
    n_trials: usize,
    sample_size: SampleSize,
    resampler: &mut R,
) -> Vec<f64> {
    let multiplier = net_multiplier(discount);
    (0..n_trials)
        .map(|_| {
            let n = match sample_size {
                SampleSize::MatchObserved => values.len(),
                SampleSize::DailyVolume => daily_counts[resampler.pick(daily_counts.len())],
            };
            resampler.resample_sum(values, n) * multiplier
        })
        .collect()
}

fn summarize(discount: f64, mut revenues: Vec<f64>) -> DiscountSummary {
    sort_samples(&mut revenues);
    DiscountSummary {
        discount_pct: discount,
        mean_revenue: mean(&revenues).unwrap_or_default(),
        revenue_5th_pct: percentile(&revenues, 0.05).unwrap_or_default(),
        revenue_95th_pct: percentile(&revenues, 0.95).unwrap_or_default(),
    }
}

/// Simulate net revenue for each discount level, in input order
pub fn simulate<S, R>(
    source: &S,
    selection: WindowSelection,
    discount_levels: &[f64],
    n_trials: usize,
    sample_size: SampleSize,
    resampler: &mut R,
) -> SimResult<Vec<DiscountSummary>>
where
    S: TransactionSource + ?Sized,
    R: Resampler + ?Sized,
{
    if n_trials == 0 {
        return Err(SimError::ZeroTrials);
    }
    validate_discounts(discount_levels)?;

    let range = selection.as_range();
    let values = source.gross_values(range);
    if values.is_empty() {
        return Err(SimError::EmptySample {
            scope: selection.describe(),
        });
    }
    let daily_counts = source.daily_counts(range);

    info!(
        scope = %selection.describe(),
        observed = values.len(),
        levels = discount_levels.len(),
        n_trials,
        ?sample_size,
        "running bootstrap revenue simulation"
    );

    let summaries = discount_levels
        .iter()
        .map(|&discount| {
            let revenues = trial_revenues(
                &values,
                &daily_counts,
                discount,
                n_trials,
                sample_size,
                &mut *resampler,
            );
            let summary = summarize(discount, revenues);
            debug!(
                discount,
                mean = summary.mean_revenue,
                p5 = summary.revenue_5th_pct,
                p95 = summary.revenue_95th_pct,
                "discount level simulated"
            );
            summary
        })
        .collect();

    Ok(summaries)
}
