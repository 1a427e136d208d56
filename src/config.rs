/// Simulation configuration
/// Defaults reproduce the analysis scripts; a JSON file may override any field

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::detector::validate_threshold;
use crate::error::SimError;
use crate::ingest::ColumnNames;
use crate::monte_carlo::UpliftScenario;
use crate::resampler::{validate_discounts, MissingWindowPolicy, SampleSize};
use crate::uplift::UpliftModel;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpliftConfig {
    pub base_rate: f64,
    pub promo_rate: f64,
    pub promo_discount: f64,
    pub max_potential_buyers: u64,
}

impl Default for UpliftConfig {
    fn default() -> Self {
        UpliftConfig {
            base_rate: 0.05,
            promo_rate: 0.20,
            promo_discount: 30.0,
            max_potential_buyers: 1_000,
        }
    }
}

impl UpliftConfig {
    pub fn build_model(&self) -> Result<UpliftModel> {
        UpliftModel::new(self.base_rate, self.promo_rate, self.promo_discount)
            .context("invalid uplift anchors")
    }

    pub fn build_scenario(&self) -> Result<UpliftScenario> {
        Ok(UpliftScenario::new(self.max_potential_buyers, self.build_model()?))
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fraction of full price; days with mean discount >= threshold * 100 are promotional
    pub threshold: f64,
    pub discount_levels: Vec<f64>,
    pub n_trials: usize,
    pub seed: u64,
    pub missing_window: MissingWindowPolicy,
    pub sample_size: SampleSize,
    pub columns: ColumnNames,
    pub uplift: UpliftConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            threshold: 0.85,
            discount_levels: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
            n_trials: 5_000,
            seed: 42,
            missing_window: MissingWindowPolicy::UseFullDataset,
            sample_size: SampleSize::MatchObserved,
            columns: ColumnNames::default(),
            uplift: UpliftConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: SimulationConfig = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        if self.discount_levels.is_empty() {
            bail!("at least one discount level is required");
        }
        validate_discounts(&self.discount_levels)?;
        if self.n_trials == 0 {
            return Err(SimError::ZeroTrials.into());
        }
        self.uplift.build_model()?;
        Ok(())
    }
}
