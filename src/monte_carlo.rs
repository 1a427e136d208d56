/// Monte Carlo simulation with conversion uplift
/// Each trial draws the number of buyers from a binomial distribution whose success
/// probability comes from the uplift model, then resamples their purchase values

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Binomial;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::models::{Recommendation, TrialRecord};
use crate::resampler::{net_multiplier, validate_discounts, RandomResampler, Resampler};
use crate::stats::{mean, median, percentile, sort_samples};
use crate::uplift::UpliftModel;

/// Revenue distribution of all trials sharing one discount level
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpliftSummary {
    pub discount: f64,
    pub conversion_rate: f64,
    pub mean_buyers: f64,
    pub median_revenue: f64,
    pub revenue_5th_pct: f64,
    pub revenue_95th_pct: f64,
}

/// Buyer pool and uplift model of one simulation setup
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpliftScenario {
    pub max_potential_buyers: u64,
    pub uplift: UpliftModel,
}

impl UpliftScenario {
    pub fn new(max_potential_buyers: u64, uplift: UpliftModel) -> Self {
        UpliftScenario {
            max_potential_buyers,
            uplift,
        }
    }

    pub fn simulate(
        &self,
        values: &[f64],
        discount_levels: &[f64],
        n_trials: usize,
        seed: u64,
    ) -> SimResult<Vec<TrialRecord>> {
        simulate_with_uplift(
            self.max_potential_buyers,
            values,
            &self.uplift,
            discount_levels,
            n_trials,
            seed,
        )
    }
}

/// Run the uplift simulation.
/// A single random stream is seeded once, so equal seeds reproduce identical records.
pub fn simulate_with_uplift(
    max_potential_buyers: u64,
    values: &[f64],
    uplift: &UpliftModel,
    discount_levels: &[f64],
    n_trials: usize,
    seed: u64,
) -> SimResult<Vec<TrialRecord>> {
    if n_trials == 0 {
        return Err(SimError::ZeroTrials);
    }
    validate_discounts(discount_levels)?;
    if values.is_empty() {
        return Err(SimError::EmptySample {
            scope: "the historical value distribution".to_string(),
        });
    }

    info!(
        max_potential_buyers,
        observed = values.len(),
        levels = discount_levels.len(),
        n_trials,
        seed,
        "running conversion uplift simulation"
    );

    let mut resampler = RandomResampler::new(StdRng::seed_from_u64(seed));
    let mut records = Vec::with_capacity(discount_levels.len() * n_trials);

    for &discount in discount_levels {
        let conversion_rate = uplift.conversion_rate(discount);
        let buyers = Binomial::new(max_potential_buyers, conversion_rate)
            .map_err(|e| SimError::Binomial(format!("{:?}", e)))?;
        let multiplier = net_multiplier(discount);

        for trial_id in 0..n_trials {
            let buyer_count = resampler.rng_mut().sample(&buyers);
            let gross = resampler.resample_sum(values, buyer_count as usize);
            records.push(TrialRecord {
                trial_id,
                discount,
                revenue: gross * multiplier,
                buyer_count,
                conversion_rate,
            });
        }

        debug!(discount, conversion_rate, "discount level simulated");
    }

    Ok(records)
}

/// Group trial records by discount, preserving first-seen order
fn group_by_discount(records: &[TrialRecord]) -> Vec<(f64, Vec<&TrialRecord>)> {
    let mut groups: Vec<(f64, Vec<&TrialRecord>)> = Vec::new();
    for record in records {
        match groups
            .iter_mut()
            .find(|(discount, _)| discount.to_bits() == record.discount.to_bits())
        {
            Some((_, members)) => members.push(record),
            None => groups.push((record.discount, vec![record])),
        }
    }
    groups
}

/// Per-discount revenue distribution, used for box plots and the recommendation
pub fn summarize_by_discount(records: &[TrialRecord]) -> Vec<UpliftSummary> {
    group_by_discount(records)
        .into_iter()
        .map(|(discount, members)| {
            let mut revenues: Vec<f64> = members.iter().map(|r| r.revenue).collect();
            sort_samples(&mut revenues);
            let buyers: Vec<f64> = members.iter().map(|r| r.buyer_count as f64).collect();

            UpliftSummary {
                discount,
                conversion_rate: members[0].conversion_rate,
                mean_buyers: mean(&buyers).unwrap_or_default(),
                median_revenue: median(&revenues).unwrap_or_default(),
                revenue_5th_pct: percentile(&revenues, 0.05).unwrap_or_default(),
                revenue_95th_pct: percentile(&revenues, 0.95).unwrap_or_default(),
            }
        })
        .collect()
}

/// Discount with the highest median revenue; the earliest level wins ties
pub fn recommend_discount(records: &[TrialRecord]) -> Option<Recommendation> {
    summarize_by_discount(records)
        .into_iter()
        .fold(None, |best: Option<UpliftSummary>, candidate| match best {
            Some(current) if current.median_revenue >= candidate.median_revenue => Some(current),
            _ => Some(candidate),
        })
        .map(|best| Recommendation {
            discount: best.discount,
            median_revenue: best.median_revenue,
        })
}

/// Revenue without any promotion: the observed total, drawn as a reference line
pub fn baseline_revenue(values: &[f64]) -> f64 {
    values.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> UpliftModel {
        UpliftModel::new(0.05, 0.20, 30.0).unwrap()
    }

    fn history() -> Vec<f64> {
        vec![35.0, 80.0, 120.0, 42.5, 60.0, 99.9, 250.0, 18.0]
    }

    fn record(trial_id: usize, discount: f64, revenue: f64) -> TrialRecord {
        TrialRecord {
            trial_id,
            discount,
            revenue,
            buyer_count: 1,
            conversion_rate: 0.1,
        }
    }

    #[test]
    fn test_records_follow_level_then_trial_order() {
        let levels = [20.0, 0.0, 40.0];
        let records = simulate_with_uplift(500, &history(), &model(), &levels, 25, 42).unwrap();
        assert_eq!(records.len(), 75);
        for (level_idx, chunk) in records.chunks(25).enumerate() {
            for (trial_id, record) in chunk.iter().enumerate() {
                assert_eq!(record.trial_id, trial_id);
                assert_eq!(record.discount, levels[level_idx]);
                assert_eq!(record.conversion_rate, model().conversion_rate(levels[level_idx]));
                assert!(record.buyer_count <= 500);
            }
        }
    }

    #[test]
    fn test_same_seed_reproduces_records() {
        let levels = [0.0, 10.0, 30.0];
        let a = simulate_with_uplift(1_000, &history(), &model(), &levels, 50, 7).unwrap();
        let b = simulate_with_uplift(1_000, &history(), &model(), &levels, 50, 7).unwrap();
        let c = simulate_with_uplift(1_000, &history(), &model(), &levels, 50, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_buyer_counts_track_conversion_rate() {
        let records = simulate_with_uplift(10_000, &history(), &model(), &[0.0, 30.0], 200, 1).unwrap();
        let summaries = summarize_by_discount(&records);
        // expected 500 and 2000 buyers, std dev roughly 22 and 40
        assert!((summaries[0].mean_buyers - 500.0).abs() < 10.0);
        assert!((summaries[1].mean_buyers - 2_000.0).abs() < 20.0);
    }

    #[test]
    fn test_full_discount_yields_zero_revenue() {
        let records = simulate_with_uplift(200, &history(), &model(), &[100.0], 100, 3).unwrap();
        assert!(records.iter().all(|r| r.revenue == 0.0));
    }

    #[test]
    fn test_zero_buyers_yield_zero_revenue() {
        let flat = UpliftModel::new(1e-12, 1e-12, 10.0).unwrap();
        let records = simulate_with_uplift(10, &history(), &flat, &[0.0], 20, 3).unwrap();
        assert!(records.iter().all(|r| r.buyer_count == 0 && r.revenue == 0.0));
    }

    #[test]
    fn test_recommendation_picks_highest_median() {
        let records = vec![
            record(0, 0.0, 100.0),
            record(1, 0.0, 110.0),
            record(2, 0.0, 900.0),
            record(0, 20.0, 150.0),
            record(1, 20.0, 160.0),
            record(2, 20.0, 170.0),
            record(0, 40.0, 10.0),
            record(1, 40.0, 12.0),
            record(2, 40.0, 14.0),
        ];
        assert_eq!(
            recommend_discount(&records),
            Some(Recommendation { discount: 20.0, median_revenue: 160.0 })
        );
    }

    #[test]
    fn test_recommendation_tie_keeps_earliest_level() {
        let records = vec![record(0, 10.0, 50.0), record(0, 5.0, 50.0)];
        assert_eq!(recommend_discount(&records).map(|r| r.discount), Some(10.0));
        assert_eq!(recommend_discount(&[]), None);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(matches!(
            simulate_with_uplift(10, &[], &model(), &[0.0], 5, 1),
            Err(SimError::EmptySample { .. })
        ));
        assert_eq!(
            simulate_with_uplift(10, &history(), &model(), &[0.0], 0, 1),
            Err(SimError::ZeroTrials)
        );
        assert_eq!(
            simulate_with_uplift(10, &history(), &model(), &[101.0], 5, 1),
            Err(SimError::DiscountOutOfRange(101.0))
        );
    }

    #[test]
    fn test_scenario_runs_the_same_simulation() {
        let scenario = UpliftScenario::new(300, model());
        let levels = [0.0, 30.0];
        assert_eq!(
            scenario.simulate(&history(), &levels, 40, 5).unwrap(),
            simulate_with_uplift(300, &history(), &model(), &levels, 40, 5).unwrap()
        );
    }

    #[test]
    fn test_baseline_revenue_is_observed_total() {
        assert_eq!(baseline_revenue(&[10.0, 20.5, 30.0]), 60.5);
    }
}
