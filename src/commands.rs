/// Subcommand drivers: load, detect, simulate, report

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::backend::{InMemoryTable, PartitionedTable, TransactionSource};
use crate::cli::{Backend, CommonArgs, DetectArgs, SimulateArgs, UpliftArgs};
use crate::config::SimulationConfig;
use crate::detector::detect_window;
use crate::ingest::load_transactions;
use crate::monte_carlo::{baseline_revenue, recommend_discount, summarize_by_discount};
use crate::reporting::{
    display_discount_summaries, display_recommendation, display_uplift_summaries, display_window,
    write_records,
};
use crate::resampler::{simulate, RandomResampler, WindowSelection};

fn load_config(common: &CommonArgs, apply: impl FnOnce(&mut SimulationConfig)) -> Result<SimulationConfig> {
    let mut config = SimulationConfig::load_or_default(common.config.as_deref())?;
    apply(&mut config);
    config.validate().context("invalid simulation configuration")?;
    Ok(config)
}

fn open_source(common: &CommonArgs, config: &SimulationConfig) -> Result<Box<dyn TransactionSource>> {
    let transactions = load_transactions(&common.transactions, &config.columns)?;
    let source: Box<dyn TransactionSource> = match common.backend {
        Backend::InMemory => Box::new(InMemoryTable::new(transactions)),
        Backend::Partitioned => {
            let table = PartitionedTable::new(transactions, common.partitions);
            info!(partitions = table.num_partitions(), "partitioned transaction table");
            Box::new(table)
        }
    };
    info!(backend = ?common.backend, rows = source.len(), "transaction source ready");
    Ok(source)
}

fn detect_and_select(
    source: &dyn TransactionSource,
    config: &SimulationConfig,
) -> Result<WindowSelection> {
    let window = detect_window(source, config.threshold)?;
    display_window(&window);
    if !window.is_detected() {
        warn!(
            threshold = config.threshold,
            policy = ?config.missing_window,
            "no promotional window detected"
        );
    }
    Ok(WindowSelection::resolve(&window, config.missing_window)?)
}

pub fn run_detect(args: DetectArgs) -> Result<()> {
    let config = load_config(&args.common, |config| args.common.apply(config))?;
    let source = open_source(&args.common, &config)?;
    let window = detect_window(&*source, config.threshold)?;

    info!(threshold = config.threshold, detected = window.is_detected(), "detection finished");
    display_window(&window);
    Ok(())
}

pub fn run_simulate(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args.common, |config| args.apply(config))?;
    let source = open_source(&args.common, &config)?;
    let selection = detect_and_select(&*source, &config)?;

    let mut resampler = RandomResampler::new(StdRng::seed_from_u64(config.seed));
    let summaries = simulate(
        &*source,
        selection,
        &config.discount_levels,
        config.n_trials,
        config.sample_size,
        &mut resampler,
    )?;

    display_discount_summaries(&summaries);
    if let Some(path) = &args.output {
        write_records(path, &summaries)?;
    }
    Ok(())
}

pub fn run_uplift(args: UpliftArgs) -> Result<()> {
    let common = &args.simulate.common;
    let config = load_config(common, |config| args.apply(config))?;
    let scenario = config.uplift.build_scenario()?;
    info!(
        base_rate = scenario.uplift.base_rate(),
        slope = scenario.uplift.slope(),
        max_potential_buyers = scenario.max_potential_buyers,
        "fitted uplift model"
    );
    let source = open_source(common, &config)?;
    let selection = detect_and_select(&*source, &config)?;

    let values = source.gross_values(selection.as_range());
    let records = scenario.simulate(&values, &config.discount_levels, config.n_trials, config.seed)?;

    let summaries = summarize_by_discount(&records);
    display_uplift_summaries(&summaries, baseline_revenue(&values));
    if let Some(recommendation) = recommend_discount(&records) {
        info!(
            discount = recommendation.discount,
            median_revenue = recommendation.median_revenue,
            "recommended operating point"
        );
        display_recommendation(&recommendation);
    }

    if let Some(path) = &args.simulate.output {
        write_records(path, &records)?;
    }
    if let Some(path) = &args.summary_output {
        write_records(path, &summaries)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("promo-sim-commands-{}-{}", std::process::id(), name))
    }

    fn write_log(name: &str) -> PathBuf {
        let path = temp_path(name);
        let mut data = String::from("created_at,full_value,discount_percent\n");
        for (idx, (date, discount)) in [
            ("2025-01-01 09:00:00", 5.0),
            ("2025-01-02 10:30:00", 83.1),
            ("2025-01-02 11:45:00", 91.1),
            ("2025-01-02 18:20:00", 80.8),
            ("2025-01-03 08:05:00", 88.4),
            ("2025-01-04 12:00:00", 10.0),
        ]
        .iter()
        .enumerate()
        {
            data.push_str(&format!("{},{:.2},{}\n", date, 40.0 + idx as f64 * 12.35, discount));
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args.iter().copied()).unwrap().command
    }

    #[test]
    fn test_simulate_partitioned_writes_summaries() {
        let log = write_log("simulate.csv");
        let output = temp_path("simulate-out.csv");
        let command = parse(&[
            "promo-sim",
            "simulate",
            "--transactions",
            log.to_str().unwrap(),
            "--backend",
            "partitioned",
            "--partitions",
            "2",
            "--discount",
            "0",
            "--discount",
            "25",
            "--trials",
            "50",
            "--missing-window",
            "fail",
            "--output",
            output.to_str().unwrap(),
        ]);
        let Commands::Simulate(args) = command else {
            panic!("expected simulate subcommand");
        };
        run_simulate(args).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        std::fs::remove_file(&log).unwrap();
        std::fs::remove_file(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "discount_pct,mean_revenue,revenue_5th_pct,revenue_95th_pct");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("25.0,"));
    }

    #[test]
    fn test_uplift_partitioned_writes_records_and_summary() {
        let log = write_log("uplift.csv");
        let records = temp_path("uplift-records.json");
        let summary = temp_path("uplift-summary.csv");
        let command = parse(&[
            "promo-sim",
            "uplift",
            "--transactions",
            log.to_str().unwrap(),
            "--backend",
            "partitioned",
            "--partitions",
            "3",
            "--discount",
            "0",
            "--discount",
            "30",
            "--trials",
            "20",
            "--max-buyers",
            "200",
            "--output",
            records.to_str().unwrap(),
            "--summary-output",
            summary.to_str().unwrap(),
        ]);
        let Commands::Uplift(args) = command else {
            panic!("expected uplift subcommand");
        };
        run_uplift(args).unwrap();

        let raw = std::fs::read(&records).unwrap();
        let summary_text = std::fs::read_to_string(&summary).unwrap();
        for path in [&log, &records, &summary] {
            std::fs::remove_file(path).unwrap();
        }
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(40));
        assert_eq!(value[20]["trial_id"], 0);
        assert_eq!(value[20]["discount"], 30.0);
        assert_eq!(summary_text.lines().count(), 3);
    }

    #[test]
    fn test_missing_window_fail_policy_surfaces_error() {
        let log = write_log("nowindow.csv");
        let command = parse(&[
            "promo-sim",
            "simulate",
            "--transactions",
            log.to_str().unwrap(),
            "--threshold",
            "0.99",
            "--missing-window",
            "fail",
            "--trials",
            "10",
        ]);
        let Commands::Simulate(args) = command else {
            panic!("expected simulate subcommand");
        };
        let err = run_simulate(args).unwrap_err();
        std::fs::remove_file(&log).unwrap();
        assert!(err.downcast_ref::<crate::error::SimError>().is_some());
    }
}
