/// Reporting and output formatting module
/// Console presentation of results and export of records for the chart renderer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::{DiscountSummary, PromotionWindow, Recommendation};
use crate::monte_carlo::UpliftSummary;

/// Write records as CSV, or as pretty JSON when the path ends in `.json`
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let mut file = File::create(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;

    if is_json {
        let data = serde_json::to_vec_pretty(records)
            .with_context(|| format!("failed to serialize json: {}", path.display()))?;
        file.write_all(&data)
            .with_context(|| format!("failed to write json file: {}", path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to finalize json file: {}", path.display()))?;
    } else {
        let mut writer = csv::Writer::from_writer(file);
        for record in records {
            writer
                .serialize(record)
                .with_context(|| format!("failed to write csv row: {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush csv file: {}", path.display()))?;
    }

    info!(path = %path.display(), records = records.len(), "wrote result records");
    Ok(())
}

/// Display the detected promotional window
pub fn display_window(window: &PromotionWindow) {
    match window.as_range() {
        Some(range) => println!(
            "Promotional window: {} to {} ({} days)",
            range.start,
            range.end,
            range.num_days()
        ),
        None => println!("Promotional window: none detected"),
    }
}

/// Display bootstrap results per discount level
pub fn display_discount_summaries(summaries: &[DiscountSummary]) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║          MONTE CARLO NET REVENUE BY DISCOUNT LEVEL           ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("{:>10} {:>16} {:>16} {:>16}", "Discount", "Mean", "5th pct", "95th pct");
    for summary in summaries {
        println!(
            "{:>9.1}% {:>16.2} {:>16.2} {:>16.2}",
            summary.discount_pct,
            summary.mean_revenue,
            summary.revenue_5th_pct,
            summary.revenue_95th_pct
        );
    }
}

/// Display the uplift distribution per discount level
pub fn display_uplift_summaries(summaries: &[UpliftSummary], baseline: f64) {
    println!("\n╔══════════════════════════════════════════════════════════════════════════╗");
    println!("║              CONVERSION UPLIFT SIMULATION BY DISCOUNT LEVEL              ║");
    println!("╚══════════════════════════════════════════════════════════════════════════╝\n");

    println!(
        "{:>10} {:>10} {:>10} {:>14} {:>14} {:>14}",
        "Discount", "Conv.", "Buyers", "Median", "5th pct", "95th pct"
    );
    for summary in summaries {
        println!(
            "{:>9.1}% {:>9.2}% {:>10.1} {:>14.2} {:>14.2} {:>14.2}",
            summary.discount,
            summary.conversion_rate * 100.0,
            summary.mean_buyers,
            summary.median_revenue,
            summary.revenue_5th_pct,
            summary.revenue_95th_pct
        );
    }
    println!("\nBaseline (no promotion) revenue: {:.2}", baseline);
}

/// Display the recommended operating point
pub fn display_recommendation(recommendation: &Recommendation) {
    println!(
        "Recommended discount: {:.1}% (median net revenue {:.2})",
        recommendation.discount, recommendation.median_revenue
    );
}
