/// Promotional window detection
/// Finds the first and last day whose mean discount met the promotion threshold

use tracing::debug;

use crate::backend::TransactionSource;
use crate::error::{SimError, SimResult};
use crate::models::PromotionWindow;

/// Threshold is a fraction of full price in (0, 1]
pub fn validate_threshold(threshold: f64) -> SimResult<()> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(SimError::InvalidThreshold(threshold))
    }
}

/// Detect the promotional window.
/// `threshold` is a fraction in (0, 1]; discounts are stored as percentages,
/// so a day qualifies when its mean discount >= threshold * 100.
pub fn detect_window<S: TransactionSource + ?Sized>(
    source: &S,
    threshold: f64,
) -> SimResult<PromotionWindow> {
    validate_threshold(threshold)?;
    let cutoff = threshold * 100.0;

    let qualifying: Vec<_> = source
        .daily_discount_means()
        .into_iter()
        .filter(|(_, mean_discount)| *mean_discount >= cutoff)
        .map(|(date, _)| date)
        .collect();

    debug!(cutoff, qualifying_days = qualifying.len(), "scanned daily discount means");

    match (qualifying.iter().min(), qualifying.iter().max()) {
        (Some(&start), Some(&end)) => Ok(PromotionWindow::between(start, end)),
        _ => Ok(PromotionWindow::absent()),
    }
}
