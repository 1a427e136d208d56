use chrono::NaiveDate;
use serde::Serialize;

/// A single sale from the transaction log, normalised to calendar-date granularity
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub full_value: f64,
    /// Discount applied to the sale, stored as a percentage (0-100)
    pub discount_percent: f64,
}

impl Transaction {
    pub fn new(date: NaiveDate, full_value: f64, discount_percent: f64) -> Self {
        Transaction {
            date,
            full_value,
            discount_percent,
        }
    }
}

/// Inclusive calendar range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Days where the mean discount met the promotion threshold.
/// Start and end are either both present or both absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromotionWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PromotionWindow {
    pub fn absent() -> Self {
        PromotionWindow::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        PromotionWindow {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.as_range().is_some()
    }

    pub fn as_range(&self) -> Option<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        }
    }
}

/// Bootstrap statistics for one simulated discount level
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiscountSummary {
    pub discount_pct: f64,
    pub mean_revenue: f64,
    pub revenue_5th_pct: f64,
    pub revenue_95th_pct: f64,
}

/// One Monte Carlo trial of the conversion-uplift simulation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial_id: usize,
    pub discount: f64,
    pub revenue: f64,
    pub buyer_count: u64,
    pub conversion_rate: f64,
}

/// Discount level with the highest median simulated revenue
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub discount: f64,
    pub median_revenue: f64,
}
