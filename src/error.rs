/// Domain errors raised by the detector, resamplers and uplift model

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("{name} must lie strictly between 0 and 1, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("promo discount must be a non-zero finite percentage, got {0}")]
    InvalidPromoDiscount(f64),
    #[error("promotion threshold must lie in (0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("discount level {0} is outside [0, 100]")]
    DiscountOutOfRange(f64),
    #[error("number of trials must be at least 1")]
    ZeroTrials,
    #[error("no transactions available to resample in {scope}")]
    EmptySample { scope: String },
    #[error("no promotional window was detected and the missing-window policy is `fail`")]
    NoPromotionWindow,
    #[error("binomial draw rejected: {0}")]
    Binomial(String),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample_message_names_scope() {
        let err = SimError::EmptySample {
            scope: "2025-01-01..=2025-01-02".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no transactions available to resample in 2025-01-01..=2025-01-02"
        );
    }
}
