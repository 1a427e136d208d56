/// Conversion uplift model
/// Interpolates conversion probability linearly in log-odds space between
/// (0, base_rate) and (promo_discount, promo_rate)

use crate::error::{SimError, SimResult};

pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpliftModel {
    base_rate: f64,
    logit_base: f64,
    slope: f64,
}

impl UpliftModel {
    /// Fit the model through two anchor points.
    /// Rates must be in the open interval (0, 1) and the promo discount non-zero.
    pub fn new(base_rate: f64, promo_rate: f64, promo_discount: f64) -> SimResult<Self> {
        check_rate("base_rate", base_rate)?;
        check_rate("promo_rate", promo_rate)?;
        if !promo_discount.is_finite() || promo_discount == 0.0 {
            return Err(SimError::InvalidPromoDiscount(promo_discount));
        }

        let logit_base = logit(base_rate);
        let slope = (logit(promo_rate) - logit_base) / promo_discount;

        Ok(UpliftModel {
            base_rate,
            logit_base,
            slope,
        })
    }

    /// Estimated conversion probability at `discount` percent.
    /// Negative discounts are clamped to the base rate.
    pub fn conversion_rate(&self, discount: f64) -> f64 {
        if discount < 0.0 {
            return self.base_rate;
        }
        sigmoid(self.logit_base + self.slope * discount)
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }
}

fn check_rate(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(SimError::InvalidRate { name, value })
    }
}
