//! Decimal amounts and their storage representation.
//!
//! Amounts cross the public API as [`Decimal`] and are persisted as signed
//! integer **minor units** with a fixed scale per column, so sums and
//! comparisons in the database stay exact.
//!
//! Example: with 2 fraction digits, `75.50` is stored as `7550`.

use rust_decimal::Decimal;

use crate::{EngineError, ResultEngine};

/// Storage rules for one amount column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AmountScale {
    label: &'static str,
    /// Number of fraction digits kept in storage.
    fraction_digits: u32,
    /// Maximum number of digits before the decimal point.
    integer_digits: u32,
}

/// Transaction amounts: positive, up to 999,999,999.99.
pub(crate) const TRANSACTION_AMOUNT: AmountScale = AmountScale {
    label: "transaction amount",
    fraction_digits: 2,
    integer_digits: 9,
};

/// Reading amounts: signed, up to 9,999,999.99999999 in absolute value.
pub(crate) const READING_AMOUNT: AmountScale = AmountScale {
    label: "reading amount",
    fraction_digits: 8,
    integer_digits: 7,
};

impl AmountScale {
    /// Converts a decimal into minor units, rejecting values that would need
    /// rounding or do not fit the column.
    pub(crate) fn to_minor(self, value: Decimal) -> ResultEngine<i64> {
        let normalized = value.normalize();
        if normalized.scale() > self.fraction_digits {
            return Err(EngineError::Validation(format!(
                "{} must have at most {} decimal places",
                self.label, self.fraction_digits
            )));
        }

        let bound = Decimal::from(10_i64.pow(self.integer_digits));
        if normalized.abs() >= bound {
            return Err(EngineError::Validation(format!(
                "{} must not exceed {} integer digits",
                self.label, self.integer_digits
            )));
        }

        let mut scaled = normalized;
        scaled.rescale(self.fraction_digits);
        i64::try_from(scaled.mantissa()).map_err(|_| {
            EngineError::Validation(format!("{} is out of range", self.label))
        })
    }

    /// Converts stored minor units back into a decimal.
    pub(crate) fn from_minor(self, minor: i64) -> Decimal {
        Decimal::new(minor, self.fraction_digits)
    }

    /// Same as [`AmountScale::to_minor`] but additionally requires `value > 0`.
    pub(crate) fn to_positive_minor(self, value: Decimal) -> ResultEngine<i64> {
        if value <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "{} must be positive",
                self.label
            )));
        }
        self.to_minor(value)
    }
}
