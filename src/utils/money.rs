use crate::error::{AppError, AppResult};

/// Largest amount accepted from clients: one billion currency units.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Converts an amount in currency units (as sent by clients) into integer cents.
pub fn to_cents(amount: f64) -> AppResult<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::ValidationError(
            "Amount must be a non-negative number".to_string(),
        ));
    }
    let cents = (amount * 100.0).round();
    if cents > MAX_AMOUNT_CENTS as f64 {
        return Err(AppError::ValidationError("Amount is too large".to_string()));
    }
    Ok(cents as i64)
}
