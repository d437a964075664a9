//! Conversion of absolute sums and counts into proportions for presentation.
use crate::error::{EngineError, EngineResult};

/// `value / total`, refusing a zero total.
pub fn share(value: f64, total: f64, context: &str) -> EngineResult<f64> {
    if total == 0.0 {
        return Err(EngineError::DivideByZero(context.to_string()));
    }
    Ok(value / total)
}

/// Every value as a proportion of the sum of `values`.
pub fn shares_of_total(values: &[f64], context: &str) -> EngineResult<Vec<f64>> {
    let mut sorted = values.to_vec();
    let total = crate::util::stable_sum(&mut sorted);
    values.iter().map(|v| share(*v, total, context)).collect()
}

/// Count-based variant used for operation counts.
pub fn count_share(count: usize, total: usize, context: &str) -> EngineResult<f64> {
    share(count as f64, total as f64, context)
}
