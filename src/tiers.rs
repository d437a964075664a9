//! Derivation of the ordinary / large-scale split from programmed amounts.
//!
//! The source data arrives with a precomputed `Palier` label. This classifier
//! recomputes it per fund from a quantile of the amounts, to audit the label
//! or to relabel with a different cut.
use crate::error::{EngineError, EngineResult};
use crate::types::{Fund, Operation, Tier};
use serde::Deserialize;
use tracing::info;

/// Which side of the threshold an amount exactly equal to it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Large-scale iff `amount > threshold`.
    #[default]
    Exclusive,
    /// Large-scale iff `amount >= threshold`.
    Inclusive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierClassifier {
    quantile: f64,
    boundary: Boundary,
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self {
            quantile: 0.9,
            boundary: Boundary::Exclusive,
        }
    }
}

impl TierClassifier {
    /// Rejects quantiles outside the open interval (0, 1), NaN included.
    pub fn new(quantile: f64, boundary: Boundary) -> EngineResult<Self> {
        if !(quantile > 0.0 && quantile < 1.0) {
            return Err(EngineError::InvalidQuantile(quantile));
        }
        Ok(Self { quantile, boundary })
    }

    /// Linear-interpolation quantile of `amounts` (position `q * (n - 1)`).
    pub fn threshold(&self, amounts: &[f64]) -> EngineResult<f64> {
        if amounts.is_empty() {
            return Err(EngineError::insufficient("tier threshold", 0));
        }
        let mut sorted = amounts.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let pos = self.quantile * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
    }

    /// One threshold per fund present in `records`.
    pub fn thresholds(&self, records: &[Operation]) -> EngineResult<Vec<(Fund, f64)>> {
        Fund::ALL
            .iter()
            .filter_map(|fund| {
                let amounts: Vec<f64> = records
                    .iter()
                    .filter(|op| op.fund == *fund)
                    .map(|op| op.programmed_amount)
                    .collect();
                (!amounts.is_empty()).then(|| self.threshold(&amounts).map(|t| (*fund, t)))
            })
            .collect()
    }

    pub fn tier_for(&self, amount: f64, threshold: f64) -> Tier {
        let large = match self.boundary {
            Boundary::Exclusive => amount > threshold,
            Boundary::Inclusive => amount >= threshold,
        };
        if large {
            Tier::LargeScale
        } else {
            Tier::Ordinary
        }
    }

    /// Copies of `records` with `tier` recomputed from the per-fund thresholds.
    pub fn classify(&self, records: &[Operation]) -> EngineResult<Vec<Operation>> {
        let thresholds = self.thresholds(records)?;
        for (fund, threshold) in &thresholds {
            info!(fund = %fund, threshold, "derived large-scale threshold");
        }
        Ok(records
            .iter()
            .map(|op| {
                let mut op = op.clone();
                // Every record's fund has a threshold: it contributed to it.
                if let Some((_, t)) = thresholds.iter().find(|(f, _)| *f == op.fund) {
                    op.tier = self.tier_for(op.programmed_amount, *t);
                }
                op
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn op(fund: Fund, amount: f64) -> Operation {
        let day = NaiveDate::from_ymd_opt(2017, 6, 1).unwrap();
        Operation {
            fund,
            theme: "Transport".to_string(),
            beneficiary_category: "Communes".to_string(),
            region: "Corse".to_string(),
            programmed_amount: amount,
            total_eligible_expenditure: amount,
            is_financial_instrument: false,
            financial_instrument_category: None,
            duration_months: 24,
            start_date: day,
            end_date: day,
            tier: Tier::Ordinary,
        }
    }

    #[test]
    fn quantile_interpolates_between_neighbours() {
        let amounts: Vec<f64> = (1..=11).map(|v| v as f64 * 10.0).collect();
        assert_eq!(TierClassifier::default().threshold(&amounts).unwrap(), 100.0);

        let amounts = [1.0, 2.0, 3.0, 4.0];
        // position 0.9 * 3 = 2.7 -> 3 + 0.7 * (4 - 3)
        let t = TierClassifier::default().threshold(&amounts).unwrap();
        assert!((t - 3.7).abs() < 1e-12);

        assert!(TierClassifier::default().threshold(&[]).is_err());
    }

    #[test]
    fn boundary_decides_ties() {
        let exclusive = TierClassifier::new(0.9, Boundary::Exclusive).unwrap();
        let inclusive = TierClassifier::new(0.9, Boundary::Inclusive).unwrap();
        assert_eq!(exclusive.tier_for(100.0, 100.0), Tier::Ordinary);
        assert_eq!(inclusive.tier_for(100.0, 100.0), Tier::LargeScale);
        assert_eq!(exclusive.tier_for(100.5, 100.0), Tier::LargeScale);
    }

    #[test]
    fn out_of_range_quantiles_are_rejected() {
        for q in [1.5, 1.0, 0.0, -0.2, f64::NAN] {
            assert!(matches!(
                TierClassifier::new(q, Boundary::Exclusive),
                Err(EngineError::InvalidQuantile(_))
            ));
        }
        let classifier = TierClassifier::new(0.99, Boundary::Exclusive).unwrap();
        let t = classifier.threshold(&[1.0, 2.0, 3.0]).unwrap();
        assert!(t > 2.9 && t <= 3.0);
    }

    #[test]
    fn classify_uses_each_funds_own_threshold() {
        let mut records: Vec<Operation> = (1..=10).map(|v| op(Fund::Fse, v as f64)).collect();
        records.extend((1..=10).map(|v| op(Fund::Feder, v as f64 * 1000.0)));

        let thresholds = TierClassifier::default().thresholds(&records).unwrap();
        assert_eq!(thresholds.len(), 2);
        assert_eq!(thresholds[0].0, Fund::Feder);

        let classified = TierClassifier::default().classify(&records).unwrap();
        let large: Vec<_> = classified
            .iter()
            .filter(|op| op.tier == Tier::LargeScale)
            .map(|op| (op.fund, op.programmed_amount))
            .collect();
        assert_eq!(large, vec![(Fund::Fse, 10.0), (Fund::Feder, 10_000.0)]);
    }

    #[test]
    fn absent_fund_has_no_threshold() {
        let records = vec![op(Fund::Feder, 5.0)];
        let thresholds = TierClassifier::default().thresholds(&records).unwrap();
        assert_eq!(thresholds, vec![(Fund::Feder, 5.0)]);
    }
}
