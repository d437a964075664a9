//! Concentration curves: share of operations against share of cumulative
//! programmed amount, operations taken in ascending amount order.
use crate::error::{EngineError, EngineResult};
use crate::types::{Fund, Operation};
use tracing::debug;

/// How the rank axis is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankAxis {
    /// Ranks `1..=n`, one point per operation.
    #[default]
    Full,
    /// Ranks `1..n`; the top-amount operation is left off the curve and the
    /// cumulative axis is cut to the same length. Reproduces the historical
    /// published chart.
    DropTop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankCurve {
    pub fund: Fund,
    /// Min-max normalized ranks.
    pub operations: Vec<f64>,
    /// Min-max normalized running sums of the programmed amount.
    pub amounts: Vec<f64>,
}

impl RankCurve {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.operations.iter().copied().zip(self.amounts.iter().copied())
    }
}

/// `(v - min) / (max - min)` over the whole sequence.
pub fn min_max_normalize(values: &[f64], context: &str) -> EngineResult<Vec<f64>> {
    if values.len() < 2 {
        return Err(EngineError::insufficient(context, values.len()));
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return Err(EngineError::DivideByZero(context.to_string()));
    }
    Ok(values.iter().map(|v| (v - min) / range).collect())
}

/// Running sums of the amounts in ascending order.
pub fn cumulative_sorted(mut amounts: Vec<f64>) -> Vec<f64> {
    amounts.sort_by(|a, b| a.total_cmp(b));
    amounts
        .into_iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct RankCurveBuilder {
    axis: RankAxis,
}

impl RankCurveBuilder {
    pub fn new(axis: RankAxis) -> Self {
        Self { axis }
    }

    pub fn build(&self, records: &[Operation], fund: Fund) -> EngineResult<RankCurve> {
        let amounts: Vec<f64> = records
            .iter()
            .filter(|op| op.fund == fund)
            .map(|op| op.programmed_amount)
            .collect();
        let n = amounts.len();
        let context = format!("{} concentration curve", fund);
        if n < 2 {
            return Err(EngineError::insufficient(context, n));
        }

        let cumulative = cumulative_sorted(amounts);
        let amounts_axis = min_max_normalize(&cumulative, &context)?;

        let (operations, amounts) = match self.axis {
            RankAxis::Full => {
                let ranks: Vec<f64> = (1..=n).map(|r| r as f64).collect();
                (min_max_normalize(&ranks, &context)?, amounts_axis)
            }
            RankAxis::DropTop => {
                let ranks: Vec<f64> = (1..n).map(|r| r as f64).collect();
                let operations = min_max_normalize(&ranks, &context)?;
                let mut amounts = amounts_axis;
                amounts.truncate(operations.len());
                (operations, amounts)
            }
        };

        debug!(fund = %fund, points = operations.len(), "concentration curve built");
        Ok(RankCurve {
            fund,
            operations,
            amounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::types::Tier;

    fn op(fund: Fund, amount: f64) -> Operation {
        let day = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        Operation {
            fund,
            theme: "Emploi".to_string(),
            beneficiary_category: "Associations".to_string(),
            region: "Bretagne".to_string(),
            programmed_amount: amount,
            total_eligible_expenditure: amount * 2.0,
            is_financial_instrument: false,
            financial_instrument_category: None,
            duration_months: 12,
            start_date: day,
            end_date: day,
            tier: Tier::Ordinary,
        }
    }

    #[test]
    fn three_fse_operations() {
        let records = vec![op(Fund::Fse, 600.0), op(Fund::Fse, 100.0), op(Fund::Fse, 300.0)];
        assert_eq!(
            cumulative_sorted(records.iter().map(|o| o.programmed_amount).collect()),
            vec![100.0, 400.0, 1000.0]
        );

        let curve = RankCurveBuilder::default().build(&records, Fund::Fse).unwrap();
        assert_eq!(curve.operations, vec![0.0, 0.5, 1.0]);
        assert_eq!(curve.amounts[0], 0.0);
        assert!((curve.amounts[1] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(curve.amounts[2], 1.0);
    }

    #[test]
    fn other_fund_is_filtered_out() {
        let records = vec![
            op(Fund::Feder, 5.0),
            op(Fund::Fse, 1.0),
            op(Fund::Feder, 1_000_000.0),
            op(Fund::Fse, 3.0),
        ];
        let curve = RankCurveBuilder::default().build(&records, Fund::Fse).unwrap();
        assert_eq!(curve.fund, Fund::Fse);
        assert_eq!(curve.operations, vec![0.0, 1.0]);
        assert_eq!(curve.amounts, vec![0.0, 1.0]);
    }

    #[test]
    fn axes_are_monotone_and_anchored() {
        let amounts = [12.0, 7.5, 300.0, 3.0, 45.0, 45.5, 1e6, 2.0];
        let records: Vec<_> = amounts.iter().map(|a| op(Fund::Feder, *a)).collect();
        let curve = RankCurveBuilder::default().build(&records, Fund::Feder).unwrap();

        for axis in [&curve.operations, &curve.amounts] {
            assert_eq!(axis.len(), amounts.len());
            assert_eq!(axis[0], 0.0);
            assert_eq!(axis[axis.len() - 1], 1.0);
            assert!(axis.windows(2).all(|w| w[0] <= w[1]));
        }
        assert_eq!(curve.points().count(), amounts.len());
    }

    #[test]
    fn fewer_than_two_records_is_insufficient() {
        let records = vec![op(Fund::Fse, 10.0), op(Fund::Feder, 20.0)];
        let err = RankCurveBuilder::default().build(&records, Fund::Fse).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { found: 1, .. }));

        let err = RankCurveBuilder::default().build(&[], Fund::Feder).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { found: 0, .. }));
    }

    #[test]
    fn all_zero_amounts_cannot_be_normalized() {
        let records = vec![op(Fund::Fse, 0.0), op(Fund::Fse, 0.0)];
        let err = RankCurveBuilder::default().build(&records, Fund::Fse).unwrap_err();
        assert!(matches!(err, EngineError::DivideByZero(_)));
    }

    #[test]
    fn drop_top_reproduces_the_shortened_rank_axis() {
        let records = vec![
            op(Fund::Fse, 100.0),
            op(Fund::Fse, 300.0),
            op(Fund::Fse, 600.0),
            op(Fund::Fse, 1000.0),
        ];
        let curve = RankCurveBuilder::new(RankAxis::DropTop)
            .build(&records, Fund::Fse)
            .unwrap();
        // cumulative [100, 400, 1000, 2000] normalized over its full range,
        // ranks [1, 2, 3] normalized on their own.
        assert_eq!(curve.operations, vec![0.0, 0.5, 1.0]);
        assert_eq!(curve.amounts.len(), 3);
        assert!((curve.amounts[1] - 300.0 / 1900.0).abs() < 1e-12);
        assert!((curve.amounts[2] - 900.0 / 1900.0).abs() < 1e-12);

        let two = vec![op(Fund::Fse, 1.0), op(Fund::Fse, 2.0)];
        assert!(RankCurveBuilder::new(RankAxis::DropTop)
            .build(&two, Fund::Fse)
            .is_err());
    }
}
