//! Per-group count, sum and mean over a filtered subset of records.
//!
//! Unlike the cross-tabulation, only groups that actually occur are
//! returned, so a group's count is never zero and its mean is always defined.
use crate::error::{EngineError, EngineResult};
use crate::util::stable_sum;
use std::collections::BTreeMap;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary<K> {
    pub key: K,
    pub count: usize,
    pub sum: f64,
    pub secondary_sum: f64,
    pub mean: f64,
}

/// Output order of the groups.
#[derive(Debug, Clone)]
pub enum KeyOrder<'a, K> {
    /// Follow a closed canonical ordering; keys outside it are an error.
    Canonical(&'a [K]),
    /// Sorted order of the observed keys.
    Natural,
}

#[derive(Debug, Clone)]
pub struct GroupSummarizer<'a, K> {
    dimension: &'a str,
    order: KeyOrder<'a, K>,
}

#[derive(Default)]
struct Acc {
    count: usize,
    amounts: Vec<f64>,
    secondary: Vec<f64>,
}

impl<'a, K> GroupSummarizer<'a, K>
where
    K: Ord + Clone + Display,
{
    pub fn natural(dimension: &'a str) -> Self {
        Self {
            dimension,
            order: KeyOrder::Natural,
        }
    }

    pub fn canonical(dimension: &'a str, order: &'a [K]) -> Self {
        Self {
            dimension,
            order: KeyOrder::Canonical(order),
        }
    }

    pub fn summarize<'r, T, I, FK, FA, FB>(
        &self,
        records: I,
        key: FK,
        amount: FA,
        secondary: FB,
    ) -> EngineResult<Vec<GroupSummary<K>>>
    where
        T: 'r,
        I: IntoIterator<Item = &'r T>,
        FK: Fn(&T) -> K,
        FA: Fn(&T) -> f64,
        FB: Fn(&T) -> f64,
    {
        let mut groups: BTreeMap<K, Acc> = BTreeMap::new();
        for record in records {
            let acc = groups.entry(key(record)).or_default();
            acc.count += 1;
            acc.amounts.push(amount(record));
            acc.secondary.push(secondary(record));
        }

        let finish = |key: K, mut acc: Acc| {
            let sum = stable_sum(&mut acc.amounts);
            GroupSummary {
                key,
                count: acc.count,
                sum,
                secondary_sum: stable_sum(&mut acc.secondary),
                mean: sum / acc.count as f64,
            }
        };

        match self.order {
            KeyOrder::Natural => Ok(groups
                .into_iter()
                .map(|(key, acc)| finish(key, acc))
                .collect()),
            KeyOrder::Canonical(order) => {
                if let Some(stray) = groups.keys().find(|k| !order.contains(k)) {
                    return Err(EngineError::unknown(self.dimension, stray.to_string()));
                }
                Ok(order
                    .iter()
                    .filter_map(|k| groups.remove(k).map(|acc| finish(k.clone(), acc)))
                    .collect())
            }
        }
    }

    /// Counts only; sums are left at zero.
    pub fn count<'r, T, I, FK>(&self, records: I, key: FK) -> EngineResult<Vec<GroupSummary<K>>>
    where
        T: 'r,
        I: IntoIterator<Item = &'r T>,
        FK: Fn(&T) -> K,
    {
        self.summarize(records, key, |_| 0.0, |_| 0.0)
    }
}
