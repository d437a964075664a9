//! Dense cross-tabulation of a numeric field by two categorical dimensions.
//!
//! The row and column orderings are a closed contract with whoever produced
//! the records: every record must land in a known cell, and every cell of the
//! output exists, zero when nothing contributed to it.
use crate::error::{EngineError, EngineResult};
use crate::util::stable_sum;
use std::collections::HashMap;
use tracing::debug;

/// Builds [`CrossTab`]s over fixed canonical row and column orderings.
#[derive(Debug, Clone)]
pub struct CrossTabBuilder {
    rows: Vec<String>,
    columns: Vec<String>,
    row_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
}

fn index_of(keys: &[String], dimension: &str) -> EngineResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if index.insert(key.clone(), i).is_some() {
            return Err(EngineError::DuplicateCategory {
                dimension: dimension.to_string(),
                value: key.clone(),
            });
        }
    }
    Ok(index)
}

impl CrossTabBuilder {
    pub fn new(rows: Vec<String>, columns: Vec<String>) -> EngineResult<Self> {
        let row_index = index_of(&rows, "row")?;
        let column_index = index_of(&columns, "column")?;
        Ok(Self {
            rows,
            columns,
            row_index,
            column_index,
        })
    }

    /// Sum `amount` into `M[row_key][col_key]` for every record.
    ///
    /// Fails with [`EngineError::UnknownCategory`] on the first record whose
    /// row or column key is not part of the canonical orderings.
    pub fn build<T, A, R, C>(
        &self,
        records: &[T],
        amount: A,
        row_key: R,
        col_key: C,
    ) -> EngineResult<CrossTab>
    where
        A: Fn(&T) -> f64,
        R: Fn(&T) -> &str,
        C: Fn(&T) -> &str,
    {
        let mut contributions: Vec<Vec<Vec<f64>>> =
            vec![vec![Vec::new(); self.columns.len()]; self.rows.len()];

        for record in records {
            let row = row_key(record);
            let col = col_key(record);
            let i = *self
                .row_index
                .get(row)
                .ok_or_else(|| EngineError::unknown("row", row))?;
            let j = *self
                .column_index
                .get(col)
                .ok_or_else(|| EngineError::unknown("column", col))?;
            contributions[i][j].push(amount(record));
        }

        let cells: Vec<Vec<f64>> = contributions
            .into_iter()
            .map(|row| row.into_iter().map(|mut cell| stable_sum(&mut cell)).collect())
            .collect();

        debug!(
            records = records.len(),
            rows = self.rows.len(),
            columns = self.columns.len(),
            "cross-tabulation built"
        );

        Ok(CrossTab {
            rows: self.rows.clone(),
            columns: self.columns.clone(),
            cells,
        })
    }
}

/// A dense `rows × columns` matrix of sums in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<f64>>,
}

impl CrossTab {
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    fn row_position(&self, key: &str) -> EngineResult<usize> {
        self.rows
            .iter()
            .position(|r| r == key)
            .ok_or_else(|| EngineError::unknown("row", key))
    }

    fn column_position(&self, key: &str) -> EngineResult<usize> {
        self.columns
            .iter()
            .position(|c| c == key)
            .ok_or_else(|| EngineError::unknown("column", key))
    }

    pub fn value(&self, row: &str, col: &str) -> EngineResult<f64> {
        let i = self.row_position(row)?;
        let j = self.column_position(col)?;
        Ok(self.cells[i][j])
    }

    pub fn column(&self, col: &str) -> EngineResult<Vec<f64>> {
        let j = self.column_position(col)?;
        Ok(self.cells.iter().map(|row| row[j]).collect())
    }

    pub fn total(&self) -> f64 {
        let mut values: Vec<f64> = self.cells.iter().flatten().copied().collect();
        stable_sum(&mut values)
    }

    /// Each row's share of the given column's total.
    pub fn column_shares(&self, col: &str) -> EngineResult<Vec<f64>> {
        let values = self.column(col)?;
        crate::share::shares_of_total(&values, &format!("column '{}'", col))
    }

    /// Copy of the matrix without `key`'s row. Remaining cells are untouched.
    pub fn excluding_row(&self, key: &str) -> EngineResult<CrossTab> {
        let skip = self.row_position(key)?;
        let keep = |i: &usize| *i != skip;
        Ok(CrossTab {
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, _)| keep(i))
                .map(|(_, r)| r.clone())
                .collect(),
            columns: self.columns.clone(),
            cells: self
                .cells
                .iter()
                .enumerate()
                .filter(|(i, _)| keep(i))
                .map(|(_, row)| row.clone())
                .collect(),
        })
    }

    /// `(row, column, value)` for every cell, row-major.
    pub fn iter_cells(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(i, row)| {
            self.columns
                .iter()
                .enumerate()
                .map(move |(j, col)| (row.as_str(), col.as_str(), self.cells[i][j]))
        })
    }
}
