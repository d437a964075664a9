use crate::reports::ReportSet;
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// Markdown preview of the first `max_rows` rows.
pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Write one table to `dir/file` and preview it.
fn emit<T>(
    dir: &Path,
    file: &str,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    max_rows: usize,
) -> Result<PathBuf, Box<dyn Error>>
where
    T: Tabled + Serialize + Clone,
{
    let path = dir.join(file);
    write_csv(&path, rows)?;
    preview_table(title, note, rows, max_rows);
    println!("(Full table exported to {})\n", path.display());
    info!(file = %path.display(), rows = rows.len(), "table written");
    Ok(path)
}

/// Write every table plus `summary.json` into `dir`. Returns the written paths.
pub fn write_reports(dir: &Path, reports: &ReportSet) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    let mut written = vec![
        emit(
            dir,
            "report1_concentration_curves.csv",
            "Concentration of programmed amounts",
            Some("Operations sorted by amount, both axes min-max normalized"),
            &reports.concentration,
            3,
        )?,
        emit(
            dir,
            "report2_theme_beneficiary.csv",
            "EU funding by theme and beneficiary category",
            Some("Indeterminate theme excluded"),
            &reports.theme_beneficiary,
            3,
        )?,
        emit(
            dir,
            "report3_usage_profile.csv",
            "Use of funds by beneficiary category",
            Some("Share of each category's amount per theme"),
            &reports.usage_profile,
            3,
        )?,
        emit(
            dir,
            "report4_tier_mix.csv",
            "Operations by beneficiary category and tier",
            Some("Indeterminate beneficiaries excluded"),
            &reports.tier_mix,
            4,
        )?,
        emit(
            dir,
            "report5_large_operations.csv",
            "Very large operations",
            Some("Financial instruments excluded"),
            &reports.large_operations,
            5,
        )?,
        emit(
            dir,
            "report6_financial_instruments.csv",
            "Financial instruments",
            None,
            &reports.instruments,
            5,
        )?,
        emit(
            dir,
            "report7_durations.csv",
            "Operations by duration",
            None,
            &reports.durations,
            8,
        )?,
        emit(
            dir,
            "report8_rhythm.csv",
            "Implementation rhythm",
            Some("Grouped by fund and start year"),
            &reports.rhythm,
            4,
        )?,
    ];

    let summary_path = dir.join("summary.json");
    write_json(&summary_path, &reports.summary)?;
    info!(file = %summary_path.display(), "summary written");
    written.push(summary_path);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RhythmRow;

    #[test]
    fn csv_has_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rhythm.csv");
        let rows = vec![RhythmRow {
            fund: "FSE".to_string(),
            start_year: 2015,
            operations: 3,
            amount: "1,200.00".to_string(),
        }];
        write_csv(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Fund,StartYear,Operations,ProgrammedAmount"));
        assert_eq!(lines.next(), Some("FSE,2015,3,\"1,200.00\""));
    }

    #[test]
    fn json_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("value.json");
        write_json(&path, &serde_json::json!({ "operations": 2 })).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"operations\": 2\n}");
    }
}
