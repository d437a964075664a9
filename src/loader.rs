use crate::error::LoadError;
use crate::types::{Fund, Operation, RawRow, Tier};
use crate::util::{
    months_between, parse_bool_safe, parse_date_safe, parse_f64_safe, parse_u32_safe,
};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub skipped_funds: usize,
}

/// Exports of the dataset use either `,` or `;`; pick whichever dominates the header.
fn sniff_delimiter(path: &str) -> Result<u8, LoadError> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;
    let commas = header.matches(',').count();
    let semicolons = header.matches(';').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

/// Trimmed label with chart line breaks collapsed to single spaces.
fn clean_label(s: Option<String>, fallback: &str) -> String {
    let s = s.unwrap_or_default();
    let s = s.replace("<br>", " ");
    let cleaned = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

fn clean_optional(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Read the operations file into typed records.
///
/// Rows missing a usable fund, amount, start date or `Palier` tier are skipped
/// and counted.
/// Category labels are only cleaned here; whether they belong to the canonical
/// orderings is checked by the aggregations that use them.
pub fn load_operations(path: &str) -> Result<(Vec<Operation>, LoadReport), LoadError> {
    let delimiter = sniff_delimiter(path)?;
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut skipped_funds = 0usize;
    let mut operations: Vec<Operation> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        let fund = match row.fund.as_deref().map(Fund::parse) {
            Some(Some(f)) => f,
            Some(None) => {
                skipped_funds += 1;
                continue;
            }
            None => {
                parse_errors += 1;
                continue;
            }
        };

        let programmed_amount = match parse_f64_safe(row.programmed_amount.as_deref()) {
            Some(v) if v >= 0.0 => v,
            _ => {
                parse_errors += 1;
                continue;
            }
        };
        let start_date = match parse_date_safe(row.start_date.as_deref()) {
            Some(d) => d,
            None => {
                parse_errors += 1;
                continue;
            }
        };
        let end_date = parse_date_safe(row.end_date.as_deref()).unwrap_or(start_date);
        let duration_months = parse_u32_safe(row.duration_months.as_deref())
            .unwrap_or_else(|| months_between(start_date, end_date));

        let total_eligible_expenditure = parse_f64_safe(row.total_eligible_expenditure.as_deref())
            .filter(|v| *v >= 0.0)
            .unwrap_or(programmed_amount);
        let is_financial_instrument =
            parse_bool_safe(row.is_financial_instrument.as_deref()).unwrap_or(false);
        let financial_instrument_category = if is_financial_instrument {
            clean_optional(row.financial_instrument_category)
        } else {
            None
        };
        let tier = match row.tier.as_deref().and_then(Tier::parse) {
            Some(t) => t,
            None => {
                parse_errors += 1;
                continue;
            }
        };

        operations.push(Operation {
            fund,
            theme: clean_label(row.theme, "Indéterminé"),
            beneficiary_category: clean_label(
                row.beneficiary_category,
                "Bénéficiaires de type indéterminé",
            ),
            region: clean_label(row.region, "Inconnue"),
            programmed_amount,
            total_eligible_expenditure,
            is_financial_instrument,
            financial_instrument_category,
            duration_months,
            start_date,
            end_date,
            tier,
        });
    }

    if parse_errors > 0 {
        warn!(parse_errors, "rows skipped due to parse/validation errors");
    }
    if skipped_funds > 0 {
        warn!(skipped_funds, "rows skipped for funds other than FEDER/FSE");
    }
    let report = LoadReport {
        total_rows,
        loaded_rows: operations.len(),
        parse_errors,
        skipped_funds,
    };
    info!(total = report.total_rows, loaded = report.loaded_rows, "operations loaded");
    Ok((operations, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const COLUMNS: [&str; 12] = [
        "Fonds",
        "themeprojet",
        "catbeneficiaire",
        "Région de l'opération",
        "Montant UE programmé",
        "Total des dépenses éligibles",
        "Instrument financier ?",
        "Catégorie d'instrument financier",
        "Durée, en mois",
        "Date de début de l'opération",
        "Date de fin de l'opération",
        "Palier",
    ];

    fn header(delimiter: char) -> String {
        COLUMNS
            .iter()
            .map(|c| {
                if c.contains(delimiter) {
                    format!("\"{}\"", c)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }

    fn write_csv_with(delimiter: char, lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", header(delimiter)).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        write_csv_with(',', lines)
    }

    #[test]
    fn loads_and_cleans_rows() {
        let file = write_csv(&[
            "FSE,Emploi,Associations,Bretagne,1200.5,2400,False,,12,2016-01-04,2016-12-31,P1",
            "FEDER,\"Gestion administrative<br>(assistance technique)\",État,Corse,\"15,000,000\",30000000,True,Prêt,,2017-03-01,2019-03-01,P2",
        ]);
        let (ops, report) = load_operations(file.path().to_str().unwrap()).unwrap();

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.parse_errors, 0);

        assert_eq!(ops[0].fund, Fund::Fse);
        assert_eq!(ops[0].programmed_amount, 1200.5);
        assert_eq!(ops[0].duration_months, 12);
        assert_eq!(ops[0].tier, Tier::Ordinary);
        assert!(!ops[0].is_financial_instrument);

        assert_eq!(ops[1].theme, "Gestion administrative (assistance technique)");
        assert_eq!(ops[1].programmed_amount, 15_000_000.0);
        assert_eq!(ops[1].financial_instrument_category.as_deref(), Some("Prêt"));
        assert_eq!(ops[1].duration_months, 24);
        assert_eq!(ops[1].tier, Tier::LargeScale);
        assert_eq!(ops[1].end_date, NaiveDate::from_ymd_opt(2019, 3, 1).unwrap());
    }

    #[test]
    fn counts_rejected_rows() {
        let file = write_csv(&[
            "IEJ,Emploi,Associations,Bretagne,10,10,False,,1,2016-01-04,2016-02-04,P1",
            "FSE,Emploi,Associations,Bretagne,-5,10,False,,1,2016-01-04,2016-02-04,P1",
            "FSE,Emploi,Associations,Bretagne,5,10,False,,1,,2016-02-04,P1",
            "FSE,Emploi,Associations,Bretagne,5,,False,Garantie,1,2016-01-04,,P1",
        ]);
        let (ops, report) = load_operations(file.path().to_str().unwrap()).unwrap();

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.skipped_funds, 1);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(ops.len(), 1);
        // Missing end date and eligible total fall back; category dropped without the flag.
        assert_eq!(ops[0].end_date, ops[0].start_date);
        assert_eq!(ops[0].total_eligible_expenditure, 5.0);
        assert_eq!(ops[0].financial_instrument_category, None);
    }

    #[test]
    fn rows_without_a_known_tier_are_rejected() {
        let file = write_csv(&[
            "FSE,Emploi,Associations,Bretagne,10,10,False,,1,2016-01-04,2016-02-04,",
            "FSE,Emploi,Associations,Bretagne,10,10,False,,1,2016-01-04,2016-02-04,P3",
            "FEDER,Transport,Communes,Corse,10,10,False,,1,2016-01-04,2016-02-04,p2",
        ]);
        let (ops, report) = load_operations(file.path().to_str().unwrap()).unwrap();

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(report.loaded_rows, 1);
        assert_eq!(ops[0].fund, Fund::Feder);
        assert_eq!(ops[0].tier, Tier::LargeScale);
    }

    #[test]
    fn semicolon_exports_are_detected() {
        let file = write_csv_with(
            ';',
            &["FSE;Formation;Régions;Normandie;100;200;False;;6;01/09/2015;01/03/2016;P1"],
        );

        let (ops, report) = load_operations(file.path().to_str().unwrap()).unwrap();
        assert_eq!(report.loaded_rows, 1);
        assert_eq!(ops[0].region, "Normandie");
        assert_eq!(ops[0].start_date, NaiveDate::from_ymd_opt(2015, 9, 1).unwrap());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_operations("/definitely/not/here.csv"),
            Err(LoadError::Io(_))
        ));
    }
}
