use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Co-financing fund of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fund {
    #[serde(rename = "FEDER")]
    Feder,
    #[serde(rename = "FSE")]
    Fse,
}

impl Fund {
    pub const ALL: [Fund; 2] = [Fund::Feder, Fund::Fse];

    pub fn parse(s: &str) -> Option<Fund> {
        match s.trim().to_uppercase().as_str() {
            "FEDER" => Some(Fund::Feder),
            "FSE" => Some(Fund::Fse),
            _ => None,
        }
    }
}

impl fmt::Display for Fund {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fund::Feder => write!(f, "FEDER"),
            Fund::Fse => write!(f, "FSE"),
        }
    }
}

/// Size class of an operation. `P1` in the source data is ordinary, `P2` large-scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Ordinary,
    LargeScale,
}

impl Tier {
    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_uppercase().as_str() {
            "P1" => Some(Tier::Ordinary),
            "P2" => Some(Tier::LargeScale),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Ordinary => write!(f, "courant"),
            Tier::LargeScale => write!(f, "d'ampleur"),
        }
    }
}

/// One row of the source operations file, untyped.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Fonds")]
    pub fund: Option<String>,
    #[serde(rename = "themeprojet")]
    pub theme: Option<String>,
    #[serde(rename = "catbeneficiaire")]
    pub beneficiary_category: Option<String>,
    #[serde(rename = "Région de l'opération")]
    pub region: Option<String>,
    #[serde(rename = "Montant UE programmé")]
    pub programmed_amount: Option<String>,
    #[serde(rename = "Total des dépenses éligibles")]
    pub total_eligible_expenditure: Option<String>,
    #[serde(rename = "Instrument financier ?")]
    pub is_financial_instrument: Option<String>,
    #[serde(rename = "Catégorie d'instrument financier")]
    pub financial_instrument_category: Option<String>,
    #[serde(rename = "Durée, en mois")]
    pub duration_months: Option<String>,
    #[serde(rename = "Date de début de l'opération")]
    pub start_date: Option<String>,
    #[serde(rename = "Date de fin de l'opération")]
    pub end_date: Option<String>,
    #[serde(rename = "Palier")]
    pub tier: Option<String>,
}

/// A co-financed operation, typed and immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub fund: Fund,
    pub theme: String,
    pub beneficiary_category: String,
    pub region: String,
    pub programmed_amount: f64,
    pub total_eligible_expenditure: f64,
    pub is_financial_instrument: bool,
    pub financial_instrument_category: Option<String>,
    pub duration_months: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub tier: Tier,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CurvePointRow {
    #[serde(rename = "Fund")]
    #[tabled(rename = "Fund")]
    pub fund: String,
    #[serde(rename = "Point")]
    #[tabled(rename = "Point")]
    pub point: usize,
    #[serde(rename = "OperationsShare")]
    #[tabled(rename = "OperationsShare")]
    pub operations_share: String,
    #[serde(rename = "AmountShare")]
    #[tabled(rename = "AmountShare")]
    pub amount_share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ThemeBeneficiaryRow {
    #[serde(rename = "Theme")]
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[serde(rename = "BeneficiaryCategory")]
    #[tabled(rename = "BeneficiaryCategory")]
    pub beneficiary_category: String,
    #[serde(rename = "ProgrammedAmount")]
    #[tabled(rename = "ProgrammedAmount")]
    pub amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UsageProfileRow {
    #[serde(rename = "BeneficiaryCategory")]
    #[tabled(rename = "BeneficiaryCategory")]
    pub beneficiary_category: String,
    #[serde(rename = "Theme")]
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TierMixRow {
    #[serde(rename = "Fund")]
    #[tabled(rename = "Fund")]
    pub fund: String,
    #[serde(rename = "Tier")]
    #[tabled(rename = "Tier")]
    pub tier: String,
    #[serde(rename = "BeneficiaryCategory")]
    #[tabled(rename = "BeneficiaryCategory")]
    pub beneficiary_category: String,
    #[serde(rename = "Operations")]
    #[tabled(rename = "Operations")]
    pub operations: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LargeOperationRow {
    #[serde(rename = "Theme")]
    #[tabled(rename = "Theme")]
    pub theme: String,
    #[serde(rename = "Operations")]
    #[tabled(rename = "Operations")]
    pub operations: usize,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
    #[serde(rename = "MeanAmount")]
    #[tabled(rename = "MeanAmount")]
    pub mean_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct InstrumentRow {
    #[serde(rename = "InstrumentCategory")]
    #[tabled(rename = "InstrumentCategory")]
    pub category: String,
    #[serde(rename = "Instruments")]
    #[tabled(rename = "Instruments")]
    pub instruments: usize,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DurationRow {
    #[serde(rename = "Fund")]
    #[tabled(rename = "Fund")]
    pub fund: String,
    #[serde(rename = "Duration")]
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Operations")]
    #[tabled(rename = "Operations")]
    pub operations: usize,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RhythmRow {
    #[serde(rename = "Fund")]
    #[tabled(rename = "Fund")]
    pub fund: String,
    #[serde(rename = "StartYear")]
    #[tabled(rename = "StartYear")]
    pub start_year: i32,
    #[serde(rename = "Operations")]
    #[tabled(rename = "Operations")]
    pub operations: usize,
    #[serde(rename = "ProgrammedAmount")]
    #[tabled(rename = "ProgrammedAmount")]
    pub amount: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FundSummary {
    pub fund: Fund,
    pub operations: usize,
    pub programmed_total: f64,
    pub mean_programmed: f64,
    pub cofinancing_rate: f64,
    pub tier_threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_operations: usize,
    pub total_programmed: f64,
    pub funds: Vec<FundSummary>,
    pub large_operations: usize,
    pub large_operations_share: f64,
    pub large_operations_amount_share: f64,
    pub financial_instruments: usize,
    pub financial_instruments_total: f64,
}
