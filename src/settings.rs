use crate::crosstab::CrossTabBuilder;
use crate::error::{EngineResult, SettingsError};
use crate::rank_curve::RankAxis;
use crate::tiers::{Boundary, TierClassifier};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "cohesion.toml";

const THEMES: [&str; 15] = [
    "Indéterminé",
    "Insertion",
    "Emploi",
    "Formation",
    "Subventions de fonctionnement des entreprises (compensation de surcoûts)",
    "Financement des entreprises",
    "Investissements des entreprises",
    "Recherche et innovation",
    "Haut débit et très haut débit",
    "Transport",
    "Logement",
    "Énergie",
    "Environnement",
    "Infrastructures sportives, culturelles et éducatives",
    "Gestion administrative (assistance technique)",
];

const BENEFICIARY_CATEGORIES: [&str; 14] = [
    "Associations",
    "Autres établissements publics",
    "Chambres consulaires et groupements d'entreprises",
    "Communes",
    "Départements",
    "Entreprises",
    "Formation continue et enseignement hors supérieur",
    "État",
    "Logement social",
    "Missions locales emploi et insertion",
    "Organismes de soutien à l'entrepreneuriat",
    "Régions",
    "Établissements de recherche et d'enseignement supérieur",
    "Bénéficiaires de type indéterminé",
];

/// Run configuration, read from `cohesion.toml`.
///
/// Every field has a default, so a partial file (or no file at all) is valid.
/// The canonical orderings live here rather than in the engine so they can be
/// swapped per dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Operations CSV to load.
    pub data_path: String,
    /// Directory receiving the CSV and JSON outputs.
    pub output_dir: String,
    /// Programmed amount above which a non-instrument operation counts as very large.
    pub large_operation_threshold: f64,
    pub indeterminate_theme: String,
    pub indeterminate_beneficiary: String,
    /// Canonical theme ordering (cross-tab rows).
    pub themes: Vec<String>,
    /// Canonical beneficiary ordering (cross-tab columns).
    pub beneficiary_categories: Vec<String>,
    pub rank_curve: RankCurveSettings,
    pub tiers: TierSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RankCurveSettings {
    /// Leave the top-amount operation off the curve, as the published chart did.
    pub legacy_drop_top: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierSettings {
    /// Recompute tiers from amounts instead of trusting the `Palier` column.
    pub derive: bool,
    pub quantile: f64,
    pub boundary: Boundary,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            derive: false,
            quantile: 0.9,
            boundary: Boundary::Exclusive,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: "france-2014-2020-feder-fse.csv".to_string(),
            output_dir: ".".to_string(),
            large_operation_threshold: 10_000_000.0,
            indeterminate_theme: THEMES[0].to_string(),
            indeterminate_beneficiary: BENEFICIARY_CATEGORIES[13].to_string(),
            themes: THEMES.iter().map(|s| s.to_string()).collect(),
            beneficiary_categories: BENEFICIARY_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            rank_curve: RankCurveSettings::default(),
            tiers: TierSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &str) -> Result<Self, SettingsError> {
        if !Path::new(path).exists() {
            info!(path, "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_string(),
            source,
        })?;
        let settings = Self::from_toml_str(&content)?;
        info!(path, "configuration loaded");
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.themes.is_empty() || self.beneficiary_categories.is_empty() {
            return Err(SettingsError::Invalid(
                "canonical orderings must not be empty".to_string(),
            ));
        }
        if !self.themes.contains(&self.indeterminate_theme) {
            return Err(SettingsError::Invalid(format!(
                "indeterminate theme '{}' is not in the theme ordering",
                self.indeterminate_theme
            )));
        }
        if !self.beneficiary_categories.contains(&self.indeterminate_beneficiary) {
            return Err(SettingsError::Invalid(format!(
                "indeterminate beneficiary '{}' is not in the beneficiary ordering",
                self.indeterminate_beneficiary
            )));
        }
        if !(self.tiers.quantile > 0.0 && self.tiers.quantile < 1.0) {
            return Err(SettingsError::Invalid(format!(
                "tier quantile must be in (0, 1), got {}",
                self.tiers.quantile
            )));
        }
        if self.large_operation_threshold < 0.0 {
            return Err(SettingsError::Invalid(
                "large operation threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn crosstab_builder(&self) -> EngineResult<CrossTabBuilder> {
        CrossTabBuilder::new(self.themes.clone(), self.beneficiary_categories.clone())
    }

    pub fn rank_axis(&self) -> RankAxis {
        if self.rank_curve.legacy_drop_top {
            RankAxis::DropTop
        } else {
            RankAxis::Full
        }
    }

    pub fn tier_classifier(&self) -> EngineResult<TierClassifier> {
        TierClassifier::new(self.tiers.quantile, self.tiers.boundary)
    }
}
