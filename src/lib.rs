//! Aggregation engine for FEDER/FSE co-financed operations and the report
//! tables built on top of it.
//!
//! The engine modules (`crosstab`, `rank_curve`, `groups`, `share`, `tiers`)
//! are pure functions over an in-memory slice of [`types::Operation`]s.
//! `loader`, `reports` and `output` wrap them into the CSV-in, CSV-out tool.
pub mod crosstab;
pub mod error;
pub mod groups;
pub mod loader;
pub mod logging;
pub mod output;
pub mod rank_curve;
pub mod reports;
pub mod settings;
pub mod share;
pub mod tiers;
pub mod types;
pub mod util;

pub use crosstab::{CrossTab, CrossTabBuilder};
pub use error::{EngineError, EngineResult};
pub use groups::{GroupSummarizer, GroupSummary};
pub use rank_curve::{RankAxis, RankCurve, RankCurveBuilder};
pub use settings::Settings;
pub use tiers::TierClassifier;
pub use types::{Fund, Operation, Tier};
