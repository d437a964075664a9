use crate::crosstab::CrossTab;
use crate::error::EngineResult;
use crate::groups::GroupSummarizer;
use crate::rank_curve::{RankAxis, RankCurveBuilder};
use crate::settings::Settings;
use crate::share::{count_share, share};
use crate::tiers::TierClassifier;
use crate::types::{
    CurvePointRow, DurationRow, Fund, FundSummary, InstrumentRow, LargeOperationRow, Operation,
    RhythmRow, SummaryStats, ThemeBeneficiaryRow, Tier, TierMixRow, UsageProfileRow,
};
use crate::util::{format_number, format_share};
use chrono::Datelike;
use std::borrow::Cow;
use tracing::info;

pub const DURATION_BUCKETS: [&str; 4] = [
    "moins d'un an",
    "entre un et deux ans",
    "entre deux et trois ans",
    "plus de trois ans",
];

pub const UNSPECIFIED_INSTRUMENT: &str = "Non renseigné";

pub fn duration_bucket(months: u32) -> &'static str {
    match months {
        0..=11 => DURATION_BUCKETS[0],
        12..=23 => DURATION_BUCKETS[1],
        24..=35 => DURATION_BUCKETS[2],
        _ => DURATION_BUCKETS[3],
    }
}

/// Every table of one report-generation pass.
#[derive(Debug)]
pub struct ReportSet {
    pub concentration: Vec<CurvePointRow>,
    pub theme_beneficiary: Vec<ThemeBeneficiaryRow>,
    pub usage_profile: Vec<UsageProfileRow>,
    pub tier_mix: Vec<TierMixRow>,
    pub large_operations: Vec<LargeOperationRow>,
    pub instruments: Vec<InstrumentRow>,
    pub durations: Vec<DurationRow>,
    pub rhythm: Vec<RhythmRow>,
    pub summary: SummaryStats,
}

/// Run every aggregation over one snapshot. The first failure aborts the pass.
pub fn generate_all(data: &[Operation], settings: &Settings) -> EngineResult<ReportSet> {
    let data: Cow<'_, [Operation]> = if settings.tiers.derive {
        Cow::Owned(settings.tier_classifier()?.classify(data)?)
    } else {
        Cow::Borrowed(data)
    };
    let data = data.as_ref();

    let crosstab = settings.crosstab_builder()?.build(
        data,
        |op| op.programmed_amount,
        |op| op.theme.as_str(),
        |op| op.beneficiary_category.as_str(),
    )?;

    let reports = ReportSet {
        concentration: concentration_report(data, settings.rank_axis())?,
        theme_beneficiary: theme_beneficiary_report(&crosstab, &settings.indeterminate_theme)?,
        usage_profile: usage_profile_report(&crosstab)?,
        tier_mix: tier_mix_report(data, &settings.indeterminate_beneficiary)?,
        large_operations: large_operations_report(data, settings)?,
        instruments: instruments_report(data)?,
        durations: duration_report(data)?,
        rhythm: rhythm_report(data)?,
        summary: generate_summary(data, settings)?,
    };
    info!(operations = data.len(), "reports generated");
    Ok(reports)
}

pub fn concentration_report(
    data: &[Operation],
    axis: RankAxis,
) -> EngineResult<Vec<CurvePointRow>> {
    let builder = RankCurveBuilder::new(axis);
    let mut rows = Vec::new();
    for fund in Fund::ALL {
        let curve = builder.build(data, fund)?;
        rows.extend(curve.points().enumerate().map(|(i, (ops, amount))| CurvePointRow {
            fund: fund.to_string(),
            point: i + 1,
            operations_share: format_share(ops),
            amount_share: format_share(amount),
        }));
    }
    Ok(rows)
}

/// Amounts by theme and beneficiary with the indeterminate theme removed.
pub fn theme_beneficiary_report(
    crosstab: &CrossTab,
    indeterminate_theme: &str,
) -> EngineResult<Vec<ThemeBeneficiaryRow>> {
    let trimmed = crosstab.excluding_row(indeterminate_theme)?;
    Ok(trimmed
        .iter_cells()
        .map(|(theme, category, amount)| ThemeBeneficiaryRow {
            theme: theme.to_string(),
            beneficiary_category: category.to_string(),
            amount: format_number(amount, 2),
        })
        .collect())
}

/// For each beneficiary category, how its funds split across themes.
pub fn usage_profile_report(crosstab: &CrossTab) -> EngineResult<Vec<UsageProfileRow>> {
    let mut rows = Vec::new();
    for category in crosstab.columns() {
        let shares = crosstab.column_shares(category)?;
        rows.extend(
            crosstab
                .rows()
                .iter()
                .zip(shares)
                .map(|(theme, s)| UsageProfileRow {
                    beneficiary_category: category.clone(),
                    theme: theme.clone(),
                    share: format_share(s),
                }),
        );
    }
    Ok(rows)
}

/// Share of each fund-tier's operations held by each beneficiary category.
pub fn tier_mix_report(
    data: &[Operation],
    indeterminate_beneficiary: &str,
) -> EngineResult<Vec<TierMixRow>> {
    let summarizer = GroupSummarizer::natural("beneficiary category");
    let mut rows = Vec::new();
    for fund in Fund::ALL {
        for tier in [Tier::Ordinary, Tier::LargeScale] {
            let subset: Vec<&Operation> = data
                .iter()
                .filter(|op| {
                    op.fund == fund
                        && op.tier == tier
                        && op.beneficiary_category != indeterminate_beneficiary
                })
                .collect();
            if subset.is_empty() {
                continue;
            }
            let groups = summarizer.count(subset.iter().copied(), |op| {
                op.beneficiary_category.clone()
            })?;
            for g in groups {
                let s = count_share(g.count, subset.len(), "tier mix")?;
                rows.push(TierMixRow {
                    fund: fund.to_string(),
                    tier: tier.to_string(),
                    beneficiary_category: g.key,
                    operations: g.count,
                    share: format_share(s),
                });
            }
        }
    }
    Ok(rows)
}

fn is_large_operation(op: &Operation, threshold: f64) -> bool {
    op.programmed_amount > threshold && !op.is_financial_instrument
}

/// Very large non-instrument operations, summarized per theme.
pub fn large_operations_report(
    data: &[Operation],
    settings: &Settings,
) -> EngineResult<Vec<LargeOperationRow>> {
    let large = data
        .iter()
        .filter(|op| is_large_operation(op, settings.large_operation_threshold));
    let groups = GroupSummarizer::canonical("theme", &settings.themes).summarize(
        large,
        |op| op.theme.clone(),
        |op| op.programmed_amount,
        |op| op.total_eligible_expenditure,
    )?;
    Ok(groups
        .into_iter()
        .map(|g| LargeOperationRow {
            theme: g.key,
            operations: g.count,
            total_amount: format_number(g.sum, 2),
            mean_amount: format_number(g.mean, 2),
        })
        .collect())
}

pub fn instruments_report(data: &[Operation]) -> EngineResult<Vec<InstrumentRow>> {
    let instruments = data.iter().filter(|op| op.is_financial_instrument);
    let groups = GroupSummarizer::natural("instrument category").summarize(
        instruments,
        |op| {
            op.financial_instrument_category
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_INSTRUMENT.to_string())
        },
        |op| op.programmed_amount,
        |op| op.total_eligible_expenditure,
    )?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let mut sums: Vec<f64> = groups.iter().map(|g| g.sum).collect();
    let total = crate::util::stable_sum(&mut sums);
    groups
        .into_iter()
        .map(|g| {
            Ok(InstrumentRow {
                share: format_share(share(g.sum, total, "financial instruments")?),
                category: g.key,
                instruments: g.count,
                total_amount: format_number(g.sum, 2),
            })
        })
        .collect()
}

pub fn duration_report(data: &[Operation]) -> EngineResult<Vec<DurationRow>> {
    let buckets: Vec<String> = DURATION_BUCKETS.iter().map(|b| b.to_string()).collect();
    let summarizer = GroupSummarizer::canonical("duration", &buckets);
    let mut rows = Vec::new();
    for fund in Fund::ALL {
        let subset: Vec<&Operation> = data.iter().filter(|op| op.fund == fund).collect();
        if subset.is_empty() {
            continue;
        }
        let groups = summarizer.count(subset.iter().copied(), |op| {
            duration_bucket(op.duration_months).to_string()
        })?;
        for g in groups {
            rows.push(DurationRow {
                fund: fund.to_string(),
                duration: g.key,
                operations: g.count,
                share: format_share(count_share(g.count, subset.len(), "duration profile")?),
            });
        }
    }
    Ok(rows)
}

/// Operations and amounts by start year, per fund.
pub fn rhythm_report(data: &[Operation]) -> EngineResult<Vec<RhythmRow>> {
    let summarizer = GroupSummarizer::natural("start year");
    let mut rows = Vec::new();
    for fund in Fund::ALL {
        let groups = summarizer.summarize(
            data.iter().filter(|op| op.fund == fund),
            |op| op.start_date.year(),
            |op| op.programmed_amount,
            |_| 0.0,
        )?;
        rows.extend(groups.into_iter().map(|g| RhythmRow {
            fund: fund.to_string(),
            start_year: g.key,
            operations: g.count,
            amount: format_number(g.sum, 2),
        }));
    }
    Ok(rows)
}

pub fn generate_summary(data: &[Operation], settings: &Settings) -> EngineResult<SummaryStats> {
    let per_fund = GroupSummarizer::natural("fund").summarize(
        data,
        |op| op.fund,
        |op| op.programmed_amount,
        |op| op.total_eligible_expenditure,
    )?;
    let classifier: TierClassifier = settings.tier_classifier()?;
    let thresholds = classifier.thresholds(data)?;

    let mut funds = Vec::with_capacity(per_fund.len());
    for g in &per_fund {
        let context = format!("{} co-financing rate", g.key);
        let tier_threshold = thresholds
            .iter()
            .find(|(f, _)| *f == g.key)
            .map(|(_, t)| *t)
            .unwrap_or_default();
        funds.push(FundSummary {
            fund: g.key,
            operations: g.count,
            programmed_total: g.sum,
            mean_programmed: g.mean,
            cofinancing_rate: share(g.sum, g.secondary_sum, &context)?,
            tier_threshold,
        });
    }

    let mut amounts: Vec<f64> = data.iter().map(|op| op.programmed_amount).collect();
    let total_programmed = crate::util::stable_sum(&mut amounts);

    let large: Vec<&Operation> = data
        .iter()
        .filter(|op| is_large_operation(op, settings.large_operation_threshold))
        .collect();
    let mut large_amounts: Vec<f64> = large.iter().map(|op| op.programmed_amount).collect();
    let large_total = crate::util::stable_sum(&mut large_amounts);

    let mut instrument_amounts: Vec<f64> = data
        .iter()
        .filter(|op| op.is_financial_instrument)
        .map(|op| op.programmed_amount)
        .collect();
    let financial_instruments = instrument_amounts.len();

    Ok(SummaryStats {
        total_operations: data.len(),
        total_programmed,
        funds,
        large_operations: large.len(),
        large_operations_share: count_share(large.len(), data.len(), "large operations")?,
        large_operations_amount_share: share(large_total, total_programmed, "large amounts")?,
        financial_instruments,
        financial_instruments_total: crate::util::stable_sum(&mut instrument_amounts),
    })
}
