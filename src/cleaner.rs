use std::fmt;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dataset::{Dataset, RawTable};
use crate::error::Result;

/// Row counts and completeness before and after cleaning.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleaningSummary {
    pub initial_rows: usize,
    pub malformed_rows: usize,
    pub removed_invalid_landsize: usize,
    pub suburb_name_fixes: usize,
    pub final_rows: usize,
    pub removed_rows: usize,
    pub initial_completeness_pct: f64,
    pub final_completeness_pct: f64,
}

impl fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cleaning Summary:")?;
        writeln!(f, "  Initial rows: {}", self.initial_rows)?;
        writeln!(f, "  Final rows: {}", self.final_rows)?;
        writeln!(
            f,
            "  Removed: {} ({} malformed, {} invalid landsize)",
            self.removed_rows, self.malformed_rows, self.removed_invalid_landsize
        )?;
        writeln!(f, "  Suburb names fixed: {}", self.suburb_name_fixes)?;
        write!(
            f,
            "  Completeness: {:.1}% -> {:.1}%",
            self.initial_completeness_pct, self.final_completeness_pct
        )
    }
}

/// Parse, canonicalize and filter the raw snapshot.
///
/// Steps, in order:
/// 1. drop rows that fail to parse;
/// 2. canonicalize suburb names;
/// 3. drop rows whose land size falls outside the configured bounds;
/// 4. default missing car spaces to 0.
///
/// Fails only when a required column is missing.
pub fn clean(raw: RawTable, config: &PipelineConfig) -> Result<(Dataset, CleaningSummary)> {
    let initial_rows = raw.rows.len() + raw.undecodable_rows;
    let initial_completeness_pct = round1(raw.completeness_pct());

    let (parsed, malformed_rows) = Dataset::from_raw(raw)?;

    let mut suburb_name_fixes = 0;
    let mut removed_invalid_landsize = 0;
    let Dataset {
        headers,
        columns,
        transactions,
    } = parsed;
    let mut kept = Vec::with_capacity(transactions.len());
    for mut t in transactions {
        let canonical = config.canonicalizer.canonicalize(&t.suburb);
        if canonical != t.suburb {
            debug!("Suburb {:?} -> {:?}", t.suburb, canonical);
            suburb_name_fixes += 1;
            t.suburb = canonical;
        }
        if !config.landsize_in_bounds(t.landsize) {
            removed_invalid_landsize += 1;
            continue;
        }
        t.car = Some(t.car.unwrap_or(0));
        kept.push(t);
    }

    let cleaned = Dataset {
        headers,
        columns,
        transactions: kept,
    };
    let final_rows = cleaned.len();
    let summary = CleaningSummary {
        initial_rows,
        malformed_rows,
        removed_invalid_landsize,
        suburb_name_fixes,
        final_rows,
        removed_rows: initial_rows - final_rows,
        initial_completeness_pct,
        final_completeness_pct: round1(cleaned.completeness_pct()?),
    };
    info!(
        initial = summary.initial_rows,
        kept = summary.final_rows,
        malformed = summary.malformed_rows,
        invalid_landsize = summary.removed_invalid_landsize,
        "Cleaned dataset"
    );
    Ok((cleaned, summary))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
