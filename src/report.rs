//! CSV report tables and the console report.
//!
//! Money is rounded to whole dollars, ratios are written as percentages with
//! one decimal, and undefined ratios as [`INSUFFICIENT_DATA`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::dataset::ensure_parent;
use crate::error::{PipelineError, Result};
use crate::insights::InsightReport;

pub const INSUFFICIENT_DATA: &str = "insufficient data";

pub const SUBURB_SUMMARY_FILE: &str = "suburb_summary.csv";
pub const VALUE_GAPS_FILE: &str = "value_gaps.csv";
pub const PROPERTY_TYPE_PREMIUM_FILE: &str = "property_type_premium.csv";
pub const BEDROOM_PREMIUM_FILE: &str = "bedroom_premium.csv";
pub const QUARTERLY_TRENDS_FILE: &str = "quarterly_trends.csv";
pub const HEADLINE_FILE: &str = "headline.csv";

/// Format `value` with thousands separators and a fixed number of decimals.
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `$1,234,567`
pub fn format_money(value: f64) -> String {
    if value < 0.0 {
        format!("-${}", format_number(-value, 0))
    } else {
        format!("${}", format_number(value, 0))
    }
}

fn money_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.0}")).unwrap_or_default()
}

fn pct_cell(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}", r * 100.0),
        None => INSUFFICIENT_DATA.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct SuburbRow {
    suburb: String,
    transaction_count: usize,
    median_price: String,
    mean_price: String,
    median_price_per_sqm: String,
    median_rooms: f64,
    median_building_area: String,
    distance_to_cbd: String,
}

#[derive(Debug, Serialize)]
struct ValueGapRow {
    value_suburb: String,
    premium_suburb: String,
    value_median: String,
    premium_median: String,
    discount_pct: String,
}

#[derive(Debug, Serialize)]
struct TypePremiumRow {
    suburb: String,
    house_median: String,
    unit_median: String,
    townhouse_median: String,
    premium_pct: String,
}

#[derive(Debug, Serialize)]
struct BedroomRow {
    suburb: String,
    lower_median: String,
    upper_median: String,
    premium_pct: String,
}

#[derive(Debug, Serialize)]
struct QuarterRow {
    quarter: String,
    transaction_count: usize,
    median_price: String,
    mean_price: String,
    median_price_per_sqm: String,
}

#[derive(Debug, Serialize)]
struct HeadlineRow {
    metric: &'static str,
    value: String,
}

const SUBURB_SUMMARY_COLUMNS: &[&str] = &[
    "Suburb",
    "Transaction_Count",
    "Median_Price",
    "Mean_Price",
    "Median_Price_per_sqm",
    "Median_Rooms",
    "Median_BuildingArea",
    "Distance_to_CBD",
];
const VALUE_GAPS_COLUMNS: &[&str] = &[
    "Value_Suburb",
    "Premium_Suburb",
    "Value_Median",
    "Premium_Median",
    "Discount_Pct",
];
const PROPERTY_TYPE_PREMIUM_COLUMNS: &[&str] = &[
    "Suburb",
    "House_Median",
    "Unit_Median",
    "Townhouse_Median",
    "House_vs_Unit_Premium_Pct",
];
const BEDROOM_PREMIUM_COLUMNS: &[&str] = &[
    "Suburb",
    "Lower_Rooms_Median",
    "Upper_Rooms_Median",
    "Bedroom_Premium_Pct",
];
const QUARTERLY_TRENDS_COLUMNS: &[&str] = &[
    "Quarter",
    "Transaction_Count",
    "Median_Price",
    "Mean_Price",
    "Median_Price_per_sqm",
];
const HEADLINE_COLUMNS: &[&str] = &["Metric", "Value"];

/// Header is written explicitly so empty tables keep their shape.
fn write_rows<S: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: impl IntoIterator<Item = S>,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(ensure_parent(path)?)?;
    wtr.write_record(columns)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

/// Write every report table into `dir`, returning the paths written.
pub fn write_tables<P: AsRef<Path>>(report: &InsightReport, dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut written = Vec::new();

    let path = dir.join(SUBURB_SUMMARY_FILE);
    write_rows(
        &path,
        SUBURB_SUMMARY_COLUMNS,
        report.suburbs.iter().map(|s| SuburbRow {
            suburb: s.suburb.clone(),
            transaction_count: s.transaction_count,
            median_price: money_cell(Some(s.median_price)),
            mean_price: money_cell(Some(s.mean_price)),
            median_price_per_sqm: money_cell(s.median_price_per_sqm),
            median_rooms: s.median_rooms,
            median_building_area: s
                .median_building_area
                .map(|v| format!("{v:.1}"))
                .unwrap_or_default(),
            distance_to_cbd: s.distance_to_cbd.map(|v| v.to_string()).unwrap_or_default(),
        }),
    )?;
    written.push(path);

    let path = dir.join(VALUE_GAPS_FILE);
    write_rows(
        &path,
        VALUE_GAPS_COLUMNS,
        report.value_gaps.iter().map(|g| ValueGapRow {
            value_suburb: g.value_suburb.clone(),
            premium_suburb: g.premium_suburb.clone(),
            value_median: money_cell(g.value_median),
            premium_median: money_cell(g.premium_median),
            discount_pct: pct_cell(g.discount),
        }),
    )?;
    written.push(path);

    let path = dir.join(PROPERTY_TYPE_PREMIUM_FILE);
    write_rows(
        &path,
        PROPERTY_TYPE_PREMIUM_COLUMNS,
        report.type_premiums.iter().map(|p| TypePremiumRow {
            suburb: p.suburb.clone(),
            house_median: money_cell(p.house_median),
            unit_median: money_cell(p.unit_median),
            townhouse_median: money_cell(p.townhouse_median),
            premium_pct: pct_cell(p.premium),
        }),
    )?;
    written.push(path);

    let path = dir.join(BEDROOM_PREMIUM_FILE);
    write_rows(
        &path,
        BEDROOM_PREMIUM_COLUMNS,
        report.bedroom_premiums.iter().map(|b| BedroomRow {
            suburb: b.suburb.clone(),
            lower_median: money_cell(b.lower_median),
            upper_median: money_cell(b.upper_median),
            premium_pct: pct_cell(b.premium),
        }),
    )?;
    written.push(path);

    let path = dir.join(QUARTERLY_TRENDS_FILE);
    write_rows(
        &path,
        QUARTERLY_TRENDS_COLUMNS,
        report.quarterly.iter().map(|q| QuarterRow {
            quarter: q.quarter.to_string(),
            transaction_count: q.transaction_count,
            median_price: money_cell(Some(q.median_price)),
            mean_price: money_cell(Some(q.mean_price)),
            median_price_per_sqm: money_cell(q.median_price_per_sqm),
        }),
    )?;
    written.push(path);

    let h = &report.headline;
    let path = dir.join(HEADLINE_FILE);
    write_rows(
        &path,
        HEADLINE_COLUMNS,
        [
            ("Total_Properties", h.total_properties.to_string()),
            ("Suburbs_Analyzed", h.suburbs_analyzed.to_string()),
            ("Median_Price", money_cell(h.median_price)),
            ("Market_Growth_Pct", pct_cell(h.market_growth)),
            ("Underpriced", h.underpriced.to_string()),
            ("Overpriced", h.overpriced.to_string()),
        ]
        .into_iter()
        .map(|(metric, value)| HeadlineRow { metric, value }),
    )?;
    written.push(path);

    info!("Wrote {} report tables to {}", written.len(), dir.display());
    Ok(written)
}

fn whole_pct(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// The console report of top insights.
impl fmt::Display for InsightReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}\nINVESTMENT INSIGHTS\n{rule}")?;

        writeln!(f, "\n1. UNDERVALUED SUBURBS")?;
        for g in &self.value_gaps {
            match (g.value_median, g.discount) {
                (Some(price), Some(d)) => writeln!(
                    f,
                    "   {}: {} ({} below {})",
                    g.value_suburb,
                    format_money(price),
                    whole_pct(d),
                    g.premium_suburb
                )?,
                _ => writeln!(
                    f,
                    "   {} vs {}: {}",
                    g.value_suburb, g.premium_suburb, INSUFFICIENT_DATA
                )?,
            }
        }

        writeln!(f, "\n2. HOUSE VS UNIT PREMIUMS (Top 5)")?;
        for p in self.type_premiums.iter().take(5) {
            if let Some(premium) = p.premium {
                writeln!(f, "   {}: {} premium", p.suburb, whole_pct(premium))?;
            }
        }

        writeln!(f, "\n3. BEDROOM PREMIUMS (Top 5)")?;
        for b in self.bedroom_premiums.iter().take(5) {
            if let Some(premium) = b.premium {
                writeln!(
                    f,
                    "   {}: {} premium ({}BR vs {}BR)",
                    b.suburb,
                    whole_pct(premium),
                    b.upper_rooms,
                    b.lower_rooms
                )?;
            }
        }

        writeln!(f, "\n4. MARKET TREND")?;
        match (
            self.quarterly.first(),
            self.quarterly.last(),
            self.headline.market_growth,
        ) {
            (Some(first), Some(last), Some(growth)) => {
                writeln!(
                    f,
                    "   {} -> {}: {:+.0}% market growth",
                    first.quarter,
                    last.quarter,
                    growth * 100.0
                )?;
                writeln!(
                    f,
                    "   {} -> {}",
                    format_money(first.median_price),
                    format_money(last.median_price)
                )
            }
            _ => writeln!(f, "   {INSUFFICIENT_DATA}"),
        }
    }
}
