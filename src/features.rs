//! Top-N suburb selection and per-record derived columns.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use time::Date;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{Dataset, RawTable, Transaction, SALE_DATE_FMT};
use crate::error::Result;
use crate::stats::median;

/// Columns appended to the cleaned schema in the analysis table.
pub const DERIVED_COLUMNS: [&str; 9] = [
    "Year",
    "Month",
    "Quarter",
    "PropertyType",
    "Price_per_room",
    "Price_per_sqm",
    "Suburb_Median",
    "Price_Deviation",
    "Price_Flag",
];

/// A calendar quarter; orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u8,
}

impl Quarter {
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            quarter: (u8::from(date.month()) - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceFlag {
    Underpriced,
    Overpriced,
}

impl PriceFlag {
    pub fn classify(deviation: f64, config: &PipelineConfig) -> Option<Self> {
        if deviation <= config.underpriced_threshold {
            Some(Self::Underpriced)
        } else if deviation >= config.overpriced_threshold {
            Some(Self::Overpriced)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Underpriced => "underpriced",
            Self::Overpriced => "overpriced",
        }
    }
}

/// Values derived for one analysis record.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub year: i32,
    pub month: u8,
    pub quarter: Quarter,
    /// `None` when the record has no rooms.
    pub price_per_room: Option<f64>,
    /// Price per m² of land.
    pub price_per_sqm: Option<f64>,
    pub suburb_median: f64,
    /// `(price - suburb_median) / suburb_median`.
    pub price_deviation: f64,
    pub flag: Option<PriceFlag>,
}

impl Features {
    fn cells(&self, t: &Transaction) -> Vec<String> {
        vec![
            self.year.to_string(),
            self.month.to_string(),
            self.quarter.to_string(),
            t.property_type.label().to_string(),
            self.price_per_room.map(|v| format!("{v:.2}")).unwrap_or_default(),
            self.price_per_sqm.map(|v| format!("{v:.2}")).unwrap_or_default(),
            self.suburb_median.to_string(),
            format!("{:.4}", self.price_deviation),
            self.flag.map(PriceFlag::as_str).unwrap_or_default().to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuburbVolume {
    pub suburb: String,
    pub count: usize,
}

/// The `n` suburbs with the most transactions, busiest first.
///
/// Equal volumes are ordered by suburb name, ascending.
pub fn top_suburbs(transactions: &[Transaction], n: usize) -> Vec<SuburbVolume> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in transactions {
        *counts.entry(t.suburb.as_str()).or_default() += 1;
    }
    let mut volumes: Vec<SuburbVolume> = counts
        .into_iter()
        .map(|(suburb, count)| SuburbVolume {
            suburb: suburb.to_string(),
            count,
        })
        .collect();
    volumes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.suburb.cmp(&b.suburb)));
    volumes.truncate(n);
    volumes
}

/// Median price per suburb.
pub fn suburb_medians(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut prices: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for t in transactions {
        prices.entry(t.suburb.as_str()).or_default().push(t.price);
    }
    prices
        .into_iter()
        .filter_map(|(suburb, p)| median(&p).map(|m| (suburb.to_string(), m)))
        .collect()
}

/// Derive features for every transaction, using medians over `transactions`
/// itself.
pub fn derive_features(transactions: &[Transaction], config: &PipelineConfig) -> Vec<Features> {
    let medians = suburb_medians(transactions);
    transactions
        .iter()
        .map(|t| {
            // Every suburb present has a median; fall back to the record's own
            // price so the deviation is zero.
            let suburb_median = medians.get(&t.suburb).copied().unwrap_or(t.price);
            let price_deviation = (t.price - suburb_median) / suburb_median;
            Features {
                year: t.sale_date.year(),
                month: u8::from(t.sale_date.month()),
                quarter: Quarter::of(t.sale_date),
                price_per_room: (t.rooms > 0).then(|| t.price / f64::from(t.rooms)),
                price_per_sqm: (t.landsize > 0.0).then(|| t.price / t.landsize),
                suburb_median,
                price_deviation,
                flag: PriceFlag::classify(price_deviation, config),
            }
        })
        .collect()
}

/// The top-N subset of the cleaned dataset with derived columns.
#[derive(Debug, Clone)]
pub struct AnalysisTable {
    pub dataset: Dataset,
    pub features: Vec<Features>,
}

impl AnalysisTable {
    pub fn records(&self) -> impl Iterator<Item = (&Transaction, &Features)> {
        self.dataset.transactions.iter().zip(self.features.iter())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        self.dataset
            .write_csv_with(file_path, &DERIVED_COLUMNS, |i, t| Ok(self.features[i].cells(t)))
    }

    /// Load an analysis table written by [`AnalysisTable::write_csv`].
    ///
    /// Derived columns in the file are ignored and recomputed from the base
    /// columns.
    pub fn read<P: AsRef<Path>>(file_path: P, config: &PipelineConfig) -> Result<Self> {
        let raw = RawTable::read(file_path)?.without_columns(&DERIVED_COLUMNS);
        let (dataset, malformed) = Dataset::from_raw(raw)?;
        if malformed > 0 {
            warn!("{} malformed rows dropped from analysis table", malformed);
        }
        let features = derive_features(&dataset.transactions, config);
        Ok(Self { dataset, features })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSummary {
    pub input_rows: usize,
    pub analysis_rows: usize,
    pub top_suburbs: Vec<SuburbVolume>,
    pub first_sale: Option<Date>,
    pub last_sale: Option<Date>,
    pub underpriced: usize,
    pub overpriced: usize,
}

impl fmt::Display for FeatureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feature Summary:")?;
        writeln!(f, "  Input rows: {}", self.input_rows)?;
        if let (Some(first), Some(last)) = (self.first_sale, self.last_sale) {
            writeln!(
                f,
                "  Date range: {} to {}",
                first.format(SALE_DATE_FMT).map_err(|_| fmt::Error)?,
                last.format(SALE_DATE_FMT).map_err(|_| fmt::Error)?
            )?;
        }
        writeln!(f, "  Top {} suburbs by volume:", self.top_suburbs.len())?;
        for (rank, v) in self.top_suburbs.iter().enumerate() {
            writeln!(f, "    {}. {}: {} transactions", rank + 1, v.suburb, v.count)?;
        }
        let share = if self.input_rows == 0 {
            0.0
        } else {
            self.analysis_rows as f64 / self.input_rows as f64 * 100.0
        };
        writeln!(
            f,
            "  Analysis rows: {} ({:.1}% of data)",
            self.analysis_rows, share
        )?;
        writeln!(f, "  Underpriced: {}", self.underpriced)?;
        write!(f, "  Overpriced: {}", self.overpriced)
    }
}

/// Restrict `cleaned` to its top-N suburbs and derive features.
pub fn build_analysis(
    cleaned: &Dataset,
    config: &PipelineConfig,
) -> (AnalysisTable, FeatureSummary) {
    let top = top_suburbs(&cleaned.transactions, config.top_n);
    let selected: Vec<Transaction> = cleaned
        .transactions
        .iter()
        .filter(|t| top.iter().any(|v| v.suburb == t.suburb))
        .cloned()
        .collect();
    let features = derive_features(&selected, config);
    let count_flag = |flag: PriceFlag| features.iter().filter(|f| f.flag == Some(flag)).count();

    let summary = FeatureSummary {
        input_rows: cleaned.len(),
        analysis_rows: selected.len(),
        first_sale: cleaned.transactions.iter().map(|t| t.sale_date).min(),
        last_sale: cleaned.transactions.iter().map(|t| t.sale_date).max(),
        underpriced: count_flag(PriceFlag::Underpriced),
        overpriced: count_flag(PriceFlag::Overpriced),
        top_suburbs: top,
    };
    info!(
        suburbs = summary.top_suburbs.len(),
        rows = summary.analysis_rows,
        underpriced = summary.underpriced,
        overpriced = summary.overpriced,
        "Built analysis subset"
    );
    (
        AnalysisTable {
            dataset: cleaned.with_transactions(selected),
            features,
        },
        summary,
    )
}
