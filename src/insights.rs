//! Summary statistics over the analysis table.
//!
//! Every ratio is an `Option<f64>`: `None` means one side of the comparison
//! had no data, and is reported as "insufficient data".

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::info;

use crate::config::{PipelineConfig, SuburbComparison};
use crate::dataset::{PropertyType, Transaction};
use crate::features::{AnalysisTable, Features, PriceFlag, Quarter};
use crate::stats::{discount, mean, median, relative_change};

#[derive(Debug, Clone, PartialEq)]
pub struct SuburbSummary {
    pub suburb: String,
    pub transaction_count: usize,
    pub median_price: f64,
    pub mean_price: f64,
    pub median_price_per_sqm: Option<f64>,
    pub median_rooms: f64,
    /// Over records that have a building area only.
    pub median_building_area: Option<f64>,
    pub distance_to_cbd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueGap {
    pub value_suburb: String,
    pub premium_suburb: String,
    pub value_median: Option<f64>,
    pub premium_median: Option<f64>,
    /// `1 - value_median / premium_median`.
    pub discount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTypePremium {
    pub suburb: String,
    pub house_median: Option<f64>,
    pub unit_median: Option<f64>,
    pub townhouse_median: Option<f64>,
    /// `house_median / unit_median - 1`.
    pub premium: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BedroomPremium {
    pub suburb: String,
    pub lower_rooms: u32,
    pub upper_rooms: u32,
    pub lower_median: Option<f64>,
    pub upper_median: Option<f64>,
    /// `upper_median / lower_median - 1`.
    pub premium: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterlyTrend {
    pub quarter: Quarter,
    pub transaction_count: usize,
    pub median_price: f64,
    pub mean_price: f64,
    pub median_price_per_sqm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Headline {
    pub total_properties: usize,
    pub suburbs_analyzed: usize,
    pub median_price: Option<f64>,
    pub market_growth: Option<f64>,
    pub underpriced: usize,
    pub overpriced: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightReport {
    pub headline: Headline,
    pub suburbs: Vec<SuburbSummary>,
    pub value_gaps: Vec<ValueGap>,
    pub type_premiums: Vec<PropertyTypePremium>,
    pub bedroom_premiums: Vec<BedroomPremium>,
    pub quarterly: Vec<QuarterlyTrend>,
}

type Record<'a> = (&'a Transaction, &'a Features);

fn group_by_suburb<'a>(records: &[Record<'a>]) -> BTreeMap<&'a str, Vec<Record<'a>>> {
    let mut groups: BTreeMap<&str, Vec<Record>> = BTreeMap::new();
    for &(t, f) in records {
        groups.entry(t.suburb.as_str()).or_default().push((t, f));
    }
    groups
}

fn prices<'r, 'a: 'r>(records: impl IntoIterator<Item = &'r Record<'a>>) -> Vec<f64> {
    records.into_iter().map(|(t, _)| t.price).collect()
}

/// Descending by value, undefined values last, then by name.
fn by_ratio_desc(a: (Option<f64>, &str), b: (Option<f64>, &str)) -> Ordering {
    let ratio = match (a.0, b.0) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    ratio.then_with(|| a.1.cmp(b.1))
}

/// Per-suburb statistics, most expensive suburb first.
pub fn suburb_comparison(analysis: &AnalysisTable) -> Vec<SuburbSummary> {
    let records: Vec<Record> = analysis.records().collect();
    let mut summaries: Vec<SuburbSummary> = group_by_suburb(&records)
        .into_iter()
        .filter_map(|(suburb, group)| {
            let p = prices(&group);
            let per_sqm: Vec<f64> = group.iter().filter_map(|(_, f)| f.price_per_sqm).collect();
            let rooms: Vec<f64> = group.iter().map(|(t, _)| f64::from(t.rooms)).collect();
            let areas: Vec<f64> = group.iter().filter_map(|(t, _)| t.building_area).collect();
            Some(SuburbSummary {
                suburb: suburb.to_string(),
                transaction_count: group.len(),
                median_price: median(&p)?,
                mean_price: mean(&p)?,
                median_price_per_sqm: median(&per_sqm),
                median_rooms: median(&rooms)?,
                median_building_area: median(&areas),
                distance_to_cbd: group.iter().find_map(|(t, _)| t.distance),
            })
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.median_price
            .total_cmp(&a.median_price)
            .then_with(|| a.suburb.cmp(&b.suburb))
    });
    summaries
}

/// Discount of each value suburb against its configured neighbour.
pub fn value_gaps(analysis: &AnalysisTable, comparisons: &[SuburbComparison]) -> Vec<ValueGap> {
    let records: Vec<Record> = analysis.records().collect();
    let medians: BTreeMap<&str, f64> = group_by_suburb(&records)
        .into_iter()
        .filter_map(|(suburb, group)| median(&prices(&group)).map(|m| (suburb, m)))
        .collect();
    comparisons
        .iter()
        .map(|c| {
            let value_median = medians.get(c.value_suburb.as_str()).copied();
            let premium_median = medians.get(c.premium_suburb.as_str()).copied();
            ValueGap {
                value_suburb: c.value_suburb.clone(),
                premium_suburb: c.premium_suburb.clone(),
                value_median,
                premium_median,
                discount: discount(value_median, premium_median),
            }
        })
        .collect()
}

/// House versus unit median per suburb, largest premium first.
pub fn property_type_premium(analysis: &AnalysisTable) -> Vec<PropertyTypePremium> {
    let records: Vec<Record> = analysis.records().collect();
    let mut rows: Vec<PropertyTypePremium> = group_by_suburb(&records)
        .into_iter()
        .map(|(suburb, group)| {
            let median_of = |kind: PropertyType| {
                median(&prices(group.iter().filter(|(t, _)| t.property_type == kind)))
            };
            let house_median = median_of(PropertyType::House);
            let unit_median = median_of(PropertyType::Unit);
            PropertyTypePremium {
                suburb: suburb.to_string(),
                house_median,
                unit_median,
                townhouse_median: median_of(PropertyType::Townhouse),
                premium: relative_change(house_median, unit_median),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        by_ratio_desc(
            (a.premium, a.suburb.as_str()),
            (b.premium, b.suburb.as_str()),
        )
    });
    rows
}

/// Premium of houses with `upper` rooms over houses with `lower` rooms.
pub fn bedroom_premium(
    analysis: &AnalysisTable,
    (lower, upper): (u32, u32),
) -> Vec<BedroomPremium> {
    let records: Vec<Record> = analysis.records().collect();
    let mut rows: Vec<BedroomPremium> = group_by_suburb(&records)
        .into_iter()
        .map(|(suburb, group)| {
            let median_of = |rooms: u32| {
                median(&prices(group.iter().filter(|(t, _)| {
                    t.property_type == PropertyType::House && t.rooms == rooms
                })))
            };
            let lower_median = median_of(lower);
            let upper_median = median_of(upper);
            BedroomPremium {
                suburb: suburb.to_string(),
                lower_rooms: lower,
                upper_rooms: upper,
                lower_median,
                upper_median,
                premium: relative_change(upper_median, lower_median),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        by_ratio_desc(
            (a.premium, a.suburb.as_str()),
            (b.premium, b.suburb.as_str()),
        )
    });
    rows
}

/// Price statistics per quarter, chronologically.
pub fn quarterly_trends(analysis: &AnalysisTable) -> Vec<QuarterlyTrend> {
    let mut groups: BTreeMap<Quarter, Vec<Record>> = BTreeMap::new();
    for (t, f) in analysis.records() {
        groups.entry(f.quarter).or_default().push((t, f));
    }
    groups
        .into_iter()
        .filter_map(|(quarter, group)| {
            let p = prices(&group);
            let per_sqm: Vec<f64> = group.iter().filter_map(|(_, f)| f.price_per_sqm).collect();
            Some(QuarterlyTrend {
                quarter,
                transaction_count: group.len(),
                median_price: median(&p)?,
                mean_price: mean(&p)?,
                median_price_per_sqm: median(&per_sqm),
            })
        })
        .collect()
}

/// Growth of the median price from the first quarter to the last.
pub fn market_growth(quarterly: &[QuarterlyTrend]) -> Option<f64> {
    let first = quarterly.first()?;
    let last = quarterly.last()?;
    relative_change(Some(last.median_price), Some(first.median_price))
}

pub fn generate(analysis: &AnalysisTable, config: &PipelineConfig) -> InsightReport {
    let suburbs = suburb_comparison(analysis);
    let quarterly = quarterly_trends(analysis);
    let prices: Vec<f64> = analysis.records().map(|(t, _)| t.price).collect();
    let count_flag = |flag: PriceFlag| {
        analysis
            .features
            .iter()
            .filter(|f| f.flag == Some(flag))
            .count()
    };
    let headline = Headline {
        total_properties: analysis.len(),
        suburbs_analyzed: suburbs.len(),
        median_price: median(&prices),
        market_growth: market_growth(&quarterly),
        underpriced: count_flag(PriceFlag::Underpriced),
        overpriced: count_flag(PriceFlag::Overpriced),
    };
    info!(
        properties = headline.total_properties,
        suburbs = headline.suburbs_analyzed,
        quarters = quarterly.len(),
        "Generated insights"
    );
    InsightReport {
        headline,
        suburbs,
        value_gaps: value_gaps(analysis, &config.comparisons),
        type_premiums: property_type_premium(analysis),
        bedroom_premiums: bedroom_premium(analysis, config.bedroom_pair),
        quarterly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::build_analysis;
    use crate::test_support::dataset;

    fn analysis(rows: &[(&str, &str, u32, f64, &str, &str)]) -> AnalysisTable {
        build_analysis(&dataset(rows), &PipelineConfig::default()).0
    }

    #[test]
    fn test_suburb_comparison_sorted_by_median() {
        let a = analysis(&[
            ("Reservoir", "h", 3, 600_000.0, "500", "1/4/2016"),
            ("Reservoir", "h", 3, 700_000.0, "500", "1/4/2016"),
            ("Reservoir", "h", 3, 800_000.0, "500", "1/4/2016"),
            ("Northcote", "h", 3, 1_300_000.0, "400", "1/4/2016"),
        ]);
        let rows = suburb_comparison(&a);
        assert_eq!(rows[0].suburb, "Northcote");
        assert_eq!(rows[1].suburb, "Reservoir");
        assert_eq!(rows[1].median_price, 700_000.0);
        assert_eq!(rows[1].transaction_count, 3);
        assert_eq!(rows[1].median_price_per_sqm, Some(1_400.0));
        assert_eq!(rows[1].distance_to_cbd, Some(5.0));
    }

    #[test]
    fn test_building_area_aggregate_skips_missing_values() {
        let mut data = dataset(&[
            ("Coburg", "h", 3, 900_000.0, "500", "1/4/2016"),
            ("Coburg", "h", 3, 950_000.0, "500", "1/4/2016"),
        ]);
        data.transactions[0].building_area = None;
        data.transactions[1].building_area = Some(150.0);
        let (a, _) = build_analysis(&data, &PipelineConfig::default());
        let rows = suburb_comparison(&a);
        assert_eq!(rows[0].transaction_count, 2);
        assert_eq!(rows[0].median_building_area, Some(150.0));
    }

    #[test]
    fn test_value_gap_discount() {
        let a = analysis(&[
            ("Reservoir", "h", 3, 705_000.0, "500", "1/4/2016"),
            ("Northcote", "h", 3, 1_300_000.0, "400", "1/4/2016"),
        ]);
        let gaps = value_gaps(&a, &PipelineConfig::default().comparisons);
        assert_eq!(gaps.len(), 3);
        let d = gaps[0].discount.unwrap();
        assert!((d - 0.458).abs() < 1e-3, "got {d}");
        assert_eq!(gaps[1].discount, None);
        assert_eq!(gaps[1].value_median, None);
    }

    #[test]
    fn test_property_type_premium() {
        let a = analysis(&[
            ("Coburg", "h", 3, 1_000_000.0, "500", "1/4/2016"),
            ("Coburg", "u", 2, 500_000.0, "100", "1/4/2016"),
            ("Kew", "h", 3, 2_000_000.0, "500", "1/4/2016"),
            ("Kew", "u", 2, 1_600_000.0, "100", "1/4/2016"),
            ("Brunswick", "h", 3, 1_200_000.0, "300", "1/4/2016"),
        ]);
        let rows = property_type_premium(&a);
        let order: Vec<_> = rows.iter().map(|r| r.suburb.as_str()).collect();
        assert_eq!(order, ["Coburg", "Kew", "Brunswick"]);
        assert_eq!(rows[0].premium, Some(1.0));
        assert_eq!(rows[1].premium, Some(0.25));
        assert_eq!(rows[2].premium, None);
        assert_eq!(rows[2].house_median, Some(1_200_000.0));
    }

    #[test]
    fn test_bedroom_premium_houses_only() {
        let a = analysis(&[
            ("Coburg", "h", 3, 1_000_000.0, "500", "1/4/2016"),
            ("Coburg", "h", 4, 1_200_000.0, "500", "1/4/2016"),
            ("Coburg", "u", 4, 100_000.0, "100", "1/4/2016"),
            ("Kew", "h", 3, 2_000_000.0, "500", "1/4/2016"),
        ]);
        let rows = bedroom_premium(&a, (3, 4));
        assert_eq!(rows[0].suburb, "Coburg");
        assert_eq!(rows[0].upper_median, Some(1_200_000.0));
        assert!((rows[0].premium.unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(rows[1].suburb, "Kew");
        assert_eq!(rows[1].premium, None);
    }

    #[test]
    fn test_quarterly_trends_and_growth() {
        let a = analysis(&[
            ("Coburg", "h", 3, 1_000_000.0, "500", "10/4/2016"),
            ("Coburg", "h", 3, 800_000.0, "500", "12/5/2016"),
            ("Coburg", "h", 3, 1_080_000.0, "500", "1/8/2017"),
            ("Coburg", "h", 3, 900_000.0, "500", "3/1/2017"),
        ]);
        let rows = quarterly_trends(&a);
        let quarters: Vec<_> = rows.iter().map(|r| r.quarter.to_string()).collect();
        assert_eq!(quarters, ["2016Q2", "2017Q1", "2017Q3"]);
        assert_eq!(rows[0].median_price, 900_000.0);
        assert_eq!(rows[0].transaction_count, 2);
        let growth = market_growth(&rows).unwrap();
        assert!((growth - 0.2).abs() < 1e-9);
        assert_eq!(market_growth(&[]), None);
    }

    #[test]
    fn test_generate_headline() {
        let a = analysis(&[
            ("Coburg", "h", 3, 1_000_000.0, "500", "10/4/2016"),
            ("Reservoir", "h", 3, 600_000.0, "500", "10/4/2016"),
        ]);
        let report = generate(&a, &PipelineConfig::default());
        assert_eq!(report.headline.total_properties, 2);
        assert_eq!(report.headline.suburbs_analyzed, 2);
        assert_eq!(report.headline.median_price, Some(800_000.0));
        assert_eq!(report.headline.market_growth, Some(0.0));
    }
}
