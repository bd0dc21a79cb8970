use crate::suburb::SuburbCanonicalizer;

const MIN_LANDSIZE: f64 = 0.0;
const MAX_LANDSIZE: f64 = 50_000.0;
const TOP_N_SUBURBS: usize = 20;
const UNDERPRICED_THRESHOLD: f64 = -0.5;
const OVERPRICED_THRESHOLD: f64 = 0.5;

const DEFAULT_COMPARISONS: &[(&str, &str)] = &[
    ("Reservoir", "Northcote"),
    ("Glenroy", "Moonee Ponds"),
    ("Coburg", "Brunswick"),
];

/// A value suburb compared against its more expensive neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuburbComparison {
    pub value_suburb: String,
    pub premium_suburb: String,
}

impl SuburbComparison {
    pub fn new(value_suburb: impl Into<String>, premium_suburb: impl Into<String>) -> Self {
        Self {
            value_suburb: value_suburb.into(),
            premium_suburb: premium_suburb.into(),
        }
    }
}

/// Every tunable of the three pipeline steps.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub canonicalizer: SuburbCanonicalizer,
    /// Land sizes must be strictly greater than this.
    pub min_landsize: f64,
    /// Land sizes must be at most this.
    pub max_landsize: f64,
    pub top_n: usize,
    /// Deviation from the suburb median at or below which a sale is underpriced.
    pub underpriced_threshold: f64,
    /// Deviation from the suburb median at or above which a sale is overpriced.
    pub overpriced_threshold: f64,
    pub comparisons: Vec<SuburbComparison>,
    /// Room counts `(lower, upper)` compared for the bedroom premium.
    pub bedroom_pair: (u32, u32),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canonicalizer: SuburbCanonicalizer::default(),
            min_landsize: MIN_LANDSIZE,
            max_landsize: MAX_LANDSIZE,
            top_n: TOP_N_SUBURBS,
            underpriced_threshold: UNDERPRICED_THRESHOLD,
            overpriced_threshold: OVERPRICED_THRESHOLD,
            comparisons: DEFAULT_COMPARISONS
                .iter()
                .map(|(value, premium)| SuburbComparison::new(*value, *premium))
                .collect(),
            bedroom_pair: (3, 4),
        }
    }
}

impl PipelineConfig {
    pub fn landsize_in_bounds(&self, landsize: f64) -> bool {
        landsize > self.min_landsize && landsize <= self.max_landsize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let config = PipelineConfig::default();
        assert!(!config.landsize_in_bounds(0.0));
        assert!(!config.landsize_in_bounds(-5.0));
        assert!(config.landsize_in_bounds(0.5));
        assert!(config.landsize_in_bounds(50_000.0));
        assert!(!config.landsize_in_bounds(50_000.1));
    }

    #[test]
    fn test_default_comparisons() {
        let config = PipelineConfig::default();
        assert_eq!(config.top_n, 20);
        assert_eq!(config.comparisons.len(), 3);
        assert_eq!(
            config.comparisons[0],
            SuburbComparison::new("Reservoir", "Northcote")
        );
    }
}
