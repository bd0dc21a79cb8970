use std::path::{Path, PathBuf};

use tracing::info;

use crate::cleaner::{clean, CleaningSummary};
use crate::config::PipelineConfig;
use crate::dataset::{Dataset, RawTable};
use crate::error::Result;
use crate::features::{build_analysis, AnalysisTable, FeatureSummary};
use crate::insights::{generate, InsightReport};
use crate::report::write_tables;

/// Input and output locations of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub raw: PathBuf,
    pub cleaned: PathBuf,
    pub analysis: PathBuf,
    pub reports: PathBuf,
}

impl PipelinePaths {
    /// The standard layout under a data directory:
    /// `raw/melb_data.csv`, `processed/melb_data_cleaned.csv`,
    /// `processed/melb_data_analysis.csv` and `reports/`.
    pub fn under<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            raw: data_dir.join("raw").join("melb_data.csv"),
            cleaned: data_dir.join("processed").join("melb_data_cleaned.csv"),
            analysis: data_dir.join("processed").join("melb_data_analysis.csv"),
            reports: data_dir.join("reports"),
        }
    }
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self::under("data")
    }
}

/// Outcome of all three steps.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cleaning: CleaningSummary,
    pub features: FeatureSummary,
    pub report: InsightReport,
    pub report_files: Vec<PathBuf>,
}

/// The three pipeline steps, sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Read the raw snapshot at `input` and write the cleaned table to `output`.
    pub fn clean<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<CleaningSummary> {
        info!("Loading raw data from {}", input.as_ref().display());
        let raw = RawTable::read(input)?;
        let (cleaned, summary) = clean(raw, &self.config)?;
        cleaned.write_csv(&output)?;
        info!("Cleaned data saved to {}", output.as_ref().display());
        Ok(summary)
    }

    /// Read the cleaned table at `input` and write the analysis table to `output`.
    pub fn features<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<FeatureSummary> {
        info!("Loading cleaned data from {}", input.as_ref().display());
        let (cleaned, _) = Dataset::from_raw(RawTable::read(input)?)?;
        let (analysis, summary) = build_analysis(&cleaned, &self.config);
        analysis.write_csv(&output)?;
        info!("Analysis data saved to {}", output.as_ref().display());
        Ok(summary)
    }

    /// Read the analysis table at `input` and write the report tables into
    /// `output_dir`.
    pub fn insights<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output_dir: Q,
    ) -> Result<(InsightReport, Vec<PathBuf>)> {
        info!("Loading analysis data from {}", input.as_ref().display());
        let analysis = AnalysisTable::read(input, &self.config)?;
        let report = generate(&analysis, &self.config);
        let files = write_tables(&report, output_dir)?;
        Ok((report, files))
    }

    /// Run all three steps, each reading the previous step's output file.
    pub fn run(&self, paths: &PipelinePaths) -> Result<RunSummary> {
        let cleaning = self.clean(&paths.raw, &paths.cleaned)?;
        let features = self.features(&paths.cleaned, &paths.analysis)?;
        let (report, report_files) = self.insights(&paths.analysis, &paths.reports)?;
        Ok(RunSummary {
            cleaning,
            features,
            report,
            report_files,
        })
    }
}
