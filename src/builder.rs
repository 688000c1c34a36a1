//! Assembling and running the per-run report and test suite.

use crate::analysis::{
    AnalysisError, MetricSpec, Report, ReportSpec, SuiteSpec, TestSpec, TestSuite,
};
use crate::config::{ColumnConfig, MonitorConfig};
use crate::dataset::{window, Frame};

/// Metadata key recording which current window a snapshot analysed.
pub const CYCLE_INDEX_KEY: &str = "cycle_index";

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    pub columns: Vec<ColumnConfig>,
    pub window_size: usize,
}

impl ReportBuilder {
    pub fn new(columns: Vec<ColumnConfig>, window_size: usize) -> Self {
        Self {
            columns,
            window_size,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.columns.clone(), config.partition.window_size)
    }

    /// Dataset drift, dataset missing values, then drift (and optionally a
    /// summary) for each configured column.
    pub fn report_metrics(&self) -> Vec<MetricSpec> {
        let mut metrics = vec![
            MetricSpec::dataset_drift(),
            MetricSpec::DatasetMissingValuesMetric,
        ];
        for column in &self.columns {
            metrics.push(MetricSpec::column_drift(column.name.clone(), column.stattest));
            if column.summary {
                metrics.push(MetricSpec::column_summary(column.name.clone()));
            }
        }
        metrics
    }

    /// Run the report against window `i` of `current`. Stamped with the
    /// wall-clock time at call.
    pub fn build_report(
        &self,
        i: usize,
        reference: &Frame,
        current: &Frame,
    ) -> Result<Report, AnalysisError> {
        ReportSpec::new(self.report_metrics())
            .with_metadata(CYCLE_INDEX_KEY, i.to_string())
            .run(reference, &window(current, i, self.window_size))
    }

    /// Run the data drift preset against window `i` of `current`.
    pub fn build_test_suite(
        &self,
        i: usize,
        reference: &Frame,
        current: &Frame,
    ) -> Result<TestSuite, AnalysisError> {
        SuiteSpec::new(vec![TestSpec::data_drift_preset()])
            .with_metadata(CYCLE_INDEX_KEY, i.to_string())
            .run(reference, &window(current, i, self.window_size))
    }
}
