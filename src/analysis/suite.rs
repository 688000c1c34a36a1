use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::{column_drift, dataset_drift, DEFAULT_DRIFT_SHARE};
use super::{AnalysisError, StatTest};
use crate::dataset::Frame;

/// Default upper bound (exclusive) on the share of drifted columns.
pub const DEFAULT_MAX_DRIFTED_SHARE: f64 = 0.3;

/// One test directive, or a preset that expands into several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestSpec {
    /// Share-of-drifted-columns check plus a drift check per column.
    DataDriftPreset {
        #[serde(default)]
        stattest: Option<StatTest>,
    },
    ShareOfDriftedColumns {
        lt: f64,
    },
    ColumnDrift {
        column_name: String,
        #[serde(default)]
        stattest: Option<StatTest>,
    },
}

impl TestSpec {
    pub fn data_drift_preset() -> Self {
        Self::DataDriftPreset { stattest: None }
    }

    fn expand(&self, reference: &Frame) -> Vec<SingleTest> {
        match self {
            Self::DataDriftPreset { stattest } => {
                let mut tests = vec![SingleTest::ShareOfDriftedColumns {
                    lt: DEFAULT_MAX_DRIFTED_SHARE,
                }];
                tests.extend(reference.column_names().map(|name| SingleTest::ColumnDrift {
                    column_name: name.to_string(),
                    stattest: *stattest,
                }));
                tests
            }
            Self::ShareOfDriftedColumns { lt } => {
                vec![SingleTest::ShareOfDriftedColumns { lt: *lt }]
            }
            Self::ColumnDrift {
                column_name,
                stattest,
            } => vec![SingleTest::ColumnDrift {
                column_name: column_name.clone(),
                stattest: *stattest,
            }],
        }
    }
}

/// A test after preset expansion.
enum SingleTest {
    ShareOfDriftedColumns {
        lt: f64,
    },
    ColumnDrift {
        column_name: String,
        stattest: Option<StatTest>,
    },
}

impl SingleTest {
    fn evaluate(&self, reference: &Frame, current: &Frame) -> Result<TestResult, AnalysisError> {
        match self {
            Self::ShareOfDriftedColumns { lt } => {
                let drift = dataset_drift(
                    reference,
                    current,
                    DEFAULT_DRIFT_SHARE,
                    &Default::default(),
                )?;
                let passed = drift.share_of_drifted_columns < *lt;
                Ok(TestResult {
                    name: "Share of Drifted Columns".to_string(),
                    description: format!(
                        "The drift is detected for {} out of {} columns. The test threshold is lt={}.",
                        drift.number_of_drifted_columns, drift.number_of_columns, lt
                    ),
                    status: TestStatus::from_passed(passed),
                    column_name: None,
                    value: Some(drift.share_of_drifted_columns),
                })
            }
            Self::ColumnDrift {
                column_name,
                stattest,
            } => {
                let name = format!("Drift per Column ({column_name})");
                let (Some(r), Some(c)) = (reference.column(column_name), current.column(column_name))
                else {
                    return Ok(TestResult {
                        name,
                        description: format!("Column '{column_name}' is not present in both datasets."),
                        status: TestStatus::Error,
                        column_name: Some(column_name.clone()),
                        value: None,
                    });
                };
                let drift = column_drift(r, c, *stattest)?;
                Ok(TestResult {
                    name,
                    description: format!(
                        "The drift score for the column '{}' is {:.3}. The drift detection method is {}. The drift threshold is {}.",
                        column_name,
                        drift.drift_score,
                        drift.stattest_name.as_str(),
                        drift.threshold
                    ),
                    status: TestStatus::from_passed(!drift.drift_detected),
                    column_name: Some(column_name.clone()),
                    value: Some(drift.drift_score),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Success,
    Fail,
    Error,
}

impl TestStatus {
    fn from_passed(passed: bool) -> Self {
        if passed {
            Self::Success
        } else {
            Self::Fail
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub description: String,
    pub status: TestStatus,
    pub column_name: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: usize,
    pub all_passed: bool,
}

impl SuiteSummary {
    fn of(tests: &[TestResult]) -> Self {
        let count = |status| tests.iter().filter(|t| t.status == status).count();
        let success = count(TestStatus::Success);
        Self {
            total: tests.len(),
            success,
            failed: count(TestStatus::Fail),
            errors: count(TestStatus::Error),
            all_passed: success == tests.len(),
        }
    }
}

/// A list of tests bound to a timestamp, ready to run.
#[derive(Debug, Clone)]
pub struct SuiteSpec {
    pub tests: Vec<TestSpec>,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl SuiteSpec {
    /// Stamps the spec with the current wall-clock time.
    pub fn new(tests: Vec<TestSpec>) -> Self {
        Self {
            tests,
            timestamp: Utc::now(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Expand presets and evaluate every test in order.
    ///
    /// A column test naming an absent column records an `Error` status;
    /// any other failure aborts the run.
    pub fn run(&self, reference: &Frame, current: &Frame) -> Result<TestSuite, AnalysisError> {
        if reference.is_empty() {
            return Err(AnalysisError::EmptyReference);
        }

        let tests = self
            .tests
            .iter()
            .flat_map(|t| t.expand(reference))
            .map(|t| t.evaluate(reference, current))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TestSuite {
            id: Uuid::new_v4(),
            timestamp: self.timestamp,
            tags: self.tags.clone(),
            metadata: self.metadata.clone(),
            summary: SuiteSummary::of(&tests),
            tests,
        })
    }
}

/// The completed result of a [`SuiteSpec`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub tests: Vec<TestResult>,
    pub summary: SuiteSummary,
}
