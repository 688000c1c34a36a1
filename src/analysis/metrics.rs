use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::stattest::population_std;
use super::{AnalysisError, StatTest};
use crate::dataset::{Column, ColumnKind, ColumnValues, Frame};

/// Share of drifted columns at which the whole dataset counts as drifted.
pub const DEFAULT_DRIFT_SHARE: f64 = 0.5;

/// One metric directive in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric_id")]
pub enum MetricSpec {
    DatasetDriftMetric {
        #[serde(default)]
        drift_share: Option<f64>,
    },
    DatasetMissingValuesMetric,
    ColumnDriftMetric {
        column_name: String,
        #[serde(default)]
        stattest: Option<StatTest>,
    },
    ColumnSummaryMetric {
        column_name: String,
    },
}

impl MetricSpec {
    pub fn dataset_drift() -> Self {
        Self::DatasetDriftMetric { drift_share: None }
    }

    pub fn column_drift(column: impl Into<String>, stattest: Option<StatTest>) -> Self {
        Self::ColumnDriftMetric {
            column_name: column.into(),
            stattest,
        }
    }

    pub fn column_summary(column: impl Into<String>) -> Self {
        Self::ColumnSummaryMetric {
            column_name: column.into(),
        }
    }

    pub fn metric_id(&self) -> &'static str {
        match self {
            Self::DatasetDriftMetric { .. } => "DatasetDriftMetric",
            Self::DatasetMissingValuesMetric => "DatasetMissingValuesMetric",
            Self::ColumnDriftMetric { .. } => "ColumnDriftMetric",
            Self::ColumnSummaryMetric { .. } => "ColumnSummaryMetric",
        }
    }

    pub fn compute(&self, reference: &Frame, current: &Frame) -> Result<MetricResult, AnalysisError> {
        Ok(match self {
            Self::DatasetDriftMetric { drift_share } => {
                let share = drift_share.unwrap_or(DEFAULT_DRIFT_SHARE);
                MetricResult::DatasetDriftMetric(dataset_drift(
                    reference,
                    current,
                    share,
                    &HashMap::new(),
                )?)
            }
            Self::DatasetMissingValuesMetric => {
                MetricResult::DatasetMissingValuesMetric(DatasetMissingValuesResult {
                    reference: MissingValuesStats::of(reference),
                    current: MissingValuesStats::of(current),
                })
            }
            Self::ColumnDriftMetric {
                column_name,
                stattest,
            } => {
                let (r, c) = column_pair(reference, current, column_name)?;
                MetricResult::ColumnDriftMetric(column_drift(r, c, *stattest)?)
            }
            Self::ColumnSummaryMetric { column_name } => {
                let (r, c) = column_pair(reference, current, column_name)?;
                MetricResult::ColumnSummaryMetric(ColumnSummaryResult {
                    column_name: column_name.clone(),
                    column_type: r.kind(),
                    reference: ColumnStats::of(r),
                    current: ColumnStats::of(c),
                })
            }
        })
    }
}

/// The computed value of one [`MetricSpec`].
///
/// Serialized with a `metric_id` tag so dashboard field paths can address
/// any field by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric_id")]
pub enum MetricResult {
    DatasetDriftMetric(DatasetDriftResult),
    DatasetMissingValuesMetric(DatasetMissingValuesResult),
    ColumnDriftMetric(ColumnDriftResult),
    ColumnSummaryMetric(ColumnSummaryResult),
}

impl MetricResult {
    pub fn metric_id(&self) -> &'static str {
        match self {
            Self::DatasetDriftMetric(_) => "DatasetDriftMetric",
            Self::DatasetMissingValuesMetric(_) => "DatasetMissingValuesMetric",
            Self::ColumnDriftMetric(_) => "ColumnDriftMetric",
            Self::ColumnSummaryMetric(_) => "ColumnSummaryMetric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDriftResult {
    pub drift_share: f64,
    pub number_of_columns: usize,
    pub number_of_drifted_columns: usize,
    pub share_of_drifted_columns: f64,
    pub dataset_drift: bool,
    pub drift_by_columns: Vec<ColumnDriftResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDriftResult {
    pub column_name: String,
    pub column_type: ColumnKind,
    pub stattest_name: StatTest,
    pub drift_score: f64,
    pub threshold: f64,
    pub drift_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMissingValuesResult {
    pub reference: MissingValuesStats,
    pub current: MissingValuesStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValuesStats {
    pub number_of_rows: usize,
    pub number_of_columns: usize,
    pub number_of_missing_values: usize,
    pub share_of_missing_values: f64,
    pub number_of_rows_with_missing_values: usize,
    pub share_of_rows_with_missing_values: f64,
}

impl MissingValuesStats {
    pub fn of(frame: &Frame) -> Self {
        let cells = frame.n_rows() * frame.columns().len();
        let missing = frame.missing_cells();
        let rows_missing = frame.rows_with_missing();
        Self {
            number_of_rows: frame.n_rows(),
            number_of_columns: frame.columns().len(),
            number_of_missing_values: missing,
            share_of_missing_values: share(missing, cells),
            number_of_rows_with_missing_values: rows_missing,
            share_of_rows_with_missing_values: share(rows_missing, frame.n_rows()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummaryResult {
    pub column_name: String,
    pub column_type: ColumnKind,
    pub reference: ColumnStats,
    pub current: ColumnStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

/// Descriptive statistics over present values. Location fields are `None`
/// when no value is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub count: usize,
    pub missing: usize,
    pub missing_share: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub count: usize,
    pub missing: usize,
    pub missing_share: f64,
    pub unique: usize,
    pub most_common: Option<String>,
    pub most_common_count: usize,
}

impl ColumnStats {
    pub fn of(column: &Column) -> Self {
        let missing = column.values.missing_count();
        let total = column.values.len();
        match &column.values {
            ColumnValues::Numeric(_) => {
                let mut values = column.present_numbers();
                values.sort_by(f64::total_cmp);
                let count = values.len();
                let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
                Self::Numeric(NumericStats {
                    count,
                    missing,
                    missing_share: share(missing, total),
                    min: values.first().copied(),
                    max: values.last().copied(),
                    mean,
                    std: (count > 0).then(|| population_std(&values)),
                    p25: quantile(&values, 0.25),
                    p50: quantile(&values, 0.5),
                    p75: quantile(&values, 0.75),
                })
            }
            ColumnValues::Categorical(_) => {
                let labels = column.present_labels();
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for label in &labels {
                    *counts.entry(label.as_str()).or_default() += 1;
                }
                // Ties break on the lexically smallest label.
                let top = counts
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(label, n)| (label.to_string(), *n));
                Self::Categorical(CategoricalStats {
                    count: labels.len(),
                    missing,
                    missing_share: share(missing, total),
                    unique: counts.len(),
                    most_common_count: top.as_ref().map(|t| t.1).unwrap_or(0),
                    most_common: top.map(|t| t.0),
                })
            }
        }
    }
}

/// Score one column pair, defaulting the stat test from the column kind.
pub fn column_drift(
    reference: &Column,
    current: &Column,
    stattest: Option<StatTest>,
) -> Result<ColumnDriftResult, AnalysisError> {
    let test = stattest.unwrap_or_else(|| StatTest::default_for(reference.kind()));
    let score = test.score(reference, current)?;
    Ok(ColumnDriftResult {
        column_name: reference.name.clone(),
        column_type: reference.kind(),
        stattest_name: test,
        drift_score: score,
        threshold: test.threshold(),
        drift_detected: score >= test.threshold(),
    })
}

/// Drift over every reference column. `overrides` pins the stat test for
/// named columns.
pub fn dataset_drift(
    reference: &Frame,
    current: &Frame,
    drift_share: f64,
    overrides: &HashMap<String, StatTest>,
) -> Result<DatasetDriftResult, AnalysisError> {
    let drift_by_columns = reference
        .columns()
        .iter()
        .map(|r| {
            let c = current
                .column(&r.name)
                .ok_or_else(|| AnalysisError::MissingColumn(r.name.clone()))?;
            column_drift(r, c, overrides.get(&r.name).copied())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let number_of_columns = drift_by_columns.len();
    let number_of_drifted_columns = drift_by_columns.iter().filter(|c| c.drift_detected).count();
    let share_of_drifted_columns = share(number_of_drifted_columns, number_of_columns);

    Ok(DatasetDriftResult {
        drift_share,
        number_of_columns,
        number_of_drifted_columns,
        share_of_drifted_columns,
        dataset_drift: number_of_columns > 0 && share_of_drifted_columns >= drift_share,
        drift_by_columns,
    })
}

fn column_pair<'a>(
    reference: &'a Frame,
    current: &'a Frame,
    name: &str,
) -> Result<(&'a Column, &'a Column), AnalysisError> {
    let r = reference
        .column(name)
        .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?;
    let c = current
        .column(name)
        .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))?;
    Ok((r, c))
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
