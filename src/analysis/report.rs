use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{AnalysisError, DatasetDriftResult, MetricResult, MetricSpec};
use crate::dataset::Frame;
use crate::models::PanelValue;

/// A list of metric directives bound to a timestamp, ready to run.
#[derive(Debug, Clone)]
pub struct ReportSpec {
    pub metrics: Vec<MetricSpec>,
    pub timestamp: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ReportSpec {
    /// Stamps the spec with the current wall-clock time.
    pub fn new(metrics: Vec<MetricSpec>) -> Self {
        Self {
            metrics,
            timestamp: Utc::now(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Compute every metric in order. The first failing metric aborts the run.
    pub fn run(&self, reference: &Frame, current: &Frame) -> Result<Report, AnalysisError> {
        if reference.is_empty() {
            return Err(AnalysisError::EmptyReference);
        }

        let metrics = self
            .metrics
            .iter()
            .map(|m| m.compute(reference, current))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Report {
            id: Uuid::new_v4(),
            timestamp: self.timestamp,
            tags: self.tags.clone(),
            metadata: self.metadata.clone(),
            metrics,
        })
    }
}

/// The completed result of a [`ReportSpec`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub metrics: Vec<MetricResult>,
}

impl Report {
    pub fn dataset_drift(&self) -> Option<&DatasetDriftResult> {
        self.metrics.iter().find_map(|m| match m {
            MetricResult::DatasetDriftMetric(d) => Some(d),
            _ => None,
        })
    }

    /// Read the numeric field a dashboard value points at.
    ///
    /// The first metric whose id and `metric_args` match wins. Booleans read
    /// as 0/1; anything else non-numeric resolves to `None`.
    pub fn resolve(&self, value: &PanelValue) -> Option<f64> {
        self.metrics
            .iter()
            .filter(|m| m.metric_id() == value.metric_id)
            .filter_map(|m| serde_json::to_value(m).ok())
            .find(|json| {
                value
                    .metric_args
                    .iter()
                    .all(|(path, expected)| match lookup(json, path) {
                        Some(Value::String(s)) => s == expected,
                        Some(other) => other.to_string() == *expected,
                        None => false,
                    })
            })
            .and_then(|json| match lookup(&json, &value.field_path)? {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            })
    }
}

fn lookup<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(json, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => items.get(key.parse::<usize>().ok()?),
        _ => None,
    })
}
