//! Tabular data handling: an in-memory columnar [`Frame`], CSV parsing,
//! remote/local sources and the reference/current partitioning used by the
//! monitoring job.

mod csv;
mod partition;
mod source;

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::csv::{parse_csv, MISSING_MARKERS};
pub use partition::{cycle_index, window, Partition, Partitioner};
pub use source::{CsvFileSource, CsvUrlSource, DatasetSource, OpenMlSource};

/// Errors raised while loading or shaping a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset not found: {0}")]
    NotFound(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Malformed dataset: {0}")]
    Malformed(String),
}

/// Whether a column holds numbers or labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Cell storage for one column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Self::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => matches!(v.get(row), Some(None)),
            Self::Categorical(v) => matches!(v.get(row), Some(None)),
        }
    }

    fn select(&self, keep: &[bool]) -> Self {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            Self::Numeric(v) => Self::Numeric(pick(v, keep)),
            Self::Categorical(v) => Self::Categorical(pick(v, keep)),
        }
    }

    fn slice(&self, rows: Range<usize>) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(v[rows].to_vec()),
            Self::Categorical(v) => Self::Categorical(v[rows].to_vec()),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }

    /// Non-missing numeric values; empty for categorical columns.
    pub fn present_numbers(&self) -> Vec<f64> {
        match &self.values {
            ColumnValues::Numeric(v) => v.iter().flatten().copied().collect(),
            ColumnValues::Categorical(_) => Vec::new(),
        }
    }

    /// Non-missing cells rendered as labels (numbers use their display form).
    pub fn present_labels(&self) -> Vec<String> {
        match &self.values {
            ColumnValues::Numeric(v) => v.iter().flatten().map(|x| x.to_string()).collect(),
            ColumnValues::Categorical(v) => v.iter().flatten().cloned().collect(),
        }
    }
}

/// An in-memory table with equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    rows: usize,
}

impl Frame {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
            return Err(DatasetError::Malformed(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.values.len(),
                rows
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Total number of missing cells across all columns.
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(|c| c.values.missing_count()).sum()
    }

    /// Number of rows with at least one missing cell.
    pub fn rows_with_missing(&self) -> usize {
        (0..self.rows)
            .filter(|&row| self.columns.iter().any(|c| c.values.is_missing(row)))
            .count()
    }

    /// Keep the rows for which `keep` is true. `keep` must have one entry per row.
    pub fn filter(&self, keep: &[bool]) -> Self {
        debug_assert_eq!(keep.len(), self.rows);
        let rows = keep.iter().filter(|k| **k).count();
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values.select(keep),
                })
                .collect(),
            rows,
        }
    }

    /// Rows `[start, end)`, clipped to the frame. Out-of-range windows yield an empty frame.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.rows);
        let start = start.min(end);
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values.slice(start..end),
                })
                .collect(),
            rows: end - start,
        }
    }
}
