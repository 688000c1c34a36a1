//! Drift and data-quality analysis over a reference/current frame pair.
//!
//! A [`ReportSpec`] lists metric directives and runs them into an immutable
//! [`Report`]; a [`SuiteSpec`] lists tests (or presets that expand into
//! tests) and runs them into a [`TestSuite`]. Both capture their timestamp
//! when the spec is built, not when it runs.
//!
//! Column drift is scored with one of a few distance tests (see
//! [`StatTest`]). A column has drifted when its score reaches the test's
//! threshold; the dataset has drifted when the share of drifted columns
//! reaches the dataset drift share.

mod metrics;
mod report;
mod stattest;
mod suite;

use thiserror::Error;

use crate::dataset::ColumnKind;

pub use metrics::*;
pub use report::{Report, ReportSpec};
pub use stattest::{StatTest, DEFAULT_THRESHOLD};
pub use suite::*;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Reference dataset is empty")]
    EmptyReference,

    #[error("Column '{column}' is {reference:?} in reference data but {current:?} in current data")]
    ColumnTypeMismatch {
        column: String,
        reference: ColumnKind,
        current: ColumnKind,
    },

    #[error("Stat test '{test}' cannot score {kind:?} column '{column}'")]
    UnsupportedStatTest {
        test: &'static str,
        column: String,
        kind: ColumnKind,
    },
}
