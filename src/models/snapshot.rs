use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{Report, TestSuite};

/// A report or test suite after it has been attached to a project.
///
/// Snapshots are immutable. Attaching the same result twice produces two
/// snapshots; nothing is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub project_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: SnapshotPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SnapshotPayload {
    Report(Report),
    TestSuite(TestSuite),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Report,
    TestSuite,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::TestSuite => "test_suite",
        }
    }
}

impl SnapshotPayload {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            Self::Report(_) => SnapshotKind::Report,
            Self::TestSuite(_) => SnapshotKind::TestSuite,
        }
    }

    pub fn as_report(&self) -> Option<&Report> {
        match self {
            Self::Report(r) => Some(r),
            Self::TestSuite(_) => None,
        }
    }

    pub fn as_test_suite(&self) -> Option<&TestSuite> {
        match self {
            Self::TestSuite(s) => Some(s),
            Self::Report(_) => None,
        }
    }
}

impl Snapshot {
    pub fn kind(&self) -> SnapshotKind {
        self.payload.kind()
    }

    pub fn tags(&self) -> &[String] {
        match &self.payload {
            SnapshotPayload::Report(r) => &r.tags,
            SnapshotPayload::TestSuite(s) => &s.tags,
        }
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        match &self.payload {
            SnapshotPayload::Report(r) => &r.metadata,
            SnapshotPayload::TestSuite(s) => &s.metadata,
        }
    }
}
