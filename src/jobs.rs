//! The two periodic jobs: a heartbeat that appends to a local log, and the
//! drift monitoring run.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::builder::ReportBuilder;
use crate::config::MonitorConfig;
use crate::dataset::{cycle_index, DatasetSource, Partitioner};
use crate::registry::{get_or_create_project, ProjectTemplate};
use crate::scheduler::Job;
use crate::workspace::WorkspaceStore;

pub const HEARTBEAT_JOB: &str = "heartbeat";
pub const MONITOR_JOB: &str = "monitor";

/// Appends `Task executed at <timestamp>` to a local file on each run.
#[derive(Debug, Clone)]
pub struct HeartbeatJob {
    pub log_path: PathBuf,
}

impl HeartbeatJob {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn beat_at(&self, now: DateTime<Utc>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open {}", self.log_path.display()))?;
        writeln!(file, "Task executed at {}", now.to_rfc3339())?;
        Ok(())
    }
}

impl Job for HeartbeatJob {
    fn name(&self) -> &str {
        HEARTBEAT_JOB
    }

    fn run(&self) -> Result<()> {
        self.beat_at(Utc::now())
    }
}

/// What one monitoring run attached, and where.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub project_id: Uuid,
    pub cycle_index: usize,
    pub current_rows: usize,
    pub report_id: Uuid,
    pub suite_id: Uuid,
    pub dataset_drift_share: Option<f64>,
}

/// Fetch, partition, resolve the project, then attach a report and a test
/// suite.
///
/// The dataset is fetched fresh every run. Runs are not idempotent: two
/// runs with the same cycle index attach two reports.
pub struct MonitorJob {
    store: Arc<dyn WorkspaceStore>,
    source: Arc<dyn DatasetSource>,
    template: ProjectTemplate,
    partitioner: Partitioner,
    builder: ReportBuilder,
    cycles: usize,
}

impl MonitorJob {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        source: Arc<dyn DatasetSource>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            store,
            source,
            template: ProjectTemplate::from_config(config),
            partitioner: config.partitioner(),
            builder: ReportBuilder::from_config(config),
            cycles: config.partition.cycles,
        }
    }

    pub fn run_at(&self, now: DateTime<Utc>) -> Result<MonitorOutcome> {
        self.run_with_index(cycle_index(now, self.cycles))
    }

    pub fn run_with_index(&self, i: usize) -> Result<MonitorOutcome> {
        tracing::info!(cycle_index = i, source = %self.source.describe(), "Fetching dataset");
        let frame = self.source.fetch().context("Failed to fetch dataset")?;
        let partition = self.partitioner.split(&frame)?;
        tracing::debug!(
            rows = frame.n_rows(),
            reference_rows = partition.reference.n_rows(),
            current_rows = partition.current.n_rows(),
            "Dataset partitioned"
        );

        let project = get_or_create_project(self.store.as_ref(), &self.template)?;

        let report = self
            .builder
            .build_report(i, &partition.reference, &partition.current)?;
        self.store.add_report(project.id, &report)?;

        let suite = self
            .builder
            .build_test_suite(i, &partition.reference, &partition.current)?;
        self.store.add_test_suite(project.id, &suite)?;

        let outcome = MonitorOutcome {
            project_id: project.id,
            cycle_index: i,
            current_rows: partition.current_window(i).n_rows(),
            report_id: report.id,
            suite_id: suite.id,
            dataset_drift_share: report.dataset_drift().map(|d| d.share_of_drifted_columns),
        };
        tracing::info!(
            project_id = %outcome.project_id,
            cycle_index = i,
            current_rows = outcome.current_rows,
            drift_share = ?outcome.dataset_drift_share,
            tests_passed = suite.summary.all_passed,
            "Monitoring run attached report and test suite"
        );
        Ok(outcome)
    }
}

impl Job for MonitorJob {
    fn name(&self) -> &str {
        MONITOR_JOB
    }

    fn run(&self) -> Result<()> {
        self.run_at(Utc::now()).map(|_| ())
    }
}
