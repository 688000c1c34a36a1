//! Monitor configuration.
//!
//! Loaded from a JSON file (every field optional), then overridden from
//! `DRIFTWATCH_*` environment variables. Column names used by reports and
//! dashboard panels live here rather than in the builders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::StatTest;
use crate::client::RemoteWorkspace;
use crate::dataset::{CsvFileSource, CsvUrlSource, DatasetSource, OpenMlSource, Partitioner};
use crate::db::Database;
use crate::workspace::WorkspaceStore;

const APP_NAME: &str = "driftwatch";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub project_name: String,
    pub project_description: String,
    /// Local workspace database. `None` uses the platform data directory.
    pub workspace: Option<PathBuf>,
    /// When set, projects and snapshots go to a remote workspace API instead.
    pub remote_url: Option<String>,
    pub api_key: Option<String>,
    pub dataset: DatasetConfig,
    pub partition: PartitionConfig,
    /// Columns analysed individually, in report and panel order.
    pub columns: Vec<ColumnConfig>,
    /// Title of the leading counter panel.
    pub dashboard_title: String,
    pub schedule: ScheduleConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            project_name: "My First MLOps Project".to_string(),
            project_description: "Drift monitoring with scheduled reports".to_string(),
            workspace: None,
            remote_url: None,
            api_key: None,
            dataset: DatasetConfig::default(),
            partition: PartitionConfig::default(),
            columns: vec![
                ColumnConfig::new("age").with_stattest(StatTest::Wasserstein),
                ColumnConfig::new("education-num").with_stattest(StatTest::Wasserstein),
            ],
            dashboard_title: "Census Income Dataset (Adult)".to_string(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetConfig {
    OpenMl {
        name: String,
        version: u32,
        #[serde(default)]
        base_url: Option<String>,
    },
    CsvFile {
        path: PathBuf,
    },
    CsvUrl {
        url: String,
    },
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::OpenMl {
            name: "adult".to_string(),
            version: 2,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Categorical column whose value decides reference vs current.
    pub column: String,
    /// Values that put a row into the current set.
    pub current_values: Vec<String>,
    pub window_size: usize,
    /// Number of windows the cycle index rotates through.
    pub cycles: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            column: "education".to_string(),
            current_values: vec![
                "Some-college".to_string(),
                "HS-grad".to_string(),
                "Bachelors".to_string(),
            ],
            window_size: 100,
            cycles: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// `None` picks the test from the column kind.
    #[serde(default)]
    pub stattest: Option<StatTest>,
    /// Add a summary metric for this column to each report.
    #[serde(default = "default_true")]
    pub summary: bool,
    /// Add a drift-score bar plot for this column to new dashboards.
    #[serde(default = "default_true")]
    pub panel: bool,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stattest: None,
            summary: true,
            panel: true,
        }
    }

    pub fn with_stattest(mut self, stattest: StatTest) -> Self {
        self.stattest = Some(stattest);
        self
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub heartbeat_secs: u64,
    pub monitor_secs: u64,
    /// Append-only file the heartbeat job writes to.
    pub heartbeat_log: PathBuf,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 120,
            monitor_secs: 60,
            heartbeat_log: PathBuf::from("output.txt"),
        }
    }
}

impl MonitorConfig {
    /// Default config location in the user's config directory.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Load from `path`, or from [`default_path`](Self::default_path) when
    /// `None`. An explicit path must exist; a missing default file yields
    /// the defaults. Environment overrides are applied and the result is
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Apply `DRIFTWATCH_*` overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DRIFTWATCH_WORKSPACE") {
            self.workspace = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DRIFTWATCH_REMOTE_URL") {
            self.remote_url = Some(v);
        }
        if let Some(v) = lookup("DRIFTWATCH_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("DRIFTWATCH_HEARTBEAT_LOG") {
            self.schedule.heartbeat_log = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            bail!("project_name must not be empty");
        }
        if self.partition.window_size == 0 {
            bail!("partition.window_size must be greater than zero");
        }
        if self.partition.cycles == 0 {
            bail!("partition.cycles must be greater than zero");
        }
        if self.schedule.heartbeat_secs == 0 || self.schedule.monitor_secs == 0 {
            bail!("schedule intervals must be greater than zero");
        }
        Ok(())
    }

    pub fn partitioner(&self) -> Partitioner {
        Partitioner::new(
            self.partition.column.clone(),
            self.partition.current_values.clone(),
            self.partition.window_size,
        )
    }

    pub fn dataset_source(&self) -> Arc<dyn DatasetSource> {
        match &self.dataset {
            DatasetConfig::OpenMl {
                name,
                version,
                base_url: Some(base_url),
            } => Arc::new(OpenMlSource::with_base_url(name.clone(), *version, base_url.clone())),
            DatasetConfig::OpenMl { name, version, .. } => {
                Arc::new(OpenMlSource::new(name.clone(), *version))
            }
            DatasetConfig::CsvFile { path } => Arc::new(CsvFileSource::new(path.clone())),
            DatasetConfig::CsvUrl { url } => Arc::new(CsvUrlSource::new(url.clone())),
        }
    }

    /// Open the configured store. Local databases are migrated first.
    pub fn open_store(&self) -> Result<Arc<dyn WorkspaceStore>> {
        if let Some(url) = &self.remote_url {
            tracing::info!("Using remote workspace at {}", url);
            return Ok(Arc::new(RemoteWorkspace::new(url.clone(), self.api_key.clone())));
        }

        let db = match &self.workspace {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(Arc::new(db))
    }
}
