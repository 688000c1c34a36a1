use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Snapshot;

/// The panel layout attached to a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub panels: Vec<DashboardPanel>,
}

impl Dashboard {
    pub fn add_panel(&mut self, panel: impl Into<DashboardPanel>) {
        self.panels.push(panel.into());
    }

    /// Resolve every panel against the project's snapshots.
    ///
    /// Only report snapshots contribute points, ordered by timestamp.
    /// Snapshots rejected by a panel's filter are skipped for that panel.
    pub fn evaluate(&self, snapshots: &[Snapshot]) -> Vec<PanelData> {
        let mut ordered: Vec<&Snapshot> = snapshots
            .iter()
            .filter(|s| s.payload.as_report().is_some())
            .collect();
        ordered.sort_by_key(|s| s.timestamp);

        self.panels
            .iter()
            .map(|panel| panel.evaluate(&ordered))
            .collect()
    }
}

/// A single dashboard widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardPanel {
    Counter(CounterPanel),
    Plot(PlotPanel),
}

impl DashboardPanel {
    pub fn title(&self) -> &str {
        match self {
            Self::Counter(c) => &c.title,
            Self::Plot(p) => &p.title,
        }
    }

    pub fn size(&self) -> PanelSize {
        match self {
            Self::Counter(c) => c.size,
            Self::Plot(p) => p.size,
        }
    }

    fn evaluate(&self, snapshots: &[&Snapshot]) -> PanelData {
        match self {
            Self::Counter(counter) => {
                let series: Vec<PanelSeries> = counter
                    .value
                    .iter()
                    .map(|v| PanelSeries::collect(v, &counter.filter, snapshots))
                    .collect();
                let value = series.first().and_then(|s| counter.agg.apply(&s.points));
                PanelData {
                    title: counter.title.clone(),
                    text: counter.text.clone(),
                    value,
                    series,
                }
            }
            Self::Plot(plot) => PanelData {
                title: plot.title.clone(),
                text: None,
                value: None,
                series: plot
                    .values
                    .iter()
                    .map(|v| PanelSeries::collect(v, &plot.filter, snapshots))
                    .collect(),
            },
        }
    }
}

impl From<CounterPanel> for DashboardPanel {
    fn from(panel: CounterPanel) -> Self {
        Self::Counter(panel)
    }
}

impl From<PlotPanel> for DashboardPanel {
    fn from(panel: PlotPanel) -> Self {
        Self::Plot(panel)
    }
}

/// A single-number widget, optionally aggregated over all matching snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterPanel {
    pub title: String,
    #[serde(default)]
    pub filter: ReportFilter,
    pub value: Option<PanelValue>,
    pub text: Option<String>,
    pub agg: CounterAgg,
    #[serde(default)]
    pub size: PanelSize,
}

/// A time-series widget with one line/bar group per value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotPanel {
    pub title: String,
    #[serde(default)]
    pub filter: ReportFilter,
    pub values: Vec<PanelValue>,
    pub plot_type: PlotType,
    #[serde(default)]
    pub size: PanelSize,
}

/// Reference to one numeric field of one metric result.
///
/// `metric_args` narrows the match to metric instances whose serialized
/// fields equal the given values (e.g. `column_name = "age"`).
/// `field_path` is dot separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelValue {
    pub metric_id: String,
    #[serde(default)]
    pub metric_args: BTreeMap<String, String>,
    pub field_path: String,
    pub legend: Option<String>,
}

impl PanelValue {
    pub fn new(metric_id: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            metric_id: metric_id.into(),
            metric_args: BTreeMap::new(),
            field_path: field_path.into(),
            legend: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metric_args.insert(key.into(), value.into());
        self
    }

    pub fn with_legend(mut self, legend: impl Into<String>) -> Self {
        self.legend = Some(legend.into());
        self
    }
}

/// Selects which snapshots a panel reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub metadata_values: BTreeMap<String, String>,
    #[serde(default)]
    pub tag_values: Vec<String>,
}

impl ReportFilter {
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        let tags = snapshot.tags();
        let metadata = snapshot.metadata();
        self.tag_values.iter().all(|t| tags.contains(t))
            && self
                .metadata_values
                .iter()
                .all(|(k, v)| metadata.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterAgg {
    None,
    Sum,
    Last,
}

impl CounterAgg {
    fn apply(self, points: &[PanelPoint]) -> Option<f64> {
        match self {
            Self::None => None,
            Self::Sum => Some(points.iter().map(|p| p.value).sum()),
            Self::Last => points.last().map(|p| p.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotType {
    Line,
    Bar,
    Scatter,
    Histogram,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelSize {
    Half,
    #[default]
    Full,
}

/// A panel resolved against stored snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelData {
    pub title: String,
    pub text: Option<String>,
    /// Aggregated counter value; `None` for plots and `CounterAgg::None`.
    pub value: Option<f64>,
    pub series: Vec<PanelSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSeries {
    pub legend: String,
    pub points: Vec<PanelPoint>,
}

impl PanelSeries {
    fn collect(value: &PanelValue, filter: &ReportFilter, snapshots: &[&Snapshot]) -> Self {
        let points = snapshots
            .iter()
            .filter(|s| filter.matches(s))
            .filter_map(|s| {
                let report = s.payload.as_report()?;
                Some(PanelPoint {
                    timestamp: s.timestamp,
                    value: report.resolve(value)?,
                })
            })
            .collect();

        Self {
            legend: value
                .legend
                .clone()
                .unwrap_or_else(|| value.field_path.clone()),
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
