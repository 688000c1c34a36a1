//! Resolving the monitoring project by name, creating it with its dashboard
//! on first use.

use anyhow::Result;

use crate::analysis::StatTest;
use crate::config::{ColumnConfig, MonitorConfig};
use crate::models::*;
use crate::workspace::WorkspaceStore;

/// Everything needed to create a project: identity plus its initial panels.
#[derive(Debug, Clone)]
pub struct ProjectTemplate {
    pub name: String,
    pub description: String,
    pub dashboard: Dashboard,
}

impl ProjectTemplate {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let panel_columns: Vec<ColumnConfig> = config
            .columns
            .iter()
            .filter(|c| c.panel)
            .cloned()
            .collect();
        Self {
            name: config.project_name.clone(),
            description: config.project_description.clone(),
            dashboard: monitoring_dashboard(&config.dashboard_title, &panel_columns),
        }
    }
}

/// The standard monitoring layout.
///
/// In order: a title counter, a summed row counter, a last-value drift
/// share counter, a drift/missing-values line plot, then one drift-score
/// bar plot per column.
pub fn monitoring_dashboard(title: &str, drift_columns: &[ColumnConfig]) -> Dashboard {
    let mut dashboard = Dashboard::default();

    dashboard.add_panel(CounterPanel {
        title: title.to_string(),
        filter: ReportFilter::default(),
        value: None,
        text: None,
        agg: CounterAgg::None,
        size: PanelSize::Full,
    });
    dashboard.add_panel(CounterPanel {
        title: "Model Calls".to_string(),
        filter: ReportFilter::default(),
        value: Some(
            PanelValue::new("DatasetMissingValuesMetric", "current.number_of_rows")
                .with_legend("count"),
        ),
        text: Some("count".to_string()),
        agg: CounterAgg::Sum,
        size: PanelSize::Half,
    });
    dashboard.add_panel(CounterPanel {
        title: "Share of Drifted Features".to_string(),
        filter: ReportFilter::default(),
        value: Some(
            PanelValue::new("DatasetDriftMetric", "share_of_drifted_columns").with_legend("share"),
        ),
        text: Some("share".to_string()),
        agg: CounterAgg::Last,
        size: PanelSize::Half,
    });
    dashboard.add_panel(PlotPanel {
        title: "Dataset Quality".to_string(),
        filter: ReportFilter::default(),
        values: vec![
            PanelValue::new("DatasetDriftMetric", "share_of_drifted_columns")
                .with_legend("Drift Share"),
            PanelValue::new("DatasetMissingValuesMetric", "current.share_of_missing_values")
                .with_legend("Missing Values Share"),
        ],
        plot_type: PlotType::Line,
        size: PanelSize::Full,
    });
    for column in drift_columns {
        let title = match column.stattest {
            Some(test) => format!(
                "{}: {} drift distance",
                capitalize(&column.name),
                stattest_label(test)
            ),
            None => format!("{}: drift score", capitalize(&column.name)),
        };
        dashboard.add_panel(PlotPanel {
            title,
            filter: ReportFilter::default(),
            values: vec![PanelValue::new("ColumnDriftMetric", "drift_score")
                .with_arg("column_name", column.name.clone())
                .with_legend("Drift Score")],
            plot_type: PlotType::Bar,
            size: PanelSize::Half,
        });
    }

    dashboard
}

fn stattest_label(test: StatTest) -> &'static str {
    match test {
        StatTest::Wasserstein => "Wasserstein",
        StatTest::JensenShannon => "Jensen-Shannon",
        StatTest::Psi => "PSI",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The project named `name`, if any.
///
/// Names are not unique in a workspace. When several projects share the
/// name, the one listed last wins.
pub fn find_project(store: &dyn WorkspaceStore, name: &str) -> Result<Option<Project>> {
    Ok(store.list_projects()?.into_iter().rev().find(|p| p.name == name))
}

/// Find the project named `template.name` (see [`find_project`]), or
/// create it.
pub fn get_or_create_project(
    store: &dyn WorkspaceStore,
    template: &ProjectTemplate,
) -> Result<Project> {
    match find_project(store, &template.name)? {
        Some(project) => Ok(project),
        None => create_project(store, template),
    }
}

/// Create a project with the template's description and dashboard and
/// persist it before returning.
pub fn create_project(store: &dyn WorkspaceStore, template: &ProjectTemplate) -> Result<Project> {
    let mut project = store.create_project(&template.name)?;
    project.description = Some(template.description.clone());
    project.dashboard = template.dashboard.clone();
    store.save_project(&project)?;

    tracing::info!(
        project_id = %project.id,
        panels = project.dashboard.panels.len(),
        "Created project '{}'",
        project.name
    );
    Ok(project)
}
