use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Dashboard;

/// A monitoring project inside a workspace.
///
/// Projects group the reports and test suites produced for one logical
/// monitoring stream, together with the dashboard that plots them. The
/// workspace assigns the id; names are not unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub dashboard: Dashboard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating an existing project. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub dashboard: Option<Dashboard>,
}

impl From<&Project> for UpdateProjectInput {
    fn from(project: &Project) -> Self {
        Self {
            name: Some(project.name.clone()),
            description: project.description.clone(),
            dashboard: Some(project.dashboard.clone()),
        }
    }
}
