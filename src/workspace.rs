//! The workspace seam: everything the monitoring code needs from a store of
//! projects and snapshots.
//!
//! Two backends implement it: the local SQLite [`Database`] and the HTTP
//! [`RemoteWorkspace`](crate::client::RemoteWorkspace). Jobs receive an
//! `Arc<dyn WorkspaceStore>` built once at start-up.

use anyhow::Result;
use uuid::Uuid;

use crate::analysis::{Report, TestSuite};
use crate::db::Database;
use crate::models::*;

pub trait WorkspaceStore: Send + Sync {
    /// Every project, in creation order.
    fn list_projects(&self) -> Result<Vec<Project>>;

    fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// Persist a new project with no description and an empty dashboard.
    fn create_project(&self, name: &str) -> Result<Project>;

    /// Persist the project's name, description and dashboard.
    fn save_project(&self, project: &Project) -> Result<()>;

    fn add_report(&self, project_id: Uuid, report: &Report) -> Result<Snapshot>;

    fn add_test_suite(&self, project_id: Uuid, suite: &TestSuite) -> Result<Snapshot>;

    /// Snapshots of one project, in the order they were attached.
    fn list_snapshots(&self, project_id: Uuid) -> Result<Vec<Snapshot>>;
}

impl WorkspaceStore for Database {
    fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_all_projects()
    }

    fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Database::get_project(self, id)
    }

    fn create_project(&self, name: &str) -> Result<Project> {
        Database::create_project(
            self,
            CreateProjectInput {
                name: name.to_string(),
                description: None,
            },
        )
    }

    fn save_project(&self, project: &Project) -> Result<()> {
        self.update_project(project.id, UpdateProjectInput::from(project))?
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("Project not found"))
    }

    fn add_report(&self, project_id: Uuid, report: &Report) -> Result<Snapshot> {
        self.add_snapshot(project_id, SnapshotPayload::Report(report.clone()))
    }

    fn add_test_suite(&self, project_id: Uuid, suite: &TestSuite) -> Result<Snapshot> {
        self.add_snapshot(project_id, SnapshotPayload::TestSuite(suite.clone()))
    }

    fn list_snapshots(&self, project_id: Uuid) -> Result<Vec<Snapshot>> {
        self.get_snapshots(project_id)
    }
}
