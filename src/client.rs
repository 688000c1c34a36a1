//! Blocking HTTP client for a remote workspace.
//!
//! Talks to the API served by `driftwatch serve` (see [`crate::api`]).
//! Configuration comes from the monitor config or environment:
//! - `DRIFTWATCH_REMOTE_URL` - Base URL, e.g. `http://localhost:3000/api/v1`
//! - `DRIFTWATCH_API_KEY` - Bearer token (optional)
//!
//! Calls block; use them from the blocking pool, never from async code.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::analysis::{Report, TestSuite};
use crate::models::*;
use crate::workspace::WorkspaceStore;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

/// A [`WorkspaceStore`] backed by a remote workspace API.
#[derive(Debug, Clone)]
pub struct RemoteWorkspace {
    base_url: String,
    api_key: Option<String>,
}

impl RemoteWorkspace {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a request with optional auth header.
    ///
    /// A fresh blocking client per request: a blocking client owns a
    /// runtime and must not be dropped inside async code.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = Client::new().request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json()?)
        } else {
            let body = response.text().unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        let response = self.request(Method::GET, "/projects").send()?;
        Self::handle_response(response)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/projects/{}", id))
            .send()?;
        match Self::handle_response(response) {
            Ok(project) => Ok(Some(project)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn create_project(&self, input: &CreateProjectInput) -> Result<Project, ClientError> {
        let response = self
            .request(Method::POST, "/projects")
            .json(input)
            .send()?;
        Self::handle_response(response)
    }

    pub fn update_project(
        &self,
        id: Uuid,
        input: &UpdateProjectInput,
    ) -> Result<Project, ClientError> {
        let response = self
            .request(Method::PUT, &format!("/projects/{}", id))
            .json(input)
            .send()?;
        Self::handle_response(response)
    }

    pub fn add_report(&self, project_id: Uuid, report: &Report) -> Result<Snapshot, ClientError> {
        let response = self
            .request(Method::POST, &format!("/projects/{}/reports", project_id))
            .json(report)
            .send()?;
        Self::handle_response(response)
    }

    pub fn add_test_suite(
        &self,
        project_id: Uuid,
        suite: &TestSuite,
    ) -> Result<Snapshot, ClientError> {
        let response = self
            .request(Method::POST, &format!("/projects/{}/test-suites", project_id))
            .json(suite)
            .send()?;
        Self::handle_response(response)
    }

    pub fn list_snapshots(&self, project_id: Uuid) -> Result<Vec<Snapshot>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/projects/{}/snapshots", project_id))
            .send()?;
        Self::handle_response(response)
    }

    pub fn get_dashboard(&self, project_id: Uuid) -> Result<Vec<PanelData>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/projects/{}/dashboard", project_id))
            .send()?;
        Self::handle_response(response)
    }
}

impl WorkspaceStore for RemoteWorkspace {
    fn list_projects(&self) -> anyhow::Result<Vec<Project>> {
        Ok(RemoteWorkspace::list_projects(self)?)
    }

    fn get_project(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        Ok(RemoteWorkspace::get_project(self, id)?)
    }

    fn create_project(&self, name: &str) -> anyhow::Result<Project> {
        Ok(RemoteWorkspace::create_project(
            self,
            &CreateProjectInput {
                name: name.to_string(),
                description: None,
            },
        )?)
    }

    fn save_project(&self, project: &Project) -> anyhow::Result<()> {
        RemoteWorkspace::update_project(self, project.id, &UpdateProjectInput::from(project))?;
        Ok(())
    }

    fn add_report(&self, project_id: Uuid, report: &Report) -> anyhow::Result<Snapshot> {
        Ok(RemoteWorkspace::add_report(self, project_id, report)?)
    }

    fn add_test_suite(&self, project_id: Uuid, suite: &TestSuite) -> anyhow::Result<Snapshot> {
        Ok(RemoteWorkspace::add_test_suite(self, project_id, suite)?)
    }

    fn list_snapshots(&self, project_id: Uuid) -> anyhow::Result<Vec<Snapshot>> {
        Ok(RemoteWorkspace::list_snapshots(self, project_id)?)
    }
}
