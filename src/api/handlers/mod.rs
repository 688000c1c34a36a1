use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::analysis::{Report, TestSuite};
use crate::db::Database;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// "not found" errors (attaching to an unknown project) are exposed as-is
/// with a NOT_FOUND status.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::NOT_FOUND, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(db): State<Database>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn get_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(db): State<Database>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), (StatusCode, String)> {
    if input.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Project name must not be empty".to_string(),
        ));
    }
    db.create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_project(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, (StatusCode, String)> {
    db.update_project(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

// ============================================================
// Snapshots
// ============================================================

pub async fn list_snapshots(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Snapshot>>, (StatusCode, String)> {
    db.get_snapshots(project_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn add_report(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(report): Json<Report>,
) -> Result<(StatusCode, Json<Snapshot>), (StatusCode, String)> {
    db.add_snapshot(project_id, SnapshotPayload::Report(report))
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

pub async fn add_test_suite(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
    Json(suite): Json<TestSuite>,
) -> Result<(StatusCode, Json<Snapshot>), (StatusCode, String)> {
    db.add_snapshot(project_id, SnapshotPayload::TestSuite(suite))
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

// ============================================================
// Dashboard
// ============================================================

pub async fn get_dashboard(
    State(db): State<Database>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<PanelData>>, (StatusCode, String)> {
    let project = db
        .get_project(project_id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;
    let snapshots = db.get_snapshots(project_id).map_err(internal_error)?;
    Ok(Json(project.dashboard.evaluate(&snapshots)))
}
