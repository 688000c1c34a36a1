//! JSON API over a local workspace, consumed by [`RemoteWorkspace`](crate::client::RemoteWorkspace).

mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use middleware::{auth_middleware, SecurityConfig};

pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project).put(handlers::update_project),
        )
        // Snapshots
        .route("/projects/{id}/snapshots", get(handlers::list_snapshots))
        .route("/projects/{id}/reports", post(handlers::add_report))
        .route("/projects/{id}/test-suites", post(handlers::add_test_suite))
        // Dashboard
        .route("/projects/{id}/dashboard", get(handlers::get_dashboard))
        .route_layer(from_fn_with_state(security, auth_middleware))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
