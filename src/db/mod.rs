//! SQLite-backed local workspace.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use uuid::Uuid;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open workspace at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "driftwatch")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("workspace.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Project operations
    // ============================================================

    /// All projects in creation order.
    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, dashboard, created_at, updated_at
             FROM projects ORDER BY rowid",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, dashboard, created_at, updated_at
             FROM projects WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(project_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let dashboard = Dashboard::default();

        conn.execute(
            "INSERT INTO projects (id, name, description, dashboard, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                serde_json::to_string(&dashboard)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        tracing::debug!(project_id = %id, name = %input.name, "project created");

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            dashboard,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let dashboard = input.dashboard.unwrap_or(existing.dashboard);

        conn.execute(
            "UPDATE projects SET name = ?, description = ?, dashboard = ?, updated_at = ? WHERE id = ?",
            (
                &name,
                &description,
                serde_json::to_string(&dashboard)?,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Project {
            id,
            name,
            description,
            dashboard,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    // ============================================================
    // Snapshot operations
    // ============================================================

    /// Append a report or test suite to a project. Never replaces.
    pub fn add_snapshot(&self, project_id: Uuid, payload: SnapshotPayload) -> Result<Snapshot> {
        self.get_project(project_id)?
            .ok_or_else(|| anyhow::anyhow!("Project not found"))?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let timestamp = match &payload {
            SnapshotPayload::Report(r) => r.timestamp,
            SnapshotPayload::TestSuite(s) => s.timestamp,
        };

        conn.execute(
            "INSERT INTO snapshots (id, project_id, kind, timestamp, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                project_id.to_string(),
                payload.kind().as_str(),
                timestamp.to_rfc3339(),
                serde_json::to_string(&payload)?,
                Utc::now().to_rfc3339(),
            ),
        )?;

        Ok(Snapshot {
            id,
            project_id,
            timestamp,
            payload,
        })
    }

    /// Snapshots of a project in the order they were attached.
    pub fn get_snapshots(&self, project_id: Uuid) -> Result<Vec<Snapshot>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_id, timestamp, payload
             FROM snapshots WHERE project_id = ? ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map([project_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, project_id, timestamp, payload)| {
                Ok(Snapshot {
                    id: parse_uuid(id),
                    project_id: parse_uuid(project_id),
                    timestamp: parse_datetime(timestamp),
                    payload: serde_json::from_str(&payload)
                        .context("Failed to decode snapshot payload")?,
                })
            })
            .collect()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let dashboard: String = row.get(3)?;
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        dashboard: serde_json::from_str(&dashboard).unwrap_or_default(),
        created_at: parse_datetime(row.get::<_, String>(4)?),
        updated_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
