use std::sync::Arc;

use chrono::{TimeZone, Utc};
use driftwatch::analysis::{MetricResult, StatTest};
use driftwatch::builder::CYCLE_INDEX_KEY;
use driftwatch::config::MonitorConfig;
use driftwatch::dataset::{Column, DatasetError, DatasetSource, Frame};
use driftwatch::db::Database;
use driftwatch::jobs::{HeartbeatJob, MonitorJob};
use driftwatch::models::*;
use driftwatch::registry::{find_project, get_or_create_project, ProjectTemplate};
use driftwatch::workspace::WorkspaceStore;
use speculate2::speculate;

/// Serves a fixed in-memory table.
struct StaticSource(Frame);

impl DatasetSource for StaticSource {
    fn fetch(&self) -> Result<Frame, DatasetError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "static table".to_string()
    }
}

struct FailingSource;

impl DatasetSource for FailingSource {
    fn fetch(&self) -> Result<Frame, DatasetError> {
        Err(DatasetError::NotFound("adult".to_string()))
    }

    fn describe(&self) -> String {
        "nowhere".to_string()
    }
}

/// 500 rows alternating between a current and a reference education value.
fn census_like() -> Frame {
    let rows = 0..500usize;
    Frame::new(vec![
        Column::numeric("age", rows.clone().map(|i| Some(20.0 + (i % 50) as f64)).collect()),
        Column::numeric("education-num", rows.clone().map(|i| Some((i % 16) as f64)).collect()),
        Column::categorical(
            "education",
            rows.clone()
                .map(|i| Some(if i % 2 == 0 { "HS-grad" } else { "Masters" }.to_string()))
                .collect(),
        ),
        Column::categorical(
            "workclass",
            rows.map(|i| Some(if i % 3 == 0 { "State-gov" } else { "Private" }.to_string()))
                .collect(),
        ),
    ])
    .expect("Failed to build frame")
}

fn store() -> Arc<Database> {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to run migrations");
    Arc::new(db)
}

fn monitor(db: &Arc<Database>) -> MonitorJob {
    MonitorJob::new(
        db.clone(),
        Arc::new(StaticSource(census_like())),
        &MonitorConfig::default(),
    )
}

speculate! {
    before {
        let db = store();
        let config = MonitorConfig::default();
    }

    describe "get_or_create_project" {
        it "creates the project once" {
            let template = ProjectTemplate::from_config(&config);

            let first = get_or_create_project(&*db, &template).expect("Failed to resolve");
            let second = get_or_create_project(&*db, &template).expect("Failed to resolve");

            assert_eq!(first.id, second.id);
            assert_eq!(db.list_projects().expect("Query failed").len(), 1);
        }

        it "creates the default dashboard layout" {
            let template = ProjectTemplate::from_config(&config);

            let project = get_or_create_project(&*db, &template).expect("Failed to resolve");

            let titles: Vec<&str> = project.dashboard.panels.iter().map(|p| p.title()).collect();
            assert_eq!(titles, vec![
                "Census Income Dataset (Adult)",
                "Model Calls",
                "Share of Drifted Features",
                "Dataset Quality",
                "Age: Wasserstein drift distance",
                "Education-num: Wasserstein drift distance",
            ]);
            let sizes: Vec<PanelSize> = project.dashboard.panels.iter().map(|p| p.size()).collect();
            assert_eq!(sizes, vec![
                PanelSize::Full,
                PanelSize::Half,
                PanelSize::Half,
                PanelSize::Full,
                PanelSize::Half,
                PanelSize::Half,
            ]);
        }

        it "persists the description and dashboard" {
            let template = ProjectTemplate::from_config(&config);

            let project = get_or_create_project(&*db, &template).expect("Failed to resolve");

            let stored = db.get_project(project.id).expect("Query failed").expect("Missing project");
            assert_eq!(stored.description, Some(config.project_description.clone()));
            assert_eq!(stored.dashboard, template.dashboard);
        }

        it "picks the last of several projects with the same name" {
            db.create_project(CreateProjectInput {
                name: config.project_name.clone(),
                description: None,
            }).expect("Failed to create");
            let last = db.create_project(CreateProjectInput {
                name: config.project_name.clone(),
                description: None,
            }).expect("Failed to create");

            let template = ProjectTemplate::from_config(&config);
            let resolved = get_or_create_project(&*db, &template).expect("Failed to resolve");

            assert_eq!(resolved.id, last.id);
            assert_eq!(db.list_projects().expect("Query failed").len(), 2);
        }
    }

    describe "find_project" {
        it "returns None when no project has the name" {
            let found = find_project(&*db, "absent").expect("Query failed");
            assert!(found.is_none());
        }

        it "returns the last project with the name" {
            for description in ["first", "second"] {
                db.create_project(CreateProjectInput {
                    name: "Adult".to_string(),
                    description: Some(description.to_string()),
                }).expect("Failed to create");
            }

            let found = find_project(&*db, "Adult").expect("Query failed").expect("Missing project");
            assert_eq!(found.description, Some("second".to_string()));
        }
    }

    describe "monitor job" {
        it "attaches a report then a test suite" {
            let outcome = monitor(&db).run_with_index(0).expect("Run failed");

            let snapshots = db.list_snapshots(outcome.project_id).expect("Query failed");
            let kinds: Vec<SnapshotKind> = snapshots.iter().map(|s| s.kind()).collect();
            assert_eq!(kinds, vec![SnapshotKind::Report, SnapshotKind::TestSuite]);
            assert_eq!(snapshots[0].payload.as_report().map(|r| r.id), Some(outcome.report_id));
            assert_eq!(outcome.current_rows, 100);
        }

        it "records the cycle index and a drift share in range" {
            let outcome = monitor(&db).run_with_index(2).expect("Run failed");

            let share = outcome.dataset_drift_share.expect("Missing dataset drift");
            assert!((0.0..=1.0).contains(&share));

            let snapshots = db.list_snapshots(outcome.project_id).expect("Query failed");
            let report = snapshots[0].payload.as_report().expect("Expected a report");
            assert_eq!(report.metadata.get(CYCLE_INDEX_KEY), Some(&"2".to_string()));
            let suite = snapshots[1].payload.as_test_suite().expect("Expected a test suite");
            assert_eq!(suite.metadata.get(CYCLE_INDEX_KEY), Some(&"2".to_string()));
        }

        it "reports the configured columns" {
            let outcome = monitor(&db).run_with_index(0).expect("Run failed");

            let snapshots = db.list_snapshots(outcome.project_id).expect("Query failed");
            let report = snapshots[0].payload.as_report().expect("Expected a report");
            let ids: Vec<&str> = report.metrics.iter().map(|m| m.metric_id()).collect();
            assert_eq!(ids, vec![
                "DatasetDriftMetric",
                "DatasetMissingValuesMetric",
                "ColumnDriftMetric",
                "ColumnSummaryMetric",
                "ColumnDriftMetric",
                "ColumnSummaryMetric",
            ]);
        }

        it "stamps snapshots with the run time" {
            let before = Utc::now();
            let outcome = monitor(&db).run_with_index(0).expect("Run failed");
            let after = Utc::now();

            for snapshot in db.list_snapshots(outcome.project_id).expect("Query failed") {
                assert!(snapshot.timestamp >= before && snapshot.timestamp <= after);
            }
        }

        it "duplicates snapshots when rerun with the same index" {
            let job = monitor(&db);
            let first = job.run_with_index(1).expect("Run failed");
            let second = job.run_with_index(1).expect("Run failed");

            assert_eq!(first.project_id, second.project_id);
            assert_ne!(first.report_id, second.report_id);
            assert_eq!(db.list_snapshots(first.project_id).expect("Query failed").len(), 4);
        }

        it "still attaches an empty window past the end of the current set" {
            let outcome = monitor(&db).run_with_index(4).expect("Run failed");

            assert_eq!(outcome.current_rows, 0);
            assert_eq!(outcome.dataset_drift_share, Some(0.0));
        }

        it "derives the window from the minute" {
            let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 7, 0).unwrap();

            let outcome = monitor(&db).run_at(at).expect("Run failed");

            assert_eq!(outcome.cycle_index, 2);
        }

        it "scores a configured categorical column with its kind's test" {
            let config: MonitorConfig = serde_json::from_str(
                r#"{"columns": [{"name": "age"}, {"name": "workclass"}]}"#,
            ).expect("Failed to parse config");
            let job = MonitorJob::new(db.clone(), Arc::new(StaticSource(census_like())), &config);

            let outcome = job.run_with_index(0).expect("Run failed");

            let snapshots = db.list_snapshots(outcome.project_id).expect("Query failed");
            let report = snapshots[0].payload.as_report().expect("Expected a report");
            let tests: Vec<(String, StatTest)> = report
                .metrics
                .iter()
                .filter_map(|m| match m {
                    MetricResult::ColumnDriftMetric(d) => Some((d.column_name.clone(), d.stattest_name)),
                    _ => None,
                })
                .collect();
            assert_eq!(tests, vec![
                ("age".to_string(), StatTest::Wasserstein),
                ("workclass".to_string(), StatTest::JensenShannon),
            ]);

            let project = db.get_project(outcome.project_id).expect("Query failed").expect("Missing project");
            let titles: Vec<&str> = project.dashboard.panels.iter().map(|p| p.title()).collect();
            assert_eq!(titles[4..], ["Age: drift score", "Workclass: drift score"]);
        }

        it "propagates fetch failures without touching the workspace" {
            let job = MonitorJob::new(db.clone(), Arc::new(FailingSource), &config);

            assert!(job.run_with_index(0).is_err());
            assert!(db.list_projects().expect("Query failed").is_empty());
        }
    }

    describe "heartbeat job" {
        it "appends one line per beat" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("output.txt");
            let job = HeartbeatJob::new(path.clone());
            let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

            job.beat_at(at).expect("Beat failed");
            job.beat_at(at).expect("Beat failed");

            let content = std::fs::read_to_string(&path).expect("Failed to read log");
            let lines: Vec<&str> = content.lines().collect();
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0], format!("Task executed at {}", at.to_rfc3339()));
        }
    }
}
