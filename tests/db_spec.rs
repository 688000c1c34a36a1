use driftwatch::analysis::{MetricSpec, ReportSpec, SuiteSpec, TestSpec};
use driftwatch::dataset::{Column, Frame};
use driftwatch::db::Database;
use driftwatch::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_project(db: &Database) -> Project {
    db.create_project(CreateProjectInput {
        name: "Test Project".to_string(),
        description: None,
    })
    .expect("Failed to create project")
}

fn frame(values: &[f64]) -> Frame {
    Frame::new(vec![Column::numeric(
        "age",
        values.iter().copied().map(Some).collect(),
    )])
    .expect("Failed to build frame")
}

fn report_payload() -> SnapshotPayload {
    let report = ReportSpec::new(vec![MetricSpec::dataset_drift()])
        .run(&frame(&[1.0, 2.0, 3.0]), &frame(&[2.0, 3.0, 4.0]))
        .expect("Failed to run report");
    SnapshotPayload::Report(report)
}

fn suite_payload() -> SnapshotPayload {
    let suite = SuiteSpec::new(vec![TestSpec::data_drift_preset()])
        .run(&frame(&[1.0, 2.0, 3.0]), &frame(&[1.0, 2.0, 3.0]))
        .expect("Failed to run suite");
    SnapshotPayload::TestSuite(suite)
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "projects" {
        describe "create_project" {
            it "creates a project with an empty dashboard" {
                let project = db.create_project(CreateProjectInput {
                    name: "My Project".to_string(),
                    description: None,
                }).expect("Failed to create project");

                assert_eq!(project.name, "My Project");
                assert!(project.description.is_none());
                assert!(project.dashboard.panels.is_empty());
            }

            it "keeps the description" {
                let project = db.create_project(CreateProjectInput {
                    name: "Described".to_string(),
                    description: Some("Drift on census data".to_string()),
                }).expect("Failed to create project");

                assert_eq!(project.description, Some("Drift on census data".to_string()));
            }
        }

        describe "get_project" {
            it "returns None for non-existent project" {
                let result = db.get_project(Uuid::new_v4()).expect("Query failed");
                assert!(result.is_none());
            }

            it "returns the project by id" {
                let created = create_test_project(&db);

                let found = db.get_project(created.id).expect("Query failed");
                assert_eq!(found.map(|p| p.name), Some("Test Project".to_string()));
            }
        }

        describe "get_all_projects" {
            it "returns empty list when no projects exist" {
                let projects = db.get_all_projects().expect("Query failed");
                assert!(projects.is_empty());
            }

            it "returns projects in creation order" {
                for name in ["Zebra", "Alpha", "Zebra"] {
                    db.create_project(CreateProjectInput {
                        name: name.to_string(),
                        description: None,
                    }).expect("Failed to create");
                }

                let names: Vec<String> = db
                    .get_all_projects()
                    .expect("Query failed")
                    .into_iter()
                    .map(|p| p.name)
                    .collect();
                assert_eq!(names, vec!["Zebra", "Alpha", "Zebra"]);
            }
        }

        describe "update_project" {
            it "persists the dashboard" {
                let project = create_test_project(&db);
                let mut dashboard = Dashboard::default();
                dashboard.add_panel(CounterPanel {
                    title: "Title".to_string(),
                    filter: ReportFilter::default(),
                    value: None,
                    text: None,
                    agg: CounterAgg::None,
                    size: PanelSize::Full,
                });

                db.update_project(project.id, UpdateProjectInput {
                    dashboard: Some(dashboard.clone()),
                    ..Default::default()
                }).expect("Failed to update");

                let found = db.get_project(project.id).expect("Query failed").expect("Missing project");
                assert_eq!(found.dashboard, dashboard);
                assert_eq!(found.name, "Test Project");
            }

            it "returns None for non-existent project" {
                let result = db
                    .update_project(Uuid::new_v4(), UpdateProjectInput::default())
                    .expect("Query failed");
                assert!(result.is_none());
            }
        }
    }

    describe "snapshots" {
        describe "add_snapshot" {
            it "fails for an unknown project" {
                let result = db.add_snapshot(Uuid::new_v4(), report_payload());
                assert!(result.is_err());
            }

            it "stamps the snapshot with the payload timestamp" {
                let project = create_test_project(&db);
                let payload = report_payload();
                let expected = payload.as_report().map(|r| r.timestamp);

                let snapshot = db.add_snapshot(project.id, payload).expect("Failed to add");

                assert_eq!(Some(snapshot.timestamp), expected);
                assert_eq!(snapshot.project_id, project.id);
                assert_eq!(snapshot.kind(), SnapshotKind::Report);
            }
        }

        describe "get_snapshots" {
            it "returns snapshots in the order they were attached" {
                let project = create_test_project(&db);
                let first = db.add_snapshot(project.id, report_payload()).expect("Failed");
                let second = db.add_snapshot(project.id, suite_payload()).expect("Failed");
                let third = db.add_snapshot(project.id, report_payload()).expect("Failed");

                let ids: Vec<Uuid> = db
                    .get_snapshots(project.id)
                    .expect("Query failed")
                    .iter()
                    .map(|s| s.id)
                    .collect();
                assert_eq!(ids, vec![first.id, second.id, third.id]);
            }

            it "decodes the payload kind" {
                let project = create_test_project(&db);
                db.add_snapshot(project.id, suite_payload()).expect("Failed");

                let snapshots = db.get_snapshots(project.id).expect("Query failed");
                assert_eq!(snapshots.len(), 1);
                let suite = snapshots[0].payload.as_test_suite().expect("Expected a test suite");
                assert!(suite.summary.all_passed);
            }

            it "keeps snapshots separate per project" {
                let a = create_test_project(&db);
                let b = create_test_project(&db);
                db.add_snapshot(a.id, report_payload()).expect("Failed");

                assert_eq!(db.get_snapshots(a.id).expect("Query failed").len(), 1);
                assert!(db.get_snapshots(b.id).expect("Query failed").is_empty());
            }
        }
    }
}
