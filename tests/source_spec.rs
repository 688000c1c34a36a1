use std::io::Write;

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use driftwatch::dataset::{
    ColumnKind, CsvFileSource, CsvUrlSource, DatasetError, DatasetSource, Frame, OpenMlSource,
};

const ADULT_FILE_ID: u64 = 1595261;

const ADULT_CSV: &str = "\
age,workclass,education,hours-per-week
39,State-gov,Bachelors,40
50,?,HS-grad,13
";

async fn list_datasets(Path((name, version)): Path<(String, u32)>) -> Response {
    match (name.as_str(), version) {
        ("adult", 2) => Json(serde_json::json!({
            "data": { "dataset": [{ "did": 1590, "name": "adult", "file_id": ADULT_FILE_ID }] }
        }))
        .into_response(),
        ("empty", _) => Json(serde_json::json!({ "data": { "dataset": [] } })).into_response(),
        ("gone", _) => StatusCode::NOT_FOUND.into_response(),
        // OpenML's answer for "no matching datasets".
        _ => (
            StatusCode::PRECONDITION_FAILED,
            Json(serde_json::json!({ "error": { "code": "372", "message": "No results" } })),
        )
            .into_response(),
    }
}

async fn get_csv(Path(file_id): Path<u64>) -> Response {
    if file_id == ADULT_FILE_ID {
        ADULT_CSV.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Serve a minimal OpenML lookalike on an ephemeral port.
async fn serve() -> String {
    let app = Router::new()
        .route(
            "/api/v1/json/data/list/data_name/{name}/data_version/{version}",
            get(list_datasets),
        )
        .route("/data/get_csv/{file_id}", get(get_csv))
        .route("/files/adult.csv", get(|| async { ADULT_CSV }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{}", addr)
}

/// Fetch on the blocking pool; sources use a blocking HTTP client.
async fn fetch(source: impl DatasetSource + 'static) -> Result<Frame, DatasetError> {
    tokio::task::spawn_blocking(move || source.fetch())
        .await
        .expect("Blocking task panicked")
}

fn assert_adult(frame: &Frame) {
    assert_eq!(frame.n_rows(), 2);
    let names: Vec<&str> = frame.column_names().collect();
    assert_eq!(names, vec!["age", "workclass", "education", "hours-per-week"]);
    assert_eq!(frame.missing_cells(), 1);
    assert_eq!(frame.column("age").map(|c| c.kind()), Some(ColumnKind::Numeric));
    assert_eq!(
        frame.column("workclass").map(|c| c.kind()),
        Some(ColumnKind::Categorical)
    );
}

mod openml {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn resolves_the_file_id_then_downloads_the_csv() {
        let base_url = serve().await;

        let frame = fetch(OpenMlSource::with_base_url("adult", 2, base_url))
            .await
            .expect("Fetch failed");

        assert_adult(&frame);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn maps_precondition_failed_to_not_found() {
        let base_url = serve().await;

        let result = fetch(OpenMlSource::with_base_url("nope", 1, base_url)).await;

        match result {
            Err(DatasetError::NotFound(what)) => assert_eq!(what, "openml nope v1"),
            other => panic!("expected NotFound, got {:?}", other.map(|f| f.n_rows())),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn maps_a_missing_listing_to_not_found() {
        let base_url = serve().await;

        let result = fetch(OpenMlSource::with_base_url("gone", 1, base_url)).await;

        assert!(matches!(result, Err(DatasetError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn treats_an_empty_listing_as_not_found() {
        let base_url = serve().await;

        let result = fetch(OpenMlSource::with_base_url("empty", 1, base_url)).await;

        assert!(matches!(result, Err(DatasetError::NotFound(_))));
    }

    #[test]
    fn trims_the_trailing_slash_from_the_base_url() {
        let source = OpenMlSource::with_base_url("adult", 2, "http://localhost:8080/");

        assert_eq!(source.base_url, "http://localhost:8080");
        assert_eq!(source.describe(), "openml adult v2");
    }
}

mod csv_url {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn downloads_and_parses_the_document() {
        let base_url = serve().await;

        let frame = fetch(CsvUrlSource::new(format!("{}/files/adult.csv", base_url)))
            .await
            .expect("Fetch failed");

        assert_adult(&frame);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn surfaces_http_errors() {
        let base_url = serve().await;

        let result = fetch(CsvUrlSource::new(format!("{}/files/absent.csv", base_url))).await;

        assert!(matches!(result, Err(DatasetError::Http(_))));
    }
}

mod csv_file {
    use super::*;

    #[test]
    fn reads_a_local_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(ADULT_CSV.as_bytes()).expect("Failed to write CSV");

        let frame = CsvFileSource::new(file.path())
            .fetch()
            .expect("Fetch failed");

        assert_adult(&frame);
    }

    #[test]
    fn reports_a_missing_file_as_io() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let result = CsvFileSource::new(dir.path().join("absent.csv")).fetch();

        assert!(matches!(result, Err(DatasetError::Io(_))));
    }
}
