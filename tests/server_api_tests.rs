use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use covid_explorer::config::AppConfig;
use covid_explorer::data::{DataSource, DatasetLoader};
use covid_explorer::server::routes::build_router;
use tower::ServiceExt;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/jhu")
}

fn test_config() -> AppConfig {
    AppConfig {
        data_dir: fixture_dir(),
        static_dir: PathBuf::from("/nonexistent/frontend/dist"),
        ..AppConfig::default()
    }
}

fn app_with(config: AppConfig) -> Router {
    let dataset = DatasetLoader::new(DataSource::new(&config.data_dir))
        .load()
        .expect("fixture dataset should load");
    build_router(dataset, &config)
}

fn app() -> Router {
    app_with(test_config())
}

async fn get_raw(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get_raw(app, uri).await;
    let payload = serde_json::from_str(&body).expect("response should be valid json");
    (status, payload)
}

#[tokio::test]
async fn health_endpoint_returns_ok_json() {
    let (status, payload) = get_json(app(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["service"], "covid-explorer");
}

#[tokio::test]
async fn regions_endpoint_lists_aggregated_regions() {
    let (status, payload) = get_json(app(), "/api/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload["regions"],
        serde_json::json!(["Australia", "Canada", "Germany", "Korea, South"])
    );
    assert_eq!(payload["default_region"], "Germany");
    assert_eq!(payload["first_date"], "2020-01-22");
    assert_eq!(payload["last_date"], "2020-01-26");
    assert_eq!(payload["days"], 5);
    assert_eq!(
        payload["metrics"],
        serde_json::json!(["confirmed", "deaths", "recovered"])
    );
}

#[tokio::test]
async fn series_endpoint_filters_region_and_dates() {
    let (status, payload) = get_json(
        app(),
        "/api/series?region=Australia&start=2020-01-25&end=2020-01-26",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], 2);

    let records = payload["records"].as_array().expect("records should be an array");
    let points: Vec<(&str, u64)> = records
        .iter()
        .map(|r| (r["date"].as_str().unwrap(), r["confirmed"].as_u64().unwrap()))
        .collect();
    assert_eq!(points, vec![("2020-01-25", 1), ("2020-01-26", 4)]);
    assert!(records.iter().all(|r| r["region"] == "Australia"));
}

#[tokio::test]
async fn series_endpoint_accepts_repeated_regions_with_commas() {
    let (status, payload) = get_json(
        app(),
        "/api/series?region=Korea%2C+South&region=Canada&start=2020-01-26",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let regions: Vec<&str> = payload["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["region"].as_str().unwrap())
        .collect();
    assert_eq!(regions, vec!["Canada", "Korea, South"]);
}

#[tokio::test]
async fn series_outside_observed_range_is_empty_not_error() {
    let (status, payload) = get_json(app(), "/api/series?region=Germany&start=2021-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], 0);
    assert!(payload["range"].is_null());
    assert_eq!(payload["records"], serde_json::json!([]));
}

#[tokio::test]
async fn series_for_absent_region_is_empty() {
    let (status, payload) = get_json(app(), "/api/series?region=Atlantis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], 0);
}

#[tokio::test]
async fn series_clamps_and_ignores_bad_dates() {
    let (status, payload) = get_json(
        app(),
        "/api/series?region=Germany&start=not-a-date&end=2030-12-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["count"], 5);
    assert_eq!(payload["range"]["start"], "2020-01-22");
    assert_eq!(payload["range"]["end"], "2020-01-26");
}

#[tokio::test]
async fn series_aggregate_returns_daily_totals() {
    let (status, payload) = get_json(app(), "/api/series?aggregate=total").await;
    assert_eq!(status, StatusCode::OK);
    assert!(payload.get("records").is_none());
    let totals = payload["totals"].as_array().expect("totals should be an array");
    assert_eq!(totals.len(), 5);
    let last = totals.last().unwrap();
    assert_eq!(last["date"], "2020-01-26");
    assert_eq!(last["confirmed"], 8);
    assert_eq!(last["recovered"], 1);
    assert_eq!(last["regions"], 4);
}

#[tokio::test]
async fn region_series_endpoint_includes_active_cases() {
    let (status, payload) = get_json(app(), "/api/regions/Korea%2C%20South/series").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["region"], "Korea, South");
    let points = payload["points"].as_array().unwrap();
    assert_eq!(points.len(), 5);
    let last = points.last().unwrap();
    assert_eq!(last["confirmed"], 3);
    assert_eq!(last["recovered"], 1);
    assert_eq!(last["deaths"], 0);
    assert_eq!(last["confirmed_active"], 2);
}

#[tokio::test]
async fn summary_endpoint_totals_last_day() {
    let (status, payload) = get_json(app(), "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["last_updated"], "2020-01-26");
    assert_eq!(payload["confirmed"], 8);
    assert_eq!(payload["deaths"], 0);
    assert_eq!(payload["recovered"], 1);
    assert_eq!(payload["active"], 7);
}

#[tokio::test]
async fn map_endpoint_returns_location_points() {
    let (status, payload) = get_json(app(), "/api/map?metric=confirmed&day=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["date"], "2020-01-22");
    assert_eq!(payload["days"], 5);
    let points = payload["points"].as_array().unwrap();
    assert_eq!(points.len(), 6, "one point per source row");
    let korea = points
        .iter()
        .find(|p| p["region"] == "Korea, South")
        .expect("korea should be on the map");
    assert_eq!(korea["value"], 1);
    assert_eq!(korea["value_string"], "1");
}

#[tokio::test]
async fn map_endpoint_defaults_to_last_day() {
    let (status, payload) = get_json(app(), "/api/map?metric=Recovered").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["metric"], "recovered");
    assert_eq!(payload["day"], 4);
    assert_eq!(payload["points"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn map_endpoint_rejects_unknown_metric() {
    let (status, payload) = get_json(app(), "/api/map?metric=hospitalized").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["status"], "error");
    assert!(payload["message"].as_str().unwrap().contains("hospitalized"));
}

#[tokio::test]
async fn table_endpoint_returns_region_matrix() {
    let (status, payload) = get_json(app(), "/api/table/deaths").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["title"], "COVID-19 Related Deaths");
    assert_eq!(payload["dates"].as_array().unwrap().len(), 5);
    let rows = payload["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["region"], "Australia");
}

#[tokio::test]
async fn unknown_api_route_is_json_404() {
    let (status, payload) = get_json(app(), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload["message"], "Route not found");
}

#[tokio::test]
async fn index_serves_console_unless_headless() {
    let (status, body) = get_raw(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("COVID-19 Data Explorer"));

    let headless = AppConfig {
        headless: true,
        ..test_config()
    };
    let (status, _) = get_raw(app_with(headless), "/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_headers_only_when_enabled() {
    let request = || {
        Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://example.com")
            .body(Body::empty())
            .unwrap()
    };

    let response = app().oneshot(request()).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let cors = AppConfig {
        cors: true,
        ..test_config()
    };
    let response = app_with(cors).oneshot(request()).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
