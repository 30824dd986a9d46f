//! API 라우트 통합 테스트

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use sales_analytics::ml::{MockRegressor, Regressor};
use sales_api::services::explain::{ExplainClient, ExplainError, FALLBACK_SUMMARY};
use sales_api::{create_api_router, create_test_state, AppState};
use sales_core::{AppConfig, RawTable};
use sales_data::LoadedArtifacts;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(state: AppState) -> Router {
    create_api_router().with_state(Arc::new(state))
}

async fn send(app: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    send(app(state), Method::GET, uri, Body::empty()).await
}

#[tokio::test]
async fn test_store_list_without_preview() {
    let (status, json) = get(create_test_state(), "/api/stores").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([{"value": 7, "label": "Store 7 – AMES, STORY"}])
    );
}

#[tokio::test]
async fn test_store_list_with_preview() {
    let (status, json) = get(create_test_state(), "/api/stores?preview=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["value"], 7);
    assert_eq!(json[0]["forecast"], 1060.5);
}

#[tokio::test]
async fn test_store_list_min_points_and_labels() {
    let (status, json) = get(create_test_state(), "/api/stores?min_points=3").await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Store 7 – AMES, STORY", "Store 8 – BOONE"]);
}

#[tokio::test]
async fn test_store_list_limit() {
    let (_, json) = get(create_test_state(), "/api/stores?min_points=1&limit=1").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["value"], 7);
}

#[tokio::test]
async fn test_store_list_rejects_bad_query() {
    let (status, json) = get(create_test_state(), "/api/stores?preview=maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_QUERY");

}

#[tokio::test]
async fn test_store_list_malformed_ints_fall_back_to_defaults() {
    let (status, json) = get(
        create_test_state(),
        "/api/stores?min_year=twenty&min_points=five&limit=x",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([{"value": 7, "label": "Store 7 – AMES, STORY"}])
    );
}

#[tokio::test]
async fn test_store_list_without_artifacts() {
    let (status, json) = get(AppState::new(AppConfig::default()), "/api/stores").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Required data not loaded");
    assert_eq!(json["code"], "ARTIFACTS_NOT_LOADED");
}

#[tokio::test]
async fn test_store_list_schema_error() {
    let table = RawTable::from_strs(&["Store", "Amount"], &[&["1", "5"]]);
    let model: Arc<dyn Regressor> = Arc::new(MockRegressor::new());
    let artifacts = LoadedArtifacts::new(table, model, vec![], None);
    let state = AppState::new(AppConfig::default()).with_artifacts(Arc::new(artifacts));

    let (status, json) = get(state, "/api/stores").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "SCHEMA_ERROR");
    assert!(json["error"].as_str().unwrap().contains("date"));
}

#[tokio::test]
async fn test_forecast_for_store() {
    let (status, json) = get(create_test_state(), "/api/forecast/7").await;
    assert_eq!(status, StatusCode::OK);

    let history = json["history"].as_array().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0]["date"], "2021-02-01");
    assert_eq!(history[4]["label"], "Jun 21");
    assert_eq!(history[4]["total_sales"], 1060.0);
    assert_eq!(history[4]["categories"]["liquor"], 106.0);
    assert_eq!(history[4]["source"], "history");

    let forecast = json["forecast"].as_array().unwrap();
    assert_eq!(forecast.len(), 1);
    assert_eq!(forecast[0]["date"], "2021-07-01");
    assert_eq!(forecast[0]["label"], "Jul 21");
    assert_eq!(forecast[0]["predicted"], 1060.5);
    assert_eq!(forecast[0]["sales"], 1060.5);
    assert_eq!(forecast[0]["source"], "forecast");
}

#[tokio::test]
async fn test_forecast_short_history_store() {
    let (status, json) = get(create_test_state(), "/api/forecast/8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["history"].as_array().unwrap().len(), 3);
    assert_eq!(json["forecast"][0]["predicted"], 500.5);
}

#[tokio::test]
async fn test_forecast_unknown_store_or_filtered_out() {
    let (status, json) = get(create_test_state(), "/api/forecast/999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"history": [], "forecast": []}));

    let (_, json) = get(create_test_state(), "/api/forecast/7?min_year=2022").await;
    assert_eq!(json, json!({"history": [], "forecast": []}));
}

struct StubClient {
    reply: Result<String, ()>,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ExplainClient for StubClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ExplainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|_| ExplainError::MissingApiKey)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn explain_state(reply: Result<String, ()>) -> (AppState, Arc<StubClient>) {
    let client = Arc::new(StubClient {
        reply,
        prompts: Mutex::new(Vec::new()),
    });
    let state = create_test_state().with_explain_client(client.clone());
    (state, client)
}

#[tokio::test]
async fn test_explain_focus_request() {
    let (state, client) = explain_state(Ok("* Forecast up 5%.".into()));
    let body = json!({
        "timeline": [
            {"date": "2021-05-01", "total_sales": 1050},
            {"date": "2021-06-01", "total_sales": 1060},
            {"date": "2021-07-01", "predicted": 1060.5, "source": "forecast"}
        ],
        "focus": {"date": "2021-07-01", "value": 1060.5, "source": "forecast"}
    });

    let (status, json) = send(
        app(state),
        Method::POST,
        "/api/explain_forecast",
        Body::from(body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"], "* Forecast up 5%.");
    assert!(client.prompts.lock().unwrap()[0].contains("FOCUS_ROWS"));
}

#[tokio::test]
async fn test_explain_upstream_failure_is_soft() {
    let (state, _) = explain_state(Err(()));
    let body = json!([{"date": "2021-01-01", "total": 1}, {"date": "2021-02-01", "total": 2}]);
    let (status, json) = send(
        app(state),
        Method::POST,
        "/api/explain_forecast",
        Body::from(body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"], FALLBACK_SUMMARY);
}

#[tokio::test]
async fn test_explain_bad_bodies() {
    for body in ["not json", r#"{"timeline": []}"#, r#"{"something": 1}"#] {
        let (state, client) = explain_state(Ok("unused".into()));
        let (status, json) = send(
            app(state),
            Method::POST,
            "/api/explain_forecast",
            Body::from(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(json["code"], "INVALID_TIMELINE");
        assert!(json["error"].is_string());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_home_and_health() {
    let (status, json) = get(create_test_state(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].is_string());

    let (status, json) = get(create_test_state(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["rows"], 9);
}
