//! Integration test: Server API endpoints

use kolosal_classify::prelude::*;
use kolosal_classify::server::{create_router, AppState};
use kolosal_classify::training::DecisionTree;
use std::sync::Arc;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let dataset = Dataset::reference().unwrap();
    let model = Estimator::DecisionTree(DecisionTree::new())
        .fit(dataset.features(), dataset.labels(), dataset.n_classes())
        .unwrap();
    let bundle = ModelBundle::new(
        "tree",
        dataset.feature_names().to_vec(),
        dataset.label_map().clone(),
        model,
    )
    .unwrap();
    let state = Arc::new(AppState::new(InferenceAdapter::from_bundle(bundle)));
    create_router(state)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_model_endpoint() {
    let request = Request::builder().uri("/model").body(Body::empty()).unwrap();
    let (status, body) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"], json!(["setosa", "versicolor", "virginica"]));
}

#[tokio::test]
async fn test_predict_setosa() {
    let (status, body) = send(test_app(), predict_request(json!({"features": [[5.1, 3.5, 1.4, 0.2]]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!(["setosa"]));
}

#[tokio::test]
async fn test_predict_wrong_width_is_422() {
    let (status, body) = send(test_app(), predict_request(json!({"features": [[5.1, 3.5, 1.4]]}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], true);
    assert!(body.get("predictions").is_none());
}

#[tokio::test]
async fn test_predict_empty_batch_is_422() {
    let (status, _) = send(test_app(), predict_request(json!({"features": []}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_malformed_body_is_400() {
    let (status, body) = send(test_app(), predict_request(json!({"rows": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, _) = send(test_app(), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
