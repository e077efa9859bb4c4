//! HTTP surface tests driven through `tower::ServiceExt::oneshot`.

#![cfg(feature = "http")]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use http_body_util::BodyExt;
use resource_kit::backend::InMemoryBackend;
use resource_kit::http::ProblemDetails;
use resource_kit::{crud_router, CrudService, ServeConfig};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

fn app() -> Router {
    app_with(ServeConfig::default())
}

fn app_with(config: ServeConfig) -> Router {
    let backend = InMemoryBackend::new();
    Router::new()
        .nest(
            "/api/generos",
            crud_router(CrudService::new(
                genres(backend.clone()).with_config(config.clone()),
            )),
        )
        .nest(
            "/api/cines",
            crud_router(CrudService::new(cinemas(backend).with_config(config))),
        )
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

async fn body_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Failed to parse body")
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("Failed to call router")
}

#[tokio::test]
async fn test_create_returns_201_with_location() {
    let app = app();

    let response = send(
        &app,
        json_request("POST", "/api/generos", r#"{"name":"Comedia"}"#),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/api/generos/1"
    );
    let body: GenreDto = body_json(response).await;
    assert_eq!(
        body,
        GenreDto {
            id: 1,
            name: "Comedia".to_string()
        }
    );
}

#[tokio::test]
async fn test_list_sets_total_count_header() {
    let app = app();
    for name in ["Comedia", "Drama", "Terror"] {
        send(
            &app,
            json_request("POST", "/api/generos", &format!(r#"{{"name":"{}"}}"#, name)),
        )
        .await;
    }

    let response = send(&app, empty_request("GET", "/api/generos?page=2&pageSize=2")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-total-count").unwrap(), "3");
    let items: Vec<GenreDto> = body_json(response).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Terror");
}

#[tokio::test]
async fn test_list_defaults_and_clamps() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/generos", r#"{"name":"Comedia"}"#),
    )
    .await;

    for uri in [
        "/api/generos",
        "/api/generos?page=0&pageSize=0",
        "/api/generos?page=-4&pageSize=9999",
        "/api/generos?recordsPerPage=5",
    ] {
        let response = send(&app, empty_request("GET", uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "uri {}", uri);
        let items: Vec<GenreDto> = body_json(response).await;
        assert_eq!(items.len(), 1, "uri {}", uri);
    }
}

#[tokio::test]
async fn test_non_numeric_query_is_400() {
    let response = send(&app(), empty_request("GET", "/api/generos?page=abc")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_get_missing_is_404_problem() {
    let response = send(&app(), empty_request("GET", "/api/generos/99")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let problem: ProblemDetails = body_json(response).await;
    assert_eq!(problem.status, 404);
    assert_eq!(problem.error_code, "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_id_is_400() {
    let response = send(&app(), empty_request("GET", "/api/generos/abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_bodies_are_400() {
    let app = app();

    let malformed = send(&app, json_request("POST", "/api/generos", "{not json")).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let invalid = send(
        &app,
        json_request("POST", "/api/generos", r#"{"name":"comedia"}"#),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let problem: ProblemDetails = body_json(invalid).await;
    assert_eq!(problem.error_code, "VALIDATION_ERROR");

    let all = send(&app, empty_request("GET", "/api/generos/all")).await;
    let items: Vec<GenreDto> = body_json(all).await;
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_replace_and_delete_status_codes() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/generos", r#"{"name":"Comedia"}"#),
    )
    .await;

    let replaced = send(
        &app,
        json_request("PUT", "/api/generos/1", r#"{"name":"Comedia-Drama"}"#),
    )
    .await;
    assert_eq!(replaced.status(), StatusCode::NO_CONTENT);

    let fetched: GenreDto = body_json(send(&app, empty_request("GET", "/api/generos/1")).await).await;
    assert_eq!(fetched.name, "Comedia-Drama");

    let missing = send(
        &app,
        json_request("PUT", "/api/generos/42", r#"{"name":"Drama"}"#),
    )
    .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let deleted = send(&app, empty_request("DELETE", "/api/generos/1")).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = send(&app, empty_request("DELETE", "/api/generos/1")).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_all_route_is_not_an_id() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/cines", r#"{"name":"Cine Azteca"}"#),
    )
    .await;

    let response = send(&app, empty_request("GET", "/api/cines/all")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let items: Vec<CinemaDto> = body_json(response).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Cine Azteca");
}

#[tokio::test]
async fn test_configured_count_header_and_page_limit() {
    let app = app_with(
        ServeConfig::default()
            .with_total_count_header("X-Count")
            .with_default_page_size(1)
            .with_max_page_size(2),
    );
    for name in ["Comedia", "Drama", "Terror"] {
        send(
            &app,
            json_request("POST", "/api/generos", &format!(r#"{{"name":"{}"}}"#, name)),
        )
        .await;
    }

    let default_page = send(&app, empty_request("GET", "/api/generos")).await;
    assert_eq!(default_page.headers().get("x-count").unwrap(), "3");
    let items: Vec<GenreDto> = body_json(default_page).await;
    assert_eq!(items.len(), 1);

    let clamped = send(&app, empty_request("GET", "/api/generos?pageSize=50")).await;
    let items: Vec<GenreDto> = body_json(clamped).await;
    assert_eq!(items.len(), 2);
}
