//! Axum router exposing one resource's CRUD operations.
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | GET | `/?page=&pageSize=` | 200, JSON array, total-count header |
//! | GET | `/all` | 200, JSON array |
//! | GET | `/{id}` | 200, JSON |
//! | POST | `/` | 201, `Location`, JSON |
//! | PUT | `/{id}` | 204 |
//! | DELETE | `/{id}` | 204 |
//!
//! Failures are `application/problem+json` bodies. Mount the router under the
//! resource's path with `Router::nest`.

use crate::backend::CacheBackend;
use crate::config::TOTAL_COUNT_HEADER;
use crate::error::Error;
use crate::pagination::PageRequest;
use crate::projection::Projection;
use crate::record::{Id, Record};
use crate::service::CrudService;
use crate::store::EntityStore;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Problem details body returned for every failed request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub error_code: String,
}

/// Error type returned by the handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    title: &'static str,
    detail: String,
    error_code: &'static str,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            title: "Bad Request",
            detail: detail.into(),
            error_code: "BAD_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => ApiError {
                status: StatusCode::NOT_FOUND,
                title: "Not Found",
                detail: err.to_string(),
                error_code: "NOT_FOUND",
            },
            Error::ValidationError(msg) => ApiError {
                status: StatusCode::BAD_REQUEST,
                title: "Validation Failed",
                detail: msg,
                error_code: "VALIDATION_ERROR",
            },
            other => {
                error!("Request failed: {}", other);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    title: "Internal Server Error",
                    detail: "The request could not be completed".to_string(),
                    error_code: match other {
                        Error::StoreError(_) => "STORE_ERROR",
                        _ => "INTERNAL_ERROR",
                    },
                }
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            error_code: self.error_code.to_string(),
        };

        (
            self.status,
            [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            Json(body),
        )
            .into_response()
    }
}

struct RouterState<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    service: CrudService<T, P, S, B>,
    count_header: HeaderName,
}

impl<T, P, S, B> Clone for RouterState<T, P, S, B>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    fn clone(&self) -> Self {
        RouterState {
            service: self.service.clone(),
            count_header: self.count_header.clone(),
        }
    }
}

/// Build the router for one resource.
///
/// The total-count header name comes from the orchestrator's `ServeConfig`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api/generos", crud_router(genres))
///     .nest("/api/cines", crud_router(cinemas));
/// ```
pub fn crud_router<T, P, S, B>(service: CrudService<T, P, S, B>) -> Router
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let configured = &service.orchestrator().config().total_count_header;
    let count_header = HeaderName::try_from(configured.as_str()).unwrap_or_else(|_| {
        warn!(
            "⚠ Invalid total count header '{}', using {}",
            configured, TOTAL_COUNT_HEADER
        );
        HeaderName::from_static("x-total-count")
    });

    Router::new()
        .route("/", get(list::<T, P, S, B>).post(create::<T, P, S, B>))
        .route("/all", get(list_all::<T, P, S, B>))
        .route(
            "/{id}",
            get(get_one::<T, P, S, B>)
                .put(replace::<T, P, S, B>)
                .delete(delete::<T, P, S, B>),
        )
        .with_state(RouterState {
            service,
            count_header,
        })
}

async fn list<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Response, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let Query(request) = query?;
    let page = state.service.list(request).await?;

    Ok((
        [(state.count_header, page.total_count.to_string())],
        Json(page.items),
    )
        .into_response())
}

async fn list_all<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
) -> Result<Json<Vec<P::Output>>, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    Ok(Json(state.service.list_all().await?))
}

async fn get_one<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
    id: Result<Path<Id>, PathRejection>,
) -> Result<Json<P::Output>, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let Path(id) = id?;
    Ok(Json(state.service.get(id).await?))
}

async fn create<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
    body: Result<Json<P::Input>, JsonRejection>,
) -> Result<Response, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let Json(input) = body?;
    let created = state.service.create(input).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, created.location)],
        Json(created.body),
    )
        .into_response())
}

async fn replace<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
    id: Result<Path<Id>, PathRejection>,
    body: Result<Json<P::Input>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let Path(id) = id?;
    let Json(input) = body?;
    state.service.replace(id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete<T, P, S, B>(
    State(state): State<RouterState<T, P, S, B>>,
    id: Result<Path<Id>, PathRejection>,
) -> Result<StatusCode, ApiError>
where
    T: Record,
    P: Projection<T>,
    S: EntityStore<T>,
    B: CacheBackend,
{
    let Path(id) = id?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
