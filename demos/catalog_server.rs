//! Movie catalog server: genres and cinemas served by one orchestrator type
//! over a shared in-memory tag index.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example catalog_server
//! curl -i -X POST localhost:3000/api/generos -H 'content-type: application/json' -d '{"name":"Comedia"}'
//! curl -i 'localhost:3000/api/generos?page=1&recordsPerPage=10'
//! curl localhost:3000/metrics
//! ```

use axum::{extract::State, routing::get, Json, Router};
use resource_kit::{
    backend::InMemoryBackend,
    descriptor::{ResourceDescriptor, SortKey},
    record::UNASSIGNED_ID,
    store::InMemoryStore,
    validation, CrudOrchestrator, CrudService, Id, Projection, Record, ServeConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

mod metrics;

use metrics::PrometheusMetrics;

// ============================================================================
// Genres
// ============================================================================

#[derive(Clone, Debug)]
struct Genre {
    id: Id,
    name: String,
}

impl Record for Genre {
    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

#[derive(Deserialize)]
struct GenreCreation {
    name: String,
}

#[derive(Clone, Serialize, Deserialize)]
struct GenreDto {
    id: Id,
    name: String,
}

struct GenreProjection;

impl Projection<Genre> for GenreProjection {
    type Input = GenreCreation;
    type Output = GenreDto;

    fn to_record(&self, input: GenreCreation) -> Genre {
        Genre {
            id: UNASSIGNED_ID,
            name: input.name,
        }
    }

    fn to_response(&self, record: &Genre) -> GenreDto {
        GenreDto {
            id: record.id,
            name: record.name.clone(),
        }
    }

    fn validate(&self, input: &GenreCreation) -> resource_kit::Result<()> {
        validation::name("name", &input.name)
    }
}

// ============================================================================
// Cinemas
// ============================================================================

#[derive(Clone, Debug)]
struct Cinema {
    id: Id,
    name: String,
    address: Option<String>,
}

impl Record for Cinema {
    fn id(&self) -> Id {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = id;
    }
}

#[derive(Deserialize)]
struct CinemaCreation {
    name: String,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
struct CinemaDto {
    id: Id,
    name: String,
    address: Option<String>,
}

struct CinemaProjection;

impl Projection<Cinema> for CinemaProjection {
    type Input = CinemaCreation;
    type Output = CinemaDto;

    fn to_record(&self, input: CinemaCreation) -> Cinema {
        Cinema {
            id: UNASSIGNED_ID,
            name: input.name,
            address: input.address,
        }
    }

    fn to_response(&self, record: &Cinema) -> CinemaDto {
        CinemaDto {
            id: record.id,
            name: record.name.clone(),
            address: record.address.clone(),
        }
    }

    fn validate(&self, input: &CinemaCreation) -> resource_kit::Result<()> {
        validation::required("name", &input.name)?;
        validation::max_length("name", &input.name, validation::NAME_MAX_LENGTH)
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Clone)]
struct AppState {
    backend: InMemoryBackend,
    metrics: PrometheusMetrics,
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render_prometheus()
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.backend.stats().await;
    Json(json!({
        "status": "healthy",
        "service": "resource-kit-catalog",
        "cache": {
            "entries": stats.total_entries,
            "expired": stats.expired_entries,
            "bytes": stats.total_bytes,
            "tags": stats.tracked_tags,
        }
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    let config = ServeConfig::from_env()?;
    let backend = InMemoryBackend::new();
    let metrics = PrometheusMetrics::new();

    let genres = CrudService::new(
        CrudOrchestrator::new(
            ResourceDescriptor::new(
                "generos",
                "/api/generos/{id}",
                SortKey::by_key("name", |g: &Genre| g.name.clone()),
            ),
            GenreProjection,
            InMemoryStore::new().with_unique("genre_name", |g: &Genre| g.name.to_lowercase()),
            backend.clone(),
        )
        .with_config(config.clone())
        .with_metrics(Box::new(metrics.clone())),
    );

    let cinemas = CrudService::new(
        CrudOrchestrator::new(
            ResourceDescriptor::new("cines", "/api/cines/{id}", SortKey::by_id()),
            CinemaProjection,
            InMemoryStore::new(),
            backend.clone(),
        )
        .with_config(config)
        .with_metrics(Box::new(metrics.clone())),
    );

    for name in ["Accion", "Comedia", "Drama"] {
        genres
            .create(GenreCreation {
                name: name.to_string(),
            })
            .await?;
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { backend, metrics })
        .nest("/api/generos", resource_kit::crud_router(genres))
        .nest("/api/cines", resource_kit::crud_router(cinemas));

    let addr = env::var("CATALOG_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Server running on http://{}", addr);
    println!("Genres: http://{}/api/generos", addr);
    println!("Cinemas: http://{}/api/cines", addr);
    println!("Metrics endpoint: http://{}/metrics", addr);
    println!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
