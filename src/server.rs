//! Server front ends: HTTP JSON API and stdio tool server.
//!
//! Provides [`build_service`] (open the store and embedding provider from
//! config), [`router`] (the axum routes), [`serve_http`] and [`serve_stdio`].

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::ServiceExt;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::QuillConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::Error;
use crate::notes::service::NoteService;
use crate::notes::store::{NoteStore, StoreConfig};
use crate::notes::types::CollectionStats;
use crate::tools::QuillTools;

/// Shared setup: open the store, create the embedding provider, check each
/// collection's recorded embedding model and dimension against the provider.
pub fn build_service(config: &QuillConfig) -> Result<Arc<NoteService>> {
    let store = NoteStore::open(StoreConfig::from_config(config))
        .context("failed to open note store")?;
    let provider = embedding::create_provider(&config.embedding)?;
    tracing::info!(provider = %config.embedding.provider, model = %provider.model_id(), "embedding provider ready");

    for name in store.collection_names()? {
        let Some(collection) = store.existing(&name)? else {
            continue;
        };
        let stats = collection.stats()?;
        for warning in provider_mismatches(&stats, provider.as_ref()) {
            tracing::warn!(collection = %name, "{warning}");
        }
    }

    Ok(Arc::new(NoteService::new(
        Arc::new(store),
        provider,
        config.embedding.timeout(),
        config.retrieval.default_k,
    )))
}

/// Ways a stored collection disagrees with the configured embedding provider.
fn provider_mismatches(stats: &CollectionStats, provider: &dyn EmbeddingProvider) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(stored) = stats.embedding_model.as_deref() {
        if stored != provider.model_id() {
            warnings.push(format!(
                "collection was embedded with model '{stored}' but '{}' is configured; similarity scores will be unreliable",
                provider.model_id()
            ));
        }
    }
    if let Some(dimension) = stats.dimension {
        if dimension != provider.dimensions() {
            warnings.push(format!(
                "collection holds {dimension}-dimensional vectors but the provider produces {}; ingest and search will fail with a dimension mismatch",
                provider.dimensions()
            ));
        }
    }
    warnings
}

/// HTTP routes over a shared [`NoteService`].
pub fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/notes", post(ingest_notes).get(list_notes).delete(delete_notes))
        .route("/search", post(search_notes))
        .route("/collections", get(list_collections))
        .with_state(service)
}

/// Serve the HTTP API until ctrl-c, then close the store.
pub async fn serve_http(config: QuillConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let service = build_service(&config)?;
    let store = Arc::clone(service.store());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "HTTP API listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP API");
        })
        .await?;

    store.close()?;
    Ok(())
}

/// Serve the tool server over stdio until the client disconnects.
pub async fn serve_stdio(config: QuillConfig) -> Result<()> {
    tracing::info!("starting tool server on stdio");
    let service = build_service(&config)?;
    let store = Arc::clone(service.store());

    let tools = QuillTools::new(service);
    let server = tools.serve(rmcp::transport::stdio()).await?;
    tracing::info!("tool server running, waiting for client");

    server.waiting().await?;
    store.close()?;
    tracing::info!("tool server shut down");
    Ok(())
}

// ── HTTP handlers ─────────────────────────────────────────────────────────────

type AppState = State<Arc<NoteService>>;

#[derive(Debug, Deserialize)]
struct CollectionParam {
    collection: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    ids: Vec<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

type BodyResult<T> = Result<Json<T>, JsonRejection>;
type ParamResult = Result<Query<CollectionParam>, QueryRejection>;

/// Unwrap a JSON body, turning axum's rejection into a validation error so
/// malformed bodies get the same error shape as every other failure.
fn json_body<T>(payload: BodyResult<T>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        ApiError(Error::validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    })
}

fn collection_param(param: ParamResult) -> Result<Option<String>, ApiError> {
    param.map(|Query(p)| p.collection).map_err(|rejection| {
        ApiError(Error::validation(format!(
            "invalid query string: {}",
            rejection.body_text()
        )))
    })
}

async fn ingest_notes(
    State(service): AppState,
    param: ParamResult,
    payload: BodyResult<Value>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_param(param)?;
    let body = json_body(payload)?;
    let ids = service.ingest_json(&body, collection.as_deref()).await?;
    Ok(Json(json!({ "ids": ids })))
}

async fn list_notes(
    State(service): AppState,
    param: ParamResult,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_param(param)?;
    let notes = service.list(collection.as_deref()).await?;
    Ok(Json(json!({ "notes": notes })))
}

async fn delete_notes(
    State(service): AppState,
    param: ParamResult,
    payload: BodyResult<DeleteRequest>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_param(param)?;
    let body = json_body(payload)?;
    let deleted = service.delete(body.ids, collection.as_deref()).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn search_notes(
    State(service): AppState,
    param: ParamResult,
    payload: BodyResult<SearchRequest>,
) -> Result<Json<Value>, ApiError> {
    let collection = collection_param(param)?;
    let body = json_body(payload)?;
    let results = service
        .search(&body.query, collection.as_deref(), body.k)
        .await?;
    Ok(Json(json!({ "results": results })))
}

async fn list_collections(
    State(service): AppState,
) -> Result<Json<Value>, ApiError> {
    let collections = service.collections().await?;
    Ok(Json(json!({ "collections": collections })))
}

/// Maps each [`Error`] kind to a distinct HTTP status.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::DimensionMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Embedding { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Embedding { .. } => StatusCode::BAD_GATEWAY,
            Error::Io { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Consistency { .. } | Error::EmptyCollection { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "request rejected");
        }
        let body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
                "retryable": self.0.is_retryable(),
            }
        });
        (status, Json(body)).into_response()
    }
}
