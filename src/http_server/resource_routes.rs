//! Resource HTTP Routes
//!
//! Geo documents, downloadable source files and the health check.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::errors::{ApiError, ApiResult};
use super::extract::PathParam;
use super::server::route_not_found;
use super::state::AppState;
use crate::file_cache::{DataFile, SignedDownload};
use crate::shaper::{geo, Envelope};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct DataFilesResponse {
    pub files: Vec<DataFile>,
    pub count: usize,
}

/// Create geo and data-file routes
pub fn resource_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/state/bounds/:state", get(state_bounds_handler).fallback(route_not_found))
        .route("/state/counties/:state", get(state_counties_handler).fallback(route_not_found))
        .route("/basin/geo", get(basin_geo_handler).fallback(route_not_found))
        .route("/data/files", get(data_files_handler).fallback(route_not_found))
        .route("/data/download/:filename", get(data_download_handler).fallback(route_not_found))
}

/// Health check route, outside the API prefix
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn state_bounds_handler(
    State(state): State<Arc<AppState>>,
    PathParam(code): PathParam<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    let cache = state.file_cache();
    let bounds = state.run(geo::state_bounds(&cache, &code)).await?;
    Ok(Json(Envelope::ok(bounds)))
}

async fn state_counties_handler(
    State(state): State<Arc<AppState>>,
    PathParam(code): PathParam<String>,
) -> ApiResult<Json<Envelope<Value>>> {
    let cache = state.file_cache();
    let counties = state.run(geo::state_counties(&cache, &code)).await?;
    Ok(Json(Envelope::ok(counties)))
}

async fn basin_geo_handler() -> Json<Envelope<Value>> {
    Json(Envelope::ok(geo::basin_geo()))
}

async fn data_files_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Envelope<DataFilesResponse>>> {
    let catalog = state.catalog();
    let files = state.run(catalog.list()).await?;
    Ok(Json(Envelope::ok(DataFilesResponse {
        count: files.len(),
        files,
    })))
}

async fn data_download_handler(
    State(state): State<Arc<AppState>>,
    PathParam(filename): PathParam<String>,
) -> ApiResult<Json<Envelope<SignedDownload>>> {
    let catalog = state.catalog();
    let download = state
        .run(catalog.sign(&filename))
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;
    Ok(Json(Envelope::ok(download)))
}
