//! Report HTTP Routes
//!
//! Map, chart, list, trend, hover and export endpoints. Every handler
//! validates its body into a `ReportRequest`, runs one `Reports` under the
//! request timeout and wraps the shape in the envelope.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::errors::{ApiError, ApiResult};
use super::extract::{JsonBody, PathParam, QueryParam};
use super::server::route_not_found;
use super::state::AppState;
use crate::planner::{ExportMode, ReportBody, SectorLevel};
use crate::shaper::{
    BarChart, Envelope, ExportFile, FacilityHover, FacilityPage, Marker, PieChart, SectorList,
    SectorTotals, TrendChart, VersionInfo,
};

pub const EXPORT_TRUNCATED_HEADER: &str = "x-export-truncated";
pub const EXPORT_MESSAGES_HEADER: &str = "x-export-messages";

type Shared = State<Arc<AppState>>;

/// Create report routes
pub fn report_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/version", get(version_handler).fallback(route_not_found))
        .route("/facilities/map-markers", post(markers_handler).fallback(route_not_found))
        .route("/map/overlay", post(markers_handler).fallback(route_not_found))
        .route("/sectors/total/emissions", post(sector_totals_handler).fallback(route_not_found))
        .route("/list/sectors", post(list_sectors_handler).fallback(route_not_found))
        .route("/list/facilities", post(list_facilities_handler).fallback(route_not_found))
        .route("/bar/sector", post(bar_handler).fallback(route_not_found))
        .route("/bar/sector/level2", post(bar_level2_handler).fallback(route_not_found))
        .route("/pie/sectors/emissions", post(pie_handler).fallback(route_not_found))
        .route("/pie/level2/sector/emissions", post(pie_level2_handler).fallback(route_not_found))
        .route(
            "/pie/level3/subsector/emissions",
            post(pie_level3_handler).fallback(route_not_found),
        )
        .route(
            "/sector/trend/:id/:level",
            get(trend_handler).post(trend_handler).fallback(route_not_found),
        )
        .route("/export", post(export_handler).fallback(route_not_found))
        .route(
            "/facility/hover/:year",
            get(hover_handler).post(hover_handler).fallback(route_not_found),
        )
}

// ==================
// Handlers
// ==================

async fn version_handler() -> Json<Envelope<VersionInfo>> {
    Json(Envelope::ok(VersionInfo::current()))
}

async fn markers_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<Vec<Marker>>>> {
    let request = state.request(&body)?;
    let reports = state.reports();
    let markers = state.run(reports.markers(&request)).await?;
    Ok(Json(Envelope::ok(markers)))
}

async fn sector_totals_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<SectorTotals>>> {
    let request = state.request(&body)?;
    let reports = state.reports();
    let totals = state.run(reports.sector_totals(&request)).await?;
    Ok(Json(Envelope::ok(totals)))
}

async fn list_sectors_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<SectorList>>> {
    let request = state.request(&body)?;
    let reports = state.reports();
    let list = state.run(reports.list_sectors(&request)).await?;
    Ok(Json(Envelope::ok(list)))
}

async fn list_facilities_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<FacilityPage>>> {
    let request = state.request(&body)?;
    let reports = state.reports();
    let page = state.run(reports.list_facilities(&request)).await?;
    Ok(Json(Envelope::ok(page)))
}

async fn bar_at(
    state: &AppState,
    body: &ReportBody,
    level: SectorLevel,
) -> ApiResult<Json<Envelope<BarChart>>> {
    let request = state.request(body)?;
    let reports = state.reports();
    let chart = state.run(reports.bar(&request, level)).await?;
    Ok(Json(Envelope::ok(chart)))
}

async fn bar_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<BarChart>>> {
    bar_at(&state, &body, SectorLevel::One).await
}

async fn bar_level2_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<BarChart>>> {
    bar_at(&state, &body, SectorLevel::Two).await
}

async fn pie_at(
    state: &AppState,
    body: &ReportBody,
    level: SectorLevel,
) -> ApiResult<Json<Envelope<PieChart>>> {
    let request = state.request(body)?;
    let reports = state.reports();
    let chart = state.run(reports.pie(&request, level)).await?;
    Ok(Json(Envelope::ok(chart)))
}

async fn pie_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<PieChart>>> {
    pie_at(&state, &body, SectorLevel::One).await
}

async fn pie_level2_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<PieChart>>> {
    pie_at(&state, &body, SectorLevel::Two).await
}

async fn pie_level3_handler(
    State(state): Shared,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<PieChart>>> {
    pie_at(&state, &body, SectorLevel::Three).await
}

async fn trend_handler(
    State(state): Shared,
    PathParam((id, level)): PathParam<(String, String)>,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<TrendChart>>> {
    let sector_id: i64 = id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Sector id must be a number, got '{}'", id)))?;
    let level: SectorLevel = level.parse()?;
    let request = state.request(&body)?;

    let reports = state.reports();
    let chart = state.run(reports.trend(&request, sector_id, level)).await?;
    Ok(Json(Envelope::ok(chart)))
}

async fn export_handler(
    State(state): Shared,
    QueryParam(params): QueryParam<HashMap<String, String>>,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Response> {
    let mode = match params.get("allReportingYears") {
        Some(flag) if flag.eq_ignore_ascii_case("true") => ExportMode::AllYears,
        _ => ExportMode::SingleYear,
    };
    let request = state.request(&body)?;
    let reports = state.reports();
    let file = state.run(reports.export(&request, mode)).await?;
    export_response(file)
}

fn header_value(value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Internal(format!("invalid header value: {}", e)))
}

/// CSV body with download headers and Export Guard advisories
pub fn export_response(file: ExportFile) -> ApiResult<Response> {
    let messages =
        serde_json::to_string(&file.messages).map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, header_value(file.content_type)?);
    headers.insert(
        header::CONTENT_DISPOSITION,
        header_value(&format!("attachment; filename=\"{}\"", file.filename))?,
    );
    headers.insert(
        HeaderName::from_static(EXPORT_TRUNCATED_HEADER),
        HeaderValue::from_static(if file.truncated { "true" } else { "false" }),
    );
    headers.insert(HeaderName::from_static(EXPORT_MESSAGES_HEADER), header_value(&messages)?);

    Ok((headers, file.body).into_response())
}

async fn hover_handler(
    State(state): Shared,
    PathParam(year): PathParam<String>,
    QueryParam(params): QueryParam<HashMap<String, String>>,
    JsonBody(body): JsonBody<ReportBody>,
) -> ApiResult<Json<Envelope<FacilityHover>>> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Year must be a number, got '{}'", year)))?;
    let request = state.request(&body)?;
    let facility_id = request
        .facility_id
        .clone()
        .or_else(|| params.get("id").map(|id| id.trim().to_string()))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing facility id".to_string()))?;

    let reports = state.reports();
    let hover = state.run(reports.hover(&facility_id, year)).await?;
    Ok(Json(Envelope::ok(hover)))
}
