//! CLI command implementations
//!
//! Configuration is read from an optional JSON file, then `.env` and the
//! process environment override it (see `ServiceConfig::apply_env`).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use super::args::Command;
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{read_body, write_output};
use crate::file_cache::StorageBackend;
use crate::http_server::{AppState, HttpServer, ServiceConfig};
use crate::observability::init_logging;
use crate::planner::{EndpointKind, ExplainPlan, QueryBuilder, ReportBody, ReportRequest};

/// Read a configuration file without applying the environment
pub fn read_config_file(path: &Path) -> CliResult<ServiceConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    let config: ServiceConfig = serde_json::from_str(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

    Ok(config)
}

/// File (or defaults), then `.env` and environment overrides, then validation
pub fn load_config(path: Option<&Path>) -> CliResult<ServiceConfig> {
    dotenvy::dotenv().ok();

    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ServiceConfig::default(),
    };
    config.apply_env()?;
    config.validate()?;

    Ok(config)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(config.as_deref()),
        Command::Query { config, method, route } => query(config.as_deref(), &method, &route),
        Command::Explain { config, body, endpoint } => explain(config.as_deref(), &endpoint, &body),
    }
}

/// Start the HTTP server and serve until interrupted
pub fn serve(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    init_logging(config.log_format, &config.log_filter)?;

    let backend = StorageBackend::from_config(&config.storage)?;
    let server = HttpServer::new(config, backend);

    let rt = runtime()?;
    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Answer one request through the full router and print the response body
pub fn query(config_path: Option<&Path>, method: &str, route: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    init_logging(config.log_format, &config.log_filter)?;
    let body = read_body()?;

    let state = Arc::new(AppState::from_config(config)?);
    let rt = runtime()?;
    let (status, text) = rt.block_on(dispatch(state, method, route, body))?;

    write_output(&text)?;
    if status.is_success() {
        Ok(())
    } else {
        Err(CliError::query_failed(status.as_u16()))
    }
}

/// Route one request through the router in-process
pub async fn dispatch(
    state: Arc<AppState>,
    method: &str,
    route: &str,
    body: String,
) -> CliResult<(StatusCode, String)> {
    let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
        CliError::new(CliErrorCode::InvalidRequest, format!("Invalid method: {}", method))
    })?;
    let request = Request::builder()
        .method(method)
        .uri(route)
        .body(Body::from(body))
        .map_err(|e| CliError::new(CliErrorCode::InvalidRequest, e.to_string()))?;

    let response = match HttpServer::build_router(state).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| CliError::io_error(e.to_string()))?;

    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Print the query plans of an endpoint without executing them
pub fn explain(config_path: Option<&Path>, endpoint: &str, body: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let kind: EndpointKind = endpoint.parse()?;
    let body: ReportBody = if body.trim().is_empty() {
        ReportBody::default()
    } else {
        serde_json::from_str(body)?
    };
    let request = body.validate(&config.requests)?;

    write_output(&explain_plans(&request, kind)?)
}

/// Rendered plans, one block per descriptor in execution order
pub fn explain_plans(request: &ReportRequest, kind: EndpointKind) -> CliResult<String> {
    let plans: Vec<String> = QueryBuilder::new(request)
        .build(kind)?
        .iter()
        .map(|query| ExplainPlan::from_descriptor(query).to_string())
        .collect();
    Ok(plans.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_cache::BackendConfig;
    use crate::planner::RequestLimits;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ghg-api.json");
        fs::write(&config_path, json!({"port": 3001}).to_string()).unwrap();

        let config = read_config_file(&config_path).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.requests, RequestLimits::default());
        assert!(matches!(config.storage, BackendConfig::S3 { .. }));
    }

    #[test]
    fn test_config_file_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ghg-api.json");
        fs::write(&config_path, "{ not json").unwrap();

        let result = read_config_file(&config_path);
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_missing_config_file() {
        let result = read_config_file(Path::new("/nonexistent/ghg-api.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_explain_export_plan() {
        let request = ReportRequest::defaults(&RequestLimits::default()).with_year(2022);
        let kind = EndpointKind::Export(crate::planner::ExportMode::SingleYear);
        let text = explain_plans(&request, kind).unwrap();
        assert!(text.contains("=== EXPLAIN export ==="));
        assert!(text.contains("RLPS_GHG_EMITTER_FACILITIES"));
        assert!(text.contains("'Biogenic CO2'"));
    }

    #[test]
    fn test_explain_rejects_invalid_combination() {
        let request = ReportRequest::defaults(&RequestLimits::default()).with_facility("1000112");
        let result = explain_plans(&request, EndpointKind::Pie(crate::planner::SectorLevel::Three));
        assert_eq!(result.unwrap_err().code(), &CliErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_route() {
        let mut config = ServiceConfig::default();
        config.storage = BackendConfig::Memory;
        let state = Arc::new(AppState::from_config(config).unwrap());

        let (status, body) = dispatch(state, "get", "/api/nope", String::new()).await.unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["result"], serde_json::Value::Null);
    }
}
