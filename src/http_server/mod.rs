//! # HTTP Server Module
//!
//! The Route Dispatcher: maps method and path to a report handler, validates
//! and defaults the request, and wraps every response (success or failure)
//! in the `{result, messages}` envelope with CORS headers.
//!
//! # Endpoints
//!
//! Served under both `/api` and `/ghgp/api`:
//!
//! - `/version`
//! - `/facilities/map-markers`, `/map/overlay`
//! - `/sectors/total/emissions`, `/list/sectors`, `/list/facilities`
//! - `/bar/sector[/level2]`, `/pie/...` chart aggregates
//! - `/sector/trend/:id/:level`
//! - `/export[?allReportingYears=true]`
//! - `/state/bounds/:state`, `/state/counties/:state`, `/basin/geo`
//! - `/facility/hover/:year`
//! - `/data/files`, `/data/download/:filename`
//!
//! `/health` sits outside the prefixes.

pub mod config;
pub mod errors;
pub mod extract;
pub mod report_routes;
pub mod resource_routes;
pub mod server;
pub mod state;

pub use config::{ConfigError, ServiceConfig};
pub use errors::{ApiError, ApiResult};
pub use server::HttpServer;
pub use state::AppState;
