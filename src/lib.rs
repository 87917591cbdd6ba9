//! ghg_api - Stateless query service for the greenhouse-gas facility dataset
//!
//! Reports are answered by planning typed query descriptors over Parquet
//! tables held in object storage, materialising those tables into a
//! per-request scratch cache, and shaping the rows into the envelopes the
//! map/chart frontend expects.

pub mod cli;
pub mod executor;
pub mod file_cache;
pub mod http_server;
pub mod observability;
pub mod planner;
pub mod shaper;
