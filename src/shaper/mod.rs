//! # Result Shaper
//!
//! Turns executed row sets into the response shapes of each endpoint family
//! and wraps them in the `{result, messages}` envelope.
//!
//! Units: chart and sector shapes report million metric tons (two decimals);
//! markers, facility lists, hover cards and CSV report whole metric tons.
//! Stored values are never modified.
//!
//! The Export Guard (`guard`) bounds CSV exports. Truncation is reported
//! through messages, never as an error.

pub mod charts;
pub mod csv;
pub mod envelope;
pub mod errors;
pub mod geo;
pub mod guard;
pub mod hover;
pub mod listings;
pub mod report;
pub mod trend;
pub mod units;

pub use charts::{BarChart, ChartPoint, PieChart, SectorList, SectorTotals};
pub use csv::CsvWriter;
pub use envelope::Envelope;
pub use errors::{ReportError, ReportResult};
pub use guard::{apply_limit, bound, ExportLimits, ExportPolicy, ALL_YEARS_ROW_CAP};
pub use hover::FacilityHover;
pub use listings::{FacilityPage, Marker};
pub use report::{ExportFile, Reports, VersionInfo};
pub use trend::{TrendChart, TrendPoint};
