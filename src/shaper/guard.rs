//! Export Guard
//!
//! Two policies bound an export:
//! - single-year: the platform response ceiling converted to a row budget
//! - all-years: a hard row cap
//!
//! Truncation keeps the first rows in the query's order. It is not an error;
//! the response carries an advisory instead.

use serde::{Deserialize, Serialize};

use crate::planner::ExportMode;

/// Hard cap for all-years exports
pub const ALL_YEARS_ROW_CAP: usize = 25_000;

/// Synchronous response ceiling of the hosting platform
pub const PLATFORM_RESPONSE_CEILING_BYTES: usize = 6 * 1024 * 1024;

/// Conservative size of one CSV row
pub const ESTIMATED_ROW_BYTES: usize = 256;

/// How an export is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Bounded by the response-size ceiling
    PlatformCeiling { row_budget: usize },
    /// Bounded by a fixed row count
    RowCap { cap: usize },
}

impl ExportPolicy {
    /// Maximum rows the policy lets through
    pub fn limit(&self) -> usize {
        match self {
            ExportPolicy::PlatformCeiling { row_budget } => *row_budget,
            ExportPolicy::RowCap { cap } => *cap,
        }
    }

    /// Rows to request from the engine: one past the limit, so truncation is
    /// detectable without materialising the full result
    pub fn fetch_limit(&self) -> u64 {
        self.limit() as u64 + 1
    }

    /// Advisory attached to a truncated export
    pub fn advisory(&self) -> String {
        match self {
            ExportPolicy::PlatformCeiling { row_budget } => format!(
                "Export truncated to the first {} rows to fit the response size limit",
                row_budget
            ),
            ExportPolicy::RowCap { cap } => format!(
                "Export truncated to the first {} rows; narrow the filters or export a single year",
                cap
            ),
        }
    }
}

/// Configurable export limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLimits {
    #[serde(default = "default_all_years_row_cap")]
    pub all_years_row_cap: usize,
    #[serde(default = "default_response_ceiling_bytes")]
    pub response_ceiling_bytes: usize,
    #[serde(default = "default_estimated_row_bytes")]
    pub estimated_row_bytes: usize,
}

fn default_all_years_row_cap() -> usize {
    ALL_YEARS_ROW_CAP
}

fn default_response_ceiling_bytes() -> usize {
    PLATFORM_RESPONSE_CEILING_BYTES
}

fn default_estimated_row_bytes() -> usize {
    ESTIMATED_ROW_BYTES
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            all_years_row_cap: ALL_YEARS_ROW_CAP,
            response_ceiling_bytes: PLATFORM_RESPONSE_CEILING_BYTES,
            estimated_row_bytes: ESTIMATED_ROW_BYTES,
        }
    }
}

impl ExportLimits {
    /// Policy selected by the export mode
    pub fn policy(&self, mode: ExportMode) -> ExportPolicy {
        match mode {
            ExportMode::SingleYear => ExportPolicy::PlatformCeiling {
                row_budget: self.response_ceiling_bytes / self.estimated_row_bytes.max(1),
            },
            ExportMode::AllYears => ExportPolicy::RowCap {
                cap: self.all_years_row_cap,
            },
        }
    }
}

/// Rows kept and whether any were dropped
pub fn bound(count: usize, cap: usize) -> (usize, bool) {
    (count.min(cap), count > cap)
}

/// Keep the first rows allowed by `policy`.
///
/// Reads at most one row past the limit.
pub fn apply_limit<I>(rows: I, policy: &ExportPolicy) -> (Vec<I::Item>, bool)
where
    I: IntoIterator,
{
    let mut kept: Vec<I::Item> = rows.into_iter().take(policy.limit().saturating_add(1)).collect();
    let (count, truncated) = bound(kept.len(), policy.limit());
    kept.truncate(count);
    (kept, truncated)
}
