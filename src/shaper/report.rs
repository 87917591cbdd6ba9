//! Report orchestration
//!
//! One `Reports` per request: it plans the endpoint's descriptors, executes
//! them in the request's context and shapes the rows.

use chrono::Local;
use futures_util::future::try_join;
use serde::Serialize;

use super::charts::{chart_points, BarChart, ChartPoint, PieChart, SectorList, SectorTotals};
use super::csv::CsvWriter;
use super::errors::{ReportError, ReportResult};
use super::guard::{apply_limit, ExportLimits};
use super::hover::FacilityHover;
use super::listings::{markers, FacilityPage, Marker};
use super::trend::TrendChart;
use super::units::to_tons;
use crate::executor::QueryContext;
use crate::planner::{
    ExportMode, PlannerError, QueryBuilder, ReportRequest, SectorLevel, TrendSector,
};

/// Release identifier reported by the version endpoint
pub const RELEASE_NUMBER: &str = "GHG-API-1.0";

/// CSV header for single-year exports; all-years prefixes `Year`
pub const EXPORT_HEADER: [&str; 11] = [
    "Facility ID",
    "Facility Name",
    "City",
    "State",
    "County",
    "ZIP",
    "Address",
    "Latitude",
    "Longitude",
    "Parent Company",
    "Total Emissions (Metric Tons CO2e)",
];

const EXPORT_COLUMNS: [&str; 10] = [
    "facility_id",
    "facility_name",
    "city",
    "state",
    "county",
    "zip",
    "address1",
    "latitude",
    "longitude",
    "parent_company",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub reported_date: String,
    pub release_number: &'static str,
    pub version: &'static str,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            reported_date: Local::now().format("%m/%d/%Y").to_string(),
            release_number: RELEASE_NUMBER,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// A rendered CSV export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub rows: usize,
    pub truncated: bool,
    pub messages: Vec<String>,
}

/// Report producer bound to one execution context
pub struct Reports {
    context: QueryContext,
    export: ExportLimits,
}

impl Reports {
    pub fn new(context: QueryContext, export: ExportLimits) -> Self {
        Self { context, export }
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Facility markers for the map views
    pub async fn markers(&self, request: &ReportRequest) -> ReportResult<Vec<Marker>> {
        let rows = self.context.execute(&QueryBuilder::new(request).map_markers()).await?;
        Ok(markers(&rows))
    }

    async fn level_one_points(&self, request: &ReportRequest) -> ReportResult<Vec<ChartPoint>> {
        let builder = QueryBuilder::new(request);
        let totals = builder.sector_totals(SectorLevel::One)?;
        let lookup = QueryBuilder::sector_lookup();
        let (totals, lookup) =
            try_join(self.context.execute(&totals), self.context.execute(&lookup)).await?;
        Ok(chart_points(&totals, Some(&lookup)))
    }

    async fn points(
        &self,
        request: &ReportRequest,
        level: SectorLevel,
    ) -> ReportResult<Vec<ChartPoint>> {
        match level {
            SectorLevel::One => self.level_one_points(request).await,
            _ => {
                let query = QueryBuilder::new(request).sector_totals(level)?;
                let rows = self.context.execute(&query).await?;
                Ok(chart_points(&rows, None))
            }
        }
    }

    pub async fn sector_totals(&self, request: &ReportRequest) -> ReportResult<SectorTotals> {
        let points = self.level_one_points(request).await?;
        Ok(SectorTotals::from_points(&points, request.reporting_year))
    }

    pub async fn list_sectors(&self, request: &ReportRequest) -> ReportResult<SectorList> {
        let points = self.level_one_points(request).await?;
        Ok(SectorList::from_points(&points, request.reporting_year))
    }

    /// One page plus the total row count, computed concurrently
    pub async fn list_facilities(&self, request: &ReportRequest) -> ReportResult<FacilityPage> {
        let page = QueryBuilder::new(request).facility_page();
        let (rows, total) = try_join(self.context.execute(&page), self.context.count(&page)).await?;
        Ok(FacilityPage::new(&rows, total, request.page, request.reporting_year))
    }

    pub async fn bar(&self, request: &ReportRequest, level: SectorLevel) -> ReportResult<BarChart> {
        let points = self.points(request, level).await?;
        Ok(BarChart::from_points(&points, level, request.reporting_year))
    }

    pub async fn pie(&self, request: &ReportRequest, level: SectorLevel) -> ReportResult<PieChart> {
        let points = self.points(request, level).await?;
        Ok(PieChart::from_points(&points, level, request.reporting_year))
    }

    /// Yearly series for a sector id (`0` = all sectors).
    ///
    /// `level` is validated by the caller; the series uses the level recorded
    /// for the id in the hierarchy.
    pub async fn trend(
        &self,
        request: &ReportRequest,
        sector_id: i64,
        level: SectorLevel,
    ) -> ReportResult<TrendChart> {
        let (sector, display) = self.resolve_trend_sector(sector_id).await?;
        tracing::debug!(sector_id, requested_level = %level, sector = ?sector);

        let rows = self
            .context
            .execute(&QueryBuilder::new(request).sector_trend(&sector))
            .await?;
        Ok(TrendChart::from_rows(&rows, display.as_deref()))
    }

    async fn resolve_trend_sector(
        &self,
        sector_id: i64,
    ) -> ReportResult<(TrendSector, Option<String>)> {
        if sector_id == 0 {
            return Ok((TrendSector::All, None));
        }
        let rows = self.context.execute(&QueryBuilder::sector_by_id(sector_id)).await?;
        let row = rows
            .first()
            .ok_or_else(|| PlannerError::bad_request(format!("Unknown sector id {}", sector_id)))?;

        let name = row.text("name").unwrap_or_default();
        let sector = match row.i64("level") {
            Some(2) => TrendSector::Sub {
                level: SectorLevel::Two,
                code: row.text("code").unwrap_or_default(),
            },
            Some(3) => TrendSector::Sub {
                level: SectorLevel::Three,
                code: row.text("code").unwrap_or_default(),
            },
            _ => TrendSector::Top { name: name.clone() },
        };
        Ok((sector, Some(name)))
    }

    /// CSV export bounded by the Export Guard
    pub async fn export(
        &self,
        request: &ReportRequest,
        mode: ExportMode,
    ) -> ReportResult<ExportFile> {
        let policy = self.export.policy(mode);
        let query = QueryBuilder::new(request).export(mode).with_limit(policy.fetch_limit());
        let rows = self.context.execute(&query).await?;

        let (kept, truncated) = apply_limit(rows.iter(), &policy);
        let mut writer = CsvWriter::new();
        match mode {
            ExportMode::AllYears => {
                writer.write_record(std::iter::once("Year").chain(EXPORT_HEADER))
            }
            ExportMode::SingleYear => writer.write_record(EXPORT_HEADER),
        }
        for row in &kept {
            let mut record: Vec<String> = Vec::with_capacity(EXPORT_HEADER.len() + 1);
            if mode == ExportMode::AllYears {
                record.push(row.text("year").unwrap_or_default());
            }
            record.extend(EXPORT_COLUMNS.iter().map(|c| row.text(c).unwrap_or_default()));
            record.push(to_tons(row.f64("total")).to_string());
            writer.write_record(&record);
        }

        let mut messages = Vec::new();
        if truncated {
            tracing::warn!(event = "EXPORT_TRUNCATED", limit = policy.limit(), mode = ?mode);
            messages.push(policy.advisory());
        }
        let filename = match mode {
            ExportMode::AllYears => "ghg_emissions_all_years.csv".to_string(),
            ExportMode::SingleYear => format!("ghg_emissions_{}.csv", request.reporting_year),
        };

        Ok(ExportFile {
            filename,
            content_type: "text/csv",
            rows: kept.len(),
            body: writer.finish(),
            truncated,
            messages,
        })
    }

    /// Facility details and gas breakdown for one year, falling back to the
    /// facility's latest row when it did not report that year
    pub async fn hover(&self, facility_id: &str, year: i32) -> ReportResult<FacilityHover> {
        let facility_id = facility_id.trim();
        if facility_id.is_empty() {
            return Err(PlannerError::bad_request("Missing facility id").into());
        }

        let (facility, emissions) = try_join(
            self.context.execute(&QueryBuilder::hover_facility(facility_id, year)),
            self.context.execute(&QueryBuilder::hover_emissions(facility_id, year)),
        )
        .await?;

        let facility = if facility.is_empty() {
            self.context.execute(&QueryBuilder::hover_latest(facility_id)).await?
        } else {
            facility
        };
        let row = facility
            .first()
            .ok_or_else(|| ReportError::NotFound("Facility not found".to_string()))?;
        Ok(FacilityHover::new(&row, &emissions))
    }
}
