//! Map markers and the paginated facility list

use serde::Serialize;

use super::charts::{TableColumn, TableData};
use super::units::{grouped, to_tons};
use crate::executor::{RowSet, RowView};
use crate::planner::{Page, Scalar};

pub const UNIT_TONS: &str = "MT";

/// Facility ids are numeric in the dataset; anything else passes through as text
fn facility_id(row: &RowView<'_>, column: &str) -> Scalar {
    let value = row.get(column);
    match value.as_i64() {
        Some(id) => Scalar::Int(id),
        None => value.clone(),
    }
}

/// One facility on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: Scalar,
    pub lt: Option<f64>,
    pub ln: Option<f64>,
    /// Metric tons
    pub emissions: i64,
}

pub fn markers(rows: &RowSet) -> Vec<Marker> {
    rows.iter()
        .map(|row| Marker {
            id: facility_id(&row, "id"),
            lt: row.f64("lt"),
            ln: row.f64("ln"),
            emissions: to_tons(row.f64("emissions")),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityRow {
    pub icons: Vec<String>,
    pub facility: String,
    pub facility_id: Scalar,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub total_reported_emissions: String,
}

/// One page of the facility list.
///
/// `total_count` comes from a separate count query over the same filters.
#[derive(Debug, Clone, Serialize)]
pub struct FacilityPage {
    pub data: TableData<FacilityRow>,
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub year: i32,
    pub unit: &'static str,
}

impl FacilityPage {
    pub fn new(rows: &RowSet, total_count: u64, page: Page, year: i32) -> Self {
        let cols = vec![
            TableColumn::icons(),
            TableColumn::text("facility", "facility", "Facility"),
            TableColumn::text("city", "city", "City"),
            TableColumn::text("state", "state", "State"),
            TableColumn::number("total", "totalReportedEmissions", "Total Reported Emissions"),
        ];
        let rows = rows
            .iter()
            .map(|row| {
                let id = facility_id(&row, "facility_id");
                FacilityRow {
                    icons: Vec::new(),
                    facility: format!("{} [{}]", row.text("facility_name").unwrap_or_default(), id),
                    facility_id: id,
                    city: row.text("city"),
                    state: row.text("state"),
                    county: row.text("county"),
                    total_reported_emissions: grouped(to_tons(row.f64("total")) as f64, 0),
                }
            })
            .collect();

        Self {
            data: TableData { cols, rows },
            total_count,
            page_number: page.number,
            page_size: page.size,
            year,
            unit: UNIT_TONS,
        }
    }

    pub fn rows(&self) -> &[FacilityRow] {
        &self.data.rows
    }
}
