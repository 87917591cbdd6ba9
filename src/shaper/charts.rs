//! Chart and sector shapes
//!
//! Sector aggregates arrive in metric tons and leave in million metric tons.
//! Points are ordered by displayed value descending, then category ascending,
//! so the order never depends on input order or float noise below the
//! displayed precision.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use super::units::{grouped, to_mmt};
use crate::executor::RowSet;
use crate::planner::SectorLevel;

pub const FALLBACK_COLOR: &str = "#999999";
pub const SERIES_COLOR: &str = "#1f77b4";
pub const UNIT_MMT: &str = "MMT";
pub const DOMAIN_GHG: &str = "GHG";

/// Display colour for a level-1 sector
pub fn sector_color(name: &str) -> &'static str {
    match name {
        "Power Plants" => "#1f77b4",
        "Petroleum and Natural Gas Systems" => "#ff7f0e",
        "Chemicals" => "#2ca02c",
        "Refineries" => "#d62728",
        "Other" => "#9467bd",
        "Minerals" => "#8c564b",
        "Waste" => "#e377c2",
        "Metals" => "#7f7f7f",
        "Pulp and Paper" => "#bcbd22",
        _ => FALLBACK_COLOR,
    }
}

fn view_name(level: SectorLevel) -> String {
    format!("SECTOR{}", level.number())
}

fn credits(year: i32) -> String {
    format!("Data from EPA GHGRP {}", year)
}

/// One sector aggregate, ready for presentation
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    /// Sort tie-breaker: sector name at level 1, sector code below
    pub category: String,
    pub name: String,
    /// Total in metric tons; null when nothing was summed
    pub tons: Option<f64>,
    pub facilities: i64,
    pub sector_id: Option<i64>,
    pub color: Option<String>,
}

impl ChartPoint {
    pub fn mmt(&self) -> f64 {
        to_mmt(self.tons)
    }

    fn display_color(&self) -> String {
        self.color
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| sector_color(&self.name).to_string())
    }
}

/// Build points from a `sector_totals` result, enriching ids and colours
/// from an optional `sector_lookup` result keyed by name.
pub fn chart_points(totals: &RowSet, lookup: Option<&RowSet>) -> Vec<ChartPoint> {
    let mut by_name: HashMap<String, (Option<i64>, Option<String>)> = HashMap::new();
    if let Some(lookup) = lookup {
        for row in lookup.iter() {
            if let Some(name) = row.text("name") {
                by_name.insert(name, (row.i64("sector_id"), row.text("color")));
            }
        }
    }

    let mut points: Vec<ChartPoint> = totals
        .iter()
        .map(|row| {
            let name = row.text("name").unwrap_or_default();
            let (lookup_id, lookup_color) = by_name.get(&name).cloned().unwrap_or((None, None));
            ChartPoint {
                category: row.text("category").unwrap_or_else(|| name.clone()),
                tons: row.f64("total"),
                facilities: row.i64("facilities").unwrap_or(0),
                sector_id: row.i64("sector_id").or(lookup_id),
                color: row.text("color").or(lookup_color),
                name,
            }
        })
        .collect();
    sort_points(&mut points);
    points
}

/// Displayed value descending, category ascending
pub fn sort_points(points: &mut [ChartPoint]) {
    points.sort_by(|a, b| {
        b.mmt()
            .partial_cmp(&a.mmt())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
}

/// One row of `sectorEmissionDetails`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorDetail {
    pub sector_id: Option<i64>,
    pub sector_name: String,
    pub ghg_emission: f64,
    pub reported_emission: f64,
    pub total_emissions: f64,
    pub number_of_facilities_reported: i64,
    pub facility_count: i64,
    pub num_facilities: i64,
}

/// Response of the sector totals endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorTotals {
    pub sector_emission_details: Vec<SectorDetail>,
    pub total_reported_emission: f64,
    pub total_number_of_facilities: i64,
    /// Field name kept as the frontend spells it
    #[serde(rename = "totalNumOfFacilitesReported")]
    pub total_num_of_facilities_reported: i64,
    pub reporting_year: i32,
    pub unit_abbr: &'static str,
}

impl SectorTotals {
    /// The facility total sums per-sector distinct counts, so a facility
    /// reporting in two sectors counts twice.
    pub fn from_points(points: &[ChartPoint], year: i32) -> Self {
        let details: Vec<SectorDetail> = points
            .iter()
            .map(|p| SectorDetail {
                sector_id: p.sector_id,
                sector_name: p.name.clone(),
                ghg_emission: p.mmt(),
                reported_emission: p.mmt(),
                total_emissions: p.mmt(),
                number_of_facilities_reported: p.facilities,
                facility_count: p.facilities,
                num_facilities: p.facilities,
            })
            .collect();
        let total_tons: f64 = points.iter().filter_map(|p| p.tons).sum();
        let facilities: i64 = points.iter().map(|p| p.facilities).sum();

        Self {
            sector_emission_details: details,
            total_reported_emission: to_mmt(Some(total_tons)),
            total_number_of_facilities: facilities,
            total_num_of_facilities_reported: facilities,
            reporting_year: year,
            unit_abbr: UNIT_MMT,
        }
    }
}

/// Data-table column descriptor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub id: &'static str,
    pub field: &'static str,
    pub name: &'static str,
    pub sortable: bool,
    pub css_class: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl TableColumn {
    pub const fn icons() -> Self {
        Self {
            id: "icons",
            field: "icons",
            name: "",
            sortable: false,
            css_class: "icon-col",
            kind: None,
        }
    }

    pub const fn text(id: &'static str, field: &'static str, name: &'static str) -> Self {
        Self {
            id,
            field,
            name,
            sortable: true,
            css_class: "",
            kind: Some("string"),
        }
    }

    pub const fn number(id: &'static str, field: &'static str, name: &'static str) -> Self {
        Self {
            id,
            field,
            name,
            sortable: true,
            css_class: "",
            kind: Some("number"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorRow {
    pub icons: Vec<String>,
    pub sector: String,
    pub facilities: String,
    pub total_reported_emissions: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableData<R> {
    pub cols: Vec<TableColumn>,
    pub rows: Vec<R>,
}

/// Level-1 sector table
#[derive(Debug, Clone, Serialize)]
pub struct SectorList {
    pub data: TableData<SectorRow>,
    pub year: i32,
    pub unit: &'static str,
}

impl SectorList {
    pub fn from_points(points: &[ChartPoint], year: i32) -> Self {
        let cols = vec![
            TableColumn::icons(),
            TableColumn::text("sector", "sector", "Sector"),
            TableColumn::number("facilities", "facilities", "# Facilities"),
            TableColumn::number("total", "totalReportedEmissions", "Total Reported Emissions"),
        ];
        let rows = points
            .iter()
            .map(|p| SectorRow {
                icons: Vec::new(),
                sector: p.name.clone(),
                facilities: grouped(p.facilities as f64, 0),
                total_reported_emissions: grouped(p.mmt(), 2),
            })
            .collect();
        Self {
            data: TableData { cols, rows },
            year,
            unit: UNIT_MMT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: &'static str,
    pub id: &'static str,
    pub color: &'static str,
    pub data: Vec<f64>,
}

/// Bar chart: one series, one category per sector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    pub x_axis: Axis,
    pub series: Vec<BarSeries>,
    pub domain: &'static str,
    pub unit: &'static str,
    pub view: String,
    pub credits: String,
}

impl BarChart {
    pub fn from_points(points: &[ChartPoint], level: SectorLevel, year: i32) -> Self {
        Self {
            x_axis: Axis {
                categories: points.iter().map(|p| p.name.clone()).collect(),
            },
            series: vec![BarSeries {
                name: "GHG Emissions",
                id: "ghg_emissions",
                color: SERIES_COLOR,
                data: points.iter().map(ChartPoint::mmt).collect(),
            }],
            domain: DOMAIN_GHG,
            unit: UNIT_MMT,
            view: view_name(level),
            credits: credits(year),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub y: f64,
    pub color: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSeries {
    pub name: &'static str,
    pub data: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub series: Vec<PieSeries>,
    pub domain: &'static str,
    pub unit: &'static str,
    pub view: String,
    pub credits: String,
}

impl PieChart {
    pub fn from_points(points: &[ChartPoint], level: SectorLevel, year: i32) -> Self {
        let data = points
            .iter()
            .map(|p| PieSlice {
                name: p.name.clone(),
                y: p.mmt(),
                color: p.display_color(),
                id: p.sector_id,
            })
            .collect();
        Self {
            series: vec![PieSeries { name: "Emissions", data }],
            domain: DOMAIN_GHG,
            unit: UNIT_MMT,
            view: view_name(level),
            credits: credits(year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Scalar;

    fn point(category: &str, tons: f64) -> ChartPoint {
        ChartPoint {
            category: category.into(),
            name: category.into(),
            tons: Some(tons),
            facilities: 1,
            sector_id: None,
            color: None,
        }
    }

    #[test]
    fn test_sort_is_deterministic_under_shuffle() {
        let mut a = vec![point("Waste", 2e6), point("Chemicals", 5e6), point("Metals", 2e6)];
        let mut b = vec![point("Metals", 2e6), point("Waste", 2e6), point("Chemicals", 5e6)];
        sort_points(&mut a);
        sort_points(&mut b);
        assert_eq!(a, b);
        let order: Vec<&str> = a.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(order, vec!["Chemicals", "Metals", "Waste"]);
    }

    #[test]
    fn test_ties_at_display_precision() {
        let mut points = vec![point("B", 1_000_001.0), point("A", 1_000_000.0)];
        sort_points(&mut points);
        assert_eq!(points[0].category, "A");
    }

    #[test]
    fn test_lookup_enrichment() {
        let totals = RowSet::new(
            vec!["category".into(), "name".into(), "total".into(), "facilities".into()],
            vec![vec![
                Scalar::str("Power Plants"),
                Scalar::str("Power Plants"),
                Scalar::Float(1.5e9),
                Scalar::Int(1200),
            ]],
        );
        let lookup = RowSet::new(
            vec!["name".into(), "sector_id".into(), "color".into()],
            vec![vec![Scalar::str("Power Plants"), Scalar::str("1"), Scalar::Null]],
        );
        let points = chart_points(&totals, Some(&lookup));
        assert_eq!(points[0].sector_id, Some(1));
        assert_eq!(points[0].mmt(), 1500.0);

        let pie = PieChart::from_points(&points, SectorLevel::One, 2022);
        assert_eq!(pie.series[0].data[0].color, "#1f77b4");
        assert_eq!(pie.view, "SECTOR1");
    }

    #[test]
    fn test_sector_totals_shape() {
        let points = vec![point("Waste", 2_500_000.0), point("Metals", 1_000_000.0)];
        let totals = SectorTotals::from_points(&points, 2022);
        let value = serde_json::to_value(&totals).unwrap();
        assert_eq!(value["totalReportedEmission"], 3.5);
        assert_eq!(value["totalNumOfFacilitesReported"], 2);
        assert_eq!(value["sectorEmissionDetails"][0]["sectorName"], "Waste");
        assert_eq!(value["unitAbbr"], "MMT");
    }

    #[test]
    fn test_bar_chart_shape() {
        let points = vec![point("Waste", 2_500_000.0)];
        let chart = BarChart::from_points(&points, SectorLevel::Two, 2021);
        let value = serde_json::to_value(chart).unwrap();
        assert_eq!(value["xAxis"]["categories"][0], "Waste");
        assert_eq!(value["series"][0]["data"][0], 2.5);
        assert_eq!(value["view"], "SECTOR2");
        assert_eq!(value["credits"], "Data from EPA GHGRP 2021");
    }

    #[test]
    fn test_unknown_sector_color() {
        assert_eq!(sector_color("Unlisted"), FALLBACK_COLOR);
    }
}
