//! Trend series
//!
//! One point per year present in the data, ascending. Gap years are absent.

use serde::Serialize;

use super::charts::{Axis, SERIES_COLOR};
use super::units::to_mmt;
use crate::executor::RowSet;

pub const TOTAL_SERIES_NAME: &str = "Total GHG Emissions";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i64,
    /// Million metric tons
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub name: String,
    pub data: Vec<f64>,
    pub color: &'static str,
}

/// Line chart over reporting years
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendChart {
    pub points: Vec<TrendPoint>,
    pub x_axis: Axis,
    pub series: Vec<TrendSeries>,
    pub year_range: Vec<String>,
    pub credits: String,
}

impl TrendChart {
    /// `sector` is the sector's display name, `None` for all sectors
    pub fn from_rows(rows: &RowSet, sector: Option<&str>) -> Self {
        let mut points: Vec<TrendPoint> = rows
            .iter()
            .filter_map(|row| {
                row.i64("year").map(|year| TrendPoint {
                    year,
                    value: to_mmt(row.f64("total")),
                })
            })
            .collect();
        points.sort_by_key(|p| p.year);

        let years: Vec<String> = points.iter().map(|p| p.year.to_string()).collect();
        let credits = match (years.first(), years.last()) {
            (Some(first), Some(last)) => format!("Data from EPA GHGRP {}-{}", first, last),
            _ => String::new(),
        };
        let name = match sector {
            Some(sector) => format!("{} Emissions", sector),
            None => TOTAL_SERIES_NAME.to_string(),
        };

        Self {
            series: vec![TrendSeries {
                name,
                data: points.iter().map(|p| p.value).collect(),
                color: SERIES_COLOR,
            }],
            x_axis: Axis {
                categories: years.clone(),
            },
            year_range: years,
            credits,
            points,
        }
    }
}
