//! Facility hover card

use serde::Serialize;

use super::units::to_tons;
use crate::executor::{RowSet, RowView};
use crate::planner::Scalar;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityTip {
    pub facility_id: Scalar,
    pub facility_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent_company: Option<String>,
}

impl FacilityTip {
    pub fn from_row(row: &RowView<'_>) -> Self {
        let id = row.get("facility_id");
        Self {
            facility_id: id.as_i64().map(Scalar::Int).unwrap_or_else(|| id.clone()),
            facility_name: row.text("facility_name"),
            address1: row.text("address1"),
            address2: row.text("address2"),
            city: row.text("city"),
            state: row.text("state"),
            county: row.text("county"),
            zip: row.text("zip"),
            latitude: row.f64("latitude"),
            longitude: row.f64("longitude"),
            parent_company: row.text("parent_company"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GasEmission {
    #[serde(rename = "type")]
    pub gas: String,
    /// Metric tons
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityHover {
    pub facility_tip_dto: FacilityTip,
    pub emissions: Vec<GasEmission>,
}

impl FacilityHover {
    pub fn new(facility: &RowView<'_>, emissions: &RowSet) -> Self {
        Self {
            facility_tip_dto: FacilityTip::from_row(facility),
            emissions: emissions
                .iter()
                .map(|row| GasEmission {
                    gas: row.text("gas").unwrap_or_default(),
                    quantity: to_tons(row.f64("quantity")),
                })
                .collect(),
        }
    }
}
