//! Report requests
//!
//! `ReportBody` is the JSON body as the frontend sends it: every field is
//! optional and numbers may arrive as strings. `ReportBody::validate` turns it
//! into a `ReportRequest` with defaults applied and ranges checked.

use serde::{Deserialize, Serialize};

use super::errors::{PlannerError, PlannerResult};

/// Earliest and latest reporting years accepted
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1990..=2100;

/// A number that may be sent as JSON number or numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Lenient {
    /// `Ok(None)` for an empty string
    fn as_i64(&self, field: &str) -> PlannerResult<Option<i64>> {
        match self {
            Lenient::Int(i) => Ok(Some(*i)),
            Lenient::Float(f) if f.fract() == 0.0 => Ok(Some(*f as i64)),
            Lenient::Float(_) => {
                Err(PlannerError::bad_request(format!("{} must be a whole number", field)))
            }
            Lenient::Text(s) if s.trim().is_empty() => Ok(None),
            Lenient::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| PlannerError::bad_request(format!("{} must be a number", field))),
        }
    }

    fn as_f64(&self, field: &str) -> PlannerResult<Option<f64>> {
        match self {
            Lenient::Int(i) => Ok(Some(*i as f64)),
            Lenient::Float(f) => Ok(Some(*f)),
            Lenient::Text(s) if s.trim().is_empty() => Ok(None),
            Lenient::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Some)
                .ok_or_else(|| PlannerError::bad_request(format!("{} must be a number", field))),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Lenient::Int(i) => i.to_string(),
            Lenient::Float(f) => f.to_string(),
            Lenient::Text(s) => s.trim().to_string(),
        }
    }
}

/// Raw report body. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    pub reporting_year: Option<Lenient>,
    pub state: Option<String>,
    pub sector1: Option<String>,
    pub data_source: Option<String>,
    pub facility_id: Option<Lenient>,
    pub page_size: Option<Lenient>,
    pub page_number: Option<Lenient>,
    #[serde(rename = "lowE")]
    pub low_e: Option<Lenient>,
    #[serde(rename = "highE")]
    pub high_e: Option<Lenient>,
}

/// Defaults and bounds applied during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    pub default_year: i32,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// `sector_type` used when the body omits `dataSource`; `None` matches every source
    pub default_data_source: Option<String>,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            default_year: 2023,
            default_page_size: 100,
            max_page_size: 1000,
            default_data_source: Some("E".to_string()),
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.size as u64
    }
}

/// A validated report request.
///
/// `None` filters match everything.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub reporting_year: i32,
    /// Two-letter upper-case state code
    pub state: Option<String>,
    /// Level-1 sector name
    pub sector: Option<String>,
    pub data_source: Option<String>,
    pub facility_id: Option<String>,
    pub page: Page,
    /// Inclusive emission band in metric tons
    pub low_emissions: Option<f64>,
    pub high_emissions: Option<f64>,
}

impl ReportRequest {
    /// Request with defaults only
    pub fn defaults(limits: &RequestLimits) -> Self {
        Self {
            reporting_year: limits.default_year,
            state: None,
            sector: None,
            data_source: limits.default_data_source.clone(),
            facility_id: None,
            page: Page {
                number: 1,
                size: limits.default_page_size,
            },
            low_emissions: None,
            high_emissions: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.reporting_year = year;
        self
    }

    pub fn with_state(mut self, state: &str) -> PlannerResult<Self> {
        self.state = normalize_state(Some(state))?;
        Ok(self)
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = Some(source.into());
        self
    }

    pub fn with_any_data_source(mut self) -> Self {
        self.data_source = None;
        self
    }

    pub fn with_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_id = Some(facility_id.into());
        self
    }

    pub fn with_page(mut self, number: u32, size: u32) -> Self {
        self.page = Page { number, size };
        self
    }
}

impl ReportBody {
    /// Apply defaults and check ranges
    pub fn validate(&self, limits: &RequestLimits) -> PlannerResult<ReportRequest> {
        let reporting_year = match self.reporting_year.as_ref() {
            Some(y) => y.as_i64("reportingYear")?.map_or(Ok(limits.default_year), |y| {
                i32::try_from(y)
                    .ok()
                    .filter(|y| YEAR_RANGE.contains(y))
                    .ok_or_else(|| {
                        PlannerError::bad_request(format!("reportingYear out of range: {}", y))
                    })
            })?,
            None => limits.default_year,
        };

        let page_number = optional_i64(self.page_number.as_ref(), "pageNumber")?.unwrap_or(1);
        if page_number < 1 {
            return Err(PlannerError::bad_request("pageNumber must be at least 1"));
        }
        let page_size = optional_i64(self.page_size.as_ref(), "pageSize")?
            .unwrap_or(limits.default_page_size as i64);
        if page_size < 1 || page_size > limits.max_page_size as i64 {
            return Err(PlannerError::bad_request(format!(
                "pageSize must be between 1 and {}",
                limits.max_page_size
            )));
        }
        let page_number = u32::try_from(page_number)
            .map_err(|_| PlannerError::bad_request("pageNumber out of range"))?;

        let low_emissions = optional_f64(self.low_e.as_ref(), "lowE")?;
        let high_emissions = optional_f64(self.high_e.as_ref(), "highE")?;
        if let (Some(low), Some(high)) = (low_emissions, high_emissions) {
            if low > high {
                return Err(PlannerError::bad_request("lowE must not exceed highE"));
            }
        }

        Ok(ReportRequest {
            reporting_year,
            state: normalize_state(self.state.as_deref())?,
            sector: non_empty(self.sector1.as_deref()),
            data_source: non_empty(self.data_source.as_deref())
                .or_else(|| limits.default_data_source.clone()),
            facility_id: self
                .facility_id
                .as_ref()
                .map(Lenient::as_text)
                .filter(|s| !s.is_empty()),
            page: Page {
                number: page_number,
                size: page_size as u32,
            },
            low_emissions,
            high_emissions,
        })
    }
}

fn optional_i64(value: Option<&Lenient>, field: &str) -> PlannerResult<Option<i64>> {
    match value {
        Some(v) => v.as_i64(field),
        None => Ok(None),
    }
}

fn optional_f64(value: Option<&Lenient>, field: &str) -> PlannerResult<Option<f64>> {
    match value {
        Some(v) => v.as_f64(field),
        None => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// `US`, `LOCAL` and empty mean all states
pub fn normalize_state(state: Option<&str>) -> PlannerResult<Option<String>> {
    let state = match non_empty(state) {
        Some(s) => s.to_ascii_uppercase(),
        None => return Ok(None),
    };
    if state == "US" || state == "LOCAL" {
        return Ok(None);
    }
    if state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(Some(state))
    } else {
        Err(PlannerError::bad_request(format!("Invalid state code: {}", state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ReportBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_body_uses_defaults() {
        let request = parse("{}").validate(&RequestLimits::default()).unwrap();
        assert_eq!(request, ReportRequest::defaults(&RequestLimits::default()));
        assert_eq!(request.page.offset(), 0);
    }

    #[test]
    fn test_lenient_numbers() {
        let body = r#"{"reportingYear": "2021", "pageNumber": 3, "pageSize": "50",
            "facilityId": 1000112}"#;
        let request = parse(body)
            .validate(&RequestLimits::default())
            .unwrap();
        assert_eq!(request.reporting_year, 2021);
        assert_eq!(request.page, Page { number: 3, size: 50 });
        assert_eq!(request.page.offset(), 100);
        assert_eq!(request.facility_id.as_deref(), Some("1000112"));
    }

    #[test]
    fn test_state_wildcards() {
        let limits = RequestLimits::default();
        assert_eq!(parse(r#"{"state": "US"}"#).validate(&limits).unwrap().state, None);
        assert_eq!(parse(r#"{"state": ""}"#).validate(&limits).unwrap().state, None);
        let texas = parse(r#"{"state": "tx"}"#).validate(&limits).unwrap();
        assert_eq!(texas.state.as_deref(), Some("TX"));
        assert!(parse(r#"{"state": "Texas"}"#).validate(&limits).is_err());
    }

    #[test]
    fn test_pagination_rejected_out_of_range() {
        let limits = RequestLimits::default();
        assert!(parse(r#"{"pageNumber": 0}"#).validate(&limits).is_err());
        assert!(parse(r#"{"pageSize": 0}"#).validate(&limits).is_err());
        assert!(parse(r#"{"pageSize": 1001}"#).validate(&limits).is_err());
        assert!(parse(r#"{"pageSize": 1000}"#).validate(&limits).is_ok());
    }

    #[test]
    fn test_invalid_year() {
        let limits = RequestLimits::default();
        assert!(matches!(
            parse(r#"{"reportingYear": "latest"}"#).validate(&limits),
            Err(PlannerError::BadRequest(_))
        ));
        assert!(parse(r#"{"reportingYear": 1200}"#).validate(&limits).is_err());
    }

    #[test]
    fn test_emission_band() {
        let limits = RequestLimits::default();
        let request = parse(r#"{"lowE": 100, "highE": "2500.5"}"#).validate(&limits).unwrap();
        assert_eq!(request.low_emissions, Some(100.0));
        assert_eq!(request.high_emissions, Some(2500.5));
        assert!(parse(r#"{"lowE": 10, "highE": 1}"#).validate(&limits).is_err());
    }

    #[test]
    fn test_data_source_defaults_to_direct_emitters() {
        let limits = RequestLimits::default();
        let source = |json: &str| parse(json).validate(&limits).unwrap().data_source;
        assert_eq!(source("{}").as_deref(), Some("E"));
        assert_eq!(source(r#"{"dataSource": " "}"#).as_deref(), Some("E"));
        assert_eq!(source(r#"{"dataSource": "S"}"#).as_deref(), Some("S"));

        let open = RequestLimits {
            default_data_source: None,
            ..RequestLimits::default()
        };
        assert_eq!(parse("{}").validate(&open).unwrap().data_source, None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let body = parse(r#"{"tribalLand": null, "sector1": " Power Plants "}"#);
        let request = body.validate(&RequestLimits::default()).unwrap();
        assert_eq!(request.sector.as_deref(), Some("Power Plants"));
    }
}
