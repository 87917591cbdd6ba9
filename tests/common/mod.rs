//! Shared fixtures: small Parquet tables written with arrow into an
//! in-memory object store laid out like the production bucket.

#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::ArrowWriter;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ghg_api::executor::QueryContext;
use ghg_api::file_cache::{BackendConfig, FileCache, ObjectLayout, StorageBackend};
use ghg_api::http_server::{AppState, HttpServer, ServiceConfig};
use ghg_api::planner::{ReportRequest, RequestLimits, TableName};
use ghg_api::shaper::geo::{COUNTIES_BY_STATE, STATE_GEOMETRIES};
use ghg_api::shaper::{ExportLimits, Reports};

#[derive(Debug, Clone)]
pub struct FacilityRow {
    pub id: String,
    pub year: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub county: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub parent: String,
}

pub fn facility(id: &str, year: i64, name: &str, state: &str) -> FacilityRow {
    FacilityRow {
        id: id.to_string(),
        year,
        name: name.to_string(),
        city: "Springfield".to_string(),
        state: state.to_string(),
        county: "Greene".to_string(),
        latitude: Some(35.0),
        longitude: Some(-97.0),
        parent: "Holding Co".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct EmissionRow {
    pub facility_id: String,
    pub year: i64,
    pub gas: String,
    pub source: String,
    pub sector: String,
    pub level2: Option<String>,
    pub level3: Option<String>,
    pub tons: f64,
}

pub fn emission(facility_id: &str, year: i64, gas: &str, sector: &str, tons: f64) -> EmissionRow {
    EmissionRow {
        facility_id: facility_id.to_string(),
        year,
        gas: gas.to_string(),
        source: "E".to_string(),
        sector: sector.to_string(),
        level2: None,
        level3: None,
        tons,
    }
}

#[derive(Debug, Clone)]
pub struct SectorRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub level: i64,
    pub color: Option<String>,
}

pub fn sector(id: i64, name: &str, code: &str, level: i64) -> SectorRow {
    SectorRow {
        id,
        name: name.to_string(),
        code: code.to_string(),
        level,
        color: None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub facilities: Vec<FacilityRow>,
    pub emissions: Vec<EmissionRow>,
    pub sectors: Vec<SectorRow>,
}

impl Dataset {
    /// Four facilities reporting in 2022 (two in TX, two in CA), plus a
    /// minerals facility that reported only in 2015, 2018 and 2020. The
    /// refinery also carries a supplier (`S`) row.
    pub fn standard() -> Self {
        let mut facilities = vec![
            facility("1001", 2022, "Alpha Power Station", "TX"),
            facility("1002", 2022, "Beta Refinery", "TX"),
            facility("1003", 2022, "Gamma Landfill", "CA"),
            facility("1004", 2022, "Delta Generating", "CA"),
        ];
        facilities[3].latitude = None;
        facilities[3].longitude = None;
        for year in [2015, 2018, 2020] {
            facilities.push(facility("1005", year, "Epsilon Lime", "OH"));
        }

        const PNG: &str = "Petroleum and Natural Gas Systems";
        let mut refinery = emission("1002", 2022, "Carbon Dioxide", PNG, 2_000_000.0);
        refinery.level2 = Some("PNG-REF".to_string());
        refinery.level3 = Some("PNG-REF-HC".to_string());
        let mut power = emission("1001", 2022, "Carbon Dioxide", "Power Plants", 1_000_000.0);
        power.level2 = Some("PWR-FOS".to_string());
        let mut supplied = emission("1002", 2022, "Carbon Dioxide", PNG, 9_000_000.0);
        supplied.source = "S".to_string();

        let mut emissions = vec![
            power,
            emission("1001", 2022, "Methane", "Power Plants", 500_000.0),
            emission("1001", 2022, "Biogenic CO2", "Power Plants", 9_000_000.0),
            refinery,
            emission("1003", 2022, "Methane", "Waste", 300_000.0),
            emission("1004", 2022, "Carbon Dioxide", "Power Plants", 250_000.0),
            supplied,
        ];
        emissions[1].level2 = Some("PWR-FOS".to_string());
        for (year, tons) in [(2015, 120_000.0), (2018, 110_000.0), (2020, 90_000.0)] {
            emissions.push(emission("1005", year, "Carbon Dioxide", "Minerals", tons));
        }

        let mut sectors = vec![
            sector(1, "Power Plants", "PWR", 1),
            sector(2, "Petroleum and Natural Gas Systems", "PNG", 1),
            sector(3, "Waste", "WST", 1),
            sector(4, "Minerals", "MIN", 1),
            sector(21, "Fossil Generation", "PWR-FOS", 2),
            sector(22, "Refineries", "PNG-REF", 2),
            sector(31, "Hydrocracking", "PNG-REF-HC", 3),
        ];
        sectors[4].color = Some("#123456".to_string());

        Self {
            facilities,
            emissions,
            sectors,
        }
    }

    /// `count` facilities in `year`, one emission row each
    pub fn bulk(count: usize, year: i64) -> Self {
        let mut dataset = Self::default();
        for i in 0..count {
            let id = format!("{}", 100_000 + i);
            dataset.facilities.push(facility(&id, year, &format!("Facility {}", i), "TX"));
            dataset
                .emissions
                .push(emission(&id, year, "Carbon Dioxide", "Power Plants", 1_000.0 + i as f64));
        }
        dataset.sectors.push(sector(1, "Power Plants", "PWR", 1));
        dataset
    }

    fn facilities_batch(&self) -> RecordBatch {
        let rows = &self.facilities;
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("facility_id", strings(rows, |r| r.id.as_str())),
            ("year", ints(rows, |r| r.year)),
            ("facility_name", strings(rows, |r| r.name.as_str())),
            ("address1", strings(rows, |_| "1 Main St")),
            ("address2", optional_strings(rows, |_| None)),
            ("city", strings(rows, |r| r.city.as_str())),
            ("state", strings(rows, |r| r.state.as_str())),
            ("county", strings(rows, |r| r.county.as_str())),
            ("zip", strings(rows, |_| "75001")),
            ("latitude", floats(rows, |r| r.latitude)),
            ("longitude", floats(rows, |r| r.longitude)),
            ("parent_company", strings(rows, |r| r.parent.as_str())),
        ];
        batch(columns)
    }

    fn emissions_batch(&self) -> RecordBatch {
        let rows = &self.emissions;
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("facility_id", strings(rows, |r| r.facility_id.as_str())),
            ("year", ints(rows, |r| r.year)),
            ("gas_name", strings(rows, |r| r.gas.as_str())),
            ("sector_type", strings(rows, |r| r.source.as_str())),
            ("sector_name", strings(rows, |r| r.sector.as_str())),
            ("level2_code", optional_strings(rows, |r| r.level2.as_deref())),
            ("level3_code", optional_strings(rows, |r| r.level3.as_deref())),
            ("co2e_emission", floats(rows, |r| Some(r.tons))),
        ];
        batch(columns)
    }

    fn sectors_batch(&self) -> RecordBatch {
        let rows = &self.sectors;
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("sector_id", ints(rows, |r| r.id)),
            ("sector_name", strings(rows, |r| r.name.as_str())),
            ("sector_code", strings(rows, |r| r.code.as_str())),
            ("sector_level", ints(rows, |r| r.level)),
            ("sector_color", optional_strings(rows, |r| r.color.as_deref())),
        ];
        batch(columns)
    }

    /// Upload every table and the geo documents under the default layout
    pub async fn upload(&self, store: &InMemory) {
        let layout = ObjectLayout::default();
        let tables = [
            (TableName::Facilities, self.facilities_batch()),
            (TableName::EmitterSector, self.emissions_batch()),
            (TableName::DimSector, self.sectors_batch()),
        ];
        for (name, batch) in tables {
            let payload = PutPayload::from(parquet_bytes(&batch));
            store.put(&layout.table_key(name.as_str()), payload).await.unwrap();
        }

        let states = serde_json::json!({
            "TX": {
                "name": "Texas",
                "bounds": [[-106.6, 25.8], [-93.5, 36.5]],
                "geometry": {"type": "Polygon", "coordinates": []}
            },
            "CA": {
                "name": "California",
                "bounds": [[-124.4, 32.5], [-114.1, 42.0]],
                "geometry": null
            }
        });
        let counties = serde_json::json!({"TX": ["Dallas", "Harris"], "CA": ["Alameda"]});
        for (file, doc) in [(STATE_GEOMETRIES, states), (COUNTIES_BY_STATE, counties)] {
            let payload = PutPayload::from(Bytes::from(doc.to_string()));
            store.put(&layout.geo_key(file), payload).await.unwrap();
        }
    }
}

fn strings<R>(rows: &[R], f: impl Fn(&R) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn optional_strings<R>(rows: &[R], f: impl Fn(&R) -> Option<&str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn ints<R>(rows: &[R], f: impl Fn(&R) -> i64) -> ArrayRef {
    Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn floats<R>(rows: &[R], f: impl Fn(&R) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

fn parquet_bytes(batch: &RecordBatch) -> Bytes {
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
    Bytes::from(buffer)
}

/// A populated store plus a private scratch directory
pub struct Fixture {
    pub store: Arc<InMemory>,
    pub scratch: TempDir,
    pub export: ExportLimits,
}

impl Fixture {
    pub async fn new(dataset: &Dataset) -> Self {
        let store = Arc::new(InMemory::new());
        dataset.upload(&store).await;
        Self {
            store,
            scratch: TempDir::new().unwrap(),
            export: ExportLimits::default(),
        }
    }

    pub async fn standard() -> Self {
        Self::new(&Dataset::standard()).await
    }

    pub fn backend(&self) -> StorageBackend {
        StorageBackend::from_store(self.store.clone())
    }

    pub fn config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.storage = BackendConfig::Memory;
        config.scratch_dir = self.scratch.path().to_path_buf();
        config.export = self.export;
        config
    }

    /// Reports over a fresh execution context
    pub fn reports(&self) -> Reports {
        let cache = FileCache::new(&self.backend(), ObjectLayout::default(), self.scratch.path());
        Reports::new(QueryContext::new(cache), self.export)
    }

    pub fn router(&self) -> Router {
        HttpServer::build_router(Arc::new(AppState::new(self.config(), self.backend())))
    }
}

/// Request for 2022 with no filters
pub fn request() -> ReportRequest {
    ReportRequest::defaults(&RequestLimits::default()).with_year(2022)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

/// Send one request through the router
pub async fn send(router: Router, method: Method, uri: &str, body: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("origin", "http://localhost:5173")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    Reply { status, headers, body }
}

pub async fn post(router: Router, uri: &str, body: Value) -> Reply {
    send(router, Method::POST, uri, &body.to_string()).await
}
