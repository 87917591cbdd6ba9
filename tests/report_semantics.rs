//! Report semantics over Parquet fixtures
//!
//! Rollups, biogenic exclusion, wildcard filters, pagination and trend gaps,
//! exercised through `Reports` against an in-memory bucket.

mod common;

use std::sync::Arc;

use common::{request, Fixture};
use ghg_api::executor::QueryContext;
use ghg_api::file_cache::{FileCache, ObjectLayout, StorageBackend};
use ghg_api::planner::{
    PlannerError, QueryBuilder, ReportBody, RequestLimits, SectorLevel, TableName,
};
use ghg_api::shaper::{ExportLimits, ReportError, Reports};
use object_store::memory::InMemory;

#[tokio::test]
async fn test_level_one_totals_exclude_biogenic() {
    let fixture = Fixture::standard().await;
    let totals = fixture.reports().sector_totals(&request()).await.unwrap();

    let names: Vec<&str> = totals
        .sector_emission_details
        .iter()
        .map(|d| d.sector_name.as_str())
        .collect();
    assert_eq!(names, vec!["Petroleum and Natural Gas Systems", "Power Plants", "Waste"]);

    let power = &totals.sector_emission_details[1];
    assert_eq!(power.ghg_emission, 1.75);
    assert_eq!(power.number_of_facilities_reported, 2);
    assert_eq!(power.sector_id, Some(1));

    assert_eq!(totals.total_reported_emission, 4.05);
    assert_eq!(totals.total_number_of_facilities, 4);
    assert_eq!(totals.reporting_year, 2022);
}

#[tokio::test]
async fn test_state_filter_and_national_wildcard() {
    let fixture = Fixture::standard().await;

    let texas = request().with_state("tx").unwrap();
    let chart = fixture.reports().bar(&texas, SectorLevel::One).await.unwrap();
    assert_eq!(
        chart.x_axis.categories,
        vec!["Petroleum and Natural Gas Systems".to_string(), "Power Plants".to_string()]
    );
    assert_eq!(chart.series[0].data, vec![2.0, 1.5]);

    let national = request().with_state("US").unwrap();
    let everything = fixture.reports().bar(&national, SectorLevel::One).await.unwrap();
    let unfiltered = fixture.reports().bar(&request(), SectorLevel::One).await.unwrap();
    assert_eq!(everything, unfiltered);
    assert_eq!(everything.series[0].data.len(), 3);

    let california = request().with_state("CA").unwrap();
    let mut by_state = 0.0;
    let mut facilities = 0;
    for state in [&texas, &california] {
        let totals = fixture.reports().sector_totals(state).await.unwrap();
        by_state += totals.total_reported_emission;
        facilities += totals.total_number_of_facilities;
    }
    let all = fixture.reports().sector_totals(&national).await.unwrap();
    assert!((by_state - all.total_reported_emission).abs() < 1e-9);
    assert_eq!(facilities, all.total_number_of_facilities);
}

#[tokio::test]
async fn test_sector_and_source_filters() {
    let fixture = Fixture::standard().await;

    let waste = request().with_sector("Waste");
    let markers = fixture.reports().markers(&waste).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].emissions, 300_000);

    let supplier = request().with_data_source("S");
    let totals = fixture.reports().sector_totals(&supplier).await.unwrap();
    assert_eq!(totals.sector_emission_details.len(), 1);
    assert_eq!(totals.sector_emission_details[0].ghg_emission, 9.0);
    assert_eq!(totals.total_number_of_facilities, 1);

    let empty = request().with_data_source("X");
    let totals = fixture.reports().sector_totals(&empty).await.unwrap();
    assert!(totals.sector_emission_details.is_empty());
    assert_eq!(totals.total_reported_emission, 0.0);
}

#[tokio::test]
async fn test_omitted_source_excludes_supplier_rows() {
    let fixture = Fixture::standard().await;

    let direct = fixture.reports().bar(&request(), SectorLevel::One).await.unwrap();
    assert_eq!(direct.series[0].data, vec![2.0, 1.75, 0.3]);

    let body = serde_json::json!({"reportingYear": 2022});
    let validated: ReportBody = serde_json::from_value(body).unwrap();
    let from_body = validated.validate(&RequestLimits::default()).unwrap();
    let totals = fixture.reports().sector_totals(&from_body).await.unwrap();
    assert_eq!(totals.total_reported_emission, 4.05);

    let any_source = request().with_any_data_source();
    let totals = fixture.reports().sector_totals(&any_source).await.unwrap();
    assert_eq!(totals.total_reported_emission, 13.05);
}

#[tokio::test]
async fn test_markers_skip_missing_coordinates() {
    let fixture = Fixture::standard().await;
    let markers = fixture.reports().markers(&request()).await.unwrap();

    let ids: Vec<String> = markers.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1003"]);
    assert_eq!(markers[0].emissions, 1_500_000);
}

#[tokio::test]
async fn test_emission_band_bounds_markers() {
    let fixture = Fixture::standard().await;
    let mut banded = request();
    banded.low_emissions = Some(400_000.0);
    banded.high_emissions = Some(1_500_000.0);

    let markers = fixture.reports().markers(&banded).await.unwrap();
    let ids: Vec<String> = markers.iter().map(|m| m.id.to_string()).collect();
    assert_eq!(ids, vec!["1001"]);
}

#[tokio::test]
async fn test_lower_level_rollups_follow_hierarchy() {
    let fixture = Fixture::standard().await;

    let bar = fixture.reports().bar(&request(), SectorLevel::Two).await.unwrap();
    assert_eq!(
        bar.x_axis.categories,
        vec!["Refineries".to_string(), "Fossil Generation".to_string()]
    );
    assert_eq!(bar.view, "SECTOR2");

    let pie = fixture.reports().pie(&request(), SectorLevel::Three).await.unwrap();
    let slices = &pie.series[0].data;
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].name, "Hydrocracking");
    assert_eq!(slices[0].y, 2.0);
    assert_eq!(slices[0].id, Some(31));
}

#[tokio::test]
async fn test_facility_filter_rejected_for_sub_sector_rollup() {
    let fixture = Fixture::standard().await;
    let scoped = request().with_facility("1001");

    let result = fixture.reports().pie(&scoped, SectorLevel::Three).await;
    assert!(matches!(
        result,
        Err(ReportError::Planner(PlannerError::InvalidFilterCombination(_)))
    ));

    let level_one = fixture.reports().pie(&scoped, SectorLevel::One).await.unwrap();
    assert_eq!(level_one.series[0].data.len(), 1);
}

#[tokio::test]
async fn test_pagination_covers_total_count() {
    let fixture = Fixture::standard().await;

    let first = fixture.reports().list_facilities(&request().with_page(1, 3)).await.unwrap();
    let second = fixture.reports().list_facilities(&request().with_page(2, 3)).await.unwrap();
    let beyond = fixture.reports().list_facilities(&request().with_page(3, 3)).await.unwrap();

    assert_eq!(first.total_count, 4);
    assert_eq!(second.total_count, 4);
    assert_eq!(
        (first.rows().len() + second.rows().len() + beyond.rows().len()) as u64,
        first.total_count
    );

    assert_eq!(first.rows()[0].facility, "Beta Refinery [1002]");
    assert_eq!(first.rows()[0].total_reported_emissions, "2,000,000");
    assert_eq!(second.rows()[0].facility, "Delta Generating [1004]");
}

#[tokio::test]
async fn test_trend_keeps_gap_years_absent() {
    let fixture = Fixture::standard().await;
    let trend = fixture
        .reports()
        .trend(&request(), 4, SectorLevel::One)
        .await
        .unwrap();

    let years: Vec<i64> = trend.points.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2015, 2018, 2020]);
    assert_eq!(trend.series[0].name, "Minerals Emissions");
    assert_eq!(trend.series[0].data, vec![0.12, 0.11, 0.09]);
    assert_eq!(trend.credits, "Data from EPA GHGRP 2015-2020");
}

#[tokio::test]
async fn test_trend_for_all_sectors_and_sub_sector() {
    let fixture = Fixture::standard().await;

    let all = fixture.reports().trend(&request(), 0, SectorLevel::One).await.unwrap();
    assert_eq!(all.year_range, vec!["2015", "2018", "2020", "2022"]);
    assert_eq!(all.series[0].name, "Total GHG Emissions");

    let refineries = fixture.reports().trend(&request(), 22, SectorLevel::Two).await.unwrap();
    assert_eq!(refineries.year_range, vec!["2022"]);
    assert_eq!(refineries.series[0].data, vec![2.0]);
}

#[tokio::test]
async fn test_trend_unknown_sector_is_bad_request() {
    let fixture = Fixture::standard().await;
    let result = fixture.reports().trend(&request(), 999, SectorLevel::One).await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_hover_includes_biogenic_and_falls_back_to_latest() {
    let fixture = Fixture::standard().await;

    let hover = fixture.reports().hover("1001", 2022).await.unwrap();
    let gases: Vec<&str> = hover.emissions.iter().map(|e| e.gas.as_str()).collect();
    assert_eq!(gases, vec!["Biogenic CO2", "Carbon Dioxide", "Methane"]);
    assert_eq!(hover.emissions[0].quantity, 9_000_000);

    let latest = fixture.reports().hover("1005", 2022).await.unwrap();
    assert_eq!(latest.facility_tip_dto.facility_name.as_deref(), Some("Epsilon Lime"));
    assert!(latest.emissions.is_empty());

    let missing = fixture.reports().hover("9999", 2022).await;
    assert!(matches!(missing, Err(ReportError::NotFound(_))));
}

#[tokio::test]
async fn test_missing_table_is_storage_error() {
    let scratch = tempfile::TempDir::new().unwrap();
    let empty = StorageBackend::from_store(Arc::new(InMemory::new()));
    let cache = FileCache::new(&empty, ObjectLayout::default(), scratch.path());
    let reports = Reports::new(QueryContext::new(cache), ExportLimits::default());

    let err = reports.markers(&request()).await.unwrap_err();
    assert_eq!(err.code(), "GHG_STORAGE");
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn test_concurrent_queries_share_one_decode_per_table() {
    let fixture = Fixture::standard().await;
    let cache = FileCache::new(&fixture.backend(), ObjectLayout::default(), fixture.scratch.path());
    let context = QueryContext::new(cache);

    let req = request();
    let builder = QueryBuilder::new(&req);
    let totals = builder.sector_totals(SectorLevel::One).unwrap();
    let markers = builder.map_markers();
    assert!(context.decoded(TableName::EmitterSector).is_none());

    let (a, b) = futures_util::future::try_join(context.execute(&totals), context.execute(&markers))
        .await
        .unwrap();
    assert!(!a.is_empty());
    assert!(!b.is_empty());

    let sectors = context.decoded(TableName::EmitterSector).unwrap();
    let facilities = context.decoded(TableName::Facilities).unwrap();
    context.execute(&markers).await.unwrap();
    assert!(Arc::ptr_eq(&sectors, &context.decoded(TableName::EmitterSector).unwrap()));
    assert!(Arc::ptr_eq(&facilities, &context.decoded(TableName::Facilities).unwrap()));
}
