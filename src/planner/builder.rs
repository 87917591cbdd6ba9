//! Query builder
//!
//! Translates a `ReportRequest` into query descriptors for each endpoint
//! family. Omitted filters emit no predicate. Every emission aggregate except
//! the hover gas breakdown excludes biogenic CO2.
//!
//! Rollups: level 1 groups fact rows by `sector_name` directly; levels 2 and 3
//! inner-join the fact table's `level{n}_code` to the sector hierarchy, so codes
//! without a hierarchy entry drop out of the rollup.
//!
//! Trend series group by year. Years without matching rows are absent from the
//! result; they are never zero-filled.

use std::fmt;
use std::str::FromStr;

use super::ast::{
    col, Aggregate, FilterOp, Join, JoinKind, Predicate, QueryDescriptor, Scalar, SortSpec,
    TableName, TableRef,
};
use super::errors::{PlannerError, PlannerResult};
use super::request::ReportRequest;

/// Gas excluded from emission totals
pub const BIOGENIC_CO2: &str = "Biogenic CO2";

const FACILITY: &str = "f";
const EMISSION: &str = "e";
const SECTOR: &str = "d";

/// Sector hierarchy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectorLevel {
    One,
    Two,
    Three,
}

impl SectorLevel {
    pub fn number(&self) -> u8 {
        match self {
            SectorLevel::One => 1,
            SectorLevel::Two => 2,
            SectorLevel::Three => 3,
        }
    }

    /// Fact column holding this level's code (levels 2 and 3)
    fn fact_code_column(&self) -> &'static str {
        match self {
            SectorLevel::One => "sector_name",
            SectorLevel::Two => "level2_code",
            SectorLevel::Three => "level3_code",
        }
    }
}

impl FromStr for SectorLevel {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(SectorLevel::One),
            "2" => Ok(SectorLevel::Two),
            "3" => Ok(SectorLevel::Three),
            other => Err(PlannerError::bad_request(format!(
                "Sector level must be 1, 2 or 3, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SectorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Sector selected for a trend series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrendSector {
    /// All sectors (id `0`)
    All,
    /// A level-1 sector, matched by name
    Top { name: String },
    /// A level-2 or level-3 sector, matched by code
    Sub { level: SectorLevel, code: String },
}

/// Export flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// One reporting year
    SingleYear,
    /// Every reporting year, year column first
    AllYears,
}

/// Endpoint families, for explain output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    MapMarkers,
    SectorTotals,
    ListSectors,
    ListFacilities,
    Bar(SectorLevel),
    Pie(SectorLevel),
    Trend,
    Export(ExportMode),
    Hover,
}

impl FromStr for EndpointKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "map-markers" | "map-overlay" => EndpointKind::MapMarkers,
            "sector-totals" => EndpointKind::SectorTotals,
            "list-sectors" => EndpointKind::ListSectors,
            "list-facilities" => EndpointKind::ListFacilities,
            "bar" => EndpointKind::Bar(SectorLevel::One),
            "bar-level2" => EndpointKind::Bar(SectorLevel::Two),
            "pie" => EndpointKind::Pie(SectorLevel::One),
            "pie-level2" => EndpointKind::Pie(SectorLevel::Two),
            "pie-level3" => EndpointKind::Pie(SectorLevel::Three),
            "trend" => EndpointKind::Trend,
            "export" => EndpointKind::Export(ExportMode::SingleYear),
            "export-all-years" => EndpointKind::Export(ExportMode::AllYears),
            "hover" => EndpointKind::Hover,
            other => return Err(PlannerError::UnknownEndpoint(other.to_string())),
        };
        Ok(kind)
    }
}

impl EndpointKind {
    /// Names accepted by `from_str`
    pub fn names() -> &'static [&'static str] {
        &[
            "map-markers",
            "map-overlay",
            "sector-totals",
            "list-sectors",
            "list-facilities",
            "bar",
            "bar-level2",
            "pie",
            "pie-level2",
            "pie-level3",
            "trend",
            "export",
            "export-all-years",
            "hover",
        ]
    }
}

/// Builds descriptors for one validated request
pub struct QueryBuilder<'a> {
    request: &'a ReportRequest,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(request: &'a ReportRequest) -> Self {
        Self { request }
    }

    /// Every descriptor an endpoint issues, in execution order
    pub fn build(&self, kind: EndpointKind) -> PlannerResult<Vec<QueryDescriptor>> {
        let queries = match kind {
            EndpointKind::MapMarkers => vec![self.map_markers()],
            EndpointKind::SectorTotals | EndpointKind::ListSectors => {
                vec![self.sector_totals(SectorLevel::One)?, Self::sector_lookup()]
            }
            EndpointKind::ListFacilities => {
                let page = self.facility_page();
                let count = page.count();
                vec![page, count]
            }
            EndpointKind::Bar(level) | EndpointKind::Pie(level) => {
                let mut queries = vec![self.sector_totals(level)?];
                if level == SectorLevel::One {
                    queries.push(Self::sector_lookup());
                }
                queries
            }
            EndpointKind::Trend => vec![self.sector_trend(&TrendSector::All)],
            EndpointKind::Export(mode) => vec![self.export(mode)],
            EndpointKind::Hover => {
                let facility = self
                    .request
                    .facility_id
                    .as_deref()
                    .ok_or_else(|| PlannerError::bad_request("Missing facility id"))?;
                vec![
                    Self::hover_facility(facility, self.request.reporting_year),
                    Self::hover_latest(facility),
                    Self::hover_emissions(facility, self.request.reporting_year),
                ]
            }
        };
        Ok(queries)
    }

    /// Reject filters that cannot share one rollup
    pub fn check_rollup(&self, level: SectorLevel) -> PlannerResult<()> {
        if level != SectorLevel::One && self.request.facility_id.is_some() {
            return Err(PlannerError::InvalidFilterCombination(format!(
                "A facility filter cannot be combined with a level {} sector rollup",
                level
            )));
        }
        Ok(())
    }

    /// Fact-row filters shared by every emission aggregate (no year)
    fn emission_filters(&self) -> Vec<Predicate> {
        let mut filters = vec![Predicate::ne(col(EMISSION, "gas_name"), BIOGENIC_CO2)];
        if let Some(source) = &self.request.data_source {
            filters.push(Predicate::eq(col(EMISSION, "sector_type"), source.as_str()));
        }
        if let Some(sector) = &self.request.sector {
            filters.push(Predicate::eq(col(EMISSION, "sector_name"), sector.as_str()));
        }
        filters
    }

    /// Restrict fact rows to facilities in the requested state
    fn state_join(&self) -> Option<Join> {
        self.request.state.as_ref().map(|state| {
            Join::new(JoinKind::Inner, TableRef::new(TableName::Facilities, FACILITY))
                .on(col(EMISSION, "facility_id"), col(FACILITY, "facility_id"))
                .on(col(EMISSION, "year"), col(FACILITY, "year"))
                .filter(Predicate::eq(col(FACILITY, "state"), state.as_str()))
        })
    }

    /// Fact table scan with the request's filters applied
    fn fact_scan(&self, label: &str, with_year: bool) -> QueryDescriptor {
        let mut query = QueryDescriptor::new(label, TableName::EmitterSector, EMISSION)
            .filters(self.emission_filters());
        if with_year {
            query = query.filter(Predicate::eq(col(EMISSION, "year"), self.request.reporting_year));
        }
        if let Some(facility) = &self.request.facility_id {
            query = query.filter(Predicate::eq(col(EMISSION, "facility_id"), facility.as_str()));
        }
        if let Some(join) = self.state_join() {
            query = query.join(join);
        }
        query
    }

    /// Facility-year rows joined to their emissions. Inner when a sector
    /// filter is present so only facilities reporting in that sector remain.
    fn facility_emissions(&self, label: &str) -> QueryDescriptor {
        let kind = if self.request.sector.is_some() {
            JoinKind::Inner
        } else {
            JoinKind::Left
        };
        let mut query = QueryDescriptor::new(label, TableName::Facilities, FACILITY).join(
            Join::new(kind, TableRef::new(TableName::EmitterSector, EMISSION))
                .on(col(FACILITY, "facility_id"), col(EMISSION, "facility_id"))
                .on(col(FACILITY, "year"), col(EMISSION, "year"))
                .filters(self.emission_filters()),
        );
        if let Some(state) = &self.request.state {
            query = query.filter(Predicate::eq(col(FACILITY, "state"), state.as_str()));
        }
        if let Some(facility) = &self.request.facility_id {
            query = query.filter(Predicate::eq(col(FACILITY, "facility_id"), facility.as_str()));
        }
        query
    }

    /// One marker per facility with coordinates, for the requested year
    pub fn map_markers(&self) -> QueryDescriptor {
        let mut query = self
            .facility_emissions("map_markers")
            .filter(Predicate::eq(col(FACILITY, "year"), self.request.reporting_year))
            .filter(Predicate::not_empty(col(FACILITY, "latitude")))
            .filter(Predicate::not_empty(col(FACILITY, "longitude")))
            .group_by(col(FACILITY, "facility_id"))
            .column(col(FACILITY, "facility_id"), "id")
            .aggregate(Aggregate::Max(col(FACILITY, "latitude")), "lt")
            .aggregate(Aggregate::Max(col(FACILITY, "longitude")), "ln")
            .aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "emissions");
        if let Some(low) = self.request.low_emissions {
            query = query.having("emissions", FilterOp::Gte(Scalar::Float(low)));
        }
        if let Some(high) = self.request.high_emissions {
            query = query.having("emissions", FilterOp::Lte(Scalar::Float(high)));
        }
        query.order_by(SortSpec::asc("id"))
    }

    /// Emission totals per sector at `level`, largest first.
    ///
    /// Output columns: `category`, `name`, `total`, `facilities`, and for
    /// levels 2/3 also `sector_id`, `color`.
    pub fn sector_totals(&self, level: SectorLevel) -> PlannerResult<QueryDescriptor> {
        self.check_rollup(level)?;
        let label = format!("sector_totals_l{}", level);
        let query = self.fact_scan(&label, true);

        let query = match level {
            SectorLevel::One => query
                .group_by(col(EMISSION, "sector_name"))
                .column(col(EMISSION, "sector_name"), "category")
                .column(col(EMISSION, "sector_name"), "name"),
            SectorLevel::Two | SectorLevel::Three => query
                .join(
                    Join::new(JoinKind::Inner, TableRef::new(TableName::DimSector, SECTOR))
                        .on(col(EMISSION, level.fact_code_column()), col(SECTOR, "sector_code"))
                        .filter(Predicate::eq(col(SECTOR, "sector_level"), level.number() as i64)),
                )
                .group_by(col(SECTOR, "sector_code"))
                .column(col(SECTOR, "sector_code"), "category")
                .aggregate(Aggregate::Max(col(SECTOR, "sector_name")), "name")
                .aggregate(Aggregate::Max(col(SECTOR, "sector_id")), "sector_id")
                .aggregate(Aggregate::Max(col(SECTOR, "sector_color")), "color"),
        };

        Ok(query
            .aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "total")
            .aggregate(Aggregate::CountDistinct(col(EMISSION, "facility_id")), "facilities")
            .order_by(SortSpec::desc("total"))
            .order_by(SortSpec::asc("category")))
    }

    /// Level-1 sector ids and colours, keyed by name
    pub fn sector_lookup() -> QueryDescriptor {
        QueryDescriptor::new("sector_lookup", TableName::DimSector, SECTOR)
            .filter(Predicate::eq(col(SECTOR, "sector_level"), 1i64))
            .group_by(col(SECTOR, "sector_name"))
            .column(col(SECTOR, "sector_name"), "name")
            .aggregate(Aggregate::Max(col(SECTOR, "sector_id")), "sector_id")
            .aggregate(Aggregate::Max(col(SECTOR, "sector_color")), "color")
            .order_by(SortSpec::asc("name"))
    }

    /// Hierarchy entry for a sector id
    pub fn sector_by_id(sector_id: i64) -> QueryDescriptor {
        QueryDescriptor::new("sector_by_id", TableName::DimSector, SECTOR)
            .filter(Predicate::eq(col(SECTOR, "sector_id"), sector_id))
            .column(col(SECTOR, "sector_name"), "name")
            .column(col(SECTOR, "sector_code"), "code")
            .column(col(SECTOR, "sector_level"), "level")
            .order_by(SortSpec::asc("level"))
            .with_limit(1)
    }

    /// One page of facilities for the requested year, largest emitters first
    pub fn facility_page(&self) -> QueryDescriptor {
        self.facility_emissions("facility_page")
            .filter(Predicate::eq(col(FACILITY, "year"), self.request.reporting_year))
            .group_by(col(FACILITY, "facility_id"))
            .column(col(FACILITY, "facility_id"), "facility_id")
            .aggregate(Aggregate::Max(col(FACILITY, "facility_name")), "facility_name")
            .aggregate(Aggregate::Max(col(FACILITY, "city")), "city")
            .aggregate(Aggregate::Max(col(FACILITY, "state")), "state")
            .aggregate(Aggregate::Max(col(FACILITY, "county")), "county")
            .aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "total")
            .order_by(SortSpec::desc("total"))
            .order_by(SortSpec::asc("facility_id"))
            .with_limit(self.request.page.size as u64)
            .with_offset(self.request.page.offset())
    }

    /// Yearly totals for a sector across all reporting years
    pub fn sector_trend(&self, sector: &TrendSector) -> QueryDescriptor {
        let mut query = self.fact_scan("sector_trend", false);
        match sector {
            TrendSector::All => {}
            TrendSector::Top { name } => {
                query = query.filter(Predicate::eq(col(EMISSION, "sector_name"), name.as_str()));
            }
            TrendSector::Sub { level, code } => {
                let column = col(EMISSION, level.fact_code_column());
                query = query.filter(Predicate::eq(column, code.as_str()));
            }
        }
        query
            .group_by(col(EMISSION, "year"))
            .column(col(EMISSION, "year"), "year")
            .aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "total")
            .order_by(SortSpec::asc("year"))
    }

    /// Facility export rows in canonical column order.
    ///
    /// All-years mode keeps only positive totals and orders by year first.
    pub fn export(&self, mode: ExportMode) -> QueryDescriptor {
        let mut query = self.facility_emissions(match mode {
            ExportMode::SingleYear => "export",
            ExportMode::AllYears => "export_all_years",
        });

        if mode == ExportMode::AllYears {
            query = query
                .group_by(col(FACILITY, "year"))
                .column(col(FACILITY, "year"), "year");
        } else {
            query = query.filter(Predicate::eq(col(FACILITY, "year"), self.request.reporting_year));
        }

        query = query
            .group_by(col(FACILITY, "facility_id"))
            .column(col(FACILITY, "facility_id"), "facility_id");
        for column in [
            "facility_name",
            "city",
            "state",
            "county",
            "zip",
            "address1",
            "latitude",
            "longitude",
            "parent_company",
        ] {
            query = query.aggregate(Aggregate::Max(col(FACILITY, column)), column);
        }
        query = query.aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "total");

        match mode {
            ExportMode::AllYears => query
                .having("total", FilterOp::Gt(Scalar::Int(0)))
                .order_by(SortSpec::desc("year"))
                .order_by(SortSpec::desc("total"))
                .order_by(SortSpec::asc("facility_id")),
            ExportMode::SingleYear => query
                .order_by(SortSpec::desc("total"))
                .order_by(SortSpec::asc("facility_id")),
        }
    }

    /// Facility details for one year
    pub fn hover_facility(facility_id: &str, year: i32) -> QueryDescriptor {
        Self::facility_details("hover_facility", facility_id)
            .filter(Predicate::eq(col(FACILITY, "year"), year))
            .with_limit(1)
    }

    /// Most recent facility details, any year
    pub fn hover_latest(facility_id: &str) -> QueryDescriptor {
        Self::facility_details("hover_latest", facility_id)
            .order_by(SortSpec::desc("year"))
            .with_limit(1)
    }

    fn facility_details(label: &str, facility_id: &str) -> QueryDescriptor {
        let mut query = QueryDescriptor::new(label, TableName::Facilities, FACILITY)
            .filter(Predicate::eq(col(FACILITY, "facility_id"), facility_id));
        for column in [
            "facility_id",
            "year",
            "facility_name",
            "address1",
            "address2",
            "city",
            "state",
            "county",
            "zip",
            "latitude",
            "longitude",
            "parent_company",
        ] {
            query = query.column(col(FACILITY, column), column);
        }
        query
    }

    /// Emissions per gas for one facility-year, biogenic CO2 included
    pub fn hover_emissions(facility_id: &str, year: i32) -> QueryDescriptor {
        QueryDescriptor::new("hover_emissions", TableName::EmitterSector, EMISSION)
            .filter(Predicate::eq(col(EMISSION, "facility_id"), facility_id))
            .filter(Predicate::eq(col(EMISSION, "year"), year))
            .group_by(col(EMISSION, "gas_name"))
            .column(col(EMISSION, "gas_name"), "gas")
            .aggregate(Aggregate::Sum(col(EMISSION, "co2e_emission")), "quantity")
            .order_by(SortSpec::desc("quantity"))
            .order_by(SortSpec::asc("gas"))
    }
}
