//! Uniform provider capability over the environmental data services.

use envapi::{
    ApiError, Client, Elevation, ForestCover, Place, SoilGridsClass, SoilProperties,
    SoilPropertyQuery, SoilType, TreeSpecies, WeatherHistory,
};
use geo::Coord;
use serde::Serialize;
use std::{fmt, sync::Arc};

/// The environmental data categories a [`Collector`](crate::Collector)
/// can gather.
///
/// Declaration order is collection and display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Location,
    Weather,
    SoilGrids,
    SoilType,
    SoilProperties,
    Elevation,
    Topography,
    ForestCover,
    TreeSpecies,
}

impl ProviderKind {
    pub const ALL: [Self; 9] = [
        Self::Location,
        Self::Weather,
        Self::SoilGrids,
        Self::SoilType,
        Self::SoilProperties,
        Self::Elevation,
        Self::Topography,
        Self::ForestCover,
        Self::TreeSpecies,
    ];

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Weather => "Weather History",
            Self::SoilGrids => "SoilGrids Classification",
            Self::SoilType => "OpenEPI Soil Type",
            Self::SoilProperties => "Soil Properties",
            Self::Elevation => "Elevation",
            Self::Topography => "Topography",
            Self::ForestCover => "Forest Cover",
            Self::TreeSpecies => "Tree Species",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Successful provider output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Location(Place),
    Weather(WeatherHistory),
    SoilGrids(SoilGridsClass),
    SoilType(SoilType),
    SoilProperties(SoilProperties),
    Elevation(Elevation),
    Topography(Elevation),
    ForestCover(ForestCover),
    TreeSpecies(TreeSpecies),
}

impl Payload {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Location(_) => ProviderKind::Location,
            Self::Weather(_) => ProviderKind::Weather,
            Self::SoilGrids(_) => ProviderKind::SoilGrids,
            Self::SoilType(_) => ProviderKind::SoilType,
            Self::SoilProperties(_) => ProviderKind::SoilProperties,
            Self::Elevation(_) => ProviderKind::Elevation,
            Self::Topography(_) => ProviderKind::Topography,
            Self::ForestCover(_) => ProviderKind::ForestCover,
            Self::TreeSpecies(_) => ProviderKind::TreeSpecies,
        }
    }
}

/// Either a payload or a human-readable failure. Failures are
/// ordinary values and never abort collection.
pub type ProviderResult = Result<Payload, ApiError>;

/// A source of one kind of environmental data for a coordinate.
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Performs at most a bounded number of blocking requests and
    /// converts every failure into `Err`. Never panics on bad data.
    fn fetch(&self, coord: Coord) -> ProviderResult;
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn fetch(&self, coord: Coord) -> ProviderResult {
        (**self).fetch(coord)
    }
}

/// Request parameters shared by the HTTP-backed providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ask OpenEPI for this many ranked soil types.
    pub top_k: Option<u32>,

    /// Number of WRB classes to request from SoilGrids.
    pub number_classes: u32,

    pub soil_properties: SoilPropertyQuery,

    /// Months of weather history.
    pub months: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: None,
            number_classes: 5,
            soil_properties: SoilPropertyQuery::default(),
            months: 3,
        }
    }
}

/// [`Provider`] backed by the shared [`envapi::Client`].
#[derive(Debug, Clone)]
pub struct ApiProvider {
    kind: ProviderKind,
    client: Arc<Client>,
    options: Arc<QueryOptions>,
}

impl ApiProvider {
    pub fn new(kind: ProviderKind, client: Arc<Client>, options: Arc<QueryOptions>) -> Self {
        Self {
            kind,
            client,
            options,
        }
    }
}

impl Provider for ApiProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn fetch(&self, coord: Coord) -> ProviderResult {
        let client = &self.client;
        let options = &self.options;
        match self.kind {
            ProviderKind::Location => client.reverse_geocode(coord).map(Payload::Location),
            ProviderKind::Weather => client
                .weather_history(coord, options.months)
                .map(Payload::Weather),
            ProviderKind::SoilGrids => client
                .soilgrids_class(coord, options.number_classes)
                .map(Payload::SoilGrids),
            ProviderKind::SoilType => client
                .soil_type(coord, options.top_k)
                .map(Payload::SoilType),
            ProviderKind::SoilProperties => client
                .soil_properties(coord, &options.soil_properties)
                .map(Payload::SoilProperties),
            ProviderKind::Elevation => client.elevation(coord).map(Payload::Elevation),
            ProviderKind::Topography => client
                .open_meteo_elevation(coord)
                .map(Payload::Topography),
            ProviderKind::ForestCover => client.forest_cover(coord).map(Payload::ForestCover),
            ProviderKind::TreeSpecies => client.tree_species(coord).map(Payload::TreeSpecies),
        }
    }
}
