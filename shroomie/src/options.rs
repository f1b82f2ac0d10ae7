use clap::Parser;
use sitereport::{
    envapi::{ApiConfig, SoilPropertyQuery},
    CachePolicy, ProviderKind, QueryOptions,
};
use std::{collections::BTreeSet, time::Duration};

/// Query environmental data services for a location and generate an
/// LLM prompt about its mushroom habitat.
///
/// With no data flags, every source is queried and a prompt is
/// printed. Otherwise the raw responses of the selected sources are
/// printed, unless `--prompt` is also given.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Place name to geocode when coordinates are not given.
    #[arg(long)]
    pub location: Option<String>,

    /// Name shown in the prompt if reverse geocoding fails.
    #[arg(long)]
    pub location_name: Option<String>,

    /// Print OpenStreetMap location data.
    #[arg(long)]
    pub osm: bool,

    /// Query every data source.
    #[arg(long)]
    pub all: bool,

    /// Query OpenEPI for the most probable soil type.
    #[arg(long, visible_alias = "openepi")]
    pub soil_type: bool,

    /// Return the top K soil types with probabilities from OpenEPI.
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Query ISRIC SoilGrids for the WRB soil class.
    #[arg(long)]
    pub soilgrids: bool,

    /// Number of classes to return from SoilGrids.
    #[arg(long, default_value_t = 5)]
    pub number_classes: u32,

    /// Query OpenEPI for soil properties.
    #[arg(long)]
    pub soil_properties: bool,

    /// Soil depths to query (e.g. 0-5cm 5-15cm).
    #[arg(long, num_args = 1..)]
    pub depths: Vec<String>,

    /// Soil properties to query (e.g. bdod phh2o).
    #[arg(long, num_args = 1..)]
    pub properties: Vec<String>,

    /// Statistics to return (e.g. mean Q0.05).
    #[arg(long, num_args = 1..)]
    pub values: Vec<String>,

    /// Query ground elevation.
    #[arg(long)]
    pub elevation: bool,

    /// Query Open-Meteo topographic elevation.
    #[arg(long)]
    pub topo: bool,

    /// Query forest cover.
    #[arg(long)]
    pub forest: bool,

    /// Query tree species.
    #[arg(long)]
    pub trees: bool,

    /// Global Forest Watch API key. Overrides `GFW_API_KEY`.
    #[arg(long)]
    pub gfw_api_key: Option<String>,

    /// Query historical weather.
    #[arg(long)]
    pub weather: bool,

    /// Months of weather history.
    #[arg(long, default_value_t = 3)]
    pub months: u32,

    /// Print an LLM prompt instead of raw responses.
    #[arg(long)]
    pub prompt: bool,

    /// Target mushroom for the prompt.
    #[arg(long)]
    pub mushroom_type: Option<String>,

    /// Survey a grid of points around the location.
    #[arg(long)]
    pub grid: bool,

    /// Points per side of the grid.
    #[arg(long, default_value_t = 3)]
    pub grid_size: usize,

    /// Distance between grid points, in miles.
    #[arg(long, default_value_t = 1.0)]
    pub grid_distance: f64,

    /// Grid points to collect concurrently.
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Seconds a cached response stays valid.
    #[arg(long, default_value_t = 3600)]
    pub cache_ttl: u64,

    /// Maximum cached responses; 0 disables caching.
    #[arg(long, default_value_t = 1024)]
    pub cache_capacity: usize,

    /// HTTP request timeout in seconds. Overrides
    /// `SHROOMIE_HTTP_TIMEOUT_SECS`.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Cli {
    /// True if no data source was selected explicitly.
    pub fn use_defaults(&self) -> bool {
        !(self.all
            || self.soil_type
            || self.soilgrids
            || self.soil_properties
            || self.elevation
            || self.topo
            || self.forest
            || self.trees
            || self.weather)
    }

    /// Render a prompt rather than raw responses.
    pub fn prompt_mode(&self) -> bool {
        self.prompt || self.use_defaults()
    }

    /// Include location data in raw output.
    pub fn show_location(&self) -> bool {
        self.all || self.osm
    }

    /// Providers to run. Reverse geocoding always runs since it feeds
    /// the prompt's location line.
    pub fn kinds(&self) -> BTreeSet<ProviderKind> {
        if self.all || self.use_defaults() {
            return ProviderKind::ALL.into_iter().collect();
        }
        [
            (true, ProviderKind::Location),
            (self.weather, ProviderKind::Weather),
            (self.soilgrids, ProviderKind::SoilGrids),
            (self.soil_type, ProviderKind::SoilType),
            (self.soil_properties, ProviderKind::SoilProperties),
            (self.elevation, ProviderKind::Elevation),
            (self.topo, ProviderKind::Topography),
            (self.forest, ProviderKind::ForestCover),
            (self.trees, ProviderKind::TreeSpecies),
        ]
        .into_iter()
        .filter_map(|(enabled, kind)| enabled.then_some(kind))
        .collect()
    }

    pub fn query_options(&self) -> QueryOptions {
        let defaults = SoilPropertyQuery::default();
        let or_default = |vals: &[String], default: Vec<String>| {
            if vals.is_empty() {
                default
            } else {
                vals.to_vec()
            }
        };
        QueryOptions {
            top_k: self.top_k,
            number_classes: self.number_classes,
            soil_properties: SoilPropertyQuery {
                depths: or_default(&self.depths, defaults.depths),
                properties: or_default(&self.properties, defaults.properties),
                values: or_default(&self.values, defaults.values),
            },
            months: self.months,
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::from_secs(self.cache_ttl),
            capacity: self.cache_capacity,
        }
    }

    /// Environment configuration with command line overrides applied.
    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::from_env();
        if let Some(key) = &self.gfw_api_key {
            config.gfw_api_key = Some(key.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}
