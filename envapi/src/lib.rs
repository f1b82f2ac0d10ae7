//! # Environmental data APIs
//!
//! `envapi` wraps the public web services used to describe a
//! location: soil classification and properties (OpenEPI, ISRIC
//! SoilGrids), elevation (Open-Elevation, OpenTopoData, Open-Meteo),
//! forest cover and tree species, weather history (Open-Meteo), and
//! geocoding (OpenStreetMap Nominatim).
//!
//! Every method on [`Client`] performs its request(s) synchronously
//! and returns a typed response or an [`ApiError`].

mod config;
mod elevation;
mod error;
mod forest;
mod location;
mod soil;
mod weather;

pub use crate::{
    config::ApiConfig,
    elevation::{Elevation, ElevationSource},
    error::ApiError,
    forest::{
        associated_mushrooms, classify_trees, estimate_forest, ForestCover, ForestEstimate,
        MushroomAssociation, TreeSpecies,
    },
    location::{Address, GeocodedPlace, Place},
    soil::{
        SoilDepth, SoilGridsClass, SoilLayer, SoilLayers, SoilProperties, SoilPropertyQuery,
        SoilType, SoilTypeProbability, SoilTypeProperties, UnitMeasure,
    },
    weather::{DailySeries, MonthlySummary, SeriesStats, WeatherHistory, WET_DAY_MM},
};
pub use geo;

use log::debug;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Blocking client for all supported services.
///
/// Cheap to share between threads; wrap it in an `Arc`.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    config: ApiConfig,
}

impl Client {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| ApiError::Request {
                service: "HTTP client",
                message: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl Client {
    /// Sends `request` and decodes a JSON body of type `T`.
    ///
    /// Any non-2xx status is an error, regardless of body.
    fn fetch<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let now = Instant::now();
        let response = request.send().map_err(|e| ApiError::Request {
            service,
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                service,
                status: status.as_u16(),
            });
        }
        let body = response.json::<T>().map_err(|e| ApiError::Decode {
            service,
            message: e.to_string(),
        })?;
        debug!("{service}; status: {status}, exec: {:?}", now.elapsed());
        Ok(body)
    }

    /// Convenience wrapper around [`Self::fetch`] for plain GET
    /// requests.
    fn get_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.fetch(service, self.http.get(url).query(query))
    }
}

/// Formats a `lat,lon` pair the way lookup services expect it.
fn lat_lon(coord: geo::Coord) -> String {
    format!("{},{}", coord.y, coord.x)
}
