use crate::{lat_lon, ApiError, Client};
use geo::Coord;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Service which produced an elevation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElevationSource {
    OpenElevation,
    OpenTopoData,
    OpenMeteo,
}

impl fmt::Display for ElevationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenElevation => "Open-Elevation",
            Self::OpenTopoData => "OpenTopoData",
            Self::OpenMeteo => "Open-Meteo",
        };
        f.write_str(name)
    }
}

/// Ground elevation in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elevation {
    pub elevation: f64,
    pub source: ElevationSource,
}

/// `results` envelope shared by Open-Elevation and OpenTopoData.
#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Deserialize)]
struct LookupResult {
    elevation: Option<f64>,
}

impl LookupResponse {
    fn first(self, service: &'static str) -> Result<f64, ApiError> {
        self.results
            .into_iter()
            .next()
            .and_then(|result| result.elevation)
            .ok_or(ApiError::NoData(service))
    }
}

#[derive(Deserialize)]
struct OpenMeteoElevation {
    #[serde(default)]
    elevation: Vec<Option<f64>>,
}

impl Client {
    /// Elevation from Open-Elevation, falling back to OpenTopoData
    /// only if the former fails. If both fail the error names both.
    pub fn elevation(&self, coord: Coord) -> Result<Elevation, ApiError> {
        self.open_elevation(coord).or_else(|first| {
            debug!("open-elevation failed, trying opentopodata; {first}");
            self.copernicus_elevation(coord)
                .map_err(|second| ApiError::Request {
                    service: "elevation",
                    message: format!("{first}; {second}"),
                })
        })
    }

    pub fn open_elevation(&self, coord: Coord) -> Result<Elevation, ApiError> {
        const SERVICE: &str = "Open-Elevation";
        let url = format!("{}/lookup", self.config.open_elevation_url);
        let response: LookupResponse =
            self.get_json(SERVICE, &url, &[("locations", lat_lon(coord))])?;
        Ok(Elevation {
            elevation: response.first(SERVICE)?,
            source: ElevationSource::OpenElevation,
        })
    }

    /// Copernicus 30m DEM via OpenTopoData.
    pub fn copernicus_elevation(&self, coord: Coord) -> Result<Elevation, ApiError> {
        const SERVICE: &str = "OpenTopoData";
        let url = format!("{}/copernicus30", self.config.opentopodata_url);
        let response: LookupResponse =
            self.get_json(SERVICE, &url, &[("locations", lat_lon(coord))])?;
        Ok(Elevation {
            elevation: response.first(SERVICE)?,
            source: ElevationSource::OpenTopoData,
        })
    }

    pub fn open_meteo_elevation(&self, coord: Coord) -> Result<Elevation, ApiError> {
        const SERVICE: &str = "Open-Meteo elevation";
        let url = format!("{}/elevation", self.config.open_meteo_url);
        let query = [
            ("latitude", coord.y.to_string()),
            ("longitude", coord.x.to_string()),
        ];
        let response: OpenMeteoElevation = self.get_json(SERVICE, &url, &query)?;
        let elevation = response
            .elevation
            .into_iter()
            .next()
            .flatten()
            .ok_or(ApiError::NoData(SERVICE))?;
        Ok(Elevation {
            elevation,
            source: ElevationSource::OpenMeteo,
        })
    }
}
