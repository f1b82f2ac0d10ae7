//! OpenStreetMap Nominatim reverse and forward geocoding.

use crate::{ApiError, Client};
use geo::{coord, Coord};
use serde::{Deserialize, Serialize};

/// Reverse geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub display_name: String,

    #[serde(default)]
    pub address: Address,
}

/// Structured address fields. Every field is optional; Nominatim only
/// returns the ones that apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landuse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leisure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural: Option<String>,
}

/// Forward geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub coord: Coord,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: Address,
}

impl TryFrom<ReverseResponse> for Place {
    type Error = ApiError;

    fn try_from(response: ReverseResponse) -> Result<Self, ApiError> {
        // Nominatim answers 200 with `{"error": ...}` for unmapped
        // places.
        let display_name = response
            .display_name
            .ok_or(ApiError::NoData("location name"))?;
        Ok(Self {
            display_name,
            address: response.address,
        })
    }
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl TryFrom<SearchHit> for GeocodedPlace {
    type Error = ApiError;

    fn try_from(hit: SearchHit) -> Result<Self, ApiError> {
        let parse = |val: &str| {
            val.trim().parse::<f64>().map_err(|e| ApiError::Decode {
                service: "Nominatim search",
                message: format!("bad coordinate {val:?}: {e}"),
            })
        };
        Ok(Self {
            coord: coord!(x: parse(&hit.lon)?, y: parse(&hit.lat)?),
            display_name: hit.display_name,
        })
    }
}

impl Client {
    /// Place name and address for `coord`.
    pub fn reverse_geocode(&self, coord: Coord) -> Result<Place, ApiError> {
        let url = format!("{}/reverse", self.config.nominatim_url);
        let query = [
            ("lat", coord.y.to_string()),
            ("lon", coord.x.to_string()),
            ("format", "json".to_string()),
        ];
        let response: ReverseResponse = self.get_json("Nominatim reverse", &url, &query)?;
        Place::try_from(response)
    }

    /// Coordinates of the best match for `location`.
    pub fn geocode(&self, location: &str) -> Result<GeocodedPlace, ApiError> {
        const SERVICE: &str = "Nominatim search";
        let url = format!("{}/search", self.config.nominatim_url);
        let query = [("q", location.to_string()), ("format", "json".to_string())];
        let hits: Vec<SearchHit> = self.get_json(SERVICE, &url, &query)?;
        hits.into_iter()
            .next()
            .ok_or(ApiError::NoData("coordinates"))
            .and_then(GeocodedPlace::try_from)
    }
}
