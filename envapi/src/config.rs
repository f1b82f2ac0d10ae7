use std::{env, time::Duration};

pub const DEFAULT_OSM_APP_NAME: &str = "ShroomieApp/1.0";
pub const DEFAULT_OSM_CONTACT_URL: &str = "https://github.com/shroomie/shroomie";
pub const DEFAULT_OSM_CONTACT_EMAIL: &str = "contact@example.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoints, credentials, and transport settings for every remote
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// OpenEPI soil type and soil property service.
    pub openepi_url: String,

    /// ISRIC SoilGrids v2.0.
    pub soilgrids_url: String,

    /// Open-Elevation lookup service.
    pub open_elevation_url: String,

    /// OpenTopoData (Copernicus 30m dataset).
    pub opentopodata_url: String,

    /// Open-Meteo elevation and forecast service.
    pub open_meteo_url: String,

    /// OpenStreetMap Nominatim.
    pub nominatim_url: String,

    /// Global Forest Watch tree cover endpoint.
    ///
    /// Satellite tree cover is only queried when both this and
    /// `gfw_api_key` are set.
    pub gfw_tree_cover_url: Option<String>,

    pub gfw_api_key: Option<String>,

    /// Nominatim requires an identifying user agent.
    pub osm_app_name: String,
    pub osm_contact_url: String,
    pub osm_contact_email: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            openepi_url: "https://api.openepi.io".into(),
            soilgrids_url: "https://rest.isric.org/soilgrids/v2.0".into(),
            open_elevation_url: "https://api.open-elevation.com/api/v1".into(),
            opentopodata_url: "https://api.opentopodata.org/v1".into(),
            open_meteo_url: "https://api.open-meteo.com/v1".into(),
            nominatim_url: "https://nominatim.openstreetmap.org".into(),
            gfw_tree_cover_url: None,
            gfw_api_key: None,
            osm_app_name: DEFAULT_OSM_APP_NAME.into(),
            osm_contact_url: DEFAULT_OSM_CONTACT_URL.into(),
            osm_contact_email: DEFAULT_OSM_CONTACT_EMAIL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Returns the default configuration overridden by any of the
    /// following environment variables:
    ///
    /// - `GFW_API_KEY`
    /// - `GFW_TREE_COVER_URL`
    /// - `OSM_USER_AGENT`
    /// - `OSM_CONTACT_URL`
    /// - `OSM_CONTACT_EMAIL`
    /// - `SHROOMIE_HTTP_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let defaults = Self::default();
        Self {
            gfw_api_key: var("GFW_API_KEY"),
            gfw_tree_cover_url: var("GFW_TREE_COVER_URL"),
            osm_app_name: var("OSM_USER_AGENT").unwrap_or(defaults.osm_app_name),
            osm_contact_url: var("OSM_CONTACT_URL").unwrap_or(defaults.osm_contact_url),
            osm_contact_email: var("OSM_CONTACT_EMAIL").unwrap_or(defaults.osm_contact_email),
            timeout: var("SHROOMIE_HTTP_TIMEOUT_SECS")
                .and_then(|secs| secs.trim().parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
            ..defaults
        }
    }

    /// The `User-Agent` header sent with every request.
    pub fn user_agent(&self) -> String {
        format!(
            "{} ({}; {})",
            self.osm_app_name, self.osm_contact_url, self.osm_contact_email
        )
    }

    /// Returns `(url, key)` if satellite tree cover can be queried.
    pub fn gfw(&self) -> Option<(&str, &str)> {
        match (&self.gfw_tree_cover_url, &self.gfw_api_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}
