//! OpenEPI soil type / property and ISRIC SoilGrids classification.

use crate::{ApiError, Client};
use geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenEPI soil type feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilType {
    #[serde(default)]
    pub properties: Option<SoilTypeProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilTypeProperties {
    #[serde(default)]
    pub most_probable_soil_type: Option<String>,

    /// Only present when the request asked for `top_k` classes.
    #[serde(default)]
    pub probabilities: Option<Vec<SoilTypeProbability>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilTypeProbability {
    pub soil_type: String,

    /// Percent.
    pub probability: f64,
}

/// ISRIC SoilGrids WRB classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilGridsClass {
    #[serde(default)]
    pub wrb_class_name: Option<String>,

    /// `(class name, percent)` pairs.
    #[serde(default)]
    pub wrb_class_probability: Option<Vec<(String, f64)>>,
}

/// OpenEPI soil property feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProperties {
    #[serde(default)]
    pub properties: Option<SoilLayers>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayers {
    #[serde(default)]
    pub layers: Option<Vec<SoilLayer>>,
}

/// One soil property (e.g. `bdod`) across the requested depths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilLayer {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub unit_measure: Option<UnitMeasure>,

    #[serde(default)]
    pub depths: Vec<SoilDepth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMeasure {
    /// Raw values are divided by this to obtain `target_units`.
    #[serde(default)]
    pub conversion_factor: Option<f64>,

    #[serde(default)]
    pub mapped_units: Option<String>,

    #[serde(default)]
    pub target_units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilDepth {
    #[serde(default)]
    pub label: Option<String>,

    /// Statistic name to raw value, in server order. Values may be
    /// `null` where the dataset has no coverage.
    #[serde(default)]
    pub values: Option<Map<String, Value>>,
}

/// Which depths, properties, and statistics to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoilPropertyQuery {
    pub depths: Vec<String>,
    pub properties: Vec<String>,
    pub values: Vec<String>,
}

impl Default for SoilPropertyQuery {
    fn default() -> Self {
        Self {
            depths: vec!["0-5cm".into()],
            properties: vec!["bdod".into(), "phh2o".into()],
            values: vec!["mean".into(), "Q0.05".into()],
        }
    }
}

impl SoilPropertyQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        for (key, vals) in [
            ("depths", &self.depths),
            ("properties", &self.properties),
            ("values", &self.values),
        ] {
            params.extend(vals.iter().map(|val| (key, val.clone())));
        }
        params
    }
}

impl Client {
    /// Most probable soil type, plus the `top_k` most probable
    /// classes if requested.
    pub fn soil_type(&self, coord: Coord, top_k: Option<u32>) -> Result<SoilType, ApiError> {
        let url = format!("{}/soil/type", self.config.openepi_url);
        let mut query = vec![("lat", coord.y.to_string()), ("lon", coord.x.to_string())];
        if let Some(top_k) = top_k {
            query.push(("top_k", top_k.to_string()));
        }
        self.get_json("OpenEPI soil type", &url, &query)
    }

    pub fn soil_properties(
        &self,
        coord: Coord,
        request: &SoilPropertyQuery,
    ) -> Result<SoilProperties, ApiError> {
        let url = format!("{}/soil/property", self.config.openepi_url);
        let mut query = vec![("lat", coord.y.to_string()), ("lon", coord.x.to_string())];
        query.extend(request.params());
        self.get_json("OpenEPI soil property", &url, &query)
    }

    pub fn soilgrids_class(
        &self,
        coord: Coord,
        number_classes: u32,
    ) -> Result<SoilGridsClass, ApiError> {
        let url = format!("{}/classification/query", self.config.soilgrids_url);
        let query = [
            ("lat", coord.y.to_string()),
            ("lon", coord.x.to_string()),
            ("number_classes", number_classes.to_string()),
        ];
        self.get_json("SoilGrids", &url, &query)
    }
}
