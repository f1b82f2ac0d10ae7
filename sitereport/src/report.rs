//! Merges per-provider results into one [`EnvironmentalReport`].

use crate::provider::{Payload, ProviderKind, ProviderResult};
use envapi::{
    ApiError, Elevation, ForestCover, Place, SeriesStats, SoilGridsClass, SoilProperties,
    SoilType, TreeSpecies, WeatherHistory,
};
use std::fmt;

/// Provider data that arrived but could not be interpreted. Rendered
/// as an inline note instead of failing the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    Unreadable,
}

impl<T> Section<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(val) => Some(val),
            Self::Unreadable => None,
        }
    }
}

/// Most probable soil class plus the ranked alternatives, highest
/// probability first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilClassification {
    pub primary: Option<String>,
    pub ranked: Vec<RankedSoilType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSoilType {
    pub name: String,

    /// Percent.
    pub probability: f64,
}

impl SoilClassification {
    fn from_ranked(primary: Option<String>, mut ranked: Vec<RankedSoilType>) -> Self {
        // Stable, so ties keep server order.
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Self { primary, ranked }
    }
}

impl From<SoilGridsClass> for SoilClassification {
    fn from(class: SoilGridsClass) -> Self {
        let primary = class.wrb_class_name.filter(|name| !name.is_empty());
        let ranked = class
            .wrb_class_probability
            .unwrap_or_default()
            .into_iter()
            .map(|(name, probability)| RankedSoilType { name, probability })
            .collect();
        Self::from_ranked(primary, ranked)
    }
}

impl From<SoilType> for Section<SoilClassification> {
    fn from(soil_type: SoilType) -> Self {
        let Some(properties) = soil_type.properties else {
            return Self::Unreadable;
        };
        let Some(primary) = properties.most_probable_soil_type else {
            return Self::Unreadable;
        };
        let ranked = properties
            .probabilities
            .unwrap_or_default()
            .into_iter()
            .map(|p| RankedSoilType {
                name: p.soil_type,
                probability: p.probability,
            })
            .collect();
        Self::Ready(SoilClassification::from_ranked(Some(primary), ranked))
    }
}

/// One soil property (e.g. bulk density) across the requested depths.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilPropertyLayer {
    pub name: String,

    /// Target unit after conversion, if the service named one.
    pub unit: Option<String>,

    pub depths: Vec<SoilProperty>,
}

/// Statistics for one property at one depth.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilProperty {
    pub depth: String,
    pub stats: Vec<SoilStat>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoilStat {
    pub name: String,

    /// `None` where the dataset has no coverage.
    pub value: Option<f64>,

    /// The raw value was divided by a conversion factor.
    pub converted: bool,
}

impl fmt::Display for SoilStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            None => write!(f, "{}=n/a", self.name),
            Some(val) if self.converted => write!(f, "{}={val:.1}", self.name),
            Some(val) => write!(f, "{}={val}", self.name),
        }
    }
}

impl From<SoilProperties> for Section<Vec<SoilPropertyLayer>> {
    fn from(soil: SoilProperties) -> Self {
        let Some(layers) = soil.properties.and_then(|props| props.layers) else {
            return Self::Unreadable;
        };

        let mut converted_layers = Vec::with_capacity(layers.len());
        for layer in layers {
            let (factor, unit) = match layer.unit_measure {
                Some(unit) => (
                    unit.conversion_factor.unwrap_or(1.0),
                    unit.target_units.filter(|u| !u.is_empty()),
                ),
                None => (1.0, None),
            };
            if factor == 0.0 || !factor.is_finite() {
                return Self::Unreadable;
            }
            let converted = factor != 1.0;

            let depths = layer
                .depths
                .into_iter()
                .map(|depth| SoilProperty {
                    depth: depth.label.unwrap_or_else(|| "Unknown depth".to_string()),
                    stats: depth
                        .values
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(name, raw)| SoilStat {
                            name,
                            value: raw.as_f64().map(|val| val / factor),
                            converted,
                        })
                        .collect(),
                })
                .collect();

            converted_layers.push(SoilPropertyLayer {
                name: layer
                    .name
                    .or(layer.code)
                    .unwrap_or_else(|| "Unknown".to_string()),
                unit,
                depths,
            });
        }
        Self::Ready(converted_layers)
    }
}

/// Whole-period statistics of each daily weather series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSummary {
    pub temperature_mean: Option<SeriesStats>,
    pub temperature_min: Option<SeriesStats>,
    pub temperature_max: Option<SeriesStats>,
    pub precipitation: Option<SeriesStats>,
    pub rain: Option<SeriesStats>,
    pub snowfall: Option<SeriesStats>,
}

impl From<&WeatherHistory> for Section<WeatherSummary> {
    fn from(history: &WeatherHistory) -> Self {
        let Some(daily) = &history.daily else {
            return Self::Unreadable;
        };
        let stats = |series: &Option<Vec<Option<f64>>>| -> Option<SeriesStats> {
            series.as_ref().and_then(|s| SeriesStats::from_series(s))
        };
        Self::Ready(WeatherSummary {
            temperature_mean: stats(&daily.temperature_2m_mean),
            temperature_min: stats(&daily.temperature_2m_min),
            temperature_max: stats(&daily.temperature_2m_max),
            precipitation: stats(&daily.precipitation_sum),
            rain: stats(&daily.rain_sum),
            snowfall: stats(&daily.snowfall_sum),
        })
    }
}

/// Everything known about one coordinate. A field is `None` when its
/// provider was not run or failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentalReport {
    pub location: Option<Place>,
    pub weather: Option<Section<WeatherSummary>>,
    pub soil_grids: Option<SoilClassification>,
    pub soil_type: Option<Section<SoilClassification>>,
    pub soil_properties: Option<Section<Vec<SoilPropertyLayer>>>,
    pub elevation: Option<Elevation>,
    pub topography: Option<Elevation>,
    pub forest_cover: Option<ForestCover>,
    pub tree_species: Option<TreeSpecies>,

    /// Providers which failed, in collection order.
    pub unavailable: Vec<(ProviderKind, ApiError)>,
}

impl EnvironmentalReport {
    /// Builds a report from collected results. Never fails; a later
    /// result for the same provider replaces an earlier one.
    pub fn merge<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (ProviderKind, ProviderResult)>,
    {
        let mut report = Self::default();
        for (kind, result) in results {
            match result {
                Ok(payload) => report.insert(payload),
                Err(err) => report.unavailable.push((kind, err)),
            }
        }
        report
    }

    fn insert(&mut self, payload: Payload) {
        match payload {
            Payload::Location(place) => self.location = Some(place),
            Payload::Weather(history) => self.weather = Some(Section::from(&history)),
            Payload::SoilGrids(class) => self.soil_grids = Some(class.into()),
            Payload::SoilType(soil_type) => self.soil_type = Some(soil_type.into()),
            Payload::SoilProperties(props) => self.soil_properties = Some(props.into()),
            Payload::Elevation(elevation) => self.elevation = Some(elevation),
            Payload::Topography(elevation) => self.topography = Some(elevation),
            Payload::ForestCover(cover) => self.forest_cover = Some(cover),
            Payload::TreeSpecies(trees) => self.tree_species = Some(trees),
        }
    }

    /// Preferred elevation: Open-Meteo topography, then the lookup
    /// services.
    pub fn best_elevation(&self) -> Option<&Elevation> {
        self.topography.as_ref().or(self.elevation.as_ref())
    }

    /// Primary soil class and the service it came from. OpenEPI wins
    /// over SoilGrids.
    pub fn primary_soil_type(&self) -> Option<(&'static str, &str)> {
        let openepi = self
            .soil_type
            .as_ref()
            .and_then(Section::ready)
            .and_then(|class| class.primary.as_deref())
            .map(|name| ("OpenEPI", name));
        openepi.or_else(|| {
            self.soil_grids
                .as_ref()
                .and_then(|class| class.primary.as_deref())
                .map(|name| ("SoilGrids", name))
        })
    }

    /// Land use from the reverse-geocoded address: `landuse`, then
    /// `leisure`, then `natural`.
    pub fn land_use(&self) -> Option<(&'static str, &str)> {
        let address = &self.location.as_ref()?.address;
        address
            .landuse
            .as_deref()
            .map(|val| ("Land Use", val))
            .or_else(|| address.leisure.as_deref().map(|val| ("Land Use", val)))
            .or_else(|| address.natural.as_deref().map(|val| ("Land Type", val)))
    }

    /// Flat view of every soil statistic.
    pub fn soil_stats(&self) -> impl Iterator<Item = (&SoilPropertyLayer, &SoilProperty)> {
        self.soil_properties
            .iter()
            .filter_map(Section::ready)
            .flatten()
            .flat_map(|layer| layer.depths.iter().map(move |depth| (layer, depth)))
    }
}

#[cfg(test)]
mod tests {
    use super::{EnvironmentalReport, Section, SoilClassification, SoilPropertyLayer};
    use crate::provider::{Payload, ProviderKind};
    use approx::assert_relative_eq;
    use envapi::{ApiError, Elevation, ElevationSource, Place, SoilProperties, SoilType};
    use serde_json::json;

    fn convert(soil: SoilProperties) -> Section<Vec<SoilPropertyLayer>> {
        soil.into()
    }

    fn classify(soil_type: SoilType) -> Section<SoilClassification> {
        soil_type.into()
    }

    fn soil_properties() -> SoilProperties {
        serde_json::from_value(json!({
            "type": "Feature",
            "properties": {"layers": [
                {
                    "code": "bdod",
                    "name": "Bulk density",
                    "unit_measure": {
                        "conversion_factor": 100,
                        "mapped_units": "cg/cm³",
                        "target_units": "kg/dm³"
                    },
                    "depths": [{"label": "0-5cm", "values": {"mean": 120, "Q0.05": null}}]
                },
                {
                    "code": "phh2o",
                    "name": "pH water",
                    "unit_measure": {"conversion_factor": 10, "target_units": "pH"},
                    "depths": [{"label": "0-5cm", "values": {"mean": 620, "Q0.05": 540}}]
                }
            ]}
        }))
        .unwrap()
    }

    #[test]
    fn test_soil_units_are_converted() {
        let report = EnvironmentalReport::merge([(
            ProviderKind::SoilProperties,
            Ok(Payload::SoilProperties(soil_properties())),
        )]);
        let stats: Vec<_> = report.soil_stats().collect();
        assert_eq!(stats.len(), 2);

        let (layer, depth) = stats[1];
        assert_eq!(layer.name, "pH water");
        assert_eq!(layer.unit.as_deref(), Some("pH"));
        assert_relative_eq!(depth.stats[0].value.unwrap(), 62.0);
        assert_eq!(depth.stats[0].to_string(), "mean=62.0");
        assert_eq!(depth.stats[1].to_string(), "Q0.05=54.0");

        let (_, bdod) = stats[0];
        assert_eq!(bdod.stats[0].to_string(), "mean=1.2");
        assert_eq!(bdod.stats[1].to_string(), "Q0.05=n/a");
    }

    #[test]
    fn test_conversion_620_by_100() {
        let soil: SoilProperties = serde_json::from_value(json!({
            "properties": {"layers": [{
                "code": "phh2o",
                "unit_measure": {"conversion_factor": 100},
                "depths": [{"label": "0-5cm", "values": {"mean": 620}}]
            }]}
        }))
        .unwrap();
        let Section::Ready(layers) = convert(soil) else {
            panic!("expected readable layers");
        };
        assert_eq!(layers[0].name, "phh2o");
        assert_eq!(layers[0].unit, None);
        assert_eq!(layers[0].depths[0].stats[0].to_string(), "mean=6.2");
    }

    #[test]
    fn test_unconverted_values_print_as_given() {
        let soil: SoilProperties = serde_json::from_value(json!({
            "properties": {"layers": [{
                "name": "Clay",
                "unit_measure": {"conversion_factor": 1, "target_units": "%"},
                "depths": [{"values": {"mean": 31.5}}]
            }]}
        }))
        .unwrap();
        let Section::Ready(layers) = convert(soil) else {
            panic!("expected readable layers");
        };
        assert_eq!(layers[0].depths[0].depth, "Unknown depth");
        assert_eq!(layers[0].depths[0].stats[0].to_string(), "mean=31.5");
    }

    #[test]
    fn test_zero_conversion_factor_is_unreadable() {
        let soil: SoilProperties = serde_json::from_value(json!({
            "properties": {"layers": [{
                "code": "soc",
                "unit_measure": {"conversion_factor": 0},
                "depths": []
            }]}
        }))
        .unwrap();
        assert_eq!(convert(soil), Section::Unreadable);

        let missing: SoilProperties = serde_json::from_value(json!({"properties": {}})).unwrap();
        assert_eq!(convert(missing), Section::Unreadable);
    }

    #[test]
    fn test_soil_types_are_ranked() {
        let soil_type: SoilType = serde_json::from_value(json!({
            "properties": {
                "most_probable_soil_type": "Cambisols",
                "probabilities": [
                    {"soil_type": "Luvisols", "probability": 10},
                    {"soil_type": "Cambisols", "probability": 42},
                    {"soil_type": "Umbrisols", "probability": 10},
                    {"soil_type": "Andosols", "probability": 30}
                ]
            }
        }))
        .unwrap();
        let Section::Ready(class) = classify(soil_type) else {
            panic!("expected readable soil type");
        };
        let names: Vec<_> = class.ranked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Cambisols", "Andosols", "Luvisols", "Umbrisols"]);
    }

    #[test]
    fn test_soil_type_without_primary_is_unreadable() {
        let soil_type: SoilType =
            serde_json::from_value(json!({"properties": {"probabilities": []}})).unwrap();
        assert_eq!(classify(soil_type), Section::Unreadable);
    }

    #[test]
    fn test_primary_soil_type_falls_back_to_soilgrids() {
        let mut report = EnvironmentalReport {
            soil_grids: Some(SoilClassification {
                primary: Some("Andosols".to_string()),
                ranked: Vec::new(),
            }),
            ..Default::default()
        };
        assert_eq!(report.primary_soil_type(), Some(("SoilGrids", "Andosols")));

        report.soil_type = Some(Section::Unreadable);
        assert_eq!(report.primary_soil_type(), Some(("SoilGrids", "Andosols")));

        report.soil_type = Some(Section::Ready(SoilClassification {
            primary: Some("Cambisols".to_string()),
            ranked: Vec::new(),
        }));
        assert_eq!(report.primary_soil_type(), Some(("OpenEPI", "Cambisols")));
    }

    #[test]
    fn test_topography_preferred() {
        let lookup = Elevation {
            elevation: 210.0,
            source: ElevationSource::OpenElevation,
        };
        let topo = Elevation {
            elevation: 213.0,
            source: ElevationSource::OpenMeteo,
        };
        let report = EnvironmentalReport::merge([
            (ProviderKind::Elevation, Ok(Payload::Elevation(lookup))),
            (ProviderKind::Topography, Ok(Payload::Topography(topo))),
        ]);
        assert_eq!(report.best_elevation(), Some(&topo));
    }

    #[test]
    fn test_land_use_precedence() {
        let place: Place = serde_json::from_value(json!({
            "display_name": "Tillamook State Forest, Oregon",
            "address": {"leisure": "park", "natural": "wood"}
        }))
        .unwrap();
        let report =
            EnvironmentalReport::merge([(ProviderKind::Location, Ok(Payload::Location(place)))]);
        assert_eq!(report.land_use(), Some(("Land Use", "park")));
    }

    #[test]
    fn test_failures_are_recorded() {
        let report = EnvironmentalReport::merge([
            (
                ProviderKind::Weather,
                Err(ApiError::Status {
                    service: "Open-Meteo weather",
                    status: 500,
                }),
            ),
            (ProviderKind::Location, Err(ApiError::NoData("location name"))),
        ]);
        assert!(report.weather.is_none());
        assert!(report.location.is_none());
        assert_eq!(report.unavailable.len(), 2);
        assert_eq!(report.unavailable[0].0, ProviderKind::Weather);
    }
}
