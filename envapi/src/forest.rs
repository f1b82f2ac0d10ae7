//! Forest cover and tree species.
//!
//! There is no open global tree species API, so both products are
//! derived from a regional model of Pacific Northwest forests keyed
//! on latitude/longitude boxes and elevation bands. Satellite tree
//! cover is used instead of the model when Global Forest Watch
//! credentials are configured.

use crate::{ApiError, Client};
use geo::Coord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const ESTIMATE_STATUS: &str = "Estimated based on elevation and region";
pub const ESTIMATE_NOTE: &str =
    "This is an estimate. For precise data, use Global Forest Watch API with an API key.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForestCover {
    /// Satellite-derived tree cover.
    Satellite { tree_cover: f64, data_source: String },

    /// Regional model estimate.
    Estimated(ForestEstimate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestEstimate {
    /// Elevation (meters) the estimate was based on.
    pub elevation: f64,

    /// Percent.
    pub tree_cover: f64,

    pub species: Vec<String>,
    pub status: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSpecies {
    pub ecoregion: String,
    pub forest_type: Option<String>,
    pub dominant_species: Vec<String>,
    pub common_species: Vec<String>,
    pub understory: Vec<String>,
    pub status: Option<String>,
    pub note: Option<String>,

    /// Elevation (meters) the classification was based on.
    pub elevation: f64,

    /// Fungi associated with the dominant and common species, in
    /// species order.
    pub mushroom_associations: Vec<MushroomAssociation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MushroomAssociation {
    pub tree: String,
    pub mushrooms: Vec<String>,
}

/// Inclusive latitude/longitude box.
struct Region {
    south: f64,
    north: f64,
    west: f64,
    east: f64,
}

impl Region {
    fn contains(&self, Coord { x, y }: Coord) -> bool {
        self.south <= y && y <= self.north && self.west <= x && x <= self.east
    }
}

const OREGON_WEST: Region = Region {
    south: 45.0,
    north: 46.5,
    west: -124.5,
    east: -121.5,
};

const CASCADES_WEST: Region = Region {
    south: 43.0,
    north: 46.5,
    west: -124.5,
    east: -121.5,
};

const OREGON_EAST: Region = Region {
    south: 42.0,
    north: 46.0,
    west: -121.5,
    east: -117.0,
};

const COASTAL_CANOPY: &[&str] = &[
    "Western Hemlock",
    "Sitka Spruce",
    "Western Red Cedar",
    "Red Alder",
];
const LOW_MOUNTAIN_CANOPY: &[&str] = &[
    "Douglas Fir",
    "Western Hemlock",
    "Western Red Cedar",
    "Big Leaf Maple",
];
const MID_MOUNTAIN_CANOPY: &[&str] = &[
    "Douglas Fir",
    "Noble Fir",
    "Western Hemlock",
    "Pacific Silver Fir",
];
const HIGH_MOUNTAIN_CANOPY: &[&str] = &[
    "Mountain Hemlock",
    "Subalpine Fir",
    "Whitebark Pine",
    "Engelmann Spruce",
];

/// Estimated tree cover and dominant species for `coord` at
/// `elevation` meters.
pub fn estimate_forest(coord: Coord, elevation: f64) -> ForestEstimate {
    let (tree_cover, species) = if !OREGON_WEST.contains(coord) {
        (0.0, &[][..])
    } else if elevation < 100.0 {
        (70.0, COASTAL_CANOPY)
    } else if elevation < 800.0 {
        (80.0, LOW_MOUNTAIN_CANOPY)
    } else if elevation < 1800.0 {
        (70.0, MID_MOUNTAIN_CANOPY)
    } else {
        (30.0, HIGH_MOUNTAIN_CANOPY)
    };

    ForestEstimate {
        elevation,
        tree_cover,
        species: owned(species),
        status: ESTIMATE_STATUS.into(),
        note: ESTIMATE_NOTE.into(),
    }
}

struct Ecoregion {
    name: &'static str,
    forest_type: &'static str,
    dominant: &'static [&'static str],
    common: &'static [&'static str],
    understory: &'static [&'static str],
}

const COASTAL: Ecoregion = Ecoregion {
    name: "Pacific Northwest Coastal Forest",
    forest_type: "Temperate Rainforest",
    dominant: &[
        "Sitka Spruce",
        "Western Hemlock",
        "Western Red Cedar",
        "Red Alder",
    ],
    common: &["Douglas Fir", "Grand Fir", "Big Leaf Maple", "Oregon Ash"],
    understory: &["Salmonberry", "Sword Fern", "Salal", "Oregon Grape"],
};

const LOWER_MONTANE: Ecoregion = Ecoregion {
    name: "Western Cascades Lower Montane Forest",
    forest_type: "Mixed Coniferous-Deciduous Forest",
    dominant: &["Douglas Fir", "Western Hemlock", "Western Red Cedar"],
    common: &[
        "Grand Fir",
        "Big Leaf Maple",
        "Red Alder",
        "Black Cottonwood",
    ],
    understory: &["Vine Maple", "Oregon Grape", "Sword Fern", "Salal"],
};

const MID_MONTANE: Ecoregion = Ecoregion {
    name: "Western Cascades Mid Montane Forest",
    forest_type: "Coniferous Forest",
    dominant: &[
        "Douglas Fir",
        "Noble Fir",
        "Pacific Silver Fir",
        "Western Hemlock",
    ],
    common: &[
        "Western White Pine",
        "Western Red Cedar",
        "Alaska Yellow Cedar",
    ],
    understory: &["Huckleberry", "Rhododendron", "Oregon Grape"],
};

const CASCADES_SUBALPINE: Ecoregion = Ecoregion {
    name: "Cascades Subalpine Forest",
    forest_type: "Subalpine Coniferous Forest",
    dominant: &["Mountain Hemlock", "Subalpine Fir", "Whitebark Pine"],
    common: &["Engelmann Spruce", "Lodgepole Pine", "Alaska Yellow Cedar"],
    understory: &["Huckleberry", "Mountain Heather", "Beargrass"],
};

const BLUE_MOUNTAINS: Ecoregion = Ecoregion {
    name: "Blue Mountains Forest",
    forest_type: "Dry Coniferous Forest",
    dominant: &["Ponderosa Pine", "Douglas Fir", "Grand Fir"],
    common: &["Western Larch", "Lodgepole Pine", "Quaking Aspen"],
    understory: &["Snowberry", "Ninebark", "Serviceberry"],
};

const BLUE_MOUNTAINS_SUBALPINE: Ecoregion = Ecoregion {
    name: "Blue Mountains Subalpine Forest",
    forest_type: "Subalpine Coniferous Forest",
    dominant: &["Subalpine Fir", "Engelmann Spruce", "Lodgepole Pine"],
    common: &["Whitebark Pine", "Alpine Larch"],
    understory: &["Huckleberry", "Grouse Whortleberry"],
};

fn ecoregion(coord: Coord, elevation: f64) -> Option<&'static Ecoregion> {
    if CASCADES_WEST.contains(coord) {
        Some(if elevation < 150.0 {
            &COASTAL
        } else if elevation < 1000.0 {
            &LOWER_MONTANE
        } else if elevation < 1500.0 {
            &MID_MONTANE
        } else {
            &CASCADES_SUBALPINE
        })
    } else if OREGON_EAST.contains(coord) {
        Some(if elevation < 1200.0 {
            &BLUE_MOUNTAINS
        } else {
            &BLUE_MOUNTAINS_SUBALPINE
        })
    } else {
        None
    }
}

/// Likely native trees for `coord` at `elevation` meters.
pub fn classify_trees(coord: Coord, elevation: f64) -> TreeSpecies {
    match ecoregion(coord, elevation) {
        Some(region) => {
            let mut mushroom_associations: Vec<MushroomAssociation> = Vec::new();
            for tree in region.dominant.iter().chain(region.common) {
                if mushroom_associations.iter().any(|assoc| assoc.tree == *tree) {
                    continue;
                }
                if let Some(mushrooms) = associated_mushrooms(tree) {
                    mushroom_associations.push(MushroomAssociation {
                        tree: (*tree).to_string(),
                        mushrooms: owned(mushrooms),
                    });
                }
            }
            TreeSpecies {
                ecoregion: region.name.into(),
                forest_type: Some(region.forest_type.into()),
                dominant_species: owned(region.dominant),
                common_species: owned(region.common),
                understory: owned(region.understory),
                status: None,
                note: None,
                elevation,
                mushroom_associations,
            }
        }
        None => TreeSpecies {
            ecoregion: "Unknown/General Temperate Forest".into(),
            forest_type: None,
            dominant_species: Vec::new(),
            common_species: Vec::new(),
            understory: Vec::new(),
            status: Some("Location outside of detailed dataset region".into()),
            note: Some(
                "For specific tree species data in this area, consult local forestry databases."
                    .into(),
            ),
            elevation,
            mushroom_associations: Vec::new(),
        },
    }
}

/// Mushrooms commonly found with `tree`, if any.
///
/// Rules are checked in order; the first match wins.
pub fn associated_mushrooms(tree: &str) -> Option<&'static [&'static str]> {
    match tree {
        "Douglas Fir" => Some(&["Chanterelle", "King Bolete", "Matsutake", "Coral Fungus"]),
        "Western Hemlock" => Some(&["Chanterelle", "Lobster Mushroom", "Hedgehog Mushroom"]),
        "Sitka Spruce" | "Engelmann Spruce" => Some(&["King Bolete", "Matsutake", "Russula"]),
        pine if pine.contains("Pine") => Some(&[
            "King Bolete",
            "Matsutake",
            "Slippery Jack",
            "Saffron Milk Cap",
        ]),
        fir if fir.contains("Fir") => Some(&["Chanterelle", "King Bolete", "Matsutake"]),
        "Red Alder" | "Big Leaf Maple" => Some(&["Oyster Mushroom", "Lion's Mane", "Morel"]),
        "Western Red Cedar" => Some(&["Lobster Mushroom", "Cauliflower Mushroom"]),
        _ => None,
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

/// Global Forest Watch tree cover response.
#[derive(Deserialize)]
struct GfwResponse {
    data: Option<GfwData>,
}

#[derive(Deserialize)]
struct GfwData {
    attributes: Option<GfwAttributes>,
}

#[derive(Deserialize)]
struct GfwAttributes {
    #[serde(rename = "treeCover")]
    tree_cover: Option<f64>,
}

impl Client {
    /// Satellite tree cover if credentials are configured and the
    /// service answers, otherwise the regional estimate.
    pub fn forest_cover(&self, coord: Coord) -> Result<ForestCover, ApiError> {
        match self.satellite_tree_cover(coord) {
            Some(Ok(tree_cover)) => {
                return Ok(ForestCover::Satellite {
                    tree_cover,
                    data_source: "Global Forest Watch".into(),
                })
            }
            Some(Err(err)) => warn!("satellite tree cover unavailable, estimating; {err}"),
            None => debug!("no GFW credentials, estimating tree cover"),
        }

        let elevation = self
            .copernicus_elevation(coord)
            .or_else(|_| self.open_meteo_elevation(coord))
            .map_or(0.0, |elev| elev.elevation);
        Ok(ForestCover::Estimated(estimate_forest(coord, elevation)))
    }

    /// Tree species for the ecoregion containing `coord`.
    pub fn tree_species(&self, coord: Coord) -> Result<TreeSpecies, ApiError> {
        let elevation = self
            .open_meteo_elevation(coord)
            .map_or(0.0, |elev| elev.elevation);
        Ok(classify_trees(coord, elevation))
    }

    fn satellite_tree_cover(&self, coord: Coord) -> Option<Result<f64, ApiError>> {
        const SERVICE: &str = "Global Forest Watch";
        let (url, key) = self.config.gfw()?;
        let request = self
            .http
            .get(url)
            .header("x-api-key", key)
            .query(&[("lat", coord.y), ("lon", coord.x)]);
        let result = self
            .fetch::<GfwResponse>(SERVICE, request)
            .and_then(|response| {
                response
                    .data
                    .and_then(|data| data.attributes)
                    .and_then(|attrs| attrs.tree_cover)
                    .ok_or(ApiError::NoData(SERVICE))
            });
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{associated_mushrooms, classify_trees, estimate_forest, ForestCover, GfwResponse};
    use crate::{
        tests::{client, offline_config, serve},
        ApiConfig,
    };
    use geo::{coord, Coord};
    use serde_json::json;

    fn here() -> Coord {
        coord!(x: -123.7521, y: 45.1451)
    }

    fn gfw_config(base: &str) -> ApiConfig {
        ApiConfig {
            gfw_tree_cover_url: Some(format!("{base}/gfw")),
            gfw_api_key: Some("secret".to_string()),
            opentopodata_url: format!("{base}/otd"),
            ..offline_config()
        }
    }

    #[test]
    fn test_coastal_estimate() {
        let estimate = estimate_forest(coord!(x: -123.7521, y: 45.1451), 50.0);
        assert_eq!(estimate.tree_cover, 70.0);
        assert_eq!(estimate.species[1], "Sitka Spruce");
    }

    #[test]
    fn test_estimate_elevation_bands() {
        let here = coord!(x: -122.0, y: 45.5);
        assert_eq!(estimate_forest(here, 799.9).tree_cover, 80.0);
        assert_eq!(estimate_forest(here, 800.0).tree_cover, 70.0);
        assert_eq!(estimate_forest(here, 1800.0).tree_cover, 30.0);
    }

    #[test]
    fn test_estimate_outside_region() {
        let estimate = estimate_forest(coord!(x: 2.35, y: 48.85), 35.0);
        assert_eq!(estimate.tree_cover, 0.0);
        assert!(estimate.species.is_empty());
    }

    #[test]
    fn test_region_bounds_are_inclusive() {
        let corner = coord!(x: -124.5, y: 45.0);
        assert_eq!(estimate_forest(corner, 0.0).tree_cover, 70.0);
    }

    #[test]
    fn test_lower_montane_associations() {
        let trees = classify_trees(coord!(x: -122.5, y: 44.0), 600.0);
        assert_eq!(trees.ecoregion, "Western Cascades Lower Montane Forest");
        assert_eq!(
            trees.forest_type.as_deref(),
            Some("Mixed Coniferous-Deciduous Forest")
        );
        let trees_with_fungi: Vec<&str> = trees
            .mushroom_associations
            .iter()
            .map(|assoc| assoc.tree.as_str())
            .collect();
        // Black Cottonwood has no listed associations.
        assert_eq!(
            trees_with_fungi,
            [
                "Douglas Fir",
                "Western Hemlock",
                "Western Red Cedar",
                "Grand Fir",
                "Big Leaf Maple",
                "Red Alder"
            ]
        );
    }

    #[test]
    fn test_eastern_oregon() {
        let trees = classify_trees(coord!(x: -118.5, y: 45.0), 1500.0);
        assert_eq!(trees.ecoregion, "Blue Mountains Subalpine Forest");
        assert_eq!(trees.understory, ["Huckleberry", "Grouse Whortleberry"]);
    }

    #[test]
    fn test_unknown_region() {
        let trees = classify_trees(coord!(x: 2.35, y: 48.85), 35.0);
        assert_eq!(trees.ecoregion, "Unknown/General Temperate Forest");
        assert!(trees.forest_type.is_none());
        assert!(trees.status.is_some());
        assert!(trees.mushroom_associations.is_empty());
    }

    #[test]
    fn test_association_precedence() {
        assert_eq!(
            associated_mushrooms("Engelmann Spruce"),
            Some(&["King Bolete", "Matsutake", "Russula"][..])
        );
        assert_eq!(associated_mushrooms("Whitebark Pine").map(<[_]>::len), Some(4));
        assert_eq!(associated_mushrooms("Pacific Silver Fir").map(<[_]>::len), Some(3));
        assert_eq!(associated_mushrooms("Alaska Yellow Cedar"), None);
    }

    #[test]
    fn test_gfw_shape() {
        let response: GfwResponse =
            serde_json::from_value(json!({"data": {"attributes": {"treeCover": 64}}})).unwrap();
        let cover = response.data.unwrap().attributes.unwrap().tree_cover;
        assert_eq!(cover, Some(64.0));
    }

    #[test]
    fn test_forest_cover_tagging() {
        let cover = ForestCover::Satellite {
            tree_cover: 64.0,
            data_source: "Global Forest Watch".into(),
        };
        let json = serde_json::to_value(&cover).unwrap();
        assert_eq!(json["kind"], "satellite");
        assert_eq!(json["tree_cover"], 64.0);
    }

    #[test]
    fn test_satellite_cover() {
        let base = serve(&[("/gfw", 200, r#"{"data": {"attributes": {"treeCover": 64}}}"#)]);
        let cover = client(gfw_config(&base)).forest_cover(here()).unwrap();
        assert_eq!(
            cover,
            ForestCover::Satellite {
                tree_cover: 64.0,
                data_source: "Global Forest Watch".to_string()
            }
        );
    }

    #[test]
    fn test_failed_satellite_falls_back_to_estimate() {
        let base = serve(&[
            ("/gfw", 500, "{}"),
            ("/otd/copernicus30", 200, r#"{"results": [{"elevation": 500.0}]}"#),
        ]);
        let cover = client(gfw_config(&base)).forest_cover(here()).unwrap();
        assert_eq!(cover, ForestCover::Estimated(estimate_forest(here(), 500.0)));
    }

    #[test]
    fn test_offline_estimate_uses_sea_level() {
        let mut config = offline_config();
        config.gfw_api_key = Some("secret".to_string());
        config.gfw_tree_cover_url = Some(crate::tests::UNREACHABLE.to_string());
        let client = client(config);

        let ForestCover::Estimated(estimate) = client.forest_cover(here()).unwrap() else {
            panic!("expected an estimate");
        };
        assert_eq!(estimate.elevation, 0.0);
        assert_eq!(estimate.tree_cover, 70.0);

        let trees = client.tree_species(here()).unwrap();
        assert_eq!(trees, classify_trees(here(), 0.0));
    }

    #[test]
    fn test_no_credentials_estimates() {
        let cover = client(offline_config()).forest_cover(here()).unwrap();
        assert!(matches!(cover, ForestCover::Estimated(_)));
    }
}
