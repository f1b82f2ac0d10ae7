//! Raw JSON output of provider responses.

use anyhow::Result;
use serde_json::{json, Value};
use sitereport::{point_header, Collection, Payload, ProviderKind, ProviderResult, Target};

fn title(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Location => "OpenStreetMap Location Data",
        ProviderKind::Weather => "Historical Weather Data",
        ProviderKind::SoilGrids => "ISRIC SoilGrids API Result",
        ProviderKind::SoilType => "OpenEPI Soil Type API Result",
        ProviderKind::SoilProperties => "OpenEPI Soil Properties API Result",
        ProviderKind::Elevation => "Elevation API Result",
        ProviderKind::Topography => "Open-Meteo Topographic API Result",
        ProviderKind::ForestCover => "Forest Cover Result",
        ProviderKind::TreeSpecies => "Tree Species Data",
    }
}

/// JSON for one result. Weather omits the bulky daily series.
fn to_json(result: &ProviderResult) -> Result<Value> {
    Ok(match result {
        Ok(Payload::Weather(history)) => json!({ "monthly": history.monthly }),
        Ok(payload) => serde_json::to_value(payload)?,
        Err(err) => json!({ "error": err.to_string() }),
    })
}

/// Renders every result of one coordinate.
fn render_one(collection: &Collection, show_location: bool) -> Result<String> {
    let mut blocks = Vec::new();
    for (kind, result) in &collection.results {
        if *kind == ProviderKind::Location && !show_location {
            continue;
        }
        let body = serde_json::to_string_pretty(&to_json(result)?)?;
        blocks.push(format!("===== {} =====\n{body}\n", title(*kind)));
    }
    Ok(blocks.join("\n"))
}

pub fn render(target: &Target, collections: &[Collection], show_location: bool) -> Result<String> {
    let total = collections.len();
    let center = target.center_index();
    let mut out = String::new();
    for (idx, collection) in collections.iter().enumerate() {
        if total > 1 {
            out.push_str(&point_header(
                idx,
                total,
                collection.coord,
                center == Some(idx),
            ));
        }
        out.push_str(&render_one(collection, show_location)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::render;
    use serde_json::json;
    use sitereport::{
        envapi::{ApiError, WeatherHistory},
        geo::coord,
        Collection, Payload, ProviderKind, Target,
    };

    fn collection() -> Collection {
        let daily = serde_json::from_value(json!({
            "time": ["2024-09-30", "2024-10-01"],
            "precipitation_sum": [1.5, 2.0]
        }))
        .unwrap();
        Collection {
            coord: coord!(x: -123.7521, y: 45.1451),
            results: vec![
                (ProviderKind::Location, Err(ApiError::NoData("location name"))),
                (
                    ProviderKind::Weather,
                    Ok(Payload::Weather(WeatherHistory::from_daily(Some(daily)))),
                ),
                (
                    ProviderKind::SoilType,
                    Err(ApiError::Status {
                        service: "OpenEPI soil type",
                        status: 500,
                    }),
                ),
            ],
        }
    }

    #[test]
    fn test_raw_output() {
        let collection = collection();
        let target = Target::Point(collection.coord);
        let out = render(&target, &[collection], false).unwrap();

        assert!(!out.contains("OpenStreetMap"));
        assert!(out.starts_with("===== Historical Weather Data =====\n{\n  \"monthly\": {\n"));
        assert!(out.contains("\"2024-09\""));
        assert!(!out.contains("\"daily\""));
        assert!(out.contains(
            "\n===== OpenEPI Soil Type API Result =====\n{\n  \"error\": \
             \"OpenEPI soil type request failed with status code 500\"\n}\n"
        ));
    }

    #[test]
    fn test_location_shown_on_request() {
        let collection = collection();
        let target = Target::Point(collection.coord);
        let out = render(&target, &[collection], true).unwrap();
        assert!(out.starts_with(
            "===== OpenStreetMap Location Data =====\n{\n  \"error\": \"no location name data found\"\n}\n"
        ));
    }
}
