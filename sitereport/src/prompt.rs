//! Renders an [`EnvironmentalReport`] as an LLM prompt.

use crate::report::{EnvironmentalReport, Section, SoilClassification, WeatherSummary};
use chrono::{Local, NaiveDate};
use envapi::{ForestCover, TreeSpecies};
use geo::Coord;
use std::fmt::{self, Write};

const ANALYSIS_REQUEST: &str = "Based on the soil, terrain, and weather information above, \
please provide an analysis of what mushroom species might grow well in this environment. \
Consider soil types, elevation, tree cover, temperature, precipitation patterns, and explain \
why certain mushrooms would thrive in these conditions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    /// Printed on the first line.
    pub date: NaiveDate,

    /// Ask for a suitability evaluation of this species instead of
    /// an open-ended analysis.
    pub mushroom_type: Option<String>,

    /// Shown when reverse geocoding produced nothing.
    pub location_name: Option<String>,
}

impl PromptOptions {
    pub fn today() -> Self {
        Self {
            date: Local::now().date_naive(),
            mushroom_type: None,
            location_name: None,
        }
    }
}

/// Renders `report` for `coord`.
pub fn format_prompt(
    report: &EnvironmentalReport,
    coord: Coord,
    options: &PromptOptions,
) -> String {
    Prompt {
        report,
        coord,
        options,
    }
    .to_string()
}

/// Borrowed view implementing the prompt template.
struct Prompt<'a> {
    report: &'a EnvironmentalReport,
    coord: Coord,
    options: &'a PromptOptions,
}

impl fmt::Display for Prompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let options = self.options;

        writeln!(f, "Date: {}", options.date.format("%Y-%m-%d"))?;
        writeln!(f)?;
        writeln!(
            f,
            "Location Coordinates: Latitude {}, Longitude {}",
            self.coord.y, self.coord.x
        )?;
        if let Some(place) = &report.location {
            writeln!(f, "Location: {}", place.display_name)?;
        } else if let Some(name) = &options.location_name {
            writeln!(f, "Location Name: {name}")?;
        }
        if let Some(mushroom) = &options.mushroom_type {
            writeln!(f, "Target Mushroom: {mushroom}")?;
        }

        let mut terrain = String::new();
        write_terrain(&mut terrain, report)?;
        write_section(f, "Terrain Information", &terrain)?;

        if let Some(weather) = &report.weather {
            let mut body = String::new();
            write_weather(&mut body, weather)?;
            write_section(f, "Recent Weather Data", &body)?;
        }

        let mut soil = String::new();
        write_soil(&mut soil, report)?;
        write_section(f, "Soil Information", &soil)?;

        if !report.unavailable.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unavailable Data:")?;
            for (kind, err) in &report.unavailable {
                writeln!(f, "- {kind}: {err}")?;
            }
        }

        writeln!(f)?;
        match &options.mushroom_type {
            Some(mushroom) => write!(
                f,
                "Based on the soil, terrain, and weather information above, please evaluate \
                 the suitability of this location for growing {mushroom} mushrooms. Consider \
                 the soil types, elevation, tree cover, temperature, precipitation, and soil \
                 moisture patterns, and how these factors might affect mushroom growth. \
                 Provide specific recommendations for cultivation techniques that would be \
                 appropriate for these environmental conditions."
            ),
            None => f.write_str(ANALYSIS_REQUEST),
        }
    }
}

/// Writes `body` under a blank line and `title` header, unless empty.
fn write_section(f: &mut fmt::Formatter<'_>, title: &str, body: &str) -> fmt::Result {
    if body.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "{title}:")?;
    f.write_str(body)
}

fn write_list(out: &mut impl Write, header: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "{header}")?;
    for item in items {
        writeln!(out, "  * {item}")?;
    }
    Ok(())
}

fn write_terrain(out: &mut impl Write, report: &EnvironmentalReport) -> fmt::Result {
    if let Some(elevation) = report.best_elevation() {
        writeln!(
            out,
            "- Elevation ({}): {} meters",
            elevation.source, elevation.elevation
        )?;
    }

    match &report.forest_cover {
        Some(ForestCover::Satellite { tree_cover, .. }) => {
            writeln!(out, "- Tree Cover: {tree_cover}%")?;
        }
        Some(ForestCover::Estimated(estimate)) => {
            writeln!(out, "- Tree Cover: {}%", estimate.tree_cover)?;
            writeln!(out, "  (Note: {})", estimate.status)?;
            write_list(
                out,
                "- Dominant Tree Species (estimated):",
                &estimate.species,
            )?;
        }
        None => writeln!(out, "- Tree Cover: Data not available")?,
    }

    if let Some(trees) = &report.tree_species {
        write_trees(out, trees)?;
    }

    if let Some((label, val)) = report.land_use() {
        writeln!(out, "- {label}: {val}")?;
    }
    Ok(())
}

fn write_trees(out: &mut impl Write, trees: &TreeSpecies) -> fmt::Result {
    writeln!(out, "- Ecoregion: {}", trees.ecoregion)?;
    if let Some(forest_type) = &trees.forest_type {
        writeln!(out, "- Forest Type: {forest_type}")?;
    }
    write_list(out, "- Dominant Tree Species:", &trees.dominant_species)?;
    write_list(out, "- Common Tree Species:", &trees.common_species)?;
    write_list(out, "- Understory Vegetation:", &trees.understory)?;

    if !trees.mushroom_associations.is_empty() {
        writeln!(out)?;
        writeln!(out, "Mushroom-Tree Associations:")?;
        for association in &trees.mushroom_associations {
            writeln!(
                out,
                "- {}: {}",
                association.tree,
                association.mushrooms.join(", ")
            )?;
        }
    }
    Ok(())
}

fn write_weather(out: &mut impl Write, weather: &Section<WeatherSummary>) -> fmt::Result {
    let Section::Ready(weather) = weather else {
        return writeln!(out, "- Weather data is available but in an unexpected format");
    };

    if let Some(stats) = weather.temperature_mean {
        writeln!(out, "- Average Temperature: {:.1}°C", stats.mean)?;
    }
    if let Some(stats) = weather.temperature_min {
        writeln!(out, "- Minimum Temperature: {:.1}°C", stats.min)?;
    }
    if let Some(stats) = weather.temperature_max {
        writeln!(out, "- Maximum Temperature: {:.1}°C", stats.max)?;
    }
    if let Some(stats) = weather.precipitation {
        writeln!(out, "- Total Precipitation: {:.1} mm", stats.total)?;
        writeln!(out, "- Average Daily Precipitation: {:.1} mm", stats.mean)?;
    }
    if let Some(stats) = weather.rain {
        writeln!(
            out,
            "- Total Rainfall: {:.1} mm over {} days",
            stats.total, stats.wet_days
        )?;
    }
    match weather.snowfall {
        Some(stats) if stats.total > 0.0 => writeln!(
            out,
            "- Total Snowfall: {:.1} cm over {} days",
            stats.total, stats.wet_days
        )?,
        _ => (),
    }
    Ok(())
}

fn write_ranked(out: &mut impl Write, source: &str, class: &SoilClassification) -> fmt::Result {
    if class.ranked.is_empty() {
        return Ok(());
    }
    writeln!(out, "- Soil Type Probabilities ({source}):")?;
    for soil in &class.ranked {
        writeln!(out, "  * {}: {}%", soil.name, soil.probability)?;
    }
    Ok(())
}

fn write_soil(out: &mut impl Write, report: &EnvironmentalReport) -> fmt::Result {
    if let Some((source, name)) = report.primary_soil_type() {
        writeln!(out, "- Primary Soil Type ({source}): {name}")?;
    }

    match &report.soil_type {
        Some(Section::Ready(class)) => write_ranked(out, "OpenEPI", class)?,
        Some(Section::Unreadable) => {
            writeln!(out, "- OpenEPI data available but in unexpected format")?;
        }
        None => (),
    }
    if let Some(class) = &report.soil_grids {
        write_ranked(out, "SoilGrids", class)?;
    }

    match &report.soil_properties {
        Some(Section::Ready(layers)) if !layers.is_empty() => {
            writeln!(out, "- Soil Properties:")?;
            for layer in layers {
                match &layer.unit {
                    Some(unit) => writeln!(out, "  * {} ({unit}):", layer.name)?,
                    None => writeln!(out, "  * {}:", layer.name)?,
                }
                for depth in &layer.depths {
                    let stats = depth.stats.iter().map(ToString::to_string);
                    writeln!(
                        out,
                        "    - {}: {}",
                        depth.depth,
                        itertools::join(stats, ", ")
                    )?;
                }
            }
        }
        Some(Section::Unreadable) => {
            writeln!(out, "- Soil Properties data available but in unexpected format")?;
        }
        Some(Section::Ready(_)) | None => (),
    }
    Ok(())
}
