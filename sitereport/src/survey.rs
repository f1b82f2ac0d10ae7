//! Point and grid surveys: collect, merge, and render.

use crate::{
    collector::{Collection, Collector},
    grid::GridSpec,
    prompt::{format_prompt, PromptOptions},
    report::EnvironmentalReport,
    SurveyError,
};
use envapi::Client;
use geo::{coord, Coord};
use log::{info, warn};
use rayon::{prelude::*, ThreadPoolBuilder};

const HEADER_RULE: &str = "====================";
const SEPARATOR_WIDTH: usize = 80;

/// Validates a latitude/longitude pair.
pub fn checked_coord(lat: f64, lon: f64) -> Result<Coord, SurveyError> {
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(coord!(x: lon, y: lat))
    } else {
        Err(SurveyError::InvalidCoordinate { lat, lon })
    }
}

/// Resolves explicit coordinates, or geocodes `location` when either
/// coordinate is missing.
pub fn locate(
    client: &Client,
    lat: Option<f64>,
    lon: Option<f64>,
    location: Option<&str>,
) -> Result<Coord, SurveyError> {
    match (lat, lon, location) {
        (Some(lat), Some(lon), _) => checked_coord(lat, lon),
        (_, _, Some(location)) => {
            let place = client
                .geocode(location)
                .map_err(|source| SurveyError::Geocode {
                    location: location.to_string(),
                    source,
                })?;
            info!(
                "geocoded {location:?} to latitude {}, longitude {}",
                place.coord.y, place.coord.x
            );
            checked_coord(place.coord.y, place.coord.x)
        }
        _ => Err(SurveyError::MissingLocation),
    }
}

/// Banner introducing point `idx` (zero based) of `total`.
pub fn point_header(idx: usize, total: usize, coord: Coord, is_center: bool) -> String {
    let tag = if is_center { " [center]" } else { "" };
    format!(
        "\n{HEADER_RULE} Point {}/{total} (Lat: {}, Lon: {}){tag} {HEADER_RULE}\n\n",
        idx + 1,
        coord.y,
        coord.x,
    )
}

/// What to survey.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Point(Coord),
    Grid(GridSpec),
}

impl Target {
    pub fn coords(&self) -> Vec<Coord> {
        match self {
            Self::Point(coord) => vec![*coord],
            Self::Grid(grid) => {
                let coords = grid.coords();
                info!(
                    "generated a {size}x{size} grid with {} points",
                    coords.len(),
                    size = grid.size
                );
                coords
            }
        }
    }

    /// Index of the grid's center point.
    pub fn center_index(&self) -> Option<usize> {
        match self {
            Self::Point(_) => None,
            Self::Grid(grid) => Some(grid.center_index()),
        }
    }
}

pub struct Survey {
    collector: Collector,
    prompt: PromptOptions,

    /// Coordinates collected concurrently.
    jobs: usize,
}

impl Survey {
    pub fn new(collector: Collector, prompt: PromptOptions) -> Self {
        Self {
            collector,
            prompt,
            jobs: 1,
        }
    }

    /// Collect up to `jobs` coordinates at once.
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Collects every coordinate, calling `on_collected` after each.
    /// Output order matches `coords` regardless of parallelism.
    pub fn collect<F>(&self, coords: &[Coord], on_collected: F) -> Vec<Collection>
    where
        F: Fn(&Collection) + Sync,
    {
        let collect_one = |coord: &Coord| {
            let collection = self.collector.collect(*coord);
            on_collected(&collection);
            collection
        };

        if self.jobs > 1 && coords.len() > 1 {
            match ThreadPoolBuilder::new().num_threads(self.jobs).build() {
                Ok(pool) => return pool.install(|| coords.par_iter().map(collect_one).collect()),
                Err(e) => warn!("collecting sequentially: {e}"),
            }
        }
        coords.iter().map(collect_one).collect()
    }

    /// Prompt text for one coordinate.
    pub fn prompt(&self, collection: &Collection) -> String {
        let report = EnvironmentalReport::merge(collection.results.iter().cloned());
        format_prompt(&report, collection.coord, &self.prompt)
    }

    /// Renders collected results, with a header per point and a rule
    /// between points when there is more than one.
    pub fn render(&self, target: &Target, collections: &[Collection]) -> String {
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
            out.push_str(&self.prompt(collection));
            out.push('\n');
            if total > 1 && idx + 1 < total {
                out.push('\n');
                out.push_str(&"=".repeat(SEPARATOR_WIDTH));
                out.push_str("\n\n");
            }
        }
        out
    }

    /// Collects and renders `target`.
    pub fn run(&self, target: &Target) -> String {
        let collections = self.collect(&target.coords(), |_| ());
        self.render(target, &collections)
    }
}

#[cfg(test)]
mod tests {
    use super::{checked_coord, locate, Survey, Target};
    use crate::{
        collector::{tests::Fake, Collector},
        grid::GridSpec,
        prompt::PromptOptions,
        provider::{Provider, ProviderKind},
        SurveyError,
    };
    use chrono::NaiveDate;
    use envapi::{ApiConfig, Client};
    use geo::coord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn survey(jobs: usize) -> Survey {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(Fake {
                kind: ProviderKind::Topography,
                fail: false,
            }),
            Box::new(Fake {
                kind: ProviderKind::Weather,
                fail: true,
            }),
        ];
        let prompt = PromptOptions {
            date: NaiveDate::from_ymd_opt(2024, 10, 19).unwrap(),
            mushroom_type: None,
            location_name: None,
        };
        Survey::new(Collector::new(providers), prompt).jobs(jobs)
    }

    #[test]
    fn test_single_point_has_no_headers() {
        let target = Target::Point(coord!(x: -123.7521, y: 45.1451));
        let out = survey(1).run(&target);
        assert!(out.starts_with("Date: 2024-10-19\n"));
        assert!(!out.contains("Point 1/1"));
        assert!(out.contains("- Elevation (Open-Meteo): 45.1451 meters\n"));
        assert!(out.contains("\nUnavailable Data:\n- Weather History: fake request failed"));
        assert!(out.ends_with("thrive in these conditions.\n"));
    }

    #[test]
    fn test_grid_headers_and_separators() {
        let grid = GridSpec::new(coord!(x: -123.0, y: 45.0), 3, 1.0).unwrap();
        let target = Target::Grid(grid);
        let out = survey(1).run(&target);

        assert_eq!(out.matches("==================== Point ").count(), 9);
        assert_eq!(out.matches(&"=".repeat(80)).count(), 8);
        assert!(out.starts_with("\n==================== Point 1/9 (Lat: "));
        let centers: Vec<_> = out.lines().filter(|l| l.contains("[center]")).collect();
        assert_eq!(centers.len(), 1);
        assert!(centers[0].starts_with("==================== Point 5/9 (Lat: 45"));
        assert!(centers[0].ends_with(") [center] ===================="));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = GridSpec::new(coord!(x: -71.3, y: 44.27), 5, 0.5).unwrap();
        let target = Target::Grid(grid);
        let sequential = survey(1).run(&target);
        let parallel = survey(4).run(&target);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_progress_callback() {
        let grid = GridSpec::new(coord!(x: 8.5, y: 47.4), 3, 2.0).unwrap();
        let calls = AtomicUsize::new(0);
        let collections = survey(2).collect(&grid.coords(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(collections.len(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[test]
    fn test_idempotent() {
        let target = Target::Point(coord!(x: -123.7521, y: 45.1451));
        let survey = survey(1);
        assert_eq!(survey.run(&target), survey.run(&target));
    }

    #[test]
    fn test_checked_coord() {
        assert!(checked_coord(45.1451, -123.7521).is_ok());
        assert!(matches!(
            checked_coord(91.0, 0.0),
            Err(SurveyError::InvalidCoordinate { .. })
        ));
        assert!(checked_coord(0.0, -180.5).is_err());
        assert!(checked_coord(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_locate_without_location() {
        let client = Client::new(ApiConfig::default()).unwrap();
        for (lat, lon) in [(None, None), (Some(1.0), None), (None, Some(-123.0))] {
            assert!(matches!(
                locate(&client, lat, lon, None),
                Err(SurveyError::MissingLocation)
            ));
        }
        let center = locate(&client, Some(45.1451), Some(-123.7521), None).unwrap();
        assert_eq!(center, coord!(x: -123.7521, y: 45.1451));
        assert!(matches!(
            locate(&client, Some(95.0), Some(0.0), Some("ignored")),
            Err(SurveyError::InvalidCoordinate { .. })
        ));
    }
}
