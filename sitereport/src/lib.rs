//! Environmental survey of a point or grid, rendered as an LLM
//! prompt.
//!
//! A [`Collector`] runs every enabled [`Provider`] for a coordinate,
//! [`EnvironmentalReport::merge`] folds the results into one record,
//! and [`format_prompt`] renders it. [`Survey`] ties these together
//! for a single point or a [`GridSpec`].

mod cache;
mod collector;
mod error;
mod grid;
mod prompt;
mod provider;
mod report;
mod survey;

pub use crate::{
    cache::{CacheKey, CachePolicy, CachingProvider, ResponseCache},
    collector::{Collection, Collector, CollectorBuilder},
    error::SurveyError,
    grid::{grid_coords, GridSpec, MAX_GRID_POINTS, MILES_PER_DEGREE},
    prompt::{format_prompt, PromptOptions},
    provider::{ApiProvider, Payload, Provider, ProviderKind, ProviderResult, QueryOptions},
    report::{
        EnvironmentalReport, RankedSoilType, Section, SoilClassification, SoilProperty,
        SoilPropertyLayer, SoilStat, WeatherSummary,
    },
    survey::{checked_coord, locate, point_header, Survey, Target},
};
pub use envapi;
pub use geo;
