use envapi::ApiError;
use thiserror::Error;

/// Problems with the survey inputs. These halt a run; provider
/// failures never surface here.
#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("missing required parameters")]
    Builder,

    #[error("either coordinates or a location name must be provided")]
    MissingLocation,

    #[error("invalid coordinate: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("grid size must be between 1 and 100, got {0}")]
    InvalidGridSize(usize),

    #[error("grid spacing must be a positive number of miles, got {0}")]
    InvalidSpacing(f64),

    #[error("could not geocode {location:?}: {source}")]
    Geocode {
        location: String,
        #[source]
        source: ApiError,
    },
}
