use thiserror::Error;

/// A failed call to one remote service.
///
/// Errors carry owned strings rather than the underlying transport
/// error so that they can be cloned into caches and reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{service} request failed with status code {status}")]
    Status { service: &'static str, status: u16 },

    #[error("failed to fetch {service} data: {message}")]
    Request {
        service: &'static str,
        message: String,
    },

    #[error("malformed {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("no {0} data found")]
    NoData(&'static str),
}
