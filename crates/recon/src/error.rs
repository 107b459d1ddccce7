use gmde_core::{CatalogError, StateDate};
use thiserror::Error;

/// Failure of a single correspondence lookup. Produced by a
/// [`CorrespondenceSource`](crate::source::CorrespondenceSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body is not the expected CSV.
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ReconError {
    /// Neither the code-count match nor the backward scan found a state.
    #[error("no Gemeindestand could be found or inferred for {codes} codes, please check manually")]
    StateNotFound { codes: usize },
    /// Target argument is not a single date, a list or a 2-element range.
    #[error("invalid target specification: {0}")]
    InvalidTargetSpec(String),
    /// Range argument with other than two endpoints.
    #[error("date range needs exactly two dates, got {0}")]
    AmbiguousDateRange(usize),
    /// One hop's lookup failed; the whole operation is aborted.
    #[error("fetching correspondences {origin} -> {target} failed: {source}")]
    FetchFailed {
        origin: StateDate,
        target: StateDate,
        #[source]
        source: FetchError,
    },
    /// The dataset carries no as-of state date at all.
    #[error("no row carries a Gemeindestand date")]
    NoStateDates,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
