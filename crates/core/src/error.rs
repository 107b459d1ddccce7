use thiserror::Error;

use crate::date::StateDate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog holds no state at all.
    #[error("state catalog is empty")]
    Empty,
    /// Two states share the same date.
    #[error("duplicate state {0} in catalog")]
    DuplicateState(StateDate),
    /// A date string that is neither `dd-mm-yyyy` nor `dd.mm.yyyy`.
    #[error("cannot parse date '{0}' (expected dd-mm-yyyy)")]
    InvalidDate(String),
    /// A date that is not one of the catalog's states.
    #[error("{0} is not an official Gemeindestand")]
    UnknownState(StateDate),
}
