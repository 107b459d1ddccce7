use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;

/// Wire format of the correspondence and snapshot endpoints.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Format used by the `MutationDate` column of the mutation feed.
const MUTATION_DATE_FORMAT: &str = "%d.%m.%Y";

/// Date of a Gemeindestand. Displays (and serializes) as `dd-mm-yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateDate(NaiveDate);

impl StateDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Shorthand for tests and fixtures. Returns `None` for impossible dates.
    pub fn from_dmy(day: u32, month: u32, year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Absolute distance in days.
    pub fn days_between(&self, other: &StateDate) -> u64 {
        (self.0 - other.0).num_days().unsigned_abs()
    }
}

impl From<NaiveDate> for StateDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for StateDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for StateDate {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, MUTATION_DATE_FORMAT))
            .map(Self)
            .map_err(|_| CatalogError::InvalidDate(s.to_string()))
    }
}

impl Serialize for StateDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StateDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
