use std::fmt;
use std::str::FromStr;

use gmde_core::{SnapPolicy, Snapped, StateCatalog, StateDate};

use crate::error::ReconError;

/// Where a mapping should lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Single(StateDate),
    List(Vec<StateDate>),
    /// Every catalog state from start to end, both inclusive.
    Range(StateDate, StateDate),
}

/// Catalog dates a [`TargetSpec`] stands for, plus every snapping decision
/// taken on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub dates: Vec<StateDate>,
    pub snaps: Vec<Snapped>,
}

impl TargetSpec {
    /// Range from a loose list of endpoints.
    pub fn range(endpoints: Vec<StateDate>) -> Result<Self, ReconError> {
        match endpoints.as_slice() {
            [start, end] => Ok(Self::Range(*start, *end)),
            other => Err(ReconError::AmbiguousDateRange(other.len())),
        }
    }

    /// `d` is a single date, `d1,d2,…` a list, `d1..d2` a range.
    pub fn parse(raw: &str) -> Result<Self, ReconError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ReconError::InvalidTargetSpec("empty target".into()));
        }

        if raw.contains("..") {
            let parts: Vec<&str> = raw.split("..").collect();
            if parts.len() != 2 {
                return Err(ReconError::AmbiguousDateRange(parts.len()));
            }
            return Ok(Self::Range(parse_date(parts[0])?, parse_date(parts[1])?));
        }

        if raw.contains(',') {
            let dates = raw.split(',').map(parse_date).collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::List(dates));
        }

        Ok(Self::Single(parse_date(raw)?))
    }

    /// Snap every date onto the catalog and expand ranges.
    pub fn resolve(&self, catalog: &StateCatalog) -> Result<ResolvedTargets, ReconError> {
        match self {
            Self::Single(date) => {
                let snap = catalog.snap(*date, SnapPolicy::Nearest);
                Ok(ResolvedTargets {
                    dates: vec![snap.date],
                    snaps: vec![snap],
                })
            }
            Self::List(dates) => {
                if dates.is_empty() {
                    return Err(ReconError::InvalidTargetSpec("empty target list".into()));
                }
                let snaps: Vec<Snapped> = dates
                    .iter()
                    .map(|d| catalog.snap(*d, SnapPolicy::Nearest))
                    .collect();
                Ok(ResolvedTargets {
                    dates: snaps.iter().map(|s| s.date).collect(),
                    snaps,
                })
            }
            Self::Range(start, end) => {
                let start = catalog.snap(*start, SnapPolicy::EarlierOrEqual);
                let end = catalog.snap(*end, SnapPolicy::LaterOrEqual);
                let dates = catalog
                    .between(start.date, end.date)?
                    .iter()
                    .map(|s| s.date())
                    .collect();
                Ok(ResolvedTargets {
                    dates,
                    snaps: vec![start, end],
                })
            }
        }
    }
}

impl FromStr for TargetSpec {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(d) => write!(f, "{d}"),
            Self::List(dates) => {
                let parts: Vec<String> = dates.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
            Self::Range(start, end) => write!(f, "{start}..{end}"),
        }
    }
}

fn parse_date(raw: &str) -> Result<StateDate, ReconError> {
    raw.trim()
        .parse()
        .map_err(|_| ReconError::InvalidTargetSpec(format!("'{}' is not a dd-mm-yyyy date", raw.trim())))
}
