use std::collections::BTreeMap;

use gmde_core::{Code, StateDate};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One code seen in the caller's data, with the name it was recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub code: Code,
    pub name: Option<String>,
}

impl Observation {
    pub fn new(code: Code, name: impl Into<String>) -> Self {
        Self {
            code,
            name: Some(name.into()),
        }
    }

    pub fn code_only(code: Code) -> Self {
        Self { code, name: None }
    }
}

/// A row of a mixed-origin dataset: a code and the state it was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampedCode {
    pub code: Option<Code>,
    pub as_of: Option<StateDate>,
}

// ---------------------------------------------------------------------------
// State identification
// ---------------------------------------------------------------------------

/// Substitutions for never-issued codes, keyed by the wrong code.
///
/// A code mapped to itself had a name that the inferred state does not know
/// and needs manual review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CorrectionMap {
    entries: BTreeMap<Code, Code>,
}

impl CorrectionMap {
    pub fn new(entries: BTreeMap<Code, Code>) -> Self {
        Self { entries }
    }

    pub fn get(&self, wrong: Code) -> Option<Code> {
        self.entries.get(&wrong).copied()
    }

    /// Corrected code, or `code` itself when it needs no correction.
    pub fn apply(&self, code: Code) -> Code {
        self.get(code).unwrap_or(code)
    }

    pub fn apply_all(&self, observations: &mut [Observation]) {
        for obs in observations {
            obs.code = self.apply(obs.code);
        }
    }

    /// Wrong codes that could not be resolved by name.
    pub fn unresolved(&self) -> Vec<Code> {
        self.entries
            .iter()
            .filter(|(wrong, real)| wrong == real)
            .map(|(wrong, _)| *wrong)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Code, Code)> + '_ {
        self.entries.iter().map(|(w, r)| (*w, *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// A state with the same number of codes contains them all.
    CodeCount,
    /// Newest-to-oldest scan after stripping never-issued codes.
    BackwardInference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateMatch {
    pub state: StateDate,
    pub method: MatchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<CorrectionMap>,
}

// ---------------------------------------------------------------------------
// Correspondences
// ---------------------------------------------------------------------------

/// One row of the authority's correspondence table for an (origin, target)
/// state pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrespondenceEdge {
    pub origin_code: Code,
    pub origin_name: String,
    pub terminal_code: Code,
    pub terminal_name: String,
}

impl CorrespondenceEdge {
    pub fn new(
        origin_code: Code,
        origin_name: impl Into<String>,
        terminal_code: Code,
        terminal_name: impl Into<String>,
    ) -> Self {
        Self {
            origin_code,
            origin_name: origin_name.into(),
            terminal_code,
            terminal_name: terminal_name.into(),
        }
    }

    /// Neither renumbered nor renamed between the two states.
    pub fn is_unmodified(&self) -> bool {
        self.origin_code == self.terminal_code && self.origin_name == self.terminal_name
    }
}

/// Fetched correspondences for one consecutive state pair.
#[derive(Debug, Clone)]
pub struct Hop {
    pub origin: StateDate,
    pub target: StateDate,
    pub edges: Vec<CorrespondenceEdge>,
}

// ---------------------------------------------------------------------------
// Mapping chains
// ---------------------------------------------------------------------------

/// A municipality as it appears at one hop of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub code: Code,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Link {
    pub fn new(code: Code, name: impl Into<String>) -> Self {
        Self {
            code,
            name: Some(name.into()),
        }
    }
}

/// One leaf of a chain: the municipality at every date, `None` once the
/// path dead-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainRow {
    pub links: Vec<Option<Link>>,
}

impl ChainRow {
    pub fn origin(&self) -> Option<&Link> {
        self.links.first().and_then(Option::as_ref)
    }

    pub fn terminal(&self) -> Option<&Link> {
        self.links.last().and_then(Option::as_ref)
    }
}

// ---------------------------------------------------------------------------
// Dataset mapping + projection output
// ---------------------------------------------------------------------------

/// An input row joined onto a chain. One input row yields several mapped
/// rows when its code splits along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedRow {
    /// Index into the caller's rows.
    pub source: usize,
    /// Code after correction.
    pub code: Code,
    /// One entry per chain date after the origin.
    pub links: Vec<Option<Link>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedRow {
    /// Index into the caller's rows.
    pub source: usize,
    pub code: Option<Code>,
    pub as_of: Option<StateDate>,
    pub projected: Option<Code>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub newest: StateDate,
    pub rows: Vec<ProjectedRow>,
}

impl Projection {
    /// Rows left without a code in the newest state.
    pub fn unresolved(&self) -> impl Iterator<Item = &ProjectedRow> + '_ {
        self.rows.iter().filter(|r| r.projected.is_none())
    }

    /// The projected codes as fresh input, every row stamped with `newest`.
    pub fn restamped(&self) -> Vec<StampedCode> {
        self.rows
            .iter()
            .map(|r| StampedCode {
                code: r.projected,
                as_of: Some(self.newest),
            })
            .collect()
    }
}
