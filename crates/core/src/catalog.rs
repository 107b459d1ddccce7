use std::collections::BTreeSet;

use serde::Serialize;

use crate::code::Code;
use crate::date::StateDate;
use crate::error::CatalogError;
use crate::state::State;

/// Every known Gemeindestand, oldest first.
///
/// Built once at startup and shared by reference. `all_codes` is the union
/// of every state's codes: a code outside it was never issued by the BFS.
#[derive(Debug, Clone)]
pub struct StateCatalog {
    states: Vec<State>,
    all_codes: BTreeSet<Code>,
}

/// How a date that is not itself a state gets mapped onto one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapPolicy {
    Nearest,
    EarlierOrEqual,
    LaterOrEqual,
}

/// Outcome of [`StateCatalog::snap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapped {
    pub requested: StateDate,
    pub date: StateDate,
    pub policy: SnapPolicy,
    /// The requested direction had no candidate and `Nearest` was used.
    pub fell_back: bool,
}

impl Snapped {
    pub fn is_exact(&self) -> bool {
        self.requested == self.date
    }
}

impl StateCatalog {
    /// Sorts `states` by date. Duplicate dates are rejected.
    pub fn new(mut states: Vec<State>) -> Result<Self, CatalogError> {
        if states.is_empty() {
            return Err(CatalogError::Empty);
        }
        states.sort_by_key(|s| s.date());
        if let Some(pair) = states.windows(2).find(|w| w[0].date() == w[1].date()) {
            return Err(CatalogError::DuplicateState(pair[0].date()));
        }

        let all_codes = states.iter().flat_map(|s| s.codes()).collect();
        Ok(Self { states, all_codes })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn newest(&self) -> &State {
        // Non-empty by construction.
        &self.states[self.states.len() - 1]
    }

    pub fn position(&self, date: StateDate) -> Option<usize> {
        self.states.binary_search_by_key(&date, |s| s.date()).ok()
    }

    pub fn get(&self, date: StateDate) -> Option<&State> {
        self.position(date).map(|i| &self.states[i])
    }

    pub fn require(&self, date: StateDate) -> Result<&State, CatalogError> {
        self.get(date).ok_or(CatalogError::UnknownState(date))
    }

    /// States holding exactly `count` codes, in catalog order.
    pub fn with_code_count(&self, count: usize) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().filter(move |s| s.code_count() == count)
    }

    /// Was `code` ever part of any state?
    pub fn is_known_code(&self, code: Code) -> bool {
        self.all_codes.contains(&code)
    }

    pub fn all_codes(&self) -> &BTreeSet<Code> {
        &self.all_codes
    }

    /// Inclusive run of states from `start` to `end`. Empty when `start`
    /// lies after `end`.
    pub fn between(&self, start: StateDate, end: StateDate) -> Result<&[State], CatalogError> {
        let from = self.position(start).ok_or(CatalogError::UnknownState(start))?;
        let to = self.position(end).ok_or(CatalogError::UnknownState(end))?;
        if from > to {
            return Ok(&[]);
        }
        Ok(&self.states[from..=to])
    }

    /// Map `date` onto a catalog state.
    ///
    /// A date that already is a state comes back unchanged. A directional
    /// policy without any candidate falls back to `Nearest` and reports it
    /// through `fell_back`.
    pub fn snap(&self, date: StateDate, policy: SnapPolicy) -> Snapped {
        if self.position(date).is_some() {
            return Snapped {
                requested: date,
                date,
                policy,
                fell_back: false,
            };
        }

        let directional = match policy {
            SnapPolicy::Nearest => None,
            SnapPolicy::EarlierOrEqual => Some(
                self.states
                    .iter()
                    .rev()
                    .map(State::date)
                    .find(|d| *d <= date),
            ),
            SnapPolicy::LaterOrEqual => {
                Some(self.states.iter().map(State::date).find(|d| *d >= date))
            }
        };

        let (snapped, fell_back) = match directional {
            Some(Some(found)) => (found, false),
            Some(None) => {
                log::warn!("no {policy:?} state for {date}, falling back to nearest");
                (self.nearest(date), true)
            }
            None => (self.nearest(date), false),
        };

        log::info!("{date} is not an official Gemeindestand, using {snapped}");
        Snapped {
            requested: date,
            date: snapped,
            policy,
            fell_back,
        }
    }

    /// Closest state by absolute day distance; ties go to the earlier state.
    fn nearest(&self, date: StateDate) -> StateDate {
        let mut best = self.states[0].date();
        for state in &self.states[1..] {
            if state.date().days_between(&date) < best.days_between(&date) {
                best = state.date();
            }
        }
        best
    }
}
