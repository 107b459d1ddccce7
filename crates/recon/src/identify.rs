//! Which Gemeindestand does a set of codes belong to?
//!
//! Reserved codes (shared territories, lakes, foreign areas) are ignored for
//! the search but never touched in the caller's data. The fast path matches
//! by code count; when that fails, never-issued codes are stripped and the
//! catalog is scanned from newest to oldest. Older data carrying retired
//! codes is the common failure, so the newest fitting state wins.

use std::collections::{BTreeMap, BTreeSet};

use gmde_core::code::{is_non_municipal, is_shared_territory};
use gmde_core::{Code, State, StateCatalog, StateDate};

use crate::error::ReconError;
use crate::model::{CorrectionMap, MatchMethod, Observation, StateMatch};

/// Infer the state of `observations`, correcting never-issued codes by name.
pub fn identify_state(
    catalog: &StateCatalog,
    observations: &[Observation],
) -> Result<StateMatch, ReconError> {
    let codes = inference_set(observations);

    if let Some(state) = match_by_code_count(catalog, &codes) {
        log::info!("found Gemeindestand {}", state.date());
        return Ok(StateMatch {
            state: state.date(),
            method: MatchMethod::CodeCount,
            correction: None,
        });
    }

    let wrong = never_issued(catalog, &codes, observations);
    let cleaned: BTreeSet<Code> = codes
        .iter()
        .copied()
        .filter(|c| !wrong.contains_key(c))
        .collect();

    let state = infer_backward(catalog, &cleaned).ok_or(ReconError::StateNotFound {
        codes: codes.len(),
    })?;
    log::info!("inferred Gemeindestand {}", state.date());

    let correction = (!wrong.is_empty()).then(|| build_correction(state, &wrong));
    Ok(StateMatch {
        state: state.date(),
        method: MatchMethod::BackwardInference,
        correction,
    })
}

/// Build corrections for never-issued codes against a state the caller
/// already knows. `None` when every code was issued at some point.
pub fn correct_against(
    catalog: &StateCatalog,
    state: StateDate,
    observations: &[Observation],
) -> Result<Option<CorrectionMap>, ReconError> {
    let state = catalog.require(state)?;
    let codes = inference_set(observations);
    let wrong = never_issued(catalog, &codes, observations);
    if wrong.is_empty() {
        return Ok(None);
    }
    Ok(Some(build_correction(state, &wrong)))
}

/// Distinct codes of `observations` minus the reserved ranges.
fn inference_set(observations: &[Observation]) -> BTreeSet<Code> {
    let all: BTreeSet<Code> = observations.iter().map(|o| o.code).collect();

    let shared: Vec<Code> = all.iter().copied().filter(|c| is_shared_territory(*c)).collect();
    if !shared.is_empty() {
        log::info!("ignoring shared territories (Kommunanz) {shared:?} for the state search");
    }
    let non_municipal: Vec<Code> = all.iter().copied().filter(|c| is_non_municipal(*c)).collect();
    if !non_municipal.is_empty() {
        log::info!("ignoring lakes or foreign territories {non_municipal:?} for the state search");
    }

    all.into_iter()
        .filter(|c| !is_shared_territory(*c) && !is_non_municipal(*c))
        .collect()
}

/// First state, in catalog order, with exactly `codes.len()` codes that
/// contains all of them.
fn match_by_code_count<'a>(catalog: &'a StateCatalog, codes: &BTreeSet<Code>) -> Option<&'a State> {
    catalog
        .with_code_count(codes.len())
        .find(|state| state.contains_all(codes))
}

/// Codes the BFS never issued, with the first name the caller recorded
/// for each.
fn never_issued(
    catalog: &StateCatalog,
    codes: &BTreeSet<Code>,
    observations: &[Observation],
) -> BTreeMap<Code, Option<String>> {
    let mut wrong: BTreeMap<Code, Option<String>> = codes
        .iter()
        .copied()
        .filter(|c| !catalog.is_known_code(*c))
        .map(|c| (c, None))
        .collect();
    if wrong.is_empty() {
        return wrong;
    }
    log::warn!("non-BFS codes detected, removing {:?}", wrong.keys().collect::<Vec<_>>());

    for obs in observations {
        if let Some(slot) = wrong.get_mut(&obs.code) {
            if slot.is_none() {
                slot.clone_from(&obs.name);
            }
        }
    }
    wrong
}

fn infer_backward<'a>(catalog: &'a StateCatalog, codes: &BTreeSet<Code>) -> Option<&'a State> {
    catalog
        .states()
        .iter()
        .rev()
        .find(|state| state.contains_all(codes))
}

fn build_correction(state: &State, wrong: &BTreeMap<Code, Option<String>>) -> CorrectionMap {
    let entries = wrong
        .iter()
        .map(|(code, name)| {
            let real = name.as_deref().and_then(|n| state.code_of(n));
            if real.is_none() {
                log::warn!("code {code} ({name:?}) has no counterpart in {}, keep for manual review", state.date());
            }
            (*code, real.unwrap_or(*code))
        })
        .collect();
    CorrectionMap::new(entries)
}
