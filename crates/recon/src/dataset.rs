//! Map the codes of a whole dataset to later states.

use std::collections::HashMap;

use gmde_core::{Code, SnapPolicy, Snapped, StateCatalog, StateDate};
use serde::Serialize;

use crate::chain::header_for;
use crate::compose::{compose, ComposeOptions, Composition};
use crate::error::ReconError;
use crate::identify::{correct_against, identify_state};
use crate::model::{CorrectionMap, Link, MappedRow, Observation, StateMatch};
use crate::source::CorrespondenceSource;
use crate::target::TargetSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMapping {
    /// State the dataset's codes were read against.
    pub origin: StateDate,
    /// How a caller-given origin was mapped onto the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_snap: Option<Snapped>,
    /// Set when the origin had to be inferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identified: Option<StateMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<CorrectionMap>,
    pub composition: Composition,
    pub rows: Vec<MappedRow>,
}

impl DatasetMapping {
    /// Chain dates other than the origin, in the order of `MappedRow::links`.
    pub fn link_dates(&self) -> Vec<StateDate> {
        self.composition
            .chain
            .dates()
            .iter()
            .copied()
            .filter(|d| *d != self.origin)
            .collect()
    }

    pub fn link_header(&self) -> Vec<String> {
        header_for(&self.link_dates(), self.composition.chain.with_names())
    }

    /// Rows whose code has no chain entry in the origin state.
    pub fn unmatched(&self) -> impl Iterator<Item = &MappedRow> + '_ {
        self.rows.iter().filter(|r| r.links.iter().all(Option::is_none))
    }
}

/// Infer (or take) the origin state of `observations`, repair never-issued
/// codes, compose to `target` and join every row onto the chain.
///
/// `target` defaults to the newest catalog state.
pub async fn map_dataset<S: CorrespondenceSource>(
    catalog: &StateCatalog,
    source: &S,
    observations: &[Observation],
    origin: Option<StateDate>,
    target: Option<&TargetSpec>,
    options: ComposeOptions,
) -> Result<DatasetMapping, ReconError> {
    let (requested, origin_snap, identified, correction) = match origin {
        Some(date) => {
            let snap = catalog.snap(date, SnapPolicy::EarlierOrEqual);
            if snap.fell_back {
                log::warn!("no Gemeindestand on or before {date}, using {}", snap.date);
            }
            let correction = correct_against(catalog, snap.date, observations)?;
            (date, Some(snap), None, correction)
        }
        None => {
            let found = identify_state(catalog, observations)?;
            let correction = found.correction.clone();
            (found.state, None, Some(found), correction)
        }
    };
    let origin = origin_snap.map_or(requested, |s| s.date);

    let codes: Vec<Code> = observations
        .iter()
        .map(|o| correction.as_ref().map_or(o.code, |c| c.apply(o.code)))
        .collect();
    if let Some(ref c) = correction {
        log::info!("applied {} code corrections", c.len());
    }

    let default_target = TargetSpec::Single(catalog.newest().date());
    let target = target.unwrap_or(&default_target);
    let composition = compose(catalog, source, requested, target, options).await?;

    let rows = join_rows(&composition, origin, &codes);
    let mapping = DatasetMapping {
        origin,
        origin_snap,
        identified,
        correction,
        composition,
        rows,
    };
    let unmatched = mapping.unmatched().count();
    if unmatched > 0 {
        log::warn!("{unmatched} rows have no code in Gemeindestand {origin}");
    }
    Ok(mapping)
}

fn join_rows(composition: &Composition, origin: StateDate, codes: &[Code]) -> Vec<MappedRow> {
    let chain = &composition.chain;
    let Some(key_col) = chain.dates().iter().position(|d| *d == origin) else {
        return Vec::new();
    };
    let width = chain.dates().len() - 1;

    let mut by_code: HashMap<Code, Vec<Vec<Option<Link>>>> = HashMap::new();
    for row in chain.rows() {
        let Some(Some(key)) = row.links.get(key_col) else {
            continue;
        };
        let rest: Vec<Option<Link>> = row
            .links
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_col)
            .map(|(_, l)| l.clone())
            .collect();
        by_code.entry(key.code).or_default().push(rest);
    }

    let mut rows = Vec::with_capacity(codes.len());
    for (source, &code) in codes.iter().enumerate() {
        match by_code.get(&code) {
            Some(matches) => {
                for links in matches {
                    rows.push(MappedRow {
                        source,
                        code,
                        links: links.clone(),
                    });
                }
            }
            None => rows.push(MappedRow {
                source,
                code,
                links: vec![None; width],
            }),
        }
    }
    rows
}
