//! Bring a dataset whose rows were recorded in different states onto the
//! newest state that appears among them.

use std::collections::{BTreeSet, HashMap};

use gmde_core::{Code, StateDate};

use crate::error::ReconError;
use crate::gather::gather;
use crate::model::{CorrespondenceEdge, ProjectedRow, Projection, StampedCode};
use crate::source::CorrespondenceSource;

/// Project every row onto the newest as-of date present in `rows`.
///
/// One lookup per distinct older date, all run at once. Rows already in the
/// newest state keep their code. Rows without a code or date, or whose code
/// has no correspondence, stay unresolved. A code that split yields one row
/// per distinct successor.
///
/// As-of dates are taken literally: they are not snapped onto a catalog.
pub async fn project_to_newest<S: CorrespondenceSource>(
    source: &S,
    rows: &[StampedCode],
) -> Result<Projection, ReconError> {
    let newest = rows
        .iter()
        .filter_map(|r| r.as_of)
        .max()
        .ok_or(ReconError::NoStateDates)?;

    let older: BTreeSet<StateDate> = rows
        .iter()
        .filter_map(|r| r.as_of)
        .filter(|d| *d < newest)
        .collect();
    let pairs: Vec<(StateDate, StateDate)> = older.iter().map(|d| (*d, newest)).collect();
    log::info!(
        "projecting {} rows from {} older states onto {newest}",
        rows.len(),
        pairs.len()
    );

    let hops = gather(source, &pairs).await?;

    let mut successors: Vec<Vec<Code>> = rows
        .iter()
        .map(|r| match (r.code, r.as_of) {
            (Some(code), Some(as_of)) if as_of == newest => vec![code],
            _ => Vec::new(),
        })
        .collect();

    // Chronological, and each hop only writes rows stamped with its origin,
    // so no hop overwrites another's result.
    for hop in &hops {
        let index = terminal_index(&hop.edges);
        for (slot, row) in successors.iter_mut().zip(rows) {
            if row.as_of != Some(hop.origin) {
                continue;
            }
            if let Some(found) = row.code.and_then(|c| index.get(&c)) {
                slot.clone_from(found);
            }
        }
    }

    let mut projected = Vec::with_capacity(rows.len());
    for (source, (row, codes)) in rows.iter().zip(successors).enumerate() {
        if codes.is_empty() {
            projected.push(ProjectedRow {
                source,
                code: row.code,
                as_of: row.as_of,
                projected: None,
            });
            continue;
        }
        for code in codes {
            projected.push(ProjectedRow {
                source,
                code: row.code,
                as_of: row.as_of,
                projected: Some(code),
            });
        }
    }

    let projection = Projection {
        newest,
        rows: projected,
    };
    let unresolved = projection.unresolved().count();
    if unresolved > 0 {
        log::warn!("{unresolved} rows could not be projected onto {newest}");
    }
    Ok(projection)
}

/// Origin code to its distinct terminal codes, in edge order.
fn terminal_index(edges: &[CorrespondenceEdge]) -> HashMap<Code, Vec<Code>> {
    let mut index: HashMap<Code, Vec<Code>> = HashMap::new();
    for edge in edges {
        let terminals = index.entry(edge.origin_code).or_default();
        if !terminals.contains(&edge.terminal_code) {
            terminals.push(edge.terminal_code);
        }
    }
    index
}
