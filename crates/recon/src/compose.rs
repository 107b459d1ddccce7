use gmde_core::{SnapPolicy, Snapped, StateCatalog, StateDate};
use serde::Serialize;

use crate::chain::MappingChain;
use crate::error::ReconError;
use crate::gather::{consecutive_pairs, gather};
use crate::source::CorrespondenceSource;
use crate::target::TargetSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Keep `bfs_gmde_name_*` columns.
    pub with_names: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self { with_names: true }
    }
}

/// A composed chain plus the date decisions that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub origin: Snapped,
    pub targets: Vec<Snapped>,
    pub chain: MappingChain,
}

/// Chain every state from `origin` through `target`.
///
/// Only consecutive dates are fetched, concurrently; the fold then runs in
/// date order. One failed hop fails the whole call.
pub async fn compose<S: CorrespondenceSource>(
    catalog: &StateCatalog,
    source: &S,
    origin: StateDate,
    target: &TargetSpec,
    options: ComposeOptions,
) -> Result<Composition, ReconError> {
    let origin_snap = catalog.snap(origin, SnapPolicy::EarlierOrEqual);
    let resolved = target.resolve(catalog)?;
    let dates = hop_dates(origin_snap.date, &resolved.dates);
    for date in &dates {
        catalog.require(*date)?;
    }

    let mut chain = if dates.len() < 2 {
        MappingChain::identity(catalog.require(origin_snap.date)?)
    } else {
        let hops = gather(source, &consecutive_pairs(&dates)).await?;
        MappingChain::fold(dates[0], hops)
    };

    if !options.with_names {
        chain.strip_names();
    }

    let fanout = chain.fanout();
    if !fanout.is_empty() {
        log::info!(
            "{} origin codes split into several rows: {:?}",
            fanout.len(),
            fanout.keys().collect::<Vec<_>>()
        );
    }
    log::info!(
        "composed {} hops {} -> {}, {} rows",
        dates.len().saturating_sub(1),
        dates[0],
        dates[dates.len() - 1],
        chain.len()
    );

    Ok(Composition {
        origin: origin_snap,
        targets: resolved.snaps,
        chain,
    })
}

/// Origin and targets, sorted and de-duplicated. Sorting matters: callers
/// may list targets before the origin.
pub fn hop_dates(origin: StateDate, targets: &[StateDate]) -> Vec<StateDate> {
    let mut dates: Vec<StateDate> = Vec::with_capacity(targets.len() + 1);
    dates.push(origin);
    dates.extend_from_slice(targets);
    dates.sort();
    dates.dedup();
    dates
}
