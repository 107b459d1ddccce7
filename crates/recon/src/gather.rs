//! Concurrent fetch stage. Completion order is irrelevant: results come
//! back in request order and the fold runs afterwards, strictly by date.

use futures::future::try_join_all;
use gmde_core::StateDate;

use crate::error::ReconError;
use crate::model::Hop;
use crate::source::CorrespondenceSource;

/// Consecutive pairs of `dates`: `n` dates give `n - 1` hops.
pub fn consecutive_pairs(dates: &[StateDate]) -> Vec<(StateDate, StateDate)> {
    dates.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Fetch every pair at once. The first failure aborts the batch; requests
/// still in flight are dropped.
pub async fn gather<S: CorrespondenceSource>(
    source: &S,
    pairs: &[(StateDate, StateDate)],
) -> Result<Vec<Hop>, ReconError> {
    let fetches = pairs.iter().map(|&(origin, target)| async move {
        let edges = source
            .fetch(origin, target)
            .await
            .map_err(|cause| ReconError::FetchFailed {
                origin,
                target,
                source: cause,
            })?;
        log::debug!("fetched {} correspondences {origin} -> {target}", edges.len());
        Ok::<_, ReconError>(Hop {
            origin,
            target,
            edges,
        })
    });
    try_join_all(fetches).await
}
