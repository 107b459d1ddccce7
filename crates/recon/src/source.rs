use std::future::Future;

use gmde_core::StateDate;

use crate::error::FetchError;
use crate::model::CorrespondenceEdge;

/// Pairwise correspondence lookup: the unit of concurrency for the
/// composer and the projector.
///
/// One call is one request for one (origin, target) pair of catalog dates.
/// Implementations neither retry nor cache.
pub trait CorrespondenceSource: Sync {
    fn fetch(
        &self,
        origin: StateDate,
        target: StateDate,
    ) -> impl Future<Output = Result<Vec<CorrespondenceEdge>, FetchError>> + Send;
}
