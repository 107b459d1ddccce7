//! `gmde-recon` - Gemeindestand inference and multi-hop BFS code mapping.
//!
//! Pure engine crate: receives a loaded [`StateCatalog`](gmde_core::StateCatalog)
//! and a [`CorrespondenceSource`], returns mapping tables. No CLI or HTTP
//! dependencies.
//!
//! Work that touches the source runs in two stages: all pairwise lookups are
//! gathered concurrently, then folded strictly in date order.

pub mod chain;
pub mod compose;
pub mod dataset;
pub mod error;
pub mod gather;
pub mod identify;
pub mod model;
pub mod project;
pub mod source;
pub mod target;

pub use chain::MappingChain;
pub use compose::{compose, ComposeOptions, Composition};
pub use dataset::{map_dataset, DatasetMapping};
pub use error::{FetchError, ReconError};
pub use identify::{correct_against, identify_state};
pub use model::{
    ChainRow, CorrectionMap, CorrespondenceEdge, Link, MappedRow, MatchMethod, Observation,
    ProjectedRow, Projection, StampedCode, StateMatch,
};
pub use project::project_to_newest;
pub use source::CorrespondenceSource;
pub use target::{ResolvedTargets, TargetSpec};
