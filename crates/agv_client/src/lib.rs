//! BFS AGVCH commune API client.
//!
//! This crate is the single source of truth for the authority's wire
//! contract: correspondence tables, the mutation feed and per-date
//! snapshots, all served as CSV over plain GET.
//!
//! No caching. No retries. Concurrency is capped by the client's request
//! pool, shared by every call on one client.

mod client;
mod wire;

pub use client::{AgvClient, ClientOptions, RegistryError, DEFAULT_API_BASE, DEFAULT_MAX_REQUESTS};
pub use wire::{parse_correspondences, parse_mutation_dates, parse_snapshot};
