//! `gmde-core` - Swiss municipality codes and the dated states they live in.
//!
//! Value types only: a [`StateCatalog`] is built once (see `gmde-agv-client`)
//! and shared by reference afterwards. Nothing here mutates it.

pub mod catalog;
pub mod code;
pub mod date;
pub mod error;
pub mod state;

pub use catalog::{SnapPolicy, Snapped, StateCatalog};
pub use code::{is_reserved, Code, NON_MUNICIPAL_FLOOR, SHARED_TERRITORIES};
pub use date::StateDate;
pub use error::CatalogError;
pub use state::State;
