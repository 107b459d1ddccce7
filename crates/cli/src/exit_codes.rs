//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad dates)    |
//! | 3-9     | input            | Files, CSV parsing, settings             |
//! | 10-19   | recon            | State inference and mapping codes        |
//! | 20-29   | fetch            | AGVCH API connector codes                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use gmde_agv_client::RegistryError;
use gmde_recon::{FetchError, ReconError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable dates or target specs.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Cannot read the input file or write the output.
pub const EXIT_IO: u8 = 3;

/// Malformed CSV, missing column, non-numeric code or bad as-of date.
pub const EXIT_PARSE: u8 = 4;

/// settings.toml exists but cannot be read or parsed.
pub const EXIT_CONFIG: u8 = 5;

// =============================================================================
// Recon (10-19)
// =============================================================================

/// No Gemeindestand contains the input codes, even after cleanup.
pub const EXIT_STATE_NOT_FOUND: u8 = 10;

/// A date is not in the state catalog.
pub const EXIT_UNKNOWN_STATE: u8 = 11;

/// The as-of column carries no date at all.
pub const EXIT_NO_STATE_DATES: u8 = 12;

/// `project --strict`: some rows have no code in the newest state.
pub const EXIT_UNRESOLVED: u8 = 13;

// =============================================================================
// Fetch (20-29)
// =============================================================================

/// Connection, TLS or timeout failure.
pub const EXIT_FETCH_NETWORK: u8 = 20;

/// AGVCH answered with a non-success status.
pub const EXIT_FETCH_HTTP: u8 = 21;

/// AGVCH answered with a body that is not the expected CSV.
pub const EXIT_FETCH_PARSE: u8 = 22;

// =============================================================================
// Error mapping
// =============================================================================

pub fn fetch_exit_code(err: &FetchError) -> u8 {
    match err {
        FetchError::Transport(_) => EXIT_FETCH_NETWORK,
        FetchError::Http { .. } => EXIT_FETCH_HTTP,
        FetchError::Parse(_) => EXIT_FETCH_PARSE,
    }
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::StateNotFound { .. } => EXIT_STATE_NOT_FOUND,
        ReconError::InvalidTargetSpec(_) | ReconError::AmbiguousDateRange(_) => EXIT_USAGE,
        ReconError::FetchFailed { source, .. } => fetch_exit_code(source),
        ReconError::NoStateDates => EXIT_NO_STATE_DATES,
        ReconError::Catalog(_) => EXIT_UNKNOWN_STATE,
    }
}

pub fn registry_exit_code(err: &RegistryError) -> u8 {
    match err {
        RegistryError::Setup(_) => EXIT_ERROR,
        RegistryError::Fetch { source, .. } => fetch_exit_code(source),
        RegistryError::Catalog(_) => EXIT_FETCH_PARSE,
    }
}
