//! `gmde states|identify|chain|map|project`

use std::path::PathBuf;

use chrono::Local;
use gmde_agv_client::{AgvClient, ClientOptions};
use gmde_config::Settings;
use gmde_core::{Snapped, StateCatalog, StateDate};
use gmde_recon::chain::{link_cells, CODE_COLUMN_PREFIX};
use gmde_recon::{
    compose, identify_state, map_dataset, project_to_newest, ComposeOptions, MatchMethod,
    TargetSpec,
};
use serde::Serialize;

use crate::exit_codes::EXIT_UNRESOLVED;
use crate::table::{write_csv, Table};
use crate::{ApiArgs, CliError, NameArgs};

/// Unresolved rows listed by number before the message is cut short.
const MAX_LISTED_ROWS: usize = 10;

/// Settings merged with flags, plus the client and runtime they configure.
struct Session {
    settings: Settings,
    client: AgvClient,
    start: StateDate,
    runtime: tokio::runtime::Runtime,
}

impl Session {
    fn open(api: &ApiArgs) -> Result<Self, CliError> {
        let settings = Settings::load().map_err(CliError::config)?;

        let start_raw = api
            .start
            .clone()
            .unwrap_or_else(|| settings.catalog.start_date.clone());
        let start = parse_date(&start_raw, "--start")?;

        let client = AgvClient::new(ClientOptions {
            api_base: api
                .api_base
                .clone()
                .unwrap_or_else(|| settings.api.base_url.clone()),
            max_concurrent_requests: api
                .max_requests
                .unwrap_or(settings.api.max_concurrent_requests),
            timeout_secs: settings.api.timeout_secs,
        })
        .map_err(CliError::registry)?;
        log::debug!("api base {}, catalog from {start}", client.api_base());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::runtime(format!("cannot start async runtime: {e}")))?;

        Ok(Self {
            settings,
            client,
            start,
            runtime,
        })
    }

    /// Every Gemeindestand from `start` until today, fetched fresh.
    fn catalog(&self) -> Result<StateCatalog, CliError> {
        let today = StateDate::new(Local::now().date_naive());
        self.runtime
            .block_on(self.client.load_catalog(self.start, today))
            .map_err(CliError::registry)
    }

    fn compose_options(&self, names: &NameArgs) -> ComposeOptions {
        let with_names = if names.names {
            true
        } else if names.no_names {
            false
        } else {
            self.settings.output.include_names
        };
        ComposeOptions { with_names }
    }
}

fn parse_date(raw: &str, flag: &str) -> Result<StateDate, CliError> {
    raw.parse()
        .map_err(|e| CliError::args(format!("{flag}: {e}")).with_hint("dates are dd-mm-yyyy"))
}

fn parse_target(raw: &str) -> Result<TargetSpec, CliError> {
    TargetSpec::parse(raw).map_err(CliError::recon)
}

fn report_snap(snap: &Snapped) {
    if snap.is_exact() {
        return;
    }
    eprintln!(
        "note: {} is not an official Gemeindestand, using {}",
        snap.requested, snap.date
    );
    if snap.fell_back {
        eprintln!("note: no {:?} state for {}, took the nearest instead", snap.policy, snap.requested);
    }
}

fn to_json(value: &impl Serialize) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::runtime(e.to_string()))
}

// ============================================================================
// states
// ============================================================================

#[derive(Serialize)]
struct StateRow {
    date: StateDate,
    code_count: usize,
}

pub fn cmd_states(api: &ApiArgs, json: bool) -> Result<(), CliError> {
    let session = Session::open(api)?;
    let catalog = session.catalog()?;

    let rows: Vec<StateRow> = catalog
        .states()
        .iter()
        .map(|s| StateRow {
            date: s.date(),
            code_count: s.code_count(),
        })
        .collect();

    if json {
        println!("{}", to_json(&rows)?);
        return Ok(());
    }

    let headers = vec!["gemeindestand".to_string(), "code_count".to_string()];
    write_csv(
        None,
        &headers,
        rows.iter()
            .map(|r| vec![r.date.to_string(), r.code_count.to_string()]),
    )
}

// ============================================================================
// identify
// ============================================================================

pub fn cmd_identify(
    api: &ApiArgs,
    input: PathBuf,
    code_column: String,
    name_column: Option<String>,
    delimiter: char,
    json: bool,
) -> Result<(), CliError> {
    let table = Table::read(&input, delimiter)?;
    let observations = table.observations(&code_column, name_column.as_deref())?;

    let session = Session::open(api)?;
    let catalog = session.catalog()?;
    let found = identify_state(&catalog, &observations).map_err(CliError::recon)?;

    if json {
        println!("{}", to_json(&found)?);
        return Ok(());
    }

    let method = match found.method {
        MatchMethod::CodeCount => "exact code set",
        MatchMethod::BackwardInference => "newest state containing every valid code",
    };
    println!("Gemeindestand: {} ({method})", found.state);

    if let Some(correction) = &found.correction {
        println!("Corrections:");
        for (wrong, real) in correction.iter() {
            if wrong == real {
                println!("  {wrong} -> ? (name not found, check manually)");
            } else {
                println!("  {wrong} -> {real}");
            }
        }
    }
    Ok(())
}

// ============================================================================
// chain
// ============================================================================

pub fn cmd_chain(
    api: &ApiArgs,
    origin: String,
    to: String,
    names: NameArgs,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let origin = parse_date(&origin, "--origin")?;
    let target = parse_target(&to)?;

    let session = Session::open(api)?;
    let catalog = session.catalog()?;
    let options = session.compose_options(&names);
    let composition = session
        .runtime
        .block_on(compose(&catalog, &session.client, origin, &target, options))
        .map_err(CliError::recon)?;

    report_snap(&composition.origin);
    composition.targets.iter().for_each(report_snap);

    let fanout = composition.chain.fanout();
    if !fanout.is_empty() {
        eprintln!(
            "note: {} codes split and appear on several rows",
            fanout.len()
        );
    }

    write_csv(
        output.as_ref(),
        &composition.chain.header(),
        composition.chain.records(),
    )
}

// ============================================================================
// map
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub fn cmd_map(
    api: &ApiArgs,
    input: PathBuf,
    code_column: String,
    name_column: Option<String>,
    origin: Option<String>,
    to: Option<String>,
    names: NameArgs,
    delimiter: char,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let origin = origin.map(|o| parse_date(&o, "--origin")).transpose()?;
    let target = to.map(|t| parse_target(&t)).transpose()?;

    let table = Table::read(&input, delimiter)?;
    let observations = table.observations(&code_column, name_column.as_deref())?;

    let session = Session::open(api)?;
    let catalog = session.catalog()?;
    let options = session.compose_options(&names);
    let mapping = session
        .runtime
        .block_on(map_dataset(
            &catalog,
            &session.client,
            &observations,
            origin,
            target.as_ref(),
            options,
        ))
        .map_err(CliError::recon)?;

    if let Some(found) = &mapping.identified {
        eprintln!("note: input identified as Gemeindestand {}", found.state);
    }
    if let Some(snap) = &mapping.origin_snap {
        report_snap(snap);
    }
    mapping.composition.targets.iter().for_each(report_snap);
    if let Some(correction) = &mapping.correction {
        for (wrong, real) in correction.iter().filter(|(w, r)| w != r) {
            eprintln!("note: corrected code {wrong} to {real}");
        }
        let unresolved = correction.unresolved();
        if !unresolved.is_empty() {
            eprintln!("warning: unknown codes without a matching name: {unresolved:?}");
        }
    }
    let unmatched = mapping.unmatched().count();
    if unmatched > 0 {
        eprintln!("warning: {unmatched} rows have no code in Gemeindestand {}", mapping.origin);
    }

    let with_names = mapping.composition.chain.with_names();
    let mut headers = table.headers.clone();
    headers.push(format!("{CODE_COLUMN_PREFIX}_{}", mapping.origin));
    headers.extend(mapping.link_header());

    let rows = mapping.rows.iter().map(|r| {
        let mut row = table.rows[r.source].clone();
        row.push(r.code.to_string());
        row.extend(link_cells(&r.links, with_names));
        row
    });
    write_csv(output.as_ref(), &headers, rows)
}

// ============================================================================
// project
// ============================================================================

pub fn cmd_project(
    api: &ApiArgs,
    input: PathBuf,
    code_column: String,
    as_of_column: String,
    delimiter: char,
    strict: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let table = Table::read(&input, delimiter)?;
    let rows = table.stamped_codes(&code_column, &as_of_column)?;

    let session = Session::open(api)?;
    let projection = session
        .runtime
        .block_on(project_to_newest(&session.client, &rows))
        .map_err(CliError::recon)?;

    let mut headers = table.headers.clone();
    headers.push(format!("{CODE_COLUMN_PREFIX}_{}", projection.newest));
    let out_rows = projection.rows.iter().map(|r| {
        let mut row = table.rows[r.source].clone();
        row.push(r.projected.map(|c| c.to_string()).unwrap_or_default());
        row
    });
    write_csv(output.as_ref(), &headers, out_rows)?;

    let unresolved: Vec<usize> = projection.unresolved().map(|r| r.source + 2).collect();
    if unresolved.is_empty() {
        return Ok(());
    }

    let listed: Vec<String> = unresolved
        .iter()
        .take(MAX_LISTED_ROWS)
        .map(ToString::to_string)
        .collect();
    let more = if unresolved.len() > MAX_LISTED_ROWS { ", ..." } else { "" };
    let message = format!(
        "{} rows could not be projected onto {} (lines {}{more})",
        unresolved.len(),
        projection.newest,
        listed.join(", ")
    );

    if strict {
        return Err(CliError {
            code: EXIT_UNRESOLVED,
            message,
            hint: Some("codes may be deleted, or the as-of date may be wrong".to_string()),
        });
    }
    eprintln!("warning: {message}");
    Ok(())
}
