// gmde CLI - Gemeindestand inference and BFS code mapping
// Talks to the BFS AGVCH commune API; every run loads a fresh state catalog.

mod commands;
mod exit_codes;
mod table;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gmde_agv_client::RegistryError;
use gmde_recon::ReconError;

use exit_codes::{
    registry_exit_code, recon_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_IO, EXIT_PARSE,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "gmde")]
#[command(about = "Find the Gemeindestand of BFS municipality codes and map them across time")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command that talks to the API.
#[derive(Args, Debug, Clone, Default)]
pub struct ApiArgs {
    /// AGVCH commune API base URL (overrides settings.toml)
    #[arg(long, env = "GMDE_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Maximum concurrent requests to the API
    #[arg(long, global = true)]
    pub max_requests: Option<usize>,

    /// First day of the mutation feed (dd-mm-yyyy)
    #[arg(long, value_name = "DATE", global = true)]
    pub start: Option<String>,
}

/// Name column switches. Without either flag, settings.toml decides.
#[derive(Args, Debug, Clone, Default)]
pub struct NameArgs {
    /// Include bfs_gmde_name_* columns
    #[arg(long, overrides_with = "no_names")]
    pub names: bool,

    /// Leave out bfs_gmde_name_* columns
    #[arg(long, overrides_with = "names")]
    pub no_names: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every official Gemeindestand with its municipality count
    #[command(after_help = "\
Examples:
  gmde states
  gmde states --start 01-01-2000 --json")]
    States {
        /// Output JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Infer the Gemeindestand a column of BFS codes was recorded in
    #[command(after_help = "\
Examples:
  gmde identify survey.csv --code-column gmde_nr
  gmde identify survey.csv --code-column gmde_nr --name-column gemeinde --json")]
    Identify {
        /// Input CSV file (with headers)
        input: PathBuf,

        /// Column holding BFS codes
        #[arg(long)]
        code_column: String,

        /// Column holding municipality names, used to repair unknown codes
        #[arg(long)]
        name_column: Option<String>,

        /// CSV delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Write the code correspondence chain between Gemeindestände
    #[command(after_help = "\
Examples:
  gmde chain --origin 01-01-2010 --to 01-01-2024
  gmde chain --origin 01-01-2010 --to 01-01-2015,01-01-2020,01-01-2024 -o chain.csv
  gmde chain --origin 01-01-2010 --to 01-01-2015..01-01-2024 --no-names")]
    Chain {
        /// Origin Gemeindestand (snapped to the nearest earlier state)
        #[arg(long)]
        origin: String,

        /// Target: DATE, DATE,DATE,... or START..END
        #[arg(long)]
        to: String,

        #[command(flatten)]
        names: NameArgs,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Append mapped codes to every row of a dataset
    #[command(after_help = "\
Examples:
  gmde map survey.csv --code-column gmde_nr
  gmde map survey.csv --code-column gmde_nr --name-column gemeinde --to 01-01-2024 -o mapped.csv
  gmde map survey.csv --code-column gmde_nr --origin 01-01-2010 --to 01-01-2015..01-01-2024")]
    Map {
        /// Input CSV file (with headers)
        input: PathBuf,

        /// Column holding BFS codes
        #[arg(long)]
        code_column: String,

        /// Column holding municipality names, used to repair unknown codes
        #[arg(long)]
        name_column: Option<String>,

        /// Gemeindestand of the input (inferred when omitted)
        #[arg(long)]
        origin: Option<String>,

        /// Target: DATE, DATE,DATE,... or START..END (default: newest state)
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        names: NameArgs,

        /// CSV delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Bring rows recorded in different Gemeindestände onto the newest one
    #[command(after_help = "\
Examples:
  gmde project panel.csv --code-column gmde_nr --as-of-column stand
  gmde project panel.csv --code-column gmde_nr --as-of-column stand --strict -o current.csv")]
    Project {
        /// Input CSV file (with headers)
        input: PathBuf,

        /// Column holding BFS codes
        #[arg(long)]
        code_column: String,

        /// Column holding each row's Gemeindestand (dd-mm-yyyy or dd.mm.yyyy)
        #[arg(long)]
        as_of_column: String,

        /// CSV delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Exit non-zero when a row cannot be projected
        #[arg(long)]
        strict: bool,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let api = cli.api;

    let result = match cli.command {
        Commands::States { json } => commands::cmd_states(&api, json),
        Commands::Identify {
            input,
            code_column,
            name_column,
            delimiter,
            json,
        } => commands::cmd_identify(&api, input, code_column, name_column, delimiter, json),
        Commands::Chain {
            origin,
            to,
            names,
            output,
        } => commands::cmd_chain(&api, origin, to, names, output),
        Commands::Map {
            input,
            code_column,
            name_column,
            origin,
            to,
            names,
            delimiter,
            output,
        } => commands::cmd_map(
            &api, input, code_column, name_column, origin, to, names, delimiter, output,
        ),
        Commands::Project {
            input,
            code_column,
            as_of_column,
            delimiter,
            strict,
            output,
        } => commands::cmd_project(&api, input, code_column, as_of_column, delimiter, strict, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Library crates log through `log`; render those records on stderr.
/// `RUST_LOG` picks the level, default `warn`.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn config(err: gmde_config::ConfigError) -> Self {
        Self {
            code: EXIT_CONFIG,
            message: err.to_string(),
            hint: Some(format!("check {}", gmde_config::Settings::config_path_display())),
        }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with proper exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::StateNotFound { .. } => {
                Some("codes from several Gemeindestände are mixed; try `gmde project` with an as-of column".to_string())
            }
            ReconError::InvalidTargetSpec(_) | ReconError::AmbiguousDateRange(_) => {
                Some("use DATE, DATE,DATE,... or START..END with dates as dd-mm-yyyy".to_string())
            }
            ReconError::FetchFailed { .. } => {
                Some("the AGVCH API may be unavailable; check --api-base".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Create error from a catalog loading error with proper exit code.
    pub fn registry(err: RegistryError) -> Self {
        let code = registry_exit_code(&err);
        Self { code, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
