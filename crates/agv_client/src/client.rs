//! AGVCH HTTP client.
//!
//! Async reqwest client. Every GET holds a permit from one shared semaphore,
//! which caps in-flight requests no matter how many composer hops or
//! snapshot loads are gathered at once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use gmde_core::{CatalogError, State, StateCatalog, StateDate};
use gmde_recon::{CorrespondenceEdge, CorrespondenceSource, FetchError};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::wire::{parse_correspondences, parse_mutation_dates, parse_snapshot};

pub const DEFAULT_API_BASE: &str = "https://www.agvchapp.bfs.admin.ch/api/communes";
pub const DEFAULT_MAX_REQUESTS: usize = 20;

/// Error type for catalog loading.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The HTTP client could not be built.
    #[error("cannot set up HTTP client: {0}")]
    Setup(String),
    #[error("{what} failed: {source}")]
    Fetch {
        what: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub api_base: String,
    /// Size of the request pool. Zero is treated as one.
    pub max_concurrent_requests: usize,
    pub timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            max_concurrent_requests: DEFAULT_MAX_REQUESTS,
            timeout_secs: 60,
        }
    }
}

/// AGVCH API client. Cheap to clone; clones share the request pool.
#[derive(Clone)]
pub struct AgvClient {
    http: reqwest::Client,
    api_base: String,
    permits: Arc<Semaphore>,
}

impl AgvClient {
    pub fn new(options: ClientOptions) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("gmde/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| RegistryError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(options.max_concurrent_requests.max(1))),
        })
    }

    /// Client against `api_base` with default pool and timeout.
    pub fn with_base_url(api_base: impl Into<String>) -> Result<Self, RegistryError> {
        Self::new(ClientOptions {
            api_base: api_base.into(),
            ..ClientOptions::default()
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Correspondence table between two catalog states, unmodified
    /// municipalities included. One request, no retry.
    pub async fn fetch_correspondences(
        &self,
        origin: StateDate,
        target: StateDate,
    ) -> Result<Vec<CorrespondenceEdge>, FetchError> {
        let url = format!(
            "{}/correspondances?includeUnmodified=true&includeTerritoryExchange=false&startPeriod={origin}&endPeriod={target}",
            self.api_base
        );
        let body = self.get_text(&url).await?;
        parse_correspondences(&body)
    }

    /// Distinct mutation dates between `start` and `end`, ascending.
    pub async fn fetch_mutation_dates(
        &self,
        start: StateDate,
        end: StateDate,
    ) -> Result<Vec<StateDate>, FetchError> {
        let url = format!(
            "{}/mutations?includeTerritoryExchange=false&startPeriod={start}&endPeriod={end}",
            self.api_base
        );
        let body = self.get_text(&url).await?;
        parse_mutation_dates(&body)
    }

    /// The Gemeindestand valid on `date`.
    pub async fn fetch_state(&self, date: StateDate) -> Result<State, FetchError> {
        let url = format!("{}/snapshot?date={date}", self.api_base);
        let body = self.get_text(&url).await?;
        Ok(State::new(date, parse_snapshot(&body)?))
    }

    /// Build the catalog: every mutation date since `start` becomes a
    /// state, each loaded from its snapshot. Snapshots load concurrently.
    pub async fn load_catalog(
        &self,
        start: StateDate,
        end: StateDate,
    ) -> Result<StateCatalog, RegistryError> {
        let dates = self
            .fetch_mutation_dates(start, end)
            .await
            .map_err(|source| RegistryError::Fetch {
                what: "mutation feed".into(),
                source,
            })?;
        log::info!(
            "found {} Gemeindestände since {start}, latest {}",
            dates.len(),
            dates.last().map(ToString::to_string).unwrap_or_default()
        );

        let states = try_join_all(dates.iter().map(|&date| async move {
            self.fetch_state(date)
                .await
                .map_err(|source| RegistryError::Fetch {
                    what: format!("snapshot {date}"),
                    source,
                })
        }))
        .await?;

        Ok(StateCatalog::new(states)?)
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        log::debug!("GET {url}");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}

impl CorrespondenceSource for AgvClient {
    fn fetch(
        &self,
        origin: StateDate,
        target: StateDate,
    ) -> impl Future<Output = Result<Vec<CorrespondenceEdge>, FetchError>> + Send {
        self.fetch_correspondences(origin, target)
    }
}
