//! Raffle selection engine: draw-without-replacement pool, provider lookup
//! normalization, and the async controller the UI renders from.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use mmr_adapters::{
    AdapterError, CatalogSource, FixtureCatalogSource, FixtureProviderLookup, ProviderLookup,
    TmdbCatalogKind, TmdbCatalogSource, TmdbImages, TmdbProviderLookup, DEFAULT_WATCH_REGION,
    TMDB_API_BASE, TMDB_IMAGE_BASE, TMDB_LOGO_BASE,
};
use mmr_core::{Catalog, Movie, MovieId, WatchAvailability};
use mmr_http::{HttpClientConfig, HttpFetcher, TokenBucketConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const CRATE_NAME: &str = "mmr-raffle";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaffleError {
    #[error("cannot raffle from an empty catalog")]
    EmptyCatalog,
    #[error("raffle is not ready: {0}")]
    InvalidState(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolDraw {
    Drawn(Movie),
    /// The pool was empty and has been refilled; nothing was drawn.
    Restarted,
}

/// Movies not yet drawn in the current cycle, as indices into the catalog.
#[derive(Debug)]
pub struct RafflePool<R = StdRng> {
    catalog: Arc<Catalog>,
    remaining: Vec<usize>,
    rng: R,
}

impl RafflePool<StdRng> {
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Result<Self, RaffleError> {
        Self::with_rng(catalog, StdRng::from_os_rng())
    }
}

impl<R: Rng> RafflePool<R> {
    pub fn with_rng(catalog: impl Into<Arc<Catalog>>, rng: R) -> Result<Self, RaffleError> {
        let catalog = catalog.into();
        if catalog.is_empty() {
            return Err(RaffleError::EmptyCatalog);
        }
        let remaining = (0..catalog.len()).collect();
        Ok(Self {
            catalog,
            remaining,
            rng,
        })
    }

    /// Removes one uniformly chosen movie, or refills the pool when it is empty.
    pub fn draw(&mut self) -> PoolDraw {
        if self.remaining.is_empty() {
            self.reset();
            return PoolDraw::Restarted;
        }
        let pick = self.rng.random_range(0..self.remaining.len());
        // Vec::remove keeps the rest of the pool in order without gaps.
        let catalog_idx = self.remaining.remove(pick);
        PoolDraw::Drawn(self.catalog.movies()[catalog_idx].clone())
    }

    pub fn reset(&mut self) {
        self.remaining = (0..self.catalog.len()).collect();
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    #[cfg(test)]
    fn remaining_ids(&self) -> Vec<MovieId> {
        self.remaining
            .iter()
            .filter_map(|idx| self.catalog.get(*idx))
            .map(|m| m.id)
            .collect()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Provider lookup state for the current selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Pending,
    Ready { availability: WatchAvailability },
    Empty,
    Failed { reason: String },
}

impl AvailabilityStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, AvailabilityStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AvailabilityStatus::Pending => "pending",
            AvailabilityStatus::Ready { .. } => "ready",
            AvailabilityStatus::Empty => "empty",
            AvailabilityStatus::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub draw_seq: u64,
    pub movie: Movie,
    pub status: AvailabilityStatus,
}

/// What the raffle modal currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RaffleView {
    #[default]
    Idle,
    Selection(SelectionResult),
    RestartNotice { catalog_size: usize },
}

impl RaffleView {
    pub fn selection(&self) -> Option<&SelectionResult> {
        match self {
            RaffleView::Selection(selection) => Some(selection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket {
    pub draw_seq: u64,
    pub movie_id: MovieId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Selected(LookupTicket),
    PoolExhaustedRestart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupApplied {
    Applied,
    /// A newer draw (or a dismiss) superseded the selection this lookup was for.
    Discarded,
}

/// Per-session raffle state: the pool plus the selection the UI renders.
#[derive(Debug)]
pub struct RaffleSession<R = StdRng> {
    pool: Option<RafflePool<R>>,
    last_seq: u64,
    view: RaffleView,
}

impl<R> Default for RaffleSession<R> {
    fn default() -> Self {
        Self {
            pool: None,
            last_seq: 0,
            view: RaffleView::Idle,
        }
    }
}

impl RaffleSession<StdRng> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, catalog: impl Into<Arc<Catalog>>) -> Result<(), RaffleError> {
        self.initialize_with_rng(catalog, StdRng::from_os_rng())
    }
}

impl<R: Rng> RaffleSession<R> {
    /// Replaces the catalog and refills the pool. The current view is cleared.
    pub fn initialize_with_rng(
        &mut self,
        catalog: impl Into<Arc<Catalog>>,
        rng: R,
    ) -> Result<(), RaffleError> {
        let pool = RafflePool::with_rng(catalog, rng)?;
        info!(catalog_size = pool.catalog().len(), "raffle initialized");
        self.pool = Some(pool);
        self.view = RaffleView::Idle;
        Ok(())
    }

    pub fn draw(&mut self) -> Result<DrawOutcome, RaffleError> {
        let pool = self
            .pool
            .as_mut()
            .ok_or(RaffleError::InvalidState("draw called before initialize"))?;
        self.last_seq += 1;
        let draw_seq = self.last_seq;

        match pool.draw() {
            PoolDraw::Drawn(movie) => {
                debug!(draw_seq, movie_id = movie.id, remaining = pool.remaining(), "movie drawn");
                let ticket = LookupTicket {
                    draw_seq,
                    movie_id: movie.id,
                };
                self.view = RaffleView::Selection(SelectionResult {
                    draw_seq,
                    movie,
                    status: AvailabilityStatus::Pending,
                });
                Ok(DrawOutcome::Selected(ticket))
            }
            PoolDraw::Restarted => {
                let catalog_size = pool.catalog().len();
                info!(draw_seq, catalog_size, "raffle pool exhausted, restarting");
                self.view = RaffleView::RestartNotice { catalog_size };
                Ok(DrawOutcome::PoolExhaustedRestart)
            }
        }
    }

    /// Applies a finished lookup if its draw is still the one on screen.
    pub fn resolve(&mut self, draw_seq: u64, status: AvailabilityStatus) -> LookupApplied {
        match &mut self.view {
            RaffleView::Selection(selection)
                if selection.draw_seq == draw_seq && selection.status.is_pending() =>
            {
                selection.status = status;
                LookupApplied::Applied
            }
            _ => {
                debug!(draw_seq, latest = self.last_seq, "discarding stale provider lookup");
                LookupApplied::Discarded
            }
        }
    }

    pub fn reset(&mut self) -> Result<(), RaffleError> {
        let pool = self
            .pool
            .as_mut()
            .ok_or(RaffleError::InvalidState("reset called before initialize"))?;
        pool.reset();
        Ok(())
    }

    pub fn dismiss(&mut self) {
        self.view = RaffleView::Idle;
    }
}

impl<R> RaffleSession<R> {
    pub fn view(&self) -> &RaffleView {
        &self.view
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.is_some()
    }

    pub fn remaining(&self) -> Option<usize> {
        self.pool.as_ref().map(|p| p.remaining.len())
    }

    pub fn catalog_size(&self) -> Option<usize> {
        self.pool.as_ref().map(|p| p.catalog.len())
    }
}

/// Maps a provider lookup result onto the status shown with the selection.
pub fn availability_status(
    result: Result<Option<WatchAvailability>, AdapterError>,
) -> AvailabilityStatus {
    match result {
        Ok(Some(availability)) if !availability.is_empty() => {
            AvailabilityStatus::Ready { availability }
        }
        Ok(_) => AvailabilityStatus::Empty,
        Err(err) => AvailabilityStatus::Failed {
            reason: err.to_string(),
        },
    }
}

/// One lookup attempt per call; every failure path resolves to a status.
#[derive(Clone)]
pub struct ProviderLookupAdapter {
    lookup: Arc<dyn ProviderLookup>,
}

impl fmt::Debug for ProviderLookupAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderLookupAdapter")
            .field("region", &self.lookup.region())
            .finish_non_exhaustive()
    }
}

impl ProviderLookupAdapter {
    pub fn new(lookup: Arc<dyn ProviderLookup>) -> Self {
        Self { lookup }
    }

    pub fn region(&self) -> &str {
        self.lookup.region()
    }

    pub async fn lookup(&self, movie_id: MovieId) -> AvailabilityStatus {
        let lookup = Arc::clone(&self.lookup);
        let joined = tokio::spawn(async move { lookup.fetch_availability(movie_id).await }).await;
        match joined {
            Ok(result) => {
                if let Err(err) = &result {
                    warn!(movie_id, %err, "provider lookup failed");
                }
                availability_status(result)
            }
            Err(err) => {
                error!(movie_id, %err, "provider lookup task aborted");
                AvailabilityStatus::Failed {
                    reason: "provider lookup aborted".to_string(),
                }
            }
        }
    }
}

/// Handle for one draw; the lookup keeps running if this is dropped.
#[derive(Debug)]
pub struct DrawTicket {
    pub outcome: DrawOutcome,
    lookup: Option<JoinHandle<LookupApplied>>,
}

impl DrawTicket {
    /// Waits for the provider lookup of this draw. `None` for restarts.
    pub async fn settled(self) -> Option<LookupApplied> {
        match self.lookup {
            Some(handle) => Some(handle.await.unwrap_or(LookupApplied::Discarded)),
            None => None,
        }
    }
}

/// Owns the session for one user and publishes every view change.
#[derive(Clone)]
pub struct RaffleController {
    session: Arc<Mutex<RaffleSession>>,
    lookup: ProviderLookupAdapter,
    updates: Arc<watch::Sender<RaffleView>>,
}

impl fmt::Debug for RaffleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaffleController")
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}

impl RaffleController {
    pub fn new(lookup: Arc<dyn ProviderLookup>) -> Self {
        let (updates, _) = watch::channel(RaffleView::Idle);
        Self {
            session: Arc::new(Mutex::new(RaffleSession::new())),
            lookup: ProviderLookupAdapter::new(lookup),
            updates: Arc::new(updates),
        }
    }

    pub async fn initialize(&self, catalog: impl Into<Arc<Catalog>>) -> Result<(), RaffleError> {
        self.initialize_with_rng(catalog, StdRng::from_os_rng()).await
    }

    pub async fn initialize_with_rng(
        &self,
        catalog: impl Into<Arc<Catalog>>,
        rng: StdRng,
    ) -> Result<(), RaffleError> {
        let mut session = self.session.lock().await;
        session.initialize_with_rng(catalog, rng)?;
        self.updates.send_replace(session.view().clone());
        Ok(())
    }

    /// Mutates the pool under the session lock, then looks providers up off-lock.
    pub async fn draw(&self) -> Result<DrawTicket, RaffleError> {
        let outcome = {
            let mut session = self.session.lock().await;
            let outcome = session.draw()?;
            self.updates.send_replace(session.view().clone());
            outcome
        };
        let lookup = match outcome {
            DrawOutcome::Selected(ticket) => Some(self.spawn_lookup(ticket)),
            DrawOutcome::PoolExhaustedRestart => None,
        };
        Ok(DrawTicket { outcome, lookup })
    }

    fn spawn_lookup(&self, ticket: LookupTicket) -> JoinHandle<LookupApplied> {
        let session = Arc::clone(&self.session);
        let updates = Arc::clone(&self.updates);
        let lookup = self.lookup.clone();
        tokio::spawn(async move {
            let status = lookup.lookup(ticket.movie_id).await;
            let mut session = session.lock().await;
            let applied = session.resolve(ticket.draw_seq, status);
            if applied == LookupApplied::Applied {
                updates.send_replace(session.view().clone());
            }
            applied
        })
    }

    pub async fn reset(&self) -> Result<(), RaffleError> {
        self.session.lock().await.reset()
    }

    pub async fn dismiss(&self) {
        let mut session = self.session.lock().await;
        session.dismiss();
        self.updates.send_replace(session.view().clone());
    }

    pub async fn view(&self) -> RaffleView {
        self.session.lock().await.view().clone()
    }

    pub async fn remaining(&self) -> Option<usize> {
        self.session.lock().await.remaining()
    }

    pub async fn catalog_size(&self) -> Option<usize> {
        self.session.lock().await.catalog_size()
    }

    pub async fn is_initialized(&self) -> bool {
        self.session.lock().await.is_initialized()
    }

    pub fn subscribe(&self) -> watch::Receiver<RaffleView> {
        self.updates.subscribe()
    }

    pub fn region(&self) -> &str {
        self.lookup.region()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSelector {
    Popular,
    List(u64),
    Fixture(PathBuf),
}

impl FromStr for CatalogSelector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("popular") {
            return Ok(CatalogSelector::Popular);
        }
        if let Some(id) = s.strip_prefix("list:") {
            let id = id
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid TMDB list id in catalog selector {s:?}"))?;
            return Ok(CatalogSelector::List(id));
        }
        if let Some(path) = s.strip_prefix("fixture:") {
            return Ok(CatalogSelector::Fixture(PathBuf::from(path.trim())));
        }
        bail!("unknown catalog selector {s:?}; expected popular, list:<id> or fixture:<path>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelector {
    Tmdb,
    Fixture(PathBuf),
}

impl FromStr for ProviderSelector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("tmdb") {
            return Ok(ProviderSelector::Tmdb);
        }
        if let Some(path) = s.strip_prefix("fixture:") {
            return Ok(ProviderSelector::Fixture(PathBuf::from(path.trim())));
        }
        bail!("unknown provider selector {s:?}; expected tmdb or fixture:<path>")
    }
}

#[derive(Debug, Clone)]
pub struct MmrConfig {
    pub tmdb_api_key: Option<String>,
    pub tmdb_api_base: String,
    pub tmdb_image_base: String,
    pub tmdb_logo_base: String,
    pub watch_region: String,
    pub catalog: CatalogSelector,
    pub providers: ProviderSelector,
    pub catalog_max_pages: u32,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub web_port: u16,
    pub workspace_root: PathBuf,
}

impl Default for MmrConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_api_base: TMDB_API_BASE.to_string(),
            tmdb_image_base: TMDB_IMAGE_BASE.to_string(),
            tmdb_logo_base: TMDB_LOGO_BASE.to_string(),
            watch_region: DEFAULT_WATCH_REGION.to_string(),
            catalog: CatalogSelector::Popular,
            providers: ProviderSelector::Tmdb,
            catalog_max_pages: 5,
            http_timeout_secs: 20,
            user_agent: "mmr-bot/0.1".to_string(),
            web_port: 8000,
            workspace_root: PathBuf::from("."),
        }
    }
}

/// `mmr.yaml` layout; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MmrConfigFile {
    tmdb_api_key: Option<String>,
    tmdb_api_base: Option<String>,
    tmdb_image_base: Option<String>,
    tmdb_logo_base: Option<String>,
    watch_region: Option<String>,
    catalog: Option<String>,
    providers: Option<String>,
    catalog_max_pages: Option<u32>,
    http_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    web_port: Option<u16>,
}

pub const CONFIG_FILE_NAME: &str = "mmr.yaml";
pub const ENV_CONFIG_PATH: &str = "MMR_CONFIG";

impl MmrConfig {
    /// Defaults, then `mmr.yaml` (or `$MMR_CONFIG`), then environment variables.
    pub fn load(workspace_root: impl Into<PathBuf>) -> Result<Self> {
        let workspace_root = workspace_root.into();
        let mut config = Self {
            workspace_root: workspace_root.clone(),
            ..Self::default()
        };

        match std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from) {
            Some(path) => config.apply_yaml_file(&path)?,
            None => {
                let path = workspace_root.join(CONFIG_FILE_NAME);
                if path.exists() {
                    config.apply_yaml_file(&path)?;
                }
            }
        }

        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_yaml_file(&mut self, path: &Path) -> Result<()> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        self.apply_yaml_str(&yaml)
            .with_context(|| format!("parsing {}", path.display()))
    }

    pub fn apply_yaml_str(&mut self, yaml: &str) -> Result<()> {
        let file: MmrConfigFile = serde_yaml::from_str(yaml)?;
        let mut values = HashMap::new();
        let mut put = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                values.insert(key, value);
            }
        };
        put("TMDB_API_KEY", file.tmdb_api_key);
        put("TMDB_API_BASE", file.tmdb_api_base);
        put("TMDB_IMAGE_BASE", file.tmdb_image_base);
        put("TMDB_LOGO_BASE", file.tmdb_logo_base);
        put("MMR_WATCH_REGION", file.watch_region);
        put("MMR_CATALOG", file.catalog);
        put("MMR_PROVIDERS", file.providers);
        put("MMR_CATALOG_MAX_PAGES", file.catalog_max_pages.map(|v| v.to_string()));
        put("MMR_HTTP_TIMEOUT_SECS", file.http_timeout_secs.map(|v| v.to_string()));
        put("MMR_USER_AGENT", file.user_agent);
        put("MMR_WEB_PORT", file.web_port.map(|v| v.to_string()));
        self.apply_env_with(|key| values.get(key).cloned())
    }

    /// Applies `KEY=value` overrides from `lookup`; blank values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TMDB_API_KEY") {
            self.tmdb_api_key = Some(v.trim().to_string());
        }
        if let Some(v) = get("TMDB_API_BASE") {
            self.tmdb_api_base = v;
        }
        if let Some(v) = get("TMDB_IMAGE_BASE") {
            self.tmdb_image_base = v;
        }
        if let Some(v) = get("TMDB_LOGO_BASE") {
            self.tmdb_logo_base = v;
        }
        if let Some(v) = get("MMR_WATCH_REGION") {
            self.watch_region = v.trim().to_ascii_uppercase();
        }
        if let Some(v) = get("MMR_CATALOG") {
            self.catalog = v.parse()?;
        }
        if let Some(v) = get("MMR_PROVIDERS") {
            self.providers = v.parse()?;
        }
        if let Some(v) = get("MMR_CATALOG_MAX_PAGES") {
            self.catalog_max_pages = v
                .trim()
                .parse()
                .with_context(|| format!("MMR_CATALOG_MAX_PAGES={v:?} is not a page count"))?;
        }
        if let Some(v) = get("MMR_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("MMR_HTTP_TIMEOUT_SECS={v:?} is not a number of seconds"))?;
        }
        if let Some(v) = get("MMR_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = get("MMR_WEB_PORT") {
            self.web_port = v
                .trim()
                .parse()
                .with_context(|| format!("MMR_WEB_PORT={v:?} is not a port"))?;
        }
        Ok(())
    }

    /// Relative fixture paths are resolved against the workspace root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: Duration::from_secs(self.http_timeout_secs.max(1)),
            user_agent: Some(self.user_agent.clone()),
            bearer_token: self.tmdb_api_key.clone(),
            global_concurrency: 8,
            token_bucket: Some(TokenBucketConfig {
                capacity: 40,
                refill_every: Duration::from_millis(25),
            }),
        }
    }

    pub fn images(&self) -> TmdbImages {
        TmdbImages {
            poster_base: self.tmdb_image_base.clone(),
            logo_base: self.tmdb_logo_base.clone(),
        }
    }

    fn tmdb_fetcher(&self, purpose: &str) -> Result<HttpFetcher> {
        if self.tmdb_api_key.is_none() {
            bail!("TMDB_API_KEY is required for the TMDB {purpose}");
        }
        HttpFetcher::new(self.http_client_config())
    }

    pub fn catalog_source(&self) -> Result<Arc<dyn CatalogSource>> {
        let source: Arc<dyn CatalogSource> = match &self.catalog {
            CatalogSelector::Popular => Arc::new(TmdbCatalogSource::new(
                self.tmdb_fetcher("popular catalog")?,
                self.tmdb_api_base.clone(),
                TmdbCatalogKind::Popular,
                self.catalog_max_pages,
            )),
            CatalogSelector::List(id) => Arc::new(TmdbCatalogSource::new(
                self.tmdb_fetcher("list catalog")?,
                self.tmdb_api_base.clone(),
                TmdbCatalogKind::List(*id),
                self.catalog_max_pages,
            )),
            CatalogSelector::Fixture(path) => {
                Arc::new(FixtureCatalogSource::new(self.resolve_path(path)))
            }
        };
        Ok(source)
    }

    pub fn provider_lookup(&self) -> Result<Arc<dyn ProviderLookup>> {
        let lookup: Arc<dyn ProviderLookup> = match &self.providers {
            ProviderSelector::Tmdb => Arc::new(TmdbProviderLookup::new(
                self.tmdb_fetcher("provider lookup")?,
                self.tmdb_api_base.clone(),
                self.watch_region.clone(),
            )),
            ProviderSelector::Fixture(path) => Arc::new(FixtureProviderLookup::new(
                self.resolve_path(path),
                self.watch_region.clone(),
            )),
        };
        Ok(lookup)
    }
}
