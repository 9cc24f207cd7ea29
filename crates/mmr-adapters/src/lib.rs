//! Catalog and watch-provider source contracts + TMDB and fixture implementations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use mmr_core::{
    clamp_rating, normalize_providers, Catalog, Movie, MovieId, Provider, WatchAvailability,
};
use mmr_http::{FetchError, HttpFetcher};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

pub const CRATE_NAME: &str = "mmr-adapters";

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
pub const TMDB_LOGO_BASE: &str = "https://image.tmdb.org/t/p/original";
pub const DEFAULT_WATCH_REGION: &str = "BR";
pub const PLACEHOLDER_POSTER: &str = "/placeholder.svg?height=400&width=300";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Supplies the full, de-duplicated movie list for a session.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch_catalog(&self) -> Result<Catalog, AdapterError>;
}

/// Looks up where one movie can be watched in a single region.
///
/// `Ok(None)` means the upstream had nothing for this movie (region absent or a
/// non-success status); `Err` is reserved for transport and decoding faults.
#[async_trait]
pub trait ProviderLookup: Send + Sync {
    fn region(&self) -> &str;

    async fn fetch_availability(
        &self,
        movie_id: MovieId,
    ) -> Result<Option<WatchAvailability>, AdapterError>;
}

/// Movie entry as TMDB sends it in `/movie/popular` results and list items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: Option<MovieId>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
}

impl TmdbMovie {
    /// `None` when the entry lacks an id or a non-blank title.
    pub fn into_movie(self) -> Option<Movie> {
        let id = self.id?;
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        Some(Movie {
            id,
            title,
            poster_path: self.poster_path.filter(|p| !p.trim().is_empty()),
            release_date: self.release_date.as_deref().and_then(parse_release_date),
            vote_average: clamp_rating(self.vote_average.unwrap_or_default()),
        })
    }
}

pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// One page of a TMDB movie listing. Lists name the array `items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(default, alias = "items")]
    pub results: Vec<JsonValue>,
}

fn first_page() -> u32 {
    1
}

impl TmdbPage {
    /// Normalizes entries, dropping nulls, malformed objects and untitled entries.
    pub fn movies(&self) -> Vec<Movie> {
        let mut out = Vec::with_capacity(self.results.len());
        for (idx, raw) in self.results.iter().enumerate() {
            let parsed = match serde_json::from_value::<Option<TmdbMovie>>(raw.clone()) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(page = self.page, idx, %err, "skipping malformed catalog entry");
                    continue;
                }
            };
            match parsed.and_then(TmdbMovie::into_movie) {
                Some(movie) => out.push(movie),
                None => warn!(page = self.page, idx, "skipping catalog entry without id or title"),
            }
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbProvider {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_path: Option<String>,
    pub display_priority: Option<i64>,
}

impl From<TmdbProvider> for Provider {
    fn from(p: TmdbProvider) -> Self {
        Provider {
            provider_id: p.provider_id,
            provider_name: p.provider_name,
            logo_path: p.logo_path,
            display_priority: p.display_priority,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbRegionProviders {
    pub link: Option<String>,
    pub flatrate: Option<Vec<TmdbProvider>>,
    pub rent: Option<Vec<TmdbProvider>>,
    pub buy: Option<Vec<TmdbProvider>>,
}

impl From<TmdbRegionProviders> for WatchAvailability {
    fn from(r: TmdbRegionProviders) -> Self {
        let convert = |list: Option<Vec<TmdbProvider>>| {
            list.and_then(|l| normalize_providers(l.into_iter().map(Provider::from).collect()))
        };
        WatchAvailability {
            link: r.link,
            streaming: convert(r.flatrate),
            rent: convert(r.rent),
            buy: convert(r.buy),
        }
    }
}

/// Body of `/movie/{id}/watch/providers`, keyed by ISO 3166-1 region code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchProvidersResponse {
    pub id: Option<MovieId>,
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

impl WatchProvidersResponse {
    pub fn into_region(mut self, region: &str) -> Option<WatchAvailability> {
        self.results
            .remove(&region.to_ascii_uppercase())
            .map(WatchAvailability::from)
    }
}

/// Resolves TMDB image paths to absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmdbImages {
    pub poster_base: String,
    pub logo_base: String,
}

impl Default for TmdbImages {
    fn default() -> Self {
        Self {
            poster_base: TMDB_IMAGE_BASE.to_string(),
            logo_base: TMDB_LOGO_BASE.to_string(),
        }
    }
}

impl TmdbImages {
    /// Poster URL, or the placeholder poster when the path is missing.
    pub fn poster_url(&self, poster_path: Option<&str>) -> String {
        match poster_path.filter(|p| !p.is_empty()) {
            Some(path) => format!("{}{}", self.poster_base.trim_end_matches('/'), path),
            None => PLACEHOLDER_POSTER.to_string(),
        }
    }

    pub fn logo_url(&self, logo_path: Option<&str>) -> Option<String> {
        logo_path
            .filter(|p| !p.is_empty())
            .map(|path| format!("{}{}", self.logo_base.trim_end_matches('/'), path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmdbCatalogKind {
    Popular,
    /// A user-curated v3 list.
    List(u64),
}

impl TmdbCatalogKind {
    fn page_url(&self, api_base: &str, page: u32) -> String {
        let base = api_base.trim_end_matches('/');
        match self {
            TmdbCatalogKind::Popular => format!("{base}/movie/popular?page={page}"),
            TmdbCatalogKind::List(id) => format!("{base}/list/{id}?page={page}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TmdbCatalogSource {
    http: HttpFetcher,
    api_base: String,
    kind: TmdbCatalogKind,
    max_pages: u32,
}

impl TmdbCatalogSource {
    pub fn new(http: HttpFetcher, api_base: impl Into<String>, kind: TmdbCatalogKind, max_pages: u32) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            kind,
            max_pages: max_pages.max(1),
        }
    }
}

#[async_trait]
impl CatalogSource for TmdbCatalogSource {
    fn source_id(&self) -> &str {
        match self.kind {
            TmdbCatalogKind::Popular => "tmdb-popular",
            TmdbCatalogKind::List(_) => "tmdb-list",
        }
    }

    async fn fetch_catalog(&self) -> Result<Catalog, AdapterError> {
        let mut movies = Vec::new();
        let mut page = 1;
        loop {
            let url = self.kind.page_url(&self.api_base, page);
            let body: TmdbPage = self.http.get_json(&url).await?;
            movies.extend(body.movies());
            debug!(page, total_pages = body.total_pages, "catalog page fetched");
            if page >= body.total_pages || page >= self.max_pages {
                break;
            }
            page += 1;
        }
        Ok(Catalog::from_movies(movies))
    }
}

#[derive(Debug, Clone)]
pub struct TmdbProviderLookup {
    http: HttpFetcher,
    api_base: String,
    region: String,
}

impl TmdbProviderLookup {
    pub fn new(http: HttpFetcher, api_base: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            region: region.into().to_ascii_uppercase(),
        }
    }
}

#[async_trait]
impl ProviderLookup for TmdbProviderLookup {
    fn region(&self) -> &str {
        &self.region
    }

    async fn fetch_availability(
        &self,
        movie_id: MovieId,
    ) -> Result<Option<WatchAvailability>, AdapterError> {
        let url = format!(
            "{}/movie/{movie_id}/watch/providers",
            self.api_base.trim_end_matches('/')
        );
        match self.http.get_json::<WatchProvidersResponse>(&url).await {
            Ok(body) => Ok(body.into_region(&self.region)),
            Err(err) if err.is_http_status() => {
                warn!(movie_id, status = ?err.status(), "watch providers unavailable");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Catalog fixture: TMDB listing pages captured to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFixture {
    pub pages: Vec<TmdbPage>,
}

#[derive(Debug, Clone)]
pub struct FixtureCatalogSource {
    path: PathBuf,
}

impl FixtureCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalogSource {
    fn source_id(&self) -> &str {
        "fixture"
    }

    async fn fetch_catalog(&self) -> Result<Catalog, AdapterError> {
        let fixture: CatalogFixture = read_json_file(&self.path)?;
        Ok(fixture.pages.iter().flat_map(TmdbPage::movies).collect())
    }
}

/// Provider fixture: captured `/watch/providers` bodies keyed by movie id.
/// Ids listed in `unreachable_ids` behave like a transport fault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersFixture {
    #[serde(default)]
    pub responses: HashMap<MovieId, WatchProvidersResponse>,
    #[serde(default)]
    pub unreachable_ids: Vec<MovieId>,
}

#[derive(Debug, Clone)]
pub struct FixtureProviderLookup {
    path: PathBuf,
    region: String,
}

impl FixtureProviderLookup {
    pub fn new(path: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            region: region.into().to_ascii_uppercase(),
        }
    }
}

#[async_trait]
impl ProviderLookup for FixtureProviderLookup {
    fn region(&self) -> &str {
        &self.region
    }

    async fn fetch_availability(
        &self,
        movie_id: MovieId,
    ) -> Result<Option<WatchAvailability>, AdapterError> {
        let mut fixture: ProvidersFixture = read_json_file(&self.path)?;
        if fixture.unreachable_ids.contains(&movie_id) {
            return Err(AdapterError::Message(format!(
                "provider lookup for movie {movie_id} could not reach upstream"
            )));
        }
        Ok(fixture
            .responses
            .remove(&movie_id)
            .and_then(|r| r.into_region(&self.region)))
    }
}

pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}
