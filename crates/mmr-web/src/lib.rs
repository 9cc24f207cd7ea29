//! Axum + Askama UI for My Movie Raffle.

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mmr_adapters::{AdapterError, ProviderLookup, TmdbImages};
use mmr_core::{Catalog, Movie, ProviderCategory};
use mmr_raffle::{AvailabilityStatus, MmrConfig, RaffleController, RaffleError, RaffleView};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const CRATE_NAME: &str = "mmr-web";
pub const APP_NAME: &str = "My Movie Raffle";
pub const GRID_TITLE_CHARS: usize = 8;

#[derive(Debug, Clone)]
pub enum CatalogState {
    Ready(Arc<Catalog>),
    Unavailable(String),
}

#[derive(Clone)]
pub struct AppState {
    pub controller: RaffleController,
    pub catalog: CatalogState,
    pub images: TmdbImages,
    pub workspace_root: PathBuf,
}

impl AppState {
    /// Wires the controller to `lookup` and seeds it with the fetched catalog.
    pub async fn build(
        workspace_root: impl Into<PathBuf>,
        images: TmdbImages,
        catalog: Result<Catalog, AdapterError>,
        lookup: Arc<dyn ProviderLookup>,
    ) -> Self {
        let controller = RaffleController::new(lookup);
        let catalog = match catalog {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                match controller.initialize(Arc::clone(&catalog)).await {
                    Ok(()) => info!(movies = catalog.len(), "catalog loaded"),
                    Err(err) => warn!(%err, "raffle disabled"),
                }
                CatalogState::Ready(catalog)
            }
            Err(err) => {
                error!(%err, "catalog load failed");
                CatalogState::Unavailable(err.to_string())
            }
        };
        Self {
            controller,
            catalog,
            images,
            workspace_root: workspace_root.into(),
        }
    }

    pub async fn from_config(config: &MmrConfig) -> anyhow::Result<Self> {
        let source = config.catalog_source()?;
        let lookup = config.provider_lookup()?;
        info!(source = source.source_id(), region = lookup.region(), "loading catalog");
        let catalog = source.fetch_catalog().await;
        Ok(Self::build(config.workspace_root.clone(), config.images(), catalog, lookup).await)
    }

    fn movies(&self) -> &[Movie] {
        match &self.catalog {
            CatalogState::Ready(catalog) => catalog.movies(),
            CatalogState::Unavailable(_) => &[],
        }
    }

    fn raffle_blocker(&self) -> Option<RaffleError> {
        match &self.catalog {
            CatalogState::Ready(catalog) if catalog.is_empty() => Some(RaffleError::EmptyCatalog),
            CatalogState::Ready(_) => None,
            CatalogState::Unavailable(_) => {
                Some(RaffleError::InvalidState("catalog could not be loaded"))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct MovieCard {
    title: String,
    full_title: String,
    poster_url: String,
    year: String,
    rating: String,
}

impl MovieCard {
    fn new(movie: &Movie, images: &TmdbImages, title_chars: usize) -> Self {
        Self {
            title: movie.truncated_title(title_chars),
            full_title: movie.title.clone(),
            poster_url: images.poster_url(movie.poster_path.as_deref()),
            year: movie
                .release_year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| "n/a".to_string()),
            rating: movie.display_rating(),
        }
    }
}

#[derive(Debug, Clone)]
struct ProviderBadge {
    name: String,
    logo_url: String,
    has_logo: bool,
}

#[derive(Debug, Clone)]
struct ProviderSection {
    label: &'static str,
    css_class: &'static str,
    providers: Vec<ProviderBadge>,
}

/// Flattened `RaffleView` for the modal template.
#[derive(Debug, Clone, Default)]
struct ModalView {
    open: bool,
    restart: bool,
    catalog_size: usize,
    card: Option<MovieCard>,
    pending: bool,
    sections: Vec<ProviderSection>,
    no_info: bool,
    watch_link: String,
}

impl ModalView {
    fn from_view(view: &RaffleView, images: &TmdbImages) -> Self {
        match view {
            RaffleView::Idle => Self::default(),
            RaffleView::RestartNotice { catalog_size } => Self {
                open: true,
                restart: true,
                catalog_size: *catalog_size,
                ..Self::default()
            },
            RaffleView::Selection(selection) => {
                let mut modal = Self {
                    open: true,
                    card: Some(MovieCard::new(&selection.movie, images, usize::MAX)),
                    ..Self::default()
                };
                match &selection.status {
                    AvailabilityStatus::Pending => modal.pending = true,
                    AvailabilityStatus::Ready { availability } => {
                        modal.sections = ProviderCategory::ALL
                            .iter()
                            .filter(|c| !availability.providers(**c).is_empty())
                            .map(|c| ProviderSection {
                                label: c.label(),
                                css_class: category_class(*c),
                                providers: availability
                                    .providers(*c)
                                    .iter()
                                    .map(|p| {
                                        let logo_url = images.logo_url(p.logo_path.as_deref());
                                        ProviderBadge {
                                            name: p.provider_name.clone(),
                                            has_logo: logo_url.is_some(),
                                            logo_url: logo_url.unwrap_or_default(),
                                        }
                                    })
                                    .collect(),
                            })
                            .collect();
                        modal.watch_link = availability.link.clone().unwrap_or_default();
                    }
                    AvailabilityStatus::Empty | AvailabilityStatus::Failed { .. } => {
                        modal.no_info = true
                    }
                }
                modal
            }
        }
    }

    fn title(&self) -> &str {
        self.card.as_ref().map(|c| c.full_title.as_str()).unwrap_or_default()
    }

    fn poster_url(&self) -> &str {
        self.card.as_ref().map(|c| c.poster_url.as_str()).unwrap_or_default()
    }

    fn year(&self) -> &str {
        self.card.as_ref().map(|c| c.year.as_str()).unwrap_or_default()
    }

    fn rating(&self) -> &str {
        self.card.as_ref().map(|c| c.rating.as_str()).unwrap_or_default()
    }
}

fn category_class(category: ProviderCategory) -> &'static str {
    match category {
        ProviderCategory::Streaming => "is-success",
        ProviderCategory::Rent => "is-warning",
        ProviderCategory::Buy => "is-primary",
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    app_name: &'static str,
    movies: Vec<MovieCard>,
    catalog_error: String,
    has_error: bool,
    remaining: usize,
    catalog_size: usize,
    raffle_slot: String,
}

#[derive(Template)]
#[template(path = "raffle_modal.html")]
struct RaffleModalTemplate {
    modal: ModalView,
    remaining: usize,
    catalog_size: usize,
    /// Also emit the pool counter as an htmx out-of-band swap.
    oob: bool,
}

#[derive(Template)]
#[template(path = "remaining_partial.html")]
struct RemainingPartialTemplate {
    remaining: usize,
    catalog_size: usize,
    oob: bool,
}

#[derive(Debug, Deserialize, Default)]
struct PlaceholderQuery {
    height: Option<u32>,
    width: Option<u32>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/raffle", post(raffle_draw_handler))
        .route("/raffle/selection", get(selection_handler))
        .route("/raffle/selection.json", get(selection_json_handler))
        .route("/raffle/close", post(close_handler))
        .route("/raffle/reset", post(reset_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .route("/placeholder.svg", get(placeholder_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: MmrConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(MmrConfig::load(".")?).await
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    // the page already renders #remaining itself
    let raffle_slot = match render_modal(&state, false).await {
        Ok(html) => html,
        Err(err) => return server_error(err),
    };
    let (catalog_error, has_error) = match &state.catalog {
        CatalogState::Ready(_) => (String::new(), false),
        CatalogState::Unavailable(reason) => (reason.clone(), true),
    };
    let movies = state
        .movies()
        .iter()
        .map(|m| MovieCard::new(m, &state.images, GRID_TITLE_CHARS))
        .collect::<Vec<_>>();
    let tpl = IndexTemplate {
        app_name: APP_NAME,
        catalog_size: movies.len(),
        movies,
        catalog_error,
        has_error,
        remaining: state.controller.remaining().await.unwrap_or_default(),
        raffle_slot,
    };
    let mut resp = render_html(tpl);
    if has_error && resp.status() == StatusCode::OK {
        *resp.status_mut() = StatusCode::BAD_GATEWAY;
    }
    resp
}

async fn raffle_draw_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Some(err) = state.raffle_blocker() {
        return conflict(err);
    }
    match state.controller.draw().await {
        // the lookup keeps running; pending modals poll /raffle/selection
        Ok(_ticket) => modal_response(&state).await,
        Err(err) => conflict(err),
    }
}

async fn selection_handler(State(state): State<Arc<AppState>>) -> Response {
    modal_response(&state).await
}

async fn selection_json_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.controller.view().await).into_response()
}

async fn close_handler(State(state): State<Arc<AppState>>) -> Response {
    state.controller.dismiss().await;
    modal_response(&state).await
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> Response {
    if let Some(err) = state.raffle_blocker() {
        return conflict(err);
    }
    match state.controller.reset().await {
        Ok(()) => render_html(RemainingPartialTemplate {
            remaining: state.controller.remaining().await.unwrap_or_default(),
            catalog_size: state.controller.catalog_size().await.unwrap_or_default(),
            oob: false,
        }),
        Err(err) => conflict(err),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

async fn placeholder_handler(Query(query): Query<PlaceholderQuery>) -> Response {
    let height = query.height.unwrap_or(400).clamp(1, 2000);
    let width = query.width.unwrap_or(300).clamp(1, 2000);
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        placeholder_svg(width, height),
    )
        .into_response()
}

fn placeholder_svg(width: u32, height: u32) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="100%" height="100%" fill="#212529"/><text x="50%" y="50%" fill="#adafbc" font-family="monospace" font-size="16" text-anchor="middle" dominant-baseline="middle">No poster</text></svg>"##
    )
}

async fn render_modal(state: &AppState, oob: bool) -> anyhow::Result<String> {
    let view = state.controller.view().await;
    let tpl = RaffleModalTemplate {
        modal: ModalView::from_view(&view, &state.images),
        remaining: state.controller.remaining().await.unwrap_or_default(),
        catalog_size: state.controller.catalog_size().await.unwrap_or_default(),
        oob,
    };
    Ok(tpl.render()?)
}

async fn modal_response(state: &AppState) -> Response {
    match render_modal(state, true).await {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(err),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn conflict(err: RaffleError) -> Response {
    (
        StatusCode::CONFLICT,
        Html(format!("<p class=\"nes-text is-error\">{err}</p>")),
    )
        .into_response()
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}
