use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use guestbook_core::{
    read_page, AdmissionPipeline, Clock, EntryId, EntryStore, GuestbookConfig, GuestbookEntry,
    GuestbookPage, Pagination, PartitionResolver, Site, SiteRegistry, Submission, SystemClock,
    WordListMatcher, YamlSiteRegistry,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{config::ServerConfig, error::ApiError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuestbookConfig>,
    pub registry: Arc<dyn SiteRegistry>,
    pub partitions: Arc<PartitionResolver>,
    pub pipeline: Arc<AdmissionPipeline>,
}

impl AppState {
    pub fn new(config: &ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let matcher = Arc::new(WordListMatcher::from_config(&config.guestbook.moderation));
        let pipeline = AdmissionPipeline::standard(&config.guestbook, matcher, clock);

        Self {
            config: Arc::new(config.guestbook.clone()),
            registry: Arc::new(YamlSiteRegistry::new(config.sites_path())),
            partitions: Arc::new(PartitionResolver::new(config.data_dir.clone())),
            pipeline: Arc::new(pipeline),
        }
    }
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config, Arc::new(SystemClock));
    info!(
        data_dir = %config.data_dir.display(),
        rules = ?state.pipeline.rules(),
        "guestbook configured"
    );

    let app = router(state);

    info!(addr = %config.listen_addr, "guestbook listening");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sites", get(list_sites).post(create_site))
        .route("/v1/guestbook/{site}", get(get_guestbook).post(post_entry))
        .route("/v1/guestbook/{site}/{id}", delete(delete_entry))
        .route("/v1/fillup/{site}", post(fillup))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Run storage work off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal("blocking task failed", err))?
}

async fn ensure_site(state: &AppState, site: &str) -> Result<(), ApiError> {
    let registry = state.registry.clone();
    let name = site.to_string();
    let exists = blocking(move || Ok(registry.exists(&name))).await?;
    if exists {
        Ok(())
    } else {
        debug!(%site, "request for unregistered site");
        Err(ApiError::NotFound(guestbook_core::pipeline::SITE_NOT_FOUND.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sites
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SiteCreated {
    status: &'static str,
    message: &'static str,
    data: Site,
}

#[derive(Serialize)]
struct SiteList {
    status: &'static str,
    data: Vec<Site>,
}

async fn create_site(
    State(state): State<AppState>,
    payload: Result<Json<Site>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(site) = payload.map_err(|err| {
        debug!(%err, "invalid site payload");
        ApiError::MalformedRequest
    })?;

    let registry = state.registry.clone();
    let site = blocking(move || Ok(registry.add(site)?)).await?;
    info!(site = %site.name, "site registered");

    Ok(Json(SiteCreated {
        status: "success",
        message: "Site added successfully",
        data: site,
    }))
}

async fn list_sites(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let registry = state.registry.clone();
    let sites = blocking(move || Ok(registry.list()?)).await?;

    Ok(Json(SiteList {
        status: "success",
        data: sites,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Guestbook
// ─────────────────────────────────────────────────────────────────────────────

async fn post_entry(
    Path(site): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    ensure_site(&state, &site).await?;
    let Json(submission) = payload.map_err(|err| {
        debug!(%site, %err, "invalid guestbook payload");
        ApiError::MalformedRequest
    })?;

    blocking(move || {
        let partition = state.partitions.resolve(&site)?;
        state
            .pipeline
            .admit(&site, &submission, state.registry.as_ref(), &partition)?;
        Ok(())
    })
    .await?;

    Ok(StatusCode::OK)
}

/// Trusted bulk import: stores the entry verbatim, bypassing admission.
async fn fillup(
    Path(site): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<GuestbookEntry>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    ensure_site(&state, &site).await?;
    let Json(entry) = payload.map_err(|err| {
        debug!(%site, %err, "invalid fillup payload");
        ApiError::MalformedRequest
    })?;

    blocking(move || {
        let partition = state.partitions.resolve(&site)?;
        partition.insert(&entry)?;
        info!(%site, id = %entry.id, "entry imported");
        Ok(())
    })
    .await?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

async fn get_guestbook(
    Path(site): Path<String>,
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<GuestbookPage>, ApiError> {
    ensure_site(&state, &site).await?;

    let pagination = query
        .ok()
        .and_then(|Query(q)| q.page)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .and_then(|page| Pagination::new(page, state.config.page_size))
        .ok_or(ApiError::MalformedRequest)?;

    let page = blocking(move || {
        let partition = state.partitions.resolve(&site)?;
        Ok(read_page(&partition, pagination)?)
    })
    .await?;

    Ok(Json(page))
}

async fn delete_entry(
    Path((site, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    ensure_site(&state, &site).await?;

    blocking(move || {
        let partition = state.partitions.resolve(&site)?;
        let removed = partition.delete(&EntryId::new(id.as_str()))?;
        debug!(%site, %id, removed, "entry delete");
        Ok(())
    })
    .await?;

    Ok(StatusCode::OK)
}
