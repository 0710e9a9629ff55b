use crate::{
    config::AppConfig,
    db::{self, PgPool},
    error::{Result, ServiceError},
    migrations,
    models::{Envelope, Song, SongPayload, SongVerse, SongsResponse, VerseResponse},
    pagination::page_param,
    query::SongFilter,
    service::{PageRequest, SongService},
    state::AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, Level};

const DEFAULT_VERSE_SIZE: i64 = 1;

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect_pool(&config).await?;
        if config.run_migrations {
            apply_migrations(&pool).await?;
        }
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: AppConfig, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config), SongService::new(pool));
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        let routes = Router::new()
            .route("/healthz", get(Self::health))
            .route(
                "/songs",
                get(Self::list_songs)
                    .post(Self::add_song)
                    .delete(Self::delete_song)
                    .patch(Self::update_song),
            )
            .route("/songs/verses/search", get(Self::search_verses))
            .route("/songs/:id/verses", get(Self::song_verses))
            .with_state(self.state.clone());
        with_http_layers(routes, self.config.request_timeout)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "songs API listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn list_songs(
        State(state): State<AppState>,
        params: std::result::Result<Query<ListSongsParams>, QueryRejection>,
    ) -> Result<Json<SongsResponse>> {
        let params = query_params(params)?;
        let filter = SongFilter {
            id: parse_optional_id(params.id.as_deref())?,
            group: non_empty(params.group),
            title: non_empty(params.song),
        };
        let page = PageRequest {
            page: page_param(params.page.as_deref(), 1),
            page_size: page_param(params.page_size.as_deref(), state.config.default_page_size),
        };

        let response = state.songs.list_songs(filter, page).await?;
        Ok(Json(response))
    }

    async fn add_song(
        State(state): State<AppState>,
        payload: std::result::Result<Json<SongPayload>, JsonRejection>,
    ) -> Result<Json<Envelope<Song>>> {
        let Json(payload) = payload.map_err(|rejection| {
            ServiceError::InvalidRequest(format!("could not add song: {}", rejection.body_text()))
        })?;
        let (group, title) = payload.into_new()?;

        let song = state.songs.add_song(&group, &title).await?;
        Ok(Json(Envelope::success("Song added", song)))
    }

    async fn delete_song(
        State(state): State<AppState>,
        params: std::result::Result<Query<IdParams>, QueryRejection>,
    ) -> Result<Json<Envelope<()>>> {
        let params = query_params(params)?;
        let id = parse_required_id(params.id.as_deref())?;
        state.songs.delete_song(id).await?;
        Ok(Json(Envelope::message("Song deleted")))
    }

    async fn update_song(
        State(state): State<AppState>,
        params: std::result::Result<Query<IdParams>, QueryRejection>,
        payload: std::result::Result<Json<SongPayload>, JsonRejection>,
    ) -> Result<Json<Envelope<Song>>> {
        let params = query_params(params)?;
        let id = parse_required_id(params.id.as_deref())?;
        let Json(payload) = payload.map_err(|rejection| {
            ServiceError::InvalidRequest(format!("malformed song payload: {}", rejection.body_text()))
        })?;

        let song = state.songs.update_song(id, payload.into_changeset()).await?;
        Ok(Json(Envelope::success("Song updated", song)))
    }

    async fn song_verses(
        State(state): State<AppState>,
        raw_id: std::result::Result<Path<String>, PathRejection>,
        params: std::result::Result<Query<VerseParams>, QueryRejection>,
    ) -> Result<Json<Envelope<VerseResponse>>> {
        let Path(raw_id) = raw_id
            .map_err(|_| ServiceError::InvalidRequest("a valid song id is required".into()))?;
        let id = parse_required_id(Some(raw_id.as_str()))?;
        let params = query_params(params)?;
        let page = PageRequest {
            page: page_param(params.verse_page.as_deref(), 1),
            page_size: page_param(params.verse_size.as_deref(), DEFAULT_VERSE_SIZE),
        };

        let response = state.songs.song_verses(id, page).await?;
        Ok(Json(Envelope::success("Verses retrieved", response)))
    }

    async fn search_verses(
        State(state): State<AppState>,
        params: std::result::Result<Query<SearchParams>, QueryRejection>,
    ) -> Result<Json<Envelope<Vec<SongVerse>>>> {
        let params = query_params(params)?;
        let text = non_empty(params.text)
            .ok_or_else(|| ServiceError::InvalidRequest("search text is required".into()))?;

        let results = state.songs.search_verses(&text).await?;
        debug!(count = results.len(), "verse search completed");
        Ok(Json(Envelope::success("Verses found", results)))
    }
}

/// Timeout, response envelope for timeouts, and request tracing.
fn with_http_layers(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response(envelope_timeouts))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

// Handlers never answer 408 themselves; only the timeout layer does.
async fn envelope_timeouts(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ServiceError::Timeout.into_response();
    }
    response
}

async fn apply_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let mut conn = pool
        .get()
        .await
        .map_err(|err| anyhow::anyhow!("failed to acquire connection for migrations: {err:?}"))?;
    let applied = migrations::run(&mut conn).await?;
    info!(applied = applied.len(), "migrations complete");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct ListSongsParams {
    id: Option<String>,
    group: Option<String>,
    song: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdParams {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VerseParams {
    verse_page: Option<String>,
    verse_size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    text: Option<String>,
}

fn query_params<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params.map(|Query(inner)| inner).map_err(|rejection| {
        ServiceError::InvalidRequest(format!("malformed query string: {}", rejection.body_text()))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Listing accepts any integer id, including zero or negatives.
fn parse_optional_id(raw: Option<&str>) -> Result<Option<i64>> {
    match raw.filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ServiceError::InvalidRequest("invalid id format".into())),
    }
}

fn parse_required_id(raw: Option<&str>) -> Result<i64> {
    raw.and_then(|value| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ServiceError::InvalidRequest("a valid song id is required".into()))
}
