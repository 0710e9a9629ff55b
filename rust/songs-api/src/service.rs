//! Song operations backing the HTTP handlers.

use crate::{
    db::{PgConnectionManager, PgPool},
    error::{Result, ServiceError},
    models::{Song, SongChangeset, SongVerse, SongsResponse, VerseResponse},
    pagination::PageWindow,
    query::{self, SongFilter},
    verses,
};
use bb8::PooledConnection;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

#[derive(Clone)]
pub struct SongService {
    pool: PgPool,
}

impl SongService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<PooledConnection<'_, PgConnectionManager>> {
        self.pool.get().await.map_err(|err| {
            error!(error = ?err, "failed to acquire database connection");
            ServiceError::Internal(anyhow::anyhow!("failed to acquire database connection: {err:?}"))
        })
    }

    #[instrument(skip(self))]
    pub async fn list_songs(&self, filter: SongFilter, request: PageRequest) -> Result<SongsResponse> {
        let mut conn = self.connection().await?;

        let total = query::count_songs(&mut conn, &filter).await?;
        let window = match PageWindow::resolve(request.page, request.page_size, total) {
            Ok(window) => window,
            Err(err) => {
                warn!(page = request.page, total, "requested song page exceeds total pages");
                return Err(err);
            }
        };

        let rows = query::load_page(&mut conn, &filter, &window).await?;
        info!(count = rows.len(), total, "songs fetched");

        Ok(SongsResponse {
            items: rows.into_iter().map(Song::from).collect(),
            page: window.page,
            page_size: window.page_size,
            total: window.total,
            total_pages: window.total_pages,
        })
    }

    #[instrument(skip(self))]
    pub async fn add_song(&self, group: &str, title: &str) -> Result<Song> {
        let mut conn = self.connection().await?;
        let row = query::insert_song(&mut conn, group, title).await?;
        info!(id = row.id, "song added");
        Ok(Song::from(row))
    }

    #[instrument(skip(self))]
    pub async fn delete_song(&self, id: i64) -> Result<()> {
        let mut conn = self.connection().await?;
        let removed = query::delete_song(&mut conn, id).await?;
        if removed == 0 {
            return Err(ServiceError::NotFound(format!("song {id}")));
        }
        info!(id, "song deleted");
        Ok(())
    }

    /// Applies a partial update and returns the song as stored afterwards.
    ///
    /// The update and the re-read are separate statements; a concurrent
    /// delete in between surfaces as an internal error.
    #[instrument(skip(self))]
    pub async fn update_song(&self, id: i64, changes: SongChangeset) -> Result<Song> {
        if changes.is_empty() {
            return Err(ServiceError::NoFieldsToUpdate);
        }

        let mut conn = self.connection().await?;
        let touched = query::update_song(&mut conn, id, &changes).await?;
        if touched == 0 {
            return Err(ServiceError::NotFound(format!("song {id}")));
        }

        match query::fetch_song_summary(&mut conn, id).await? {
            Some(song) => {
                info!(id, "song updated");
                Ok(song)
            }
            None => {
                warn!(id, "song vanished between update and re-read");
                Err(ServiceError::Internal(anyhow::anyhow!(
                    "song {id} was removed before the update could be read back"
                )))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn song_verses(&self, id: i64, request: PageRequest) -> Result<VerseResponse> {
        let mut conn = self.connection().await?;
        let text = query::fetch_text(&mut conn, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("song {id}")))?;

        verses::page_verses(&text, request.page, request.page_size)
    }

    #[instrument(skip(self))]
    pub async fn search_verses(&self, needle: &str) -> Result<Vec<SongVerse>> {
        let mut conn = self.connection().await?;
        let rows = query::load_matching_rows(&mut conn, needle).await?;

        let results: Vec<SongVerse> = rows
            .iter()
            .flat_map(|row| verses::matching_verses(row, needle))
            .collect();

        if results.is_empty() {
            warn!(text = needle, "no verses found");
            return Err(ServiceError::NoMatches(needle.to_string()));
        }

        info!(count = results.len(), "verses found");
        Ok(results)
    }
}
