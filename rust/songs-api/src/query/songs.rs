use super::{contains_pattern, SongFilter};
use crate::{
    error::{Result, ServiceError},
    models::{NewSong, Song, SongChangeset, SongRow},
    pagination::PageWindow,
    schema::songs::dsl::{
        group as col_group, id as col_id, song as col_song, songs, text as col_text,
    },
};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{AsQuery, BoxedSelectStatement, FromClause};
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

type SongsTable = crate::schema::songs::table;
type SongsFromClause = FromClause<SongsTable>;
type SongsQuery<'a> =
    BoxedSelectStatement<'a, <SongsTable as AsQuery>::SqlType, SongsFromClause, Pg>;

fn filtered(filter: &SongFilter) -> SongsQuery<'static> {
    let mut query = songs.into_boxed::<Pg>();

    if let Some(value) = filter.id {
        query = query.filter(col_id.eq(value));
    }
    if let Some(value) = filter.group.as_deref() {
        query = query.filter(col_group.ilike(contains_pattern(value)));
    }
    if let Some(value) = filter.title.as_deref() {
        query = query.filter(col_song.ilike(contains_pattern(value)));
    }

    query
}

fn page_query(filter: &SongFilter, window: &PageWindow) -> SongsQuery<'static> {
    filtered(filter)
        .order(col_id.asc())
        .limit(window.page_size)
        .offset(window.offset)
}

pub async fn count_songs(conn: &mut AsyncPgConnection, filter: &SongFilter) -> Result<i64> {
    filtered(filter)
        .count()
        .get_result(conn)
        .await
        .map_err(ServiceError::database("failed to count songs"))
}

pub async fn load_page(
    conn: &mut AsyncPgConnection,
    filter: &SongFilter,
    window: &PageWindow,
) -> Result<Vec<SongRow>> {
    page_query(filter, window)
        .load::<SongRow>(conn)
        .await
        .map_err(ServiceError::database("failed to load songs"))
}

pub async fn insert_song(conn: &mut AsyncPgConnection, group: &str, song: &str) -> Result<SongRow> {
    diesel::insert_into(songs)
        .values(&NewSong { group, song })
        .returning(SongRow::as_returning())
        .get_result(conn)
        .await
        .map_err(ServiceError::database("failed to insert song"))
}

/// Returns the number of rows removed.
pub async fn delete_song(conn: &mut AsyncPgConnection, id: i64) -> Result<usize> {
    diesel::delete(songs.filter(col_id.eq(id)))
        .execute(conn)
        .await
        .map_err(ServiceError::database("failed to delete song"))
}

/// Returns the number of rows touched. `changes` must not be empty.
pub async fn update_song(
    conn: &mut AsyncPgConnection,
    id: i64,
    changes: &SongChangeset,
) -> Result<usize> {
    diesel::update(songs.filter(col_id.eq(id)))
        .set(changes)
        .execute(conn)
        .await
        .map_err(ServiceError::database("failed to update song"))
}

/// Reads id, group and title only; lyrics are left out.
pub async fn fetch_song_summary(conn: &mut AsyncPgConnection, id: i64) -> Result<Option<Song>> {
    let row = songs
        .filter(col_id.eq(id))
        .select((col_id, col_group, col_song))
        .first::<(i64, String, String)>(conn)
        .await
        .optional()
        .map_err(ServiceError::database("failed to read updated song"))?;

    Ok(row.map(|(id, group, title)| Song {
        id,
        group,
        title,
        text: String::new(),
    }))
}

pub async fn fetch_text(conn: &mut AsyncPgConnection, id: i64) -> Result<Option<String>> {
    songs
        .filter(col_id.eq(id))
        .select(col_text)
        .first::<String>(conn)
        .await
        .optional()
        .map_err(ServiceError::database("failed to read song text"))
}

pub fn list_query_sql(filter: &SongFilter, window: &PageWindow) -> String {
    diesel::debug_query::<Pg, _>(&page_query(filter, window)).to_string()
}
