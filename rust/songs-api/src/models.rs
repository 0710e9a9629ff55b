//! Row types, request payloads and response shapes for the songs API.

use crate::error::{Result, ServiceError};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Full `songs` row as stored in Postgres.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::songs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SongRow {
    pub id: i64,
    pub group: String,
    pub song: String,
    pub text: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::songs)]
pub struct NewSong<'a> {
    pub group: &'a str,
    pub song: &'a str,
}

/// Partial update; `None` columns are left out of the `SET` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = crate::schema::songs)]
pub struct SongChangeset {
    pub group: Option<String>,
    pub song: Option<String>,
}

impl SongChangeset {
    pub fn is_empty(&self) -> bool {
        self.group.is_none() && self.song.is_none()
    }
}

/// Song as returned over the wire. `text` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    #[serde(rename = "ID")]
    pub id: i64,
    pub group: String,
    #[serde(rename = "song")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl From<SongRow> for Song {
    fn from(row: SongRow) -> Self {
        Self {
            id: row.id,
            group: row.group,
            title: row.song,
            text: row.text,
        }
    }
}

/// Body accepted by `POST /songs` and `PATCH /songs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPayload {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
}

impl SongPayload {
    /// Both fields are required when creating a song.
    pub fn into_new(self) -> Result<(String, String)> {
        match (non_empty(self.group), non_empty(self.song)) {
            (Some(group), Some(song)) => Ok((group, song)),
            _ => Err(ServiceError::InvalidRequest(
                "group and song must not be empty".into(),
            )),
        }
    }

    pub fn into_changeset(self) -> SongChangeset {
        SongChangeset {
            group: non_empty(self.group),
            song: non_empty(self.song),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongsResponse {
    pub items: Vec<Song>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseResponse {
    pub verses: Vec<String>,
    pub verse_page: i64,
    pub verse_size: i64,
    pub total_verses: i64,
    pub total_pages: i64,
}

/// A single lyric line that matched a verse search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongVerse {
    pub song_id: i64,
    pub group: String,
    #[serde(rename = "song")]
    pub title: String,
    pub verse: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// Uniform `{status, message, data}` wrapper used by every mutating and verse endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            message: message.into(),
            data: None,
        }
    }
}
