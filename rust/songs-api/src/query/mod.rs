//! Diesel query construction for the `songs` table.
//!
//! Every statement is built with diesel's boxed query builder, so filters and
//! `SET` assignments are appended as typed expressions and bind placeholders
//! are numbered by diesel rather than spliced by hand.

mod search;
mod songs;

pub use search::{load_matching_rows, search_query_sql};
pub use songs::{
    count_songs, delete_song, fetch_song_summary, fetch_text, insert_song, list_query_sql,
    load_page, update_song,
};

/// Optional predicates for `GET /songs`; present ones are `AND`ed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongFilter {
    pub id: Option<i64>,
    pub group: Option<String>,
    pub title: Option<String>,
}

/// Wraps `needle` in `%…%` for a substring `ILIKE`, escaping LIKE metacharacters
/// so user input only ever matches literally.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
