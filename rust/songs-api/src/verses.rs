//! Verse splitting, paging and line-level search over lyric text.

use crate::{
    error::Result,
    models::{SongRow, SongVerse, VerseResponse},
    pagination::PageWindow,
};

/// Lyrics are stored as one column; each `\n`-separated line is a verse.
pub fn split_verses(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

pub fn page_verses(text: &str, verse_page: i64, verse_size: i64) -> Result<VerseResponse> {
    let verses = split_verses(text);
    let window = PageWindow::resolve(verse_page, verse_size, verses.len() as i64)?;

    let page: Vec<String> = verses
        .iter()
        .skip(window.offset as usize)
        .take((window.end() - window.offset) as usize)
        .map(|verse| verse.to_string())
        .collect();

    Ok(VerseResponse {
        verses: page,
        verse_page: window.page,
        verse_size: window.page_size,
        total_verses: window.total,
        total_pages: window.total_pages,
    })
}

/// Lines of `row.text` containing `needle`, compared case-insensitively.
pub fn matching_verses(row: &SongRow, needle: &str) -> Vec<SongVerse> {
    let needle = needle.to_lowercase();
    split_verses(&row.text)
        .into_iter()
        .filter(|verse| verse.to_lowercase().contains(&needle))
        .map(|verse| SongVerse {
            song_id: row.id,
            group: row.group.clone(),
            title: row.song.clone(),
            verse: verse.to_string(),
        })
        .collect()
}
