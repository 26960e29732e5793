//! Full-text search over slide titles and notes
//!
//! Consistency is split between the engine and the repository. The insert
//! and delete triggers on `slides` keep one shadow row per slide; the text in
//! that row is only written here, by the repository paths that change slide
//! content. An UPDATE of `slides.title` that does not go through
//! `update_slide` leaves the shadow row holding the old text.

use rusqlite::{params, Connection};

use super::models::Slide;
use super::slides::map_slide;
use super::{require, CatalogStore};
use crate::error::{CatalogError, Result};

/// Overwrite the shadow row text for a slide, creating the row if missing
pub(crate) fn write_shadow(
    conn: &Connection,
    slide_id: i64,
    title: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let title = title.unwrap_or("");
    let notes = notes.unwrap_or("");
    let rows = conn.execute(
        "UPDATE slides_fts SET title = ?, notes = ? WHERE rowid = ?",
        params![title, notes, slide_id],
    )?;
    if rows == 0 {
        conn.execute(
            "INSERT INTO slides_fts (rowid, title, notes) VALUES (?, ?, ?)",
            params![slide_id, title, notes],
        )?;
    }
    Ok(())
}

/// Quote every term so user input is matched literally
fn fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

impl CatalogStore {
    // ============================================
    // SEARCH
    // ============================================

    /// Slides whose indexed title or notes contain every term, best match first
    pub fn search_slides(&self, query: &str, limit: usize) -> Result<Vec<Slide>> {
        let query = require("search query", query)?;
        if limit == 0 {
            return Err(CatalogError::validation("search limit must be positive"));
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let match_expr = fts_query(query);

        self.read(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT s.id, s.file_id, s.slide_index, s.title, s.notes,
                          s.thumb_rel_path, s.image_rel_path
                   FROM slides_fts
                   JOIN slides s ON s.id = slides_fts.rowid
                   WHERE slides_fts MATCH ?1
                   ORDER BY bm25(slides_fts), s.id
                   LIMIT ?2"#,
            )?;
            let rows = stmt.query_map(params![match_expr, limit], map_slide)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }
}
