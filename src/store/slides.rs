use rusqlite::{params, Connection, OptionalExtension, Row};

use super::files::load_file;
use super::models::{NewSlide, Slide};
use super::search::write_shadow;
use super::{affected, exists, CatalogStore};
use crate::error::{CatalogError, Result};

pub(crate) const SLIDE_COLUMNS: &str =
    "id, file_id, slide_index, title, notes, thumb_rel_path, image_rel_path";

pub(crate) fn map_slide(row: &Row) -> rusqlite::Result<Slide> {
    Ok(Slide {
        id: row.get(0)?,
        file_id: row.get(1)?,
        slide_index: row.get(2)?,
        title: row.get(3)?,
        notes: row.get(4)?,
        thumb_rel_path: row.get(5)?,
        image_rel_path: row.get(6)?,
    })
}

fn load_slide(conn: &Connection, id: i64) -> Result<Slide> {
    conn.query_row(
        &format!("SELECT {SLIDE_COLUMNS} FROM slides WHERE id = ?"),
        params![id],
        map_slide,
    )
    .optional()?
    .ok_or(CatalogError::not_found("slide", id))
}

fn validate_index(slide_index: i64) -> Result<()> {
    if slide_index < 0 {
        return Err(CatalogError::validation(format!(
            "slide index must not be negative, got {slide_index}"
        )));
    }
    Ok(())
}

/// Insert one slide and write its searchable text
fn insert_slide(conn: &Connection, file_id: i64, slide: &NewSlide) -> Result<i64> {
    conn.execute(
        "INSERT INTO slides (file_id, slide_index, title, notes, thumb_rel_path, image_rel_path)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            file_id,
            slide.slide_index,
            slide.title,
            slide.notes,
            slide.thumb_rel_path,
            slide.image_rel_path,
        ],
    )?;
    let id = conn.last_insert_rowid();
    write_shadow(conn, id, slide.title.as_deref(), slide.notes.as_deref())?;
    Ok(id)
}

impl CatalogStore {
    // ============================================
    // SLIDES
    // ============================================

    pub fn add_slide(&self, file_id: i64, slide: &NewSlide) -> Result<i64> {
        validate_index(slide.slide_index)?;

        let id = self.write(|tx| insert_slide(tx, file_id, slide))?;

        tracing::info!(
            "Added slide {} (index {}) to file {}",
            id,
            slide.slide_index,
            file_id
        );
        Ok(id)
    }

    pub fn get_slide(&self, id: i64) -> Result<Slide> {
        self.read(|conn| load_slide(conn, id))
    }

    /// Slides of a file in presentation order
    pub fn get_slides_for_file(&self, file_id: i64) -> Result<Vec<Slide>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SLIDE_COLUMNS} FROM slides WHERE file_id = ? ORDER BY slide_index"
            ))?;
            let rows = stmt.query_map(params![file_id], map_slide)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn find_slide(&self, file_id: i64, slide_index: i64) -> Result<Option<Slide>> {
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {SLIDE_COLUMNS} FROM slides WHERE file_id = ? AND slide_index = ?"),
                params![file_id, slide_index],
                map_slide,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn slide_exists(&self, id: i64) -> Result<bool> {
        self.read(|conn| exists(conn, "SELECT 1 FROM slides WHERE id = ?", id))
    }

    /// Write back slide content and refresh the search shadow row.
    /// The owning file cannot be changed.
    pub fn update_slide(&self, slide: &Slide) -> Result<()> {
        validate_index(slide.slide_index)?;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE slides
                 SET slide_index = ?, title = ?, notes = ?, thumb_rel_path = ?, image_rel_path = ?
                 WHERE id = ?",
                params![
                    slide.slide_index,
                    slide.title,
                    slide.notes,
                    slide.thumb_rel_path,
                    slide.image_rel_path,
                    slide.id,
                ],
            )?;
            affected(rows, "slide", slide.id)?;
            write_shadow(tx, slide.id, slide.title.as_deref(), slide.notes.as_deref())
        })?;

        tracing::info!(
            "Updated slide {} (index {}, title {:?})",
            slide.id,
            slide.slide_index,
            slide.title
        );
        Ok(())
    }

    pub fn update_slide_notes(&self, id: i64, notes: Option<&str>) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE slides SET notes = ? WHERE id = ?",
                params![notes, id],
            )?;
            affected(rows, "slide", id)?;
            let title: Option<String> =
                tx.query_row("SELECT title FROM slides WHERE id = ?", params![id], |row| {
                    row.get(0)
                })?;
            write_shadow(tx, id, title.as_deref(), notes)
        })?;

        tracing::info!(
            "Updated notes of slide {} ({} chars)",
            id,
            notes.map_or(0, |n| n.chars().count())
        );
        Ok(())
    }

    /// Swap out every slide of a reprocessed file in one transaction.
    /// Elements and tags of the old slides are removed with them.
    pub fn replace_slides(&self, file_id: i64, slides: &[NewSlide]) -> Result<Vec<i64>> {
        for slide in slides {
            validate_index(slide.slide_index)?;
        }

        let (removed, ids) = self.write(|tx| {
            load_file(tx, file_id)?;
            let removed = tx.execute("DELETE FROM slides WHERE file_id = ?", params![file_id])?;
            let ids = slides
                .iter()
                .map(|slide| insert_slide(tx, file_id, slide))
                .collect::<Result<Vec<_>>>()?;
            Ok((removed, ids))
        })?;

        tracing::info!(
            "Replaced slides of file {}: removed {}, inserted {}",
            file_id,
            removed,
            ids.len()
        );
        Ok(ids)
    }

    pub fn delete_slide(&self, id: i64) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute("DELETE FROM slides WHERE id = ?", params![id])?;
            affected(rows, "slide", id)
        })?;

        tracing::info!("Deleted slide {}", id);
        Ok(())
    }
}
