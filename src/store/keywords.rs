//! Keyword tags shared by slides and elements
//!
//! Keywords are unique per `(keyword, kind)`, compared case-insensitively;
//! they are created on first use and only removed explicitly.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::elements::{map_element, ELEMENT_COLUMNS};
use super::models::{Element, Keyword, KeywordKind, Slide};
use super::slides::{map_slide, SLIDE_COLUMNS};
use super::{affected, require, CatalogStore};
use crate::error::{CatalogError, Result};

fn map_keyword(row: &Row) -> rusqlite::Result<Keyword> {
    Ok(Keyword {
        id: row.get(0)?,
        keyword: row.get(1)?,
        kind: row.get(2)?,
    })
}

fn load_keyword(conn: &Connection, id: i64) -> Result<Keyword> {
    conn.query_row(
        "SELECT id, keyword, kind FROM keywords WHERE id = ?",
        params![id],
        map_keyword,
    )
    .optional()?
    .ok_or(CatalogError::not_found("keyword", id))
}

fn lookup_keyword(conn: &Connection, text: &str, kind: KeywordKind) -> Result<Option<Keyword>> {
    // keywords.keyword is declared COLLATE NOCASE
    conn.query_row(
        "SELECT id, keyword, kind FROM keywords WHERE keyword = ? AND kind = ?",
        params![text, kind],
        map_keyword,
    )
    .optional()
    .map_err(Into::into)
}

fn keywords_for(conn: &Connection, sql: &str, id: i64) -> Result<Vec<Keyword>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], map_keyword)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Association tables and the column holding the tagged entity
const ASSOCIATIONS: [(&str, &str); 2] = [
    ("slide_keywords", "slide_id"),
    ("element_keywords", "element_id"),
];

impl CatalogStore {
    // ============================================
    // KEYWORDS
    // ============================================

    /// Return the id of the matching keyword, creating it if needed
    pub fn add_keyword_if_not_exists(&self, text: &str, kind: KeywordKind) -> Result<i64> {
        let text = require("keyword", text)?;

        let (id, created) = self.write(|tx| {
            if let Some(existing) = lookup_keyword(tx, text, kind)? {
                return Ok((existing.id, false));
            }
            tx.execute(
                "INSERT INTO keywords (keyword, kind) VALUES (?, ?)",
                params![text, kind],
            )?;
            Ok((tx.last_insert_rowid(), true))
        })?;

        if created {
            tracing::info!("Created {} keyword {} '{}'", kind, id, text);
        }
        Ok(id)
    }

    pub fn get_keyword(&self, id: i64) -> Result<Keyword> {
        self.read(|conn| load_keyword(conn, id))
    }

    pub fn find_keyword(&self, text: &str, kind: KeywordKind) -> Result<Option<Keyword>> {
        let text = text.trim();
        self.read(|conn| lookup_keyword(conn, text, kind))
    }

    pub fn list_keywords(&self, kind: Option<KeywordKind>) -> Result<Vec<Keyword>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, keyword, kind FROM keywords
                 WHERE ?1 IS NULL OR kind = ?1
                 ORDER BY keyword COLLATE NOCASE, kind",
            )?;
            let rows = stmt.query_map(params![kind], map_keyword)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn update_keyword(&self, id: i64, text: &str, kind: KeywordKind) -> Result<()> {
        let text = require("keyword", text)?;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE keywords SET keyword = ?, kind = ? WHERE id = ?",
                params![text, kind, id],
            )?;
            affected(rows, "keyword", id)
        })?;

        tracing::info!("Updated keyword {} to {} '{}'", id, kind, text);
        Ok(())
    }

    /// Delete a keyword and untag everything that referenced it
    pub fn delete_keyword(&self, id: i64) -> Result<()> {
        let keyword = self.write(|tx| {
            let keyword = load_keyword(tx, id)?;
            tx.execute("DELETE FROM keywords WHERE id = ?", params![id])?;
            Ok(keyword)
        })?;

        tracing::info!("Deleted {} keyword {} '{}'", keyword.kind, id, keyword.keyword);
        Ok(())
    }

    // ============================================
    // TAGGING
    // ============================================

    /// Tag a slide; tagging twice is a no-op
    pub fn link_slide_keyword(&self, slide_id: i64, keyword_id: i64) -> Result<()> {
        let linked = self.write(|tx| {
            Ok(tx.execute(
                "INSERT OR IGNORE INTO slide_keywords (slide_id, keyword_id) VALUES (?, ?)",
                params![slide_id, keyword_id],
            )? > 0)
        })?;

        if linked {
            tracing::info!("Tagged slide {} with keyword {}", slide_id, keyword_id);
        }
        Ok(())
    }

    pub fn unlink_slide_keyword(&self, slide_id: i64, keyword_id: i64) -> Result<()> {
        let unlinked = self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM slide_keywords WHERE slide_id = ? AND keyword_id = ?",
                params![slide_id, keyword_id],
            )? > 0)
        })?;

        if unlinked {
            tracing::info!("Removed keyword {} from slide {}", keyword_id, slide_id);
        }
        Ok(())
    }

    /// Tag an element; tagging twice is a no-op
    pub fn link_element_keyword(&self, element_id: i64, keyword_id: i64) -> Result<()> {
        let linked = self.write(|tx| {
            Ok(tx.execute(
                "INSERT OR IGNORE INTO element_keywords (element_id, keyword_id) VALUES (?, ?)",
                params![element_id, keyword_id],
            )? > 0)
        })?;

        if linked {
            tracing::info!("Tagged element {} with keyword {}", element_id, keyword_id);
        }
        Ok(())
    }

    pub fn unlink_element_keyword(&self, element_id: i64, keyword_id: i64) -> Result<()> {
        let unlinked = self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM element_keywords WHERE element_id = ? AND keyword_id = ?",
                params![element_id, keyword_id],
            )? > 0)
        })?;

        if unlinked {
            tracing::info!("Removed keyword {} from element {}", keyword_id, element_id);
        }
        Ok(())
    }

    pub fn get_keywords_for_slide(&self, slide_id: i64) -> Result<Vec<Keyword>> {
        self.read(|conn| {
            keywords_for(
                conn,
                "SELECT k.id, k.keyword, k.kind FROM keywords k
                 JOIN slide_keywords sk ON sk.keyword_id = k.id
                 WHERE sk.slide_id = ?
                 ORDER BY k.id",
                slide_id,
            )
        })
    }

    pub fn get_keywords_for_element(&self, element_id: i64) -> Result<Vec<Keyword>> {
        self.read(|conn| {
            keywords_for(
                conn,
                "SELECT k.id, k.keyword, k.kind FROM keywords k
                 JOIN element_keywords ek ON ek.keyword_id = k.id
                 WHERE ek.element_id = ?
                 ORDER BY k.id",
                element_id,
            )
        })
    }

    pub fn get_slides_for_keyword(&self, keyword_id: i64) -> Result<Vec<Slide>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SLIDE_COLUMNS} FROM slides
                 WHERE id IN (SELECT slide_id FROM slide_keywords WHERE keyword_id = ?)
                 ORDER BY file_id, slide_index"
            ))?;
            let rows = stmt.query_map(params![keyword_id], map_slide)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_elements_for_keyword(&self, keyword_id: i64) -> Result<Vec<Element>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ELEMENT_COLUMNS} FROM elements
                 WHERE id IN (SELECT element_id FROM element_keywords WHERE keyword_id = ?)
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![keyword_id], map_element)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    /// Move every tag from `source_id` onto `target_id`, then delete the source.
    ///
    /// Entities tagged with both keep a single association to the target.
    pub fn merge_keywords(&self, source_id: i64, target_id: i64) -> Result<()> {
        if source_id == target_id {
            return Err(CatalogError::validation(format!(
                "cannot merge keyword {source_id} into itself"
            )));
        }

        let (source, target, moved) = self.write(|tx| {
            let source = load_keyword(tx, source_id)?;
            let target = load_keyword(tx, target_id)?;

            let mut moved = 0;
            for (table, column) in ASSOCIATIONS {
                moved += tx.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {table} ({column}, keyword_id)
                         SELECT {column}, ?2 FROM {table} WHERE keyword_id = ?1"
                    ),
                    params![source_id, target_id],
                )?;
                tx.execute(
                    &format!("DELETE FROM {table} WHERE keyword_id = ?"),
                    params![source_id],
                )?;
            }
            tx.execute("DELETE FROM keywords WHERE id = ?", params![source_id])?;
            Ok((source, target, moved))
        })?;

        tracing::info!(
            "Merged keyword {} '{}' into {} '{}' ({} new tags)",
            source.id,
            source.keyword,
            target.id,
            target.keyword,
            moved
        );
        Ok(())
    }
}
