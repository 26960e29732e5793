use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{ConversionStatus, File, Timestamps};
use super::{affected, exists, require, CatalogStore};
use crate::error::{CatalogError, Result};

const FILE_COLUMNS: &str = "id, project_id, filename, rel_path, slide_count, checksum, \
                            conversion_status, created_at, updated_at";

fn map_file(row: &Row) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        project_id: row.get(1)?,
        filename: row.get(2)?,
        rel_path: row.get(3)?,
        slide_count: row.get(4)?,
        checksum: row.get(5)?,
        conversion_status: row.get(6)?,
        stamps: Timestamps {
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        },
    })
}

pub(crate) fn load_file(conn: &Connection, id: i64) -> Result<File> {
    conn.query_row(
        &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"),
        params![id],
        map_file,
    )
    .optional()?
    .ok_or(CatalogError::not_found("file", id))
}

fn validate_slide_count(slide_count: Option<i64>) -> Result<()> {
    match slide_count {
        Some(n) if n < 0 => Err(CatalogError::validation(format!(
            "slide count must not be negative, got {n}"
        ))),
        _ => Ok(()),
    }
}

impl CatalogStore {
    // ============================================
    // FILES
    // ============================================

    /// Register a source file under a project; starts out `Pending`
    pub fn add_file(
        &self,
        project_id: i64,
        filename: &str,
        rel_path: &str,
        checksum: Option<&str>,
    ) -> Result<i64> {
        let filename = require("filename", filename)?;
        let rel_path = require("relative path", rel_path)?;
        let stamps = Timestamps::now();

        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO files (project_id, filename, rel_path, checksum, conversion_status,
                                    created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    project_id,
                    filename,
                    rel_path,
                    checksum,
                    ConversionStatus::Pending,
                    stamps.created_at,
                    stamps.updated_at,
                ],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        tracing::info!("Added file {} '{}' to project {}", id, rel_path, project_id);
        Ok(id)
    }

    pub fn get_file(&self, id: i64) -> Result<File> {
        self.read(|conn| load_file(conn, id))
    }

    pub fn get_files_for_project(&self, project_id: i64) -> Result<Vec<File>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE project_id = ? ORDER BY rel_path, id"
            ))?;
            let rows = stmt.query_map(params![project_id], map_file)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    /// Find a file by its path inside the project
    pub fn find_file(&self, project_id: i64, rel_path: &str) -> Result<Option<File>> {
        let rel_path = rel_path.trim();
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE project_id = ? AND rel_path = ?"),
                params![project_id, rel_path],
                map_file,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn file_exists(&self, id: i64) -> Result<bool> {
        self.read(|conn| exists(conn, "SELECT 1 FROM files WHERE id = ?", id))
    }

    /// Write back the mutable fields of `file`; `project_id` and timestamps
    /// other than `updated_at` are left as stored
    pub fn update_file(&self, file: &File) -> Result<()> {
        let filename = require("filename", &file.filename)?;
        let rel_path = require("relative path", &file.rel_path)?;
        validate_slide_count(file.slide_count)?;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE files
                 SET filename = ?, rel_path = ?, slide_count = ?, checksum = ?,
                     conversion_status = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    filename,
                    rel_path,
                    file.slide_count,
                    file.checksum,
                    file.conversion_status,
                    Utc::now(),
                    file.id,
                ],
            )?;
            affected(rows, "file", file.id)
        })?;

        tracing::info!(
            "Updated file {} '{}' ({}, {} slides)",
            file.id,
            rel_path,
            file.conversion_status,
            file.slide_count.map_or_else(|| "?".to_string(), |n| n.to_string())
        );
        Ok(())
    }

    /// Record conversion progress reported by the conversion pipeline
    pub fn set_conversion_status(&self, id: i64, status: ConversionStatus) -> Result<()> {
        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE files SET conversion_status = ?, updated_at = ? WHERE id = ?",
                params![status, Utc::now(), id],
            )?;
            affected(rows, "file", id)
        })?;

        tracing::info!("File {} conversion status set to {}", id, status);
        Ok(())
    }

    /// Delete a file and its slides, elements, and tags
    pub fn delete_file(&self, id: i64) -> Result<()> {
        let (rel_path, slides) = self.write(|tx| {
            let file = load_file(tx, id)?;
            let slides: i64 = tx.query_row(
                "SELECT COUNT(*) FROM slides WHERE file_id = ?",
                params![id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM files WHERE id = ?", params![id])?;
            Ok((file.rel_path, slides))
        })?;

        tracing::info!("Deleted file {} '{}' and its {} slides", id, rel_path, slides);
        Ok(())
    }
}
