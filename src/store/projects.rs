use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Project, Timestamps};
use super::{affected, exists, require, CatalogStore};
use crate::error::{CatalogError, Result};

const PROJECT_COLUMNS: &str = "id, name, folder_path, created_at, updated_at";

fn map_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        folder_path: row.get(2)?,
        stamps: Timestamps {
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        },
    })
}

pub(crate) fn load_project(conn: &Connection, id: i64) -> Result<Project> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
        params![id],
        map_project,
    )
    .optional()?
    .ok_or(CatalogError::not_found("project", id))
}

impl CatalogStore {
    // ============================================
    // PROJECTS
    // ============================================

    /// Create a new project rooted at `folder_path`
    pub fn create_project(&self, name: &str, folder_path: &str) -> Result<i64> {
        let name = require("project name", name)?;
        let folder_path = require("folder path", folder_path)?;
        let stamps = Timestamps::now();

        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO projects (name, folder_path, created_at, updated_at)
                 VALUES (?, ?, ?, ?)",
                params![name, folder_path, stamps.created_at, stamps.updated_at],
            )?;
            Ok(tx.last_insert_rowid())
        })?;

        tracing::info!("Created project {} '{}' at {}", id, name, folder_path);
        Ok(id)
    }

    pub fn get_project(&self, id: i64) -> Result<Project> {
        self.read(|conn| load_project(conn, id))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name COLLATE NOCASE, id"
            ))?;
            let rows = stmt.query_map([], map_project)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    /// Find project by its folder
    pub fn find_project_by_folder(&self, folder_path: &str) -> Result<Option<Project>> {
        let folder_path = folder_path.trim();
        self.read(|conn| {
            conn.query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE folder_path = ?"),
                params![folder_path],
                map_project,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn project_exists(&self, id: i64) -> Result<bool> {
        self.read(|conn| exists(conn, "SELECT 1 FROM projects WHERE id = ?", id))
    }

    pub fn update_project(&self, id: i64, name: &str, folder_path: &str) -> Result<()> {
        let name = require("project name", name)?;
        let folder_path = require("folder path", folder_path)?;

        self.write(|tx| {
            let rows = tx.execute(
                "UPDATE projects SET name = ?, folder_path = ?, updated_at = ? WHERE id = ?",
                params![name, folder_path, Utc::now(), id],
            )?;
            affected(rows, "project", id)
        })?;

        tracing::info!("Updated project {}: name '{}', folder {}", id, name, folder_path);
        Ok(())
    }

    /// Delete a project and everything below it
    pub fn delete_project(&self, id: i64) -> Result<()> {
        let (name, files) = self.write(|tx| {
            let project = load_project(tx, id)?;
            let files: i64 = tx.query_row(
                "SELECT COUNT(*) FROM files WHERE project_id = ?",
                params![id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM projects WHERE id = ?", params![id])?;
            Ok((project.name, files))
        })?;

        tracing::info!("Deleted project {} '{}' and its {} files", id, name, files);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    #[test]
    fn test_create_and_get_round_trip() {
        let (_dir, store) = testing::store();
        let id = store.create_project("Demo", "/tmp/demo").unwrap();
        assert_eq!(id, 1);

        let project = store.get_project(id).unwrap();
        assert_eq!(project.name, "Demo");
        assert_eq!(project.folder_path, "/tmp/demo");
        assert_eq!(project.stamps.created_at, project.stamps.updated_at);
        assert_eq!(store.list_projects().unwrap(), vec![project]);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let (_dir, store) = testing::store();
        assert!(matches!(
            store.create_project("  ", "/tmp/demo"),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_folder_names_projects_table() {
        let (_dir, store) = testing::store();
        store.create_project("Demo", "/tmp/demo").unwrap();
        match store.create_project("Copy", "/tmp/demo") {
            Err(CatalogError::DuplicateResource { resource, detail }) => {
                assert_eq!(resource, "projects");
                assert_eq!(detail, "folder_path");
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_find_by_folder() {
        let (_dir, store) = testing::store();
        let id = store.create_project("Demo", "/tmp/demo").unwrap();
        assert_eq!(
            store.find_project_by_folder("/tmp/demo").unwrap().map(|p| p.id),
            Some(id)
        );
        assert!(store.find_project_by_folder("/nowhere").unwrap().is_none());
        assert!(store.project_exists(id).unwrap());
        assert!(!store.project_exists(id + 1).unwrap());
    }

    #[test]
    fn test_update_and_missing_ids() {
        let (_dir, store) = testing::store();
        let id = store.create_project("Demo", "/tmp/demo").unwrap();
        store.update_project(id, "Renamed", "/tmp/renamed").unwrap();

        let project = store.get_project(id).unwrap();
        assert_eq!(project.name, "Renamed");
        assert!(project.stamps.updated_at >= project.stamps.created_at);

        assert!(matches!(
            store.get_project(99),
            Err(CatalogError::ResourceNotFound { resource: "project", id: 99 })
        ));
        assert!(matches!(
            store.update_project(99, "x", "/x"),
            Err(CatalogError::ResourceNotFound { .. })
        ));
        assert!(matches!(
            store.delete_project(99),
            Err(CatalogError::ResourceNotFound { .. })
        ));
    }
}
