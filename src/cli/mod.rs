//! Command implementations for the `slidecat` binary

pub mod file;
pub mod init;
pub mod keyword;
pub mod project;
pub mod search;

use anyhow::{anyhow, Result};

use crate::store::{CatalogStore, Project};

/// Find a project by numeric id or exact name
pub fn resolve_project(store: &CatalogStore, query: &str) -> Result<Project> {
    if let Ok(id) = query.parse::<i64>() {
        if let Ok(project) = store.get_project(id) {
            return Ok(project);
        }
    }
    store
        .list_projects()?
        .into_iter()
        .find(|p| p.name == query)
        .ok_or_else(|| anyhow!("Project not found: {}", query))
}

/// Shorten `text` to `max` characters, marking the cut with "..."
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or(text);
    if line.chars().count() > max {
        let kept: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        line.to_string()
    }
}
