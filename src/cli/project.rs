use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use super::resolve_project;
use crate::store::{CatalogStore, ConversionStatus};

/// Source formats picked up by `scan`
const DECK_EXTENSIONS: [&str; 3] = ["pptx", "ppt", "pdf"];

pub fn create(store: &CatalogStore, name: String, folder: String) -> Result<()> {
    let folder = shellexpand::tilde(&folder).to_string();
    let id = store.create_project(&name, &folder)?;
    println!("Project '{}' created with ID: {}", name, id);
    Ok(())
}

pub fn list(store: &CatalogStore) -> Result<()> {
    let projects = store.list_projects()?;
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("{:<6} {:<24} {:<6} {:<40}", "ID", "Name", "Files", "Folder");
    println!("{}", "-".repeat(80));
    for p in projects {
        let files = store.get_files_for_project(p.id)?.len();
        println!(
            "{:<6} {:<24} {:<6} {:<40}",
            p.id,
            super::truncate(&p.name, 24),
            files,
            p.folder_path
        );
    }
    Ok(())
}

pub fn show(store: &CatalogStore, query: String) -> Result<()> {
    let project = resolve_project(store, &query)?;
    println!("Project {}: {}", project.id, project.name);
    println!("Folder:  {}", project.folder_path);
    println!("Created: {}", project.stamps.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", project.stamps.updated_at.format("%Y-%m-%d %H:%M"));

    let files = store.get_files_for_project(project.id)?;
    println!("\n{} files", files.len());
    for file in files {
        println!(
            "  {:<6} {:<12} {}",
            file.id, file.conversion_status, file.rel_path
        );
    }
    Ok(())
}

pub fn delete(store: &CatalogStore, query: String) -> Result<()> {
    let project = resolve_project(store, &query)?;
    store.delete_project(project.id)?;
    println!("Deleted project '{}'", project.name);
    Ok(())
}

/// Register every deck under the project folder; changed files go back to Pending
pub fn scan(store: &CatalogStore, query: String) -> Result<()> {
    let project = resolve_project(store, &query)?;
    let root = Path::new(&project.folder_path);
    if !root.is_dir() {
        anyhow::bail!("Project folder does not exist: {}", root.display());
    }

    let (mut added, mut changed, mut unchanged) = (0, 0, 0);

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_deck(e.path()))
    {
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let filename = entry.file_name().to_string_lossy().to_string();
        let checksum = checksum(entry.path())?;

        match store.find_file(project.id, &rel_path)? {
            None => {
                store.add_file(project.id, &filename, &rel_path, Some(&checksum))?;
                println!("   + {}", rel_path);
                added += 1;
            }
            Some(mut file) if file.checksum.as_deref() != Some(checksum.as_str()) => {
                file.checksum = Some(checksum);
                file.slide_count = None;
                file.conversion_status = ConversionStatus::Pending;
                store.update_file(&file)?;
                println!("   ~ {}", rel_path);
                changed += 1;
            }
            Some(_) => unchanged += 1,
        }
    }

    println!(
        "\nScanned '{}': {} added, {} changed, {} unchanged",
        project.name, added, changed, unchanged
    );
    Ok(())
}

fn is_deck(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DECK_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
        .unwrap_or(false)
}

/// Hex SHA-256 of the file contents
fn checksum(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("reading {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}
