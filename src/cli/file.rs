use anyhow::{anyhow, Result};

use super::resolve_project;
use crate::store::{CatalogStore, ConversionStatus};

pub fn list(store: &CatalogStore, project: String) -> Result<()> {
    let project = resolve_project(store, &project)?;
    let files = store.get_files_for_project(project.id)?;
    if files.is_empty() {
        println!("No files in '{}'. Run 'slidecat project scan' first.", project.name);
        return Ok(());
    }

    println!(
        "{:<6} {:<12} {:<7} {:<10} {}",
        "ID", "Status", "Slides", "Checksum", "Path"
    );
    println!("{}", "-".repeat(80));
    for file in files {
        let slides = file
            .slide_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let checksum = short_checksum(file.checksum.as_deref());
        println!(
            "{:<6} {:<12} {:<7} {:<10} {}",
            file.id, file.conversion_status, slides, checksum, file.rel_path
        );
    }
    Ok(())
}

pub fn status(store: &CatalogStore, file_id: i64, status: String) -> Result<()> {
    let status: ConversionStatus = status.parse().map_err(|e: String| anyhow!(e))?;
    store.set_conversion_status(file_id, status)?;
    println!("File {} is now {}", file_id, status);
    Ok(())
}

/// First eight characters of a checksum for table display
fn short_checksum(checksum: Option<&str>) -> String {
    checksum
        .map(|c| c.chars().take(8).collect())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_checksum() {
        assert_eq!(short_checksum(None), "-");
        assert_eq!(short_checksum(Some("abc")), "abc");
        assert_eq!(short_checksum(Some("e3b0c44298fc1c149afbf4c8")), "e3b0c442");
        // Multi-byte characters are kept whole
        assert_eq!(short_checksum(Some("ééééééééé")), "éééééééé");
    }
}
