use anyhow::Result;

use super::truncate;
use crate::store::CatalogStore;

pub fn run(store: &CatalogStore, query: String, limit: usize) -> Result<()> {
    let slides = store.search_slides(&query, limit)?;
    if slides.is_empty() {
        println!("No slides match '{}'.", query);
        return Ok(());
    }

    println!("{:<6} {:<6} {:<6} {:<40} {}", "ID", "File", "Index", "Title", "Notes");
    println!("{}", "-".repeat(100));
    for slide in slides {
        let title = slide
            .title
            .as_deref()
            .map(|t| truncate(t, 40))
            .unwrap_or_else(|| "-".to_string());
        let notes = slide.notes.as_deref().map(|n| truncate(n, 40));
        println!(
            "{:<6} {:<6} {:<6} {:<40} {}",
            slide.id,
            slide.file_id,
            slide.slide_index,
            title,
            notes.unwrap_or_default()
        );
    }
    Ok(())
}
