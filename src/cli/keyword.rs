use anyhow::{anyhow, Result};

use crate::store::{CatalogStore, KeywordKind};

fn parse_kind(kind: &str) -> Result<KeywordKind> {
    kind.parse().map_err(|e: String| anyhow!(e))
}

pub fn add(store: &CatalogStore, text: String, kind: String) -> Result<()> {
    let kind = parse_kind(&kind)?;
    let id = store.add_keyword_if_not_exists(&text, kind)?;
    println!("Keyword '{}' ({}) has ID: {}", text.trim(), kind, id);
    Ok(())
}

pub fn list(store: &CatalogStore, kind: Option<String>, json: bool) -> Result<()> {
    let kind = kind.as_deref().map(parse_kind).transpose()?;
    let keywords = store.list_keywords(kind)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&keywords)?);
        return Ok(());
    }

    if keywords.is_empty() {
        println!("No keywords found.");
        return Ok(());
    }

    println!("{:<6} {:<8} {:<8} {}", "ID", "Kind", "Slides", "Keyword");
    println!("{}", "-".repeat(50));
    for keyword in keywords {
        let slides = store.get_slides_for_keyword(keyword.id)?.len();
        println!(
            "{:<6} {:<8} {:<8} {}",
            keyword.id, keyword.kind, slides, keyword.keyword
        );
    }
    Ok(())
}

pub fn merge(store: &CatalogStore, source: i64, target: i64) -> Result<()> {
    let from = store.get_keyword(source)?;
    let into = store.get_keyword(target)?;
    store.merge_keywords(source, target)?;
    println!("Merged '{}' into '{}'", from.keyword, into.keyword);
    Ok(())
}

/// Tag a slide, or an element when `element` is set
pub fn tag(
    store: &CatalogStore,
    id: i64,
    text: String,
    kind: String,
    element: bool,
) -> Result<()> {
    let kind = parse_kind(&kind)?;
    let keyword_id = store.add_keyword_if_not_exists(&text, kind)?;
    if element {
        store.link_element_keyword(id, keyword_id)?;
        println!("Tagged element {} with '{}'", id, text.trim());
    } else {
        store.link_slide_keyword(id, keyword_id)?;
        println!("Tagged slide {} with '{}'", id, text.trim());
    }
    Ok(())
}
