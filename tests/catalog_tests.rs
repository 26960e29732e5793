use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rusqlite::params;
use slidecat::store::ConnectionPool;
use slidecat::{
    BoundingBox, CatalogError, CatalogStore, KeywordKind, NewElement, NewSlide, SchemaAction,
    StoreConfig,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> CatalogStore {
    CatalogStore::open(StoreConfig::new(dir.path().join("catalog.db"), 4)).unwrap()
}

fn count(store: &CatalogStore, sql: &str) -> i64 {
    store
        .transaction(|tx| Ok(tx.query_row(sql, [], |row| row.get(0))?))
        .unwrap()
}

#[test]
fn test_tagging_scenario() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let project = store.create_project("Demo", "/tmp/demo").unwrap();
    let file = store
        .add_file(project, "a.pptx", "a.pptx", Some("hash1"))
        .unwrap();
    let slide = store.add_slide(file, &NewSlide::at(0)).unwrap();
    let keyword = store
        .add_keyword_if_not_exists("finance", KeywordKind::Topic)
        .unwrap();
    assert_eq!((project, file, slide, keyword), (1, 1, 1, 1));

    store.link_slide_keyword(slide, keyword).unwrap();
    let tags = store.get_keywords_for_slide(1).unwrap();
    assert_eq!(
        serde_json::to_string(&tags).unwrap(),
        r#"[{"id":1,"keyword":"finance","kind":"topic"}]"#
    );
}

#[test]
fn test_duplicate_file_path_keeps_single_file() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let project = store.create_project("Demo", "/tmp/demo").unwrap();
    store
        .add_file(project, "a.pptx", "a.pptx", Some("hash1"))
        .unwrap();

    let err = store
        .add_file(project, "a.pptx", "a.pptx", Some("hash2"))
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateResource { .. }));
    assert_eq!(store.get_files_for_project(project).unwrap().len(), 1);
}

#[test]
fn test_project_delete_cascades_everywhere() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let project = store.create_project("Demo", "/tmp/demo").unwrap();
    let keep = store.create_project("Keep", "/tmp/keep").unwrap();
    let keyword = store
        .add_keyword_if_not_exists("finance", KeywordKind::Topic)
        .unwrap();

    for (p, name) in [(project, "a.pptx"), (keep, "b.pptx")] {
        let file = store.add_file(p, name, name, None).unwrap();
        for index in 0..3 {
            let slide = store
                .add_slide(
                    file,
                    &NewSlide {
                        title: Some(format!("Finance {index}")),
                        ..NewSlide::at(index)
                    },
                )
                .unwrap();
            let element = store
                .add_element(
                    slide,
                    &NewElement {
                        element_type: "chart".into(),
                        bbox: BoundingBox {
                            x: 0.0,
                            y: 0.0,
                            w: 10.0,
                            h: 5.0,
                        },
                    },
                )
                .unwrap();
            store.link_slide_keyword(slide, keyword).unwrap();
            store.link_element_keyword(element, keyword).unwrap();
        }
    }

    store.delete_project(project).unwrap();

    assert_eq!(count(&store, "SELECT COUNT(*) FROM files"), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM slides"), 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM elements"), 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM slide_keywords"), 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM element_keywords"), 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM slides_fts"), 3);
    assert_eq!(store.search_slides("finance", 10).unwrap().len(), 3);

    // The keyword itself is not owned by any project
    assert!(store.get_keyword(keyword).is_ok());
}

#[test]
fn test_keyword_creation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let first = store
        .add_keyword_if_not_exists("Finance", KeywordKind::Topic)
        .unwrap();
    let second = store
        .add_keyword_if_not_exists("FINANCE", KeywordKind::Topic)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM keywords"), 1);
}

#[test]
fn test_merge_leaves_no_trace_of_source() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);

    let project = store.create_project("Demo", "/tmp/demo").unwrap();
    let file = store.add_file(project, "a.pptx", "a.pptx", None).unwrap();
    let slides = store
        .replace_slides(file, &[NewSlide::at(0), NewSlide::at(1)])
        .unwrap();

    let source = store
        .add_keyword_if_not_exists("q3", KeywordKind::Topic)
        .unwrap();
    let target = store
        .add_keyword_if_not_exists("third quarter", KeywordKind::Topic)
        .unwrap();
    for slide in &slides {
        store.link_slide_keyword(*slide, source).unwrap();
    }
    store.link_slide_keyword(slides[0], target).unwrap();

    assert!(matches!(
        store.merge_keywords(source, source),
        Err(CatalogError::Validation(_))
    ));

    store.merge_keywords(source, target).unwrap();
    assert!(store.get_keyword(source).is_err());
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM slide_keywords WHERE keyword_id = 1"),
        0
    );
    let tagged: Vec<i64> = store
        .get_slides_for_keyword(target)
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(tagged, slides);
}

#[test]
fn test_failed_transaction_has_no_effect() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let project = store.create_project("Demo", "/tmp/demo").unwrap();

    let err = store
        .transaction(|tx| {
            tx.execute(
                "UPDATE projects SET name = 'Changed' WHERE id = ?",
                params![project],
            )?;
            Err::<(), _>(CatalogError::Validation("injected".into()))
        })
        .unwrap_err();

    assert!(matches!(err, CatalogError::Transaction(_)));
    assert_eq!(store.get_project(project).unwrap().name, "Demo");
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir));
    let project = store.create_project("Demo", "/tmp/demo").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..10 {
                    let name = format!("deck-{t}-{i}.pptx");
                    store.add_file(project, &name, &name, None).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_files_for_project(project).unwrap().len(), 40);
}

#[test]
fn test_exhausted_pool_times_out() {
    let dir = TempDir::new().unwrap();
    let mut config = StoreConfig::new(dir.path().join("catalog.db"), 1);
    config.acquire_timeout = Duration::from_millis(200);
    let pool = ConnectionPool::initialize(config).unwrap();

    let _held = pool.acquire().unwrap();
    let started = Instant::now();
    assert!(matches!(pool.acquire(), Err(CatalogError::Connection(_))));
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn test_restart_reconciles_once() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path().join("catalog.db"), 2);

    let first = CatalogStore::with_config(config.clone());
    assert_eq!(first.connect().unwrap(), SchemaAction::Created);
    let project = first.create_project("Demo", "/tmp/demo").unwrap();
    first.close();

    let second = CatalogStore::with_config(config);
    assert_eq!(second.connect().unwrap(), SchemaAction::UpToDate);
    assert_eq!(second.get_project(project).unwrap().name, "Demo");
}
