//! SQLite schema definition - catalog v2
//!
//! Key changes from v1:
//! - Added slides.notes (searchable alongside the title)
//! - Added files.conversion_status, backfilled from slide_count
//!
//! The full-text shadow table is not version-tracked; see `FTS_TABLE`.

/// Version stamped into `PRAGMA user_version` by this build
pub const SCHEMA_VERSION: i64 = 2;

pub const SCHEMA: &str = r#"
-- ============================================
-- PROJECTS & FILES
-- ============================================

-- A project is one folder of source decks
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    folder_path TEXT NOT NULL UNIQUE,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);

-- Source files (pptx, pdf) inside a project folder
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    rel_path TEXT NOT NULL,                -- Relative to the project folder
    slide_count INTEGER,                   -- NULL until converted
    checksum TEXT,
    conversion_status TEXT NOT NULL DEFAULT 'Pending'
        CHECK (conversion_status IN ('Pending', 'In Progress', 'Completed', 'Failed')),
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(project_id, rel_path),
    FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE
);

-- ============================================
-- SLIDES & ELEMENTS
-- ============================================

CREATE TABLE IF NOT EXISTS slides (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL,
    slide_index INTEGER NOT NULL CHECK (slide_index >= 0),  -- 0-based
    title TEXT,
    notes TEXT,
    thumb_rel_path TEXT,
    image_rel_path TEXT,
    UNIQUE(file_id, slide_index),
    FOREIGN KEY(file_id) REFERENCES files(id) ON DELETE CASCADE
);

-- Tagged regions on a slide
CREATE TABLE IF NOT EXISTS elements (
    id INTEGER PRIMARY KEY,
    slide_id INTEGER NOT NULL,
    element_type TEXT NOT NULL,
    bbox_x REAL NOT NULL,
    bbox_y REAL NOT NULL,
    bbox_w REAL NOT NULL CHECK (bbox_w >= 0),
    bbox_h REAL NOT NULL CHECK (bbox_h >= 0),
    FOREIGN KEY(slide_id) REFERENCES slides(id) ON DELETE CASCADE
);

-- ============================================
-- KEYWORDS
-- ============================================

CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY,
    keyword TEXT NOT NULL COLLATE NOCASE,
    kind TEXT NOT NULL CHECK (kind IN ('topic', 'title', 'name')),
    UNIQUE(keyword, kind)
);

CREATE TABLE IF NOT EXISTS slide_keywords (
    slide_id INTEGER NOT NULL,
    keyword_id INTEGER NOT NULL,
    PRIMARY KEY(slide_id, keyword_id),
    FOREIGN KEY(slide_id) REFERENCES slides(id) ON DELETE CASCADE,
    FOREIGN KEY(keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS element_keywords (
    element_id INTEGER NOT NULL,
    keyword_id INTEGER NOT NULL,
    PRIMARY KEY(element_id, keyword_id),
    FOREIGN KEY(element_id) REFERENCES elements(id) ON DELETE CASCADE,
    FOREIGN KEY(keyword_id) REFERENCES keywords(id) ON DELETE CASCADE
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_files_project ON files(project_id);
CREATE INDEX IF NOT EXISTS idx_slides_file ON slides(file_id);
CREATE INDEX IF NOT EXISTS idx_elements_slide ON elements(slide_id);
CREATE INDEX IF NOT EXISTS idx_slide_keywords_keyword ON slide_keywords(keyword_id);
CREATE INDEX IF NOT EXISTS idx_element_keywords_keyword ON element_keywords(keyword_id);
"#;

/// v1 -> v2
pub const MIGRATE_V1_TO_V2: &str = r#"
ALTER TABLE slides ADD COLUMN notes TEXT;

ALTER TABLE files ADD COLUMN conversion_status TEXT NOT NULL DEFAULT 'Pending'
    CHECK (conversion_status IN ('Pending', 'In Progress', 'Completed', 'Failed'));

-- Files that already carry a slide count were converted under v1
UPDATE files SET conversion_status = 'Completed' WHERE slide_count IS NOT NULL;
"#;

// ============================================
// FULL-TEXT SHADOW
// ============================================

pub const FTS_TABLE_NAME: &str = "slides_fts";

/// Searchable mirror of slide title and notes, keyed by slide id
pub const FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS slides_fts USING fts5(title, notes)
"#;

/// Populate the shadow table from slides that predate it
pub const FTS_BACKFILL: &str = r#"
INSERT INTO slides_fts(rowid, title, notes)
SELECT id, COALESCE(title, ''), COALESCE(notes, '') FROM slides
"#;

/// Triggers track row presence only. Text content is written by the
/// repository; a raw UPDATE of slides.title leaves the shadow row stale.
pub const FTS_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS slides_fts_insert AFTER INSERT ON slides BEGIN
    INSERT INTO slides_fts(rowid, title, notes) VALUES (new.id, '', '');
END;

CREATE TRIGGER IF NOT EXISTS slides_fts_delete AFTER DELETE ON slides BEGIN
    DELETE FROM slides_fts WHERE rowid = old.id;
END;
"#;
