//! Row types returned by the catalog store

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================
// SHARED COLUMNS
// ============================================

/// Creation/modification pair embedded by projects and files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================
// ENUMS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Pending => "Pending",
            ConversionStatus::InProgress => "In Progress",
            ConversionStatus::Completed => "Completed",
            ConversionStatus::Failed => "Failed",
        }
    }
}

impl FromStr for ConversionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ConversionStatus::Pending),
            "In Progress" => Ok(ConversionStatus::InProgress),
            "Completed" => Ok(ConversionStatus::Completed),
            "Failed" => Ok(ConversionStatus::Failed),
            other => Err(format!("unknown conversion status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Topic,
    Title,
    Name,
}

impl KeywordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordKind::Topic => "topic",
            KeywordKind::Title => "title",
            KeywordKind::Name => "name",
        }
    }
}

impl FromStr for KeywordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "topic" => Ok(KeywordKind::Topic),
            "title" => Ok(KeywordKind::Title),
            "name" => Ok(KeywordKind::Name),
            other => Err(format!("unknown keyword kind: {other}")),
        }
    }
}

macro_rules! text_column {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_column!(ConversionStatus);
text_column!(KeywordKind);

// ============================================
// ENTITIES
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub folder_path: String,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    pub id: i64,
    pub project_id: i64,
    pub filename: String,
    pub rel_path: String,
    pub slide_count: Option<i64>,
    pub checksum: Option<String>,
    pub conversion_status: ConversionStatus,
    #[serde(flatten)]
    pub stamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub id: i64,
    pub file_id: i64,
    pub slide_index: i64,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub thumb_rel_path: Option<String>,
    pub image_rel_path: Option<String>,
}

/// Slide content supplied by the conversion pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSlide {
    pub slide_index: i64,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub thumb_rel_path: Option<String>,
    pub image_rel_path: Option<String>,
}

impl NewSlide {
    pub fn at(slide_index: i64) -> Self {
        Self {
            slide_index,
            ..Default::default()
        }
    }
}

/// Tagged region on a slide, in slide units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub id: i64,
    pub slide_id: i64,
    pub element_type: String,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewElement {
    pub element_type: String,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub id: i64,
    pub keyword: String,
    pub kind: KeywordKind,
}
