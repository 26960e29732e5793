pub mod cli;
pub mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::{CatalogError, Result};
pub use store::{
    BoundingBox, CatalogStore, ConversionStatus, Element, File, Keyword, KeywordKind, NewElement,
    NewSlide, Project, SchemaAction, Slide, StoreConfig,
};
