//! Core types for the demtiles DEM mosaicking toolbox.
//!
//! Contains the geospatial model (spatial reference systems, georeferences,
//! pixel and world bounding boxes), the raster patch type exchanged between
//! pipeline stages, error kinds, a bounded LRU cache and progress reporting.

mod error;
pub use error::*;

mod limited_cache;
pub use limited_cache::*;

pub mod progress;

pub mod types;
pub use types::*;
