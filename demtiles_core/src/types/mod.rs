//! Geospatial model types: spatial reference systems, georeferences,
//! pixel/world bounding boxes and raster patches.

mod georef;
pub use georef::*;

mod patch;
pub use patch::*;

mod pixel_bbox;
pub use pixel_bbox::*;

mod srs;
pub use srs::*;

mod world_bbox;
pub use world_bbox::*;
