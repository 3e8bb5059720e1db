//! A toolbox for mosaicking overlapping digital elevation models into
//! tiled output rasters.
//!
//! This crate re-exports the workspace: [`demtiles_core`] for the
//! geospatial model, [`demtiles_raster`] for raster I/O and
//! [`demtiles_pipeline`] for the mosaicking pipeline itself. The `demtiles`
//! binary (feature `cli`) wraps them in a command line.

pub use demtiles_core::*;
pub use demtiles_pipeline::*;
pub use demtiles_raster::*;
