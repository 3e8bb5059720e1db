//! Raster I/O for the demtiles toolbox.
//!
//! Defines the [`RasterSource`] and [`TileWriter`] interfaces the pipeline
//! consumes, an in-memory raster for tests and library use, a bounded pool
//! of lazily opened readers, and (behind the `gdal` feature) GDAL-backed
//! implementations for on-disk formats.

#[cfg(feature = "gdal")]
pub mod gdal;

mod memory;
pub use memory::*;

mod output_type;
pub use output_type::*;

mod pool;
pub use pool::*;

mod source;
pub use source::*;

mod writer;
pub use writer::*;
