//! The demtiles mosaicking pipeline.
//!
//! Combines overlapping DEMs into one output grid, tile by tile: the grid
//! planner projects the output georeference and partitions it into tiles,
//! the tile planner selects contributing inputs per tile, the reprojector
//! resamples each input into the tile frame, the weight builder derives
//! per-input blending weights, the accumulator folds value/weight patches
//! into the finished tile, and the post-processor applies hole filling,
//! blurring and erosion. The driver runs tiles in parallel and commits them
//! through a [`TileWriter`](demtiles_raster::TileWriter).

mod accumulate;
pub use accumulate::*;

mod driver;
pub use driver::*;

mod params;
pub use params::*;

mod plan;
pub use plan::*;

mod postprocess;
pub use postprocess::*;

mod reproject;
pub use reproject::*;

mod weights;
pub use weights::*;
