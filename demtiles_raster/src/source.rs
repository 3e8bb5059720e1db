//! The raster read interface consumed by the mosaicking pipeline.

use anyhow::Result;
use demtiles_core::{Georef, Patch, PixelBBox};
use std::fmt::Debug;

/// A georeferenced single-band raster that can be read block-wise.
///
/// Implementations must be safe for concurrent `read_block` calls on
/// distinct handles; a single handle is only used by one worker at a time.
pub trait RasterSource: Send + Sync + Debug {
	/// The source's georeference (projection, affine, no-data value).
	fn georef(&self) -> &Georef;

	/// The full extent in the source's own pixel coordinates, anchored at
	/// the origin.
	fn pixel_bbox(&self) -> PixelBBox;

	/// Reads the given window as `f64` values with the georef's no-data
	/// sentinel. The window must lie inside [`pixel_bbox`](Self::pixel_bbox).
	fn read_block(&self, bbox: &PixelBBox) -> Result<Patch>;
}
