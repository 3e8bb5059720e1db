//! An in-memory raster source, used by tests and as a building block for
//! library consumers that already hold their data.

use anyhow::{Result, ensure};
use demtiles_core::{Georef, Patch, PixelBBox};

use crate::RasterSource;

/// A [`RasterSource`] over an owned buffer.
///
/// # Examples
/// ```
/// use demtiles_core::{Georef, PixelBBox, Srs};
/// use demtiles_raster::{MemoryRaster, RasterSource};
///
/// let georef = Georef::from_origin(Srs::new("EPSG:4326"), 0.0, 10.0, 1.0, 1.0, -9999.0).unwrap();
/// let raster = MemoryRaster::filled(georef, 10, 10, 100.0);
/// let patch = raster.read_block(&PixelBBox::new(2, 2, 5, 5).unwrap()).unwrap();
/// assert_eq!(patch.get(3, 3), 100.0);
/// ```
#[derive(Clone, Debug)]
pub struct MemoryRaster {
	georef: Georef,
	patch: Patch,
}

impl MemoryRaster {
	/// Wraps a row-major buffer of `width * height` values.
	pub fn new(georef: Georef, width: u64, height: u64, data: Vec<f64>) -> Result<MemoryRaster> {
		ensure!(width > 0 && height > 0, "raster dimensions must be positive");
		let bbox = PixelBBox::from_size(width, height);
		let patch = Patch::from_vec(bbox, data, georef.nodata())?;
		Ok(MemoryRaster { georef, patch })
	}

	/// A raster with every pixel set to `value`.
	pub fn filled(georef: Georef, width: u64, height: u64, value: f64) -> MemoryRaster {
		let bbox = PixelBBox::from_size(width, height);
		let patch = Patch::filled(bbox, value, georef.nodata());
		MemoryRaster { georef, patch }
	}

	/// A raster computed per pixel from `f(x, y)`.
	pub fn from_fn(georef: Georef, width: u64, height: u64, f: impl Fn(i64, i64) -> f64) -> MemoryRaster {
		let bbox = PixelBBox::from_size(width, height);
		let mut patch = Patch::new_nodata(bbox, georef.nodata());
		for (x, y) in bbox.iter_pixels() {
			patch.set(x, y, f(x, y));
		}
		MemoryRaster { georef, patch }
	}

	/// Overwrites one pixel; useful to punch no-data holes in test data.
	pub fn set(&mut self, x: i64, y: i64, value: f64) {
		self.patch.set(x, y, value);
	}
}

impl RasterSource for MemoryRaster {
	fn georef(&self) -> &Georef {
		&self.georef
	}

	fn pixel_bbox(&self) -> PixelBBox {
		*self.patch.bbox()
	}

	fn read_block(&self, bbox: &PixelBBox) -> Result<Patch> {
		ensure!(
			self.patch.bbox().intersection(bbox) == *bbox,
			"read window {bbox:?} exceeds raster extent {:?}",
			self.patch.bbox()
		);
		let mut block = Patch::new_nodata(*bbox, self.georef.nodata());
		for (x, y) in bbox.iter_pixels() {
			block.set(x, y, self.patch.get(x, y));
		}
		Ok(block)
	}
}
