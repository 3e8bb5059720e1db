//! Raster patches: dense `f64` grids over a pixel bounding box.
//!
//! A [`Patch`] is the unit of data exchanged between the reprojector, the
//! weight builder and the accumulator. Cells outside an input's valid data
//! carry the no-data sentinel. Weight rasters reuse the same type with a
//! no-data value of `0.0`.

use anyhow::{Result, ensure};

use super::PixelBBox;

/// A dense row-major `f64` raster aligned to a [`PixelBBox`].
///
/// Pixel access uses absolute coordinates of the owning grid, not offsets
/// into the patch, so patches over different windows of the same grid
/// compose without index arithmetic at the call sites.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
	bbox: PixelBBox,
	data: Vec<f64>,
	nodata: f64,
}

impl Patch {
	/// Creates a patch with every cell set to the no-data value.
	pub fn new_nodata(bbox: PixelBBox, nodata: f64) -> Patch {
		Patch {
			bbox,
			data: vec![nodata; bbox.area() as usize],
			nodata,
		}
	}

	/// Creates a patch with every cell set to `value`.
	pub fn filled(bbox: PixelBBox, value: f64, nodata: f64) -> Patch {
		Patch {
			bbox,
			data: vec![value; bbox.area() as usize],
			nodata,
		}
	}

	/// Wraps an existing row-major buffer.
	pub fn from_vec(bbox: PixelBBox, data: Vec<f64>, nodata: f64) -> Result<Patch> {
		ensure!(
			data.len() as u64 == bbox.area(),
			"patch buffer length ({}) does not match bbox area ({})",
			data.len(),
			bbox.area()
		);
		Ok(Patch { bbox, data, nodata })
	}

	pub fn bbox(&self) -> &PixelBBox {
		&self.bbox
	}

	pub fn nodata(&self) -> f64 {
		self.nodata
	}

	pub fn width(&self) -> u64 {
		self.bbox.width()
	}

	pub fn height(&self) -> u64 {
		self.bbox.height()
	}

	/// Reads the cell at an absolute pixel coordinate.
	pub fn get(&self, x: i64, y: i64) -> f64 {
		self.data[self.bbox.offset_of(x, y)]
	}

	/// Writes the cell at an absolute pixel coordinate.
	pub fn set(&mut self, x: i64, y: i64, value: f64) {
		let offset = self.bbox.offset_of(x, y);
		self.data[offset] = value;
	}

	/// True if the cell holds the no-data sentinel (NaN-safe).
	pub fn is_nodata(&self, x: i64, y: i64) -> bool {
		let v = self.get(x, y);
		v == self.nodata || v.is_nan()
	}

	/// True if the coordinate lies inside the patch and holds data.
	pub fn is_valid(&self, x: i64, y: i64) -> bool {
		self.bbox.contains(x, y) && !self.is_nodata(x, y)
	}

	/// The raw row-major buffer.
	pub fn values(&self) -> &[f64] {
		&self.data
	}

	pub fn values_mut(&mut self) -> &mut [f64] {
		&mut self.data
	}

	/// Consumes the patch, returning its buffer.
	pub fn into_values(self) -> Vec<f64> {
		self.data
	}

	/// A copy of the window `bbox`, which must lie inside this patch.
	pub fn cropped(&self, bbox: &PixelBBox) -> Result<Patch> {
		ensure!(
			self.bbox.intersection(bbox) == *bbox,
			"crop window {bbox:?} exceeds patch bounds {:?}",
			self.bbox
		);
		let mut out = Patch::new_nodata(*bbox, self.nodata);
		for (x, y) in bbox.iter_pixels() {
			out.set(x, y, self.get(x, y));
		}
		Ok(out)
	}

	/// True if no cell holds data.
	pub fn is_all_nodata(&self) -> bool {
		self.data.iter().all(|&v| v == self.nodata || v.is_nan())
	}

	/// Number of cells holding data.
	pub fn count_valid(&self) -> usize {
		self.data.iter().filter(|&&v| v != self.nodata && !v.is_nan()).count()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_nodata() {
		let bbox = PixelBBox::new(5, 5, 8, 7).unwrap();
		let patch = Patch::new_nodata(bbox, -9999.0);
		assert_eq!(patch.values().len(), 6);
		assert!(patch.is_all_nodata());
		assert!(patch.is_nodata(5, 5));
		assert_eq!(patch.count_valid(), 0);
	}

	#[test]
	fn test_absolute_coordinates() {
		let bbox = PixelBBox::new(10, 20, 13, 22).unwrap();
		let mut patch = Patch::new_nodata(bbox, -1.0);
		patch.set(12, 21, 42.0);
		assert_eq!(patch.get(12, 21), 42.0);
		assert!(patch.is_valid(12, 21));
		assert!(!patch.is_valid(9, 21));
		assert_eq!(patch.values()[5], 42.0);
	}

	#[test]
	fn test_from_vec_checks_length() {
		let bbox = PixelBBox::new(0, 0, 2, 2).unwrap();
		assert!(Patch::from_vec(bbox, vec![1.0; 3], 0.0).is_err());
		let patch = Patch::from_vec(bbox, vec![1.0, 2.0, 3.0, 4.0], 0.0).unwrap();
		assert_eq!(patch.get(1, 1), 4.0);
	}

	#[test]
	fn test_cropped() {
		let bbox = PixelBBox::new(0, 0, 4, 4).unwrap();
		let mut patch = Patch::new_nodata(bbox, -1.0);
		patch.set(2, 2, 9.0);

		let window = PixelBBox::new(1, 1, 3, 3).unwrap();
		let cropped = patch.cropped(&window).unwrap();
		assert_eq!(*cropped.bbox(), window);
		assert_eq!(cropped.get(2, 2), 9.0);
		assert!(cropped.is_nodata(1, 1));

		assert!(patch.cropped(&PixelBBox::new(2, 2, 5, 5).unwrap()).is_err());
	}

	#[test]
	fn test_nan_counts_as_nodata() {
		let bbox = PixelBBox::new(0, 0, 2, 1).unwrap();
		let patch = Patch::from_vec(bbox, vec![f64::NAN, 7.0], -9999.0).unwrap();
		assert!(patch.is_nodata(0, 0));
		assert!(!patch.is_nodata(1, 0));
		assert_eq!(patch.count_valid(), 1);
	}
}
