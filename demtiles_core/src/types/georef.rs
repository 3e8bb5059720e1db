//! Georeferences: the pair of a spatial reference system and an affine
//! pixel-to-world transform, plus the raster's no-data sentinel.

use anyhow::{Result, ensure};

use super::{PixelBBox, Srs, WorldBBox};

/// Default no-data value, matching the common DEM convention.
pub const DEFAULT_NODATA: f64 = -32768.0;

/// Locates a raster on a planet.
///
/// The affine uses the GDAL geotransform layout
/// `[x0, dx, rx, y0, ry, dy]`: pixel `(px, py)` maps to world
/// `(x0 + px*dx + py*rx, y0 + px*ry + py*dy)`. Pixel coordinates address
/// pixel corners; the center of pixel `(0, 0)` is at `(0.5, 0.5)`.
///
/// North-up rasters have `rx == ry == 0`, `dx > 0` and `dy < 0`.
///
/// # Examples
/// ```
/// use demtiles_core::{Georef, Srs};
///
/// let georef = Georef::from_origin(Srs::new("EPSG:4326"), 10.0, 50.0, 0.25, 0.25, -9999.0).unwrap();
/// assert_eq!(georef.pixel_to_world(0.0, 0.0), (10.0, 50.0));
/// assert_eq!(georef.pixel_to_world(4.0, 4.0), (11.0, 49.0));
/// assert_eq!(georef.world_to_pixel(11.0, 49.0), (4.0, 4.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Georef {
	srs: Srs,
	affine: [f64; 6],
	nodata: f64,
}

impl Georef {
	/// Creates a georeference from a GDAL-style geotransform.
	///
	/// Fails if any coefficient is not finite or the affine is not
	/// invertible.
	pub fn new(srs: Srs, affine: [f64; 6], nodata: f64) -> Result<Georef> {
		ensure!(
			affine.iter().all(|v| v.is_finite()),
			"geotransform coefficients must be finite, got {affine:?}"
		);
		let det = affine[1] * affine[5] - affine[2] * affine[4];
		ensure!(det != 0.0, "geotransform {affine:?} is not invertible");
		Ok(Georef { srs, affine, nodata })
	}

	/// Creates a north-up georeference anchored at the upper-left corner
	/// `(x0, y0)` with positive pixel sizes `dx` and `dy`.
	pub fn from_origin(srs: Srs, x0: f64, y0: f64, dx: f64, dy: f64, nodata: f64) -> Result<Georef> {
		ensure!(dx > 0.0 && dx.is_finite(), "pixel size dx ({dx}) must be finite and > 0");
		ensure!(dy > 0.0 && dy.is_finite(), "pixel size dy ({dy}) must be finite and > 0");
		Georef::new(srs, [x0, dx, 0.0, y0, 0.0, -dy], nodata)
	}

	pub fn srs(&self) -> &Srs {
		&self.srs
	}

	pub fn affine(&self) -> &[f64; 6] {
		&self.affine
	}

	pub fn nodata(&self) -> f64 {
		self.nodata
	}

	/// Horizontal pixel size, always positive.
	pub fn dx(&self) -> f64 {
		(self.affine[1].powi(2) + self.affine[4].powi(2)).sqrt()
	}

	/// Vertical pixel size, always positive.
	pub fn dy(&self) -> f64 {
		(self.affine[2].powi(2) + self.affine[5].powi(2)).sqrt()
	}

	/// Maps a (fractional) pixel coordinate to world coordinates.
	pub fn pixel_to_world(&self, px: f64, py: f64) -> (f64, f64) {
		let a = &self.affine;
		(a[0] + px * a[1] + py * a[2], a[3] + px * a[4] + py * a[5])
	}

	/// Maps a world coordinate to (fractional) pixel coordinates.
	pub fn world_to_pixel(&self, wx: f64, wy: f64) -> (f64, f64) {
		let a = &self.affine;
		let det = a[1] * a[5] - a[2] * a[4];
		let dx = wx - a[0];
		let dy = wy - a[3];
		((dx * a[5] - dy * a[2]) / det, (dy * a[1] - dx * a[4]) / det)
	}

	/// The world-space extent of a pixel box under this georeference.
	pub fn world_bbox(&self, bbox: &PixelBBox) -> Result<WorldBBox> {
		let corners = [
			self.pixel_to_world(bbox.x_min as f64, bbox.y_min as f64),
			self.pixel_to_world(bbox.x_max as f64, bbox.y_min as f64),
			self.pixel_to_world(bbox.x_min as f64, bbox.y_max as f64),
			self.pixel_to_world(bbox.x_max as f64, bbox.y_max as f64),
		];
		WorldBBox::from_points(&corners)
			.ok_or_else(|| anyhow::anyhow!("cannot compute the world bbox of the empty pixel bbox {bbox:?}"))
	}

	/// Restricts the georeference to a pixel box: the result's pixel
	/// `(0, 0)` is this georeference's pixel `(bbox.x_min, bbox.y_min)`.
	pub fn crop(&self, bbox: &PixelBBox) -> Georef {
		let (x0, y0) = self.pixel_to_world(bbox.x_min as f64, bbox.y_min as f64);
		let mut affine = self.affine;
		affine[0] = x0;
		affine[3] = y0;
		Georef {
			srs: self.srs.clone(),
			affine,
			nodata: self.nodata,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn georef() -> Georef {
		Georef::from_origin(Srs::new("EPSG:32633"), 500_000.0, 4_600_000.0, 30.0, 30.0, -9999.0).unwrap()
	}

	#[test]
	fn test_new_rejects_degenerate_affines() {
		let srs = Srs::new("EPSG:4326");
		assert!(Georef::new(srs.clone(), [0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0).is_err());
		assert!(Georef::new(srs.clone(), [0.0, 1.0, 0.0, 0.0, 0.0, f64::NAN], 0.0).is_err());
		assert!(Georef::from_origin(srs.clone(), 0.0, 0.0, 0.0, 1.0, 0.0).is_err());
		assert!(Georef::from_origin(srs, 0.0, 0.0, 1.0, -1.0, 0.0).is_err());
	}

	#[test]
	fn test_pixel_world_round_trip() {
		let georef = georef();
		let (wx, wy) = georef.pixel_to_world(12.5, 7.25);
		let (px, py) = georef.world_to_pixel(wx, wy);
		assert_abs_diff_eq!(px, 12.5, epsilon = 1e-9);
		assert_abs_diff_eq!(py, 7.25, epsilon = 1e-9);
	}

	#[test]
	fn test_round_trip_with_rotation_terms() {
		let georef = Georef::new(Srs::new("EPSG:4326"), [10.0, 0.5, 0.1, 20.0, -0.05, -0.5], 0.0).unwrap();
		let (wx, wy) = georef.pixel_to_world(3.0, 4.0);
		let (px, py) = georef.world_to_pixel(wx, wy);
		assert_abs_diff_eq!(px, 3.0, epsilon = 1e-9);
		assert_abs_diff_eq!(py, 4.0, epsilon = 1e-9);
	}

	#[test]
	fn test_pixel_sizes() {
		let georef = georef();
		assert_abs_diff_eq!(georef.dx(), 30.0);
		assert_abs_diff_eq!(georef.dy(), 30.0);
	}

	#[test]
	fn test_world_bbox_is_axis_aligned() {
		let georef = georef();
		let bbox = PixelBBox::new(0, 0, 100, 50).unwrap();
		let world = georef.world_bbox(&bbox).unwrap();
		assert_abs_diff_eq!(world.x_min, 500_000.0);
		assert_abs_diff_eq!(world.x_max, 503_000.0);
		assert_abs_diff_eq!(world.y_min, 4_598_500.0);
		assert_abs_diff_eq!(world.y_max, 4_600_000.0);
	}

	#[test]
	fn test_crop_shifts_origin() {
		let georef = georef();
		let cropped = georef.crop(&PixelBBox::new(10, 20, 40, 60).unwrap());
		assert_eq!(cropped.pixel_to_world(0.0, 0.0), georef.pixel_to_world(10.0, 20.0));
		assert_eq!(cropped.dx(), georef.dx());
		assert_eq!(cropped.nodata(), georef.nodata());
	}
}
