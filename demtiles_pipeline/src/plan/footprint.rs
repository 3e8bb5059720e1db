//! Input footprints: where a raster lands in another coordinate frame.
//!
//! Reprojections are not affine, so a box's image is not a box. Sampling
//! the perimeter (corners plus evenly spaced edge points) and taking the
//! axis-aligned bound of the projected samples bounds curved edges closely
//! enough for grid planning and tile/input selection.

use anyhow::{Context, Result};
use demtiles_core::{Georef, PixelBBox, SrsTransform, WorldBBox};

/// Perimeter sample count per box edge, corners included.
pub const SAMPLES_PER_EDGE: usize = 21;

/// Pixel coordinates of the box corners plus evenly spaced points along
/// each edge.
pub fn perimeter_points(bbox: &PixelBBox, samples_per_edge: usize) -> Vec<(f64, f64)> {
	let n = samples_per_edge.max(2);
	let (x0, y0) = (bbox.x_min as f64, bbox.y_min as f64);
	let (x1, y1) = (bbox.x_max as f64, bbox.y_max as f64);

	let mut points = Vec::with_capacity(4 * (n - 1));
	for i in 0..n - 1 {
		let t = i as f64 / (n - 1) as f64;
		points.push((x0 + t * (x1 - x0), y0)); // top edge, left to right
		points.push((x1, y0 + t * (y1 - y0))); // right edge, top to bottom
		points.push((x1 - t * (x1 - x0), y1)); // bottom edge, right to left
		points.push((x0, y1 - t * (y1 - y0))); // left edge, bottom to top
	}
	points
}

/// The axis-aligned world-space bound of a raster region in a target SRS.
pub fn world_footprint(georef: &Georef, bbox: &PixelBBox, to_target: &dyn SrsTransform) -> Result<WorldBBox> {
	let mut points: Vec<(f64, f64)> = perimeter_points(bbox, SAMPLES_PER_EDGE)
		.into_iter()
		.map(|(px, py)| georef.pixel_to_world(px, py))
		.collect();
	to_target.transform_points(&mut points)?;
	WorldBBox::from_points(&points).context("footprint has no perimeter points")
}

/// The axis-aligned pixel-space bound of an input raster projected into the
/// output grid, rounded outward.
pub fn pixel_footprint(
	input_georef: &Georef,
	input_bbox: &PixelBBox,
	to_output: &dyn SrsTransform,
	output_georef: &Georef,
) -> Result<PixelBBox> {
	let mut points: Vec<(f64, f64)> = perimeter_points(input_bbox, SAMPLES_PER_EDGE)
		.into_iter()
		.map(|(px, py)| input_georef.pixel_to_world(px, py))
		.collect();
	to_output.transform_points(&mut points)?;

	let pixels: Vec<(f64, f64)> = points
		.into_iter()
		.map(|(wx, wy)| output_georef.world_to_pixel(wx, wy))
		.collect();
	Ok(PixelBBox::bounding(&pixels))
}

#[cfg(test)]
mod tests {
	use super::*;
	use demtiles_core::{IdentityTransform, MercatorTransform, Srs};

	fn georef(x0: f64, y0: f64, step: f64) -> Georef {
		Georef::from_origin(Srs::new("EPSG:4326"), x0, y0, step, step, -9999.0).unwrap()
	}

	#[test]
	fn test_perimeter_points_cover_corners() {
		let bbox = PixelBBox::new(0, 0, 10, 6).unwrap();
		let points = perimeter_points(&bbox, 5);
		assert_eq!(points.len(), 16);
		for corner in [(0.0, 0.0), (10.0, 0.0), (0.0, 6.0), (10.0, 6.0)] {
			assert!(points.contains(&corner), "missing corner {corner:?}");
		}
	}

	#[test]
	fn test_world_footprint_identity() {
		let georef = georef(10.0, 50.0, 0.5);
		let bbox = PixelBBox::new(0, 0, 10, 10).unwrap();
		let world = world_footprint(&georef, &bbox, &IdentityTransform).unwrap();
		assert_eq!(world.as_tuple(), (10.0, 45.0, 15.0, 50.0));
	}

	#[test]
	fn test_world_footprint_through_mercator() {
		let georef = georef(0.0, 10.0, 1.0);
		let bbox = PixelBBox::new(0, 0, 10, 10).unwrap();
		let world = world_footprint(&georef, &bbox, &MercatorTransform::forward()).unwrap();
		// 10 degrees of longitude in mercator meters.
		assert!((world.x_max - 1_113_194.9).abs() < 1.0);
		assert!(world.x_min.abs() < 1e-6);
	}

	#[test]
	fn test_pixel_footprint_offset_grids() {
		// Input shifted 5 units right and 2 down relative to the output.
		let output = georef(0.0, 20.0, 1.0);
		let input = georef(5.0, 18.0, 1.0);
		let bbox = PixelBBox::new(0, 0, 10, 10).unwrap();
		let footprint = pixel_footprint(&input, &bbox, &IdentityTransform, &output).unwrap();
		assert_eq!(footprint, PixelBBox::new(5, 2, 15, 12).unwrap());
	}

	#[test]
	fn test_pixel_footprint_finer_output() {
		let output = georef(0.0, 10.0, 0.5);
		let input = georef(0.0, 10.0, 1.0);
		let bbox = PixelBBox::new(0, 0, 4, 4).unwrap();
		let footprint = pixel_footprint(&input, &bbox, &IdentityTransform, &output).unwrap();
		assert_eq!(footprint, PixelBBox::new(0, 0, 8, 8).unwrap());
	}
}
