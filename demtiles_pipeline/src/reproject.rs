//! Reprojection of one input into a tile's pixel frame.
//!
//! Inverse mapping: every output pixel center maps through the output
//! affine, the SRS transform and the input's inverse affine to a fractional
//! input pixel, which is sampled bilinearly. No-data propagates strictly:
//! any contributing no-data neighbor poisons the output cell.

use anyhow::Result;
use demtiles_core::{Patch, PixelBBox};
use demtiles_raster::RasterSource;

use crate::InputHandle;

/// Resamples `input` over the crop box of one tile.
///
/// Returns `None` when the input does not actually cover any crop pixel.
/// The returned patch spans exactly `crop_bbox` and uses `out_nodata` as
/// its sentinel. Input values at or below `nodata_threshold` count as
/// no-data.
pub fn reproject_input(
	source: &dyn RasterSource,
	input: &InputHandle,
	output_georef: &demtiles_core::Georef,
	crop_bbox: &PixelBBox,
	out_nodata: f64,
	nodata_threshold: Option<f64>,
) -> Result<Option<Patch>> {
	let width = crop_bbox.width() as usize;
	let height = crop_bbox.height() as usize;

	// Map every crop pixel center into the input's fractional pixel frame.
	let mut points: Vec<(f64, f64)> = Vec::with_capacity(width * height);
	for (x, y) in crop_bbox.iter_pixels() {
		points.push(output_georef.pixel_to_world(x as f64 + 0.5, y as f64 + 0.5));
	}
	input.to_input.transform_points(&mut points)?;
	let samples: Vec<(f64, f64)> = points
		.into_iter()
		.map(|(wx, wy)| input.georef.world_to_pixel(wx, wy))
		.collect();

	// The minimal input rectangle referenced by any bilinear quadruplet.
	let Some(read_bbox) = read_window(&samples, &input.pixel_bbox) else {
		return Ok(None);
	};
	let block = source.read_block(&read_bbox)?;

	let mut patch = Patch::new_nodata(*crop_bbox, out_nodata);
	let mut any_valid = false;
	for (offset, (x, y)) in crop_bbox.iter_pixels().enumerate() {
		let (u, v) = samples[offset];
		if let Some(value) = sample_bilinear(&block, &input.pixel_bbox, u, v, nodata_threshold) {
			patch.set(x, y, value);
			any_valid = true;
		}
	}
	Ok(any_valid.then_some(patch))
}

/// The outward-rounded bound of all bilinear neighbors of the in-range
/// samples, clipped to the input extent. `None` if no sample touches the
/// input.
fn read_window(samples: &[(f64, f64)], input_bbox: &PixelBBox) -> Option<PixelBBox> {
	let mut window: Option<PixelBBox> = None;
	for &(u, v) in samples {
		if !u.is_finite() || !v.is_finite() {
			continue;
		}
		if u < input_bbox.x_min as f64 || u > input_bbox.x_max as f64 || v < input_bbox.y_min as f64 || v > input_bbox.y_max as f64
		{
			continue;
		}
		let i = (u - 0.5).floor() as i64;
		let j = (v - 0.5).floor() as i64;
		let cell = PixelBBox {
			x_min: i,
			y_min: j,
			x_max: i + 2,
			y_max: j + 2,
		};
		window = Some(match window {
			Some(window) => window.union(&cell),
			None => cell,
		});
	}
	let window = window?.intersection(input_bbox);
	(!window.is_empty()).then_some(window)
}

/// Bilinear interpolation at fractional input pixel `(u, v)`, sampling the
/// four surrounding pixel centers. Neighbors with zero weight are ignored,
/// so exact pixel-center hits need only that one pixel; any contributing
/// no-data or out-of-range neighbor yields `None`.
fn sample_bilinear(block: &Patch, input_bbox: &PixelBBox, u: f64, v: f64, nodata_threshold: Option<f64>) -> Option<f64> {
	if u < input_bbox.x_min as f64 || u > input_bbox.x_max as f64 || v < input_bbox.y_min as f64 || v > input_bbox.y_max as f64 {
		return None;
	}

	let fu = u - 0.5;
	let fv = v - 0.5;
	let i = fu.floor() as i64;
	let j = fv.floor() as i64;
	let du = fu - i as f64;
	let dv = fv - j as f64;

	// The four neighbor weights sum to 1 exactly.
	let weights = [
		(i, j, (1.0 - du) * (1.0 - dv)),
		(i + 1, j, du * (1.0 - dv)),
		(i, j + 1, (1.0 - du) * dv),
		(i + 1, j + 1, du * dv),
	];

	let mut sum = 0.0;
	for (x, y, w) in weights {
		if w == 0.0 {
			continue;
		}
		if !block.bbox().contains(x, y) {
			return None;
		}
		let value = block.get(x, y);
		if value == block.nodata() || value.is_nan() || nodata_threshold.is_some_and(|t| value <= t) {
			return None;
		}
		sum += w * value;
	}
	Some(sum)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MosaicParams, MosaicPlan};
	use approx::assert_abs_diff_eq;
	use demtiles_core::{Georef, Srs, builtin_transform_factory};
	use demtiles_raster::MemoryRaster;

	fn georef(x0: f64, y0: f64, step: f64) -> Georef {
		Georef::from_origin(Srs::new("EPSG:32633"), x0, y0, step, step, -9999.0).unwrap()
	}

	fn plan_for(raster: &MemoryRaster, name: &str) -> MosaicPlan {
		MosaicPlan::new(
			&MosaicParams::default(),
			vec![(name.to_string(), raster.georef().clone(), raster.pixel_bbox())],
			&builtin_transform_factory(),
		)
		.unwrap()
	}

	#[test]
	fn test_identity_reprojection_is_exact() {
		let raster = MemoryRaster::from_fn(georef(0.0, 10.0, 1.0), 10, 10, |x, y| (y * 10 + x) as f64);
		let plan = plan_for(&raster, "a");
		let crop = plan.grid.tiles[0].bbox;

		let patch = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, None)
			.unwrap()
			.unwrap();

		for (x, y) in crop.iter_pixels() {
			assert_eq!(patch.get(x, y), (y * 10 + x) as f64, "at ({x},{y})");
		}
	}

	#[test]
	fn test_reprojection_covers_crop_margin_with_nodata() {
		let raster = MemoryRaster::filled(georef(0.0, 10.0, 1.0), 10, 10, 50.0);
		let plan = plan_for(&raster, "a");
		let crop = plan.grid.tiles[0].bbox.expanded(5);

		let patch = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, None)
			.unwrap()
			.unwrap();

		assert_eq!(patch.get(0, 0), 50.0);
		assert_eq!(patch.get(9, 9), 50.0);
		assert!(patch.is_nodata(-1, 0));
		assert!(patch.is_nodata(10, 5));
		assert!(patch.is_nodata(-5, -5));
	}

	#[test]
	fn test_half_resolution_interpolates() {
		// Output at half the input resolution: output pixel centers fall
		// between input pixel centers.
		let raster = MemoryRaster::from_fn(georef(0.0, 4.0, 1.0), 4, 4, |x, _| x as f64 * 10.0);
		let params = MosaicParams {
			target_pixel_size: Some(2.0),
			..MosaicParams::default()
		};
		let plan = MosaicPlan::new(
			&params,
			vec![("a".to_string(), raster.georef().clone(), raster.pixel_bbox())],
			&builtin_transform_factory(),
		)
		.unwrap();
		let crop = plan.grid.tiles[0].bbox;

		let patch = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, None)
			.unwrap()
			.unwrap();

		// Output pixel (0,0) center = world (1,3) = input pixel (1.0, 1.0),
		// between input columns 0 and 1: (0 + 10) / 2.
		assert_abs_diff_eq!(patch.get(0, 0), 5.0);
		// Output pixel (1,0) center = world (3,3): between columns 2 and 3.
		assert_abs_diff_eq!(patch.get(1, 0), 25.0);
	}

	#[test]
	fn test_nodata_propagates_strictly() {
		let mut raster = MemoryRaster::filled(georef(0.0, 4.0, 1.0), 4, 4, 100.0);
		raster.set(1, 1, -9999.0);
		// Shift the output grid half a pixel so every output center sits
		// between four input centers.
		let params = MosaicParams {
			target_window: Some(demtiles_core::WorldBBox::new(0.5, 0.0, 3.5, 3.5).unwrap()),
			..MosaicParams::default()
		};
		let plan = MosaicPlan::new(
			&params,
			vec![("a".to_string(), raster.georef().clone(), raster.pixel_bbox())],
			&builtin_transform_factory(),
		)
		.unwrap();
		let crop = plan.grid.tiles[0].bbox;
		let patch = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, None)
			.unwrap()
			.unwrap();

		// Output cells whose bilinear stencil touches input (1,1) are nodata.
		assert!(patch.is_nodata(0, 0));
		assert!(patch.is_nodata(1, 0));
		assert!(patch.is_nodata(0, 1));
		assert!(patch.is_nodata(1, 1));
		// Cells away from the hole keep their value.
		assert_eq!(patch.get(2, 2), 100.0);
	}

	#[test]
	fn test_nodata_threshold() {
		let raster = MemoryRaster::from_fn(georef(0.0, 4.0, 1.0), 4, 4, |x, _| if x < 2 { -100.0 } else { 10.0 });
		let plan = plan_for(&raster, "a");
		let crop = plan.grid.tiles[0].bbox;
		let patch = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, Some(-50.0))
			.unwrap()
			.unwrap();
		assert!(patch.is_nodata(0, 0));
		assert!(patch.is_nodata(1, 3));
		assert_eq!(patch.get(2, 0), 10.0);
	}

	#[test]
	fn test_disjoint_input_returns_none() {
		let raster = MemoryRaster::filled(georef(0.0, 10.0, 1.0), 10, 10, 1.0);
		let plan = plan_for(&raster, "a");
		// A crop box far outside the input.
		let crop = PixelBBox::new(1000, 1000, 1010, 1010).unwrap();
		let result = reproject_input(&raster, &plan.inputs[0], &plan.grid.georef, &crop, -1.0, None).unwrap();
		assert!(result.is_none());
	}
}
