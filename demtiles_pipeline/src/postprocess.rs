//! Post-processing of finalized tiles: hole filling, DEM blurring and
//! boundary erosion, applied in that fixed order.
//!
//! All three operate on the expanded crop patch, not the bare tile, so
//! their reach stays consistent across tile seams as long as the crop
//! margin covers it.

use demtiles_core::{Patch, PixelBBox};

use crate::gaussian_blur_masked;

/// Post-processing switches; zero values disable a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostProcessParams {
	/// Fill 4-connected no-data regions whose bounding box does not exceed
	/// this edge length.
	pub hole_fill_length: i64,
	/// Gaussian-blur the finished DEM with this sigma.
	pub dem_blur_sigma: f64,
	/// Erode this many pixels off every no-data boundary.
	pub erode_length: i64,
}

impl PostProcessParams {
	pub fn is_noop(&self) -> bool {
		self.hole_fill_length <= 0 && self.dem_blur_sigma <= 0.0 && self.erode_length <= 0
	}
}

/// Applies hole fill, blur and erosion to a finalized patch.
pub fn apply_post_processing(patch: &mut Patch, params: &PostProcessParams) {
	if params.hole_fill_length > 0 {
		fill_holes(patch, params.hole_fill_length);
	}
	if params.dem_blur_sigma > 0.0 {
		let bbox = *patch.bbox();
		let mask: Vec<bool> = bbox.iter_pixels().map(|(x, y)| !patch.is_nodata(x, y)).collect();
		gaussian_blur_masked(patch, &mask, params.dem_blur_sigma);
	}
	if params.erode_length > 0 {
		erode(patch, params.erode_length);
	}
}

/// Fills small holes: 4-connected no-data components whose bounding box
/// fits within `max_length`, filled by inverse-distance-weighted averages
/// of the hole's valid border values.
fn fill_holes(patch: &mut Patch, max_length: i64) {
	let bbox = *patch.bbox();
	let width = bbox.width() as i64;
	let height = bbox.height() as i64;
	let len = (width * height) as usize;
	let offset_of = |x: i64, y: i64| ((y - bbox.y_min) * width + (x - bbox.x_min)) as usize;

	let mut visited = vec![false; len];
	for (x0, y0) in bbox.iter_pixels() {
		if visited[offset_of(x0, y0)] || !patch.is_nodata(x0, y0) {
			continue;
		}

		// Flood-fill one no-data component, tracking its bounding box and
		// the valid pixels bordering it.
		let mut component = Vec::new();
		let mut border = Vec::new();
		let mut queue = vec![(x0, y0)];
		visited[offset_of(x0, y0)] = true;
		let mut component_bbox = PixelBBox {
			x_min: x0,
			y_min: y0,
			x_max: x0 + 1,
			y_max: y0 + 1,
		};
		while let Some((x, y)) = queue.pop() {
			component.push((x, y));
			component_bbox.x_min = component_bbox.x_min.min(x);
			component_bbox.y_min = component_bbox.y_min.min(y);
			component_bbox.x_max = component_bbox.x_max.max(x + 1);
			component_bbox.y_max = component_bbox.y_max.max(y + 1);
			for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
				if !bbox.contains(nx, ny) {
					continue;
				}
				if patch.is_nodata(nx, ny) {
					if !visited[offset_of(nx, ny)] {
						visited[offset_of(nx, ny)] = true;
						queue.push((nx, ny));
					}
				} else {
					border.push((nx, ny, patch.get(nx, ny)));
				}
			}
		}

		let max_dimension = component_bbox.width().max(component_bbox.height()) as i64;
		if max_dimension > max_length || border.is_empty() {
			continue;
		}
		border.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
		border.dedup_by_key(|entry| (entry.0, entry.1));

		for (x, y) in component {
			let mut sum = 0.0;
			let mut norm = 0.0;
			for &(bx, by, value) in &border {
				let distance = (((x - bx) * (x - bx) + (y - by) * (y - by)) as f64).sqrt();
				let inverse = 1.0 / distance;
				sum += inverse * value;
				norm += inverse;
			}
			patch.set(x, y, sum / norm);
		}
	}
}

/// Morphological erosion of the valid mask, `steps` iterations of
/// 4-connectivity. Pixels beyond the patch border are treated as valid, so
/// only real no-data boundaries erode.
fn erode(patch: &mut Patch, steps: i64) {
	let bbox = *patch.bbox();
	let nodata = patch.nodata();
	for _ in 0..steps {
		let mut doomed = Vec::new();
		for (x, y) in bbox.iter_pixels() {
			if patch.is_nodata(x, y) {
				continue;
			}
			let touches_nodata = [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
				.into_iter()
				.any(|(nx, ny)| bbox.contains(nx, ny) && patch.is_nodata(nx, ny));
			if touches_nodata {
				doomed.push((x, y));
			}
		}
		if doomed.is_empty() {
			break;
		}
		for (x, y) in doomed {
			patch.set(x, y, nodata);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	const ND: f64 = -9999.0;

	fn patch_with_hole(size: u64, hole: PixelBBox) -> Patch {
		let bbox = PixelBBox::from_size(size, size);
		let mut patch = Patch::filled(bbox, 100.0, ND);
		for (x, y) in hole.iter_pixels() {
			patch.set(x, y, ND);
		}
		patch
	}

	#[test]
	fn test_hole_fill_fills_small_holes() {
		let hole = PixelBBox::new(4, 4, 7, 7).unwrap();
		let mut patch = patch_with_hole(12, hole);
		apply_post_processing(
			&mut patch,
			&PostProcessParams {
				hole_fill_length: 4,
				..PostProcessParams::default()
			},
		);
		for (x, y) in hole.iter_pixels() {
			assert!(!patch.is_nodata(x, y), "unfilled at ({x},{y})");
			// A constant border fills with the constant.
			assert_abs_diff_eq!(patch.get(x, y), 100.0, epsilon = 1e-9);
		}
	}

	#[test]
	fn test_hole_fill_skips_large_holes() {
		let hole = PixelBBox::new(2, 2, 7, 5).unwrap();
		let mut patch = patch_with_hole(12, hole);
		apply_post_processing(
			&mut patch,
			&PostProcessParams {
				hole_fill_length: 2,
				..PostProcessParams::default()
			},
		);
		// Max dimension 5 exceeds the limit of 2: untouched.
		for (x, y) in hole.iter_pixels() {
			assert!(patch.is_nodata(x, y));
		}
	}

	#[test]
	fn test_hole_fill_weighted_toward_near_border() {
		// A 1x3 hole in a field that is 0 on the left and 60 on the right.
		let bbox = PixelBBox::from_size(9, 3);
		let mut patch = Patch::new_nodata(bbox, ND);
		for (x, y) in bbox.iter_pixels() {
			patch.set(x, y, if x < 3 { 0.0 } else { 60.0 });
		}
		for x in 3..6 {
			patch.set(x, 1, ND);
		}
		fill_holes(&mut patch, 3);
		// The cell next to the low border lands below the one next to the
		// high border.
		assert!(!patch.is_nodata(3, 1) && !patch.is_nodata(5, 1));
		assert!(patch.get(3, 1) < patch.get(5, 1));
		assert!(patch.get(3, 1) > 0.0 && patch.get(5, 1) < 60.0);
	}

	#[test]
	fn test_erosion_frame() {
		let bbox = PixelBBox::from_size(10, 10);
		// Surround the data with a nodata ring so the boundary is real.
		let outer = bbox.expanded(3);
		let mut patch = Patch::new_nodata(outer, ND);
		for (x, y) in bbox.iter_pixels() {
			patch.set(x, y, 50.0);
		}
		apply_post_processing(
			&mut patch,
			&PostProcessParams {
				erode_length: 2,
				..PostProcessParams::default()
			},
		);

		for (x, y) in bbox.iter_pixels() {
			let interior = x >= 2 && x < 8 && y >= 2 && y < 8;
			assert_eq!(patch.is_nodata(x, y), !interior, "at ({x},{y})");
		}
	}

	#[test]
	fn test_erosion_ignores_patch_border() {
		// No nodata anywhere: the patch border must not erode.
		let mut patch = Patch::filled(PixelBBox::from_size(6, 6), 1.0, ND);
		erode(&mut patch, 3);
		assert_eq!(patch.count_valid(), 36);
	}

	#[test]
	fn test_blur_preserves_constants_and_nodata() {
		let hole = PixelBBox::new(5, 5, 6, 6).unwrap();
		let mut patch = patch_with_hole(10, hole);
		apply_post_processing(
			&mut patch,
			&PostProcessParams {
				dem_blur_sigma: 1.5,
				..PostProcessParams::default()
			},
		);
		// Renormalizing blur of a constant field stays constant, nodata stays.
		assert!(patch.is_nodata(5, 5));
		for (x, y) in patch.bbox().iter_pixels() {
			if !patch.is_nodata(x, y) {
				assert_abs_diff_eq!(patch.get(x, y), 100.0, epsilon = 1e-9);
			}
		}
	}

	#[test]
	fn test_noop_flag() {
		assert!(PostProcessParams::default().is_noop());
		assert!(
			!PostProcessParams {
				erode_length: 1,
				..PostProcessParams::default()
			}
			.is_noop()
		);
	}
}
