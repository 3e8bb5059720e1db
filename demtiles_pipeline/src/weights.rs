//! Per-input blending weights over a tile's crop box.
//!
//! The base weight of a valid cell is its Euclidean distance to the
//! nearest invalid cell, computed with the two-pass parabola method of
//! Felzenszwalb & Huttenlocher and clamped by the analytic distance to the
//! input's own full-extent edge, so the input's natural boundary drives
//! feathering rather than the tile crop. Optional centerline weighting,
//! an exponent and a no-data-aware Gaussian blur follow; priority blending
//! re-maps the result so earlier inputs saturate away from their boundary.

use demtiles_core::{Patch, PixelBBox};

/// Stands in for infinity in the distance transform; any real squared
/// distance in a crop box is far below this.
const FAR: f64 = 1e20;

/// Weight-shaping parameters, shared by every input of a run.
#[derive(Debug, Clone)]
pub struct WeightParams {
	pub exponent: f64,
	pub blur_sigma: f64,
	pub use_centerline: bool,
}

impl Default for WeightParams {
	fn default() -> Self {
		WeightParams {
			exponent: 2.0,
			blur_sigma: 5.0,
			use_centerline: false,
		}
	}
}

/// Builds the weight patch for one reprojected input.
///
/// Returns `(weights, boundary_distance)`; both span the value patch's box.
/// Weights are zero exactly where the values are no-data. The boundary
/// distance is kept for priority re-mapping.
pub fn build_weight_patch(values: &Patch, footprint: &PixelBBox, params: &WeightParams) -> (Patch, Patch) {
	let bbox = *values.bbox();
	let width = bbox.width() as usize;
	let height = bbox.height() as usize;

	let mask: Vec<bool> = bbox.iter_pixels().map(|(x, y)| !values.is_nodata(x, y)).collect();
	let mut distance = distance_transform(&mask, width, height);

	// The crop window must not fence the distances in, but the input's own
	// extent must: clamp by the analytic distance to the footprint edge.
	for (offset, (x, y)) in bbox.iter_pixels().enumerate() {
		if mask[offset] {
			let edge = (x - footprint.x_min + 1)
				.min(footprint.x_max - x)
				.min(y - footprint.y_min + 1)
				.min(footprint.y_max - y);
			distance[offset] = distance[offset].min(edge.max(1) as f64);
		}
	}

	let boundary_distance = Patch::from_vec(bbox, distance.clone(), 0.0).unwrap();

	let mut weight: Vec<f64> = if params.use_centerline {
		centerline_weights(&distance, &mask, width, height)
	} else {
		distance
	};

	if params.exponent != 1.0 {
		for (offset, w) in weight.iter_mut().enumerate() {
			if mask[offset] {
				*w = w.powf(params.exponent);
			}
		}
	}

	let mut weights = Patch::from_vec(bbox, weight, 0.0).unwrap();
	if params.blur_sigma > 0.0 {
		gaussian_blur_masked(&mut weights, &mask, params.blur_sigma);
	}
	(weights, boundary_distance)
}

/// Re-maps one input's weights for priority blending.
///
/// The input at `position` (0-based, within the tile's input list of
/// `total`) saturates at a rank constant wherever its boundary distance
/// exceeds `length`; inside that band the weight ramps linearly down to
/// the blended weight, so boundaries feather into later inputs. Adjacent
/// ranks differ by `2^50`, which puts an earlier interior input beyond the
/// reach of every later one in double precision.
pub fn apply_priority_blending(weights: &mut Patch, boundary_distance: &Patch, position: usize, total: usize, length: i64) {
	let exponent = (50 * total.saturating_sub(position)).min(1000) as i32;
	let plateau = 2.0f64.powi(exponent);

	let bbox = *weights.bbox();
	for (x, y) in bbox.iter_pixels() {
		let distance = boundary_distance.get(x, y);
		if distance <= 0.0 {
			continue; // no-data cell, weight stays zero
		}
		let weight = weights.get(x, y);
		let remapped = if distance > length as f64 {
			plateau
		} else {
			weight + (plateau - weight) * (distance / length as f64)
		};
		weights.set(x, y, remapped);
	}
}

/// Euclidean distance of every `true` cell to the nearest `false` cell.
///
/// Cells beyond the grid border do not count as invalid; an all-valid grid
/// yields uniformly huge distances (callers clamp them).
pub fn distance_transform(mask: &[bool], width: usize, height: usize) -> Vec<f64> {
	debug_assert_eq!(mask.len(), width * height);
	let mut squared: Vec<f64> = mask.iter().map(|&valid| if valid { FAR } else { 0.0 }).collect();

	// Column pass, then row pass of the 1D parabola transform.
	let mut f = vec![0.0; height.max(width)];
	let mut d = vec![0.0; height.max(width)];
	for x in 0..width {
		for y in 0..height {
			f[y] = squared[y * width + x];
		}
		edt_1d(&f[..height], &mut d[..height]);
		for y in 0..height {
			squared[y * width + x] = d[y];
		}
	}
	for y in 0..height {
		f[..width].copy_from_slice(&squared[y * width..(y + 1) * width]);
		edt_1d(&f[..width], &mut d[..width]);
		for x in 0..width {
			squared[y * width + x] = d[x];
		}
	}

	squared.into_iter().map(|s| s.min(FAR).sqrt()).collect()
}

/// One dimension of the Felzenszwalb/Huttenlocher squared distance
/// transform: `d[q] = min_p ((q-p)^2 + f[p])`.
fn edt_1d(f: &[f64], d: &mut [f64]) {
	let n = f.len();
	if n == 0 {
		return;
	}
	let mut hull = vec![0usize; n]; // indexes of parabolas on the lower envelope
	let mut boundary = vec![0.0f64; n + 1];
	let mut k = 0;
	boundary[0] = f64::NEG_INFINITY;
	boundary[1] = f64::INFINITY;

	for q in 1..n {
		loop {
			let p = hull[k];
			let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2.0 * (q as f64 - p as f64));
			if s <= boundary[k] {
				if k == 0 {
					break;
				}
				k -= 1;
			} else {
				k += 1;
				hull[k] = q;
				boundary[k] = s;
				boundary[k + 1] = f64::INFINITY;
				break;
			}
		}
	}

	k = 0;
	for q in 0..n {
		while boundary[k + 1] < q as f64 {
			k += 1;
		}
		let p = hull[k] as f64;
		d[q] = (q as f64 - p) * (q as f64 - p) + f[hull[k]];
	}
}

/// Centerline weights: distance-to-boundary over distance-to-medial-axis,
/// in [0, 1], rising to 1 along the skeleton.
///
/// The medial axis is approximated as the local maxima (8-neighborhood) of
/// the boundary distance.
fn centerline_weights(distance: &[f64], mask: &[bool], width: usize, height: usize) -> Vec<f64> {
	let at = |x: i64, y: i64| -> f64 {
		if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
			0.0
		} else {
			distance[y as usize * width + x as usize]
		}
	};

	let mut skeleton = vec![true; width * height];
	for y in 0..height as i64 {
		for x in 0..width as i64 {
			let offset = y as usize * width + x as usize;
			if !mask[offset] {
				continue;
			}
			let center = distance[offset];
			let mut is_maximum = true;
			for dy in -1..=1 {
				for dx in -1..=1 {
					if (dx != 0 || dy != 0) && at(x + dx, y + dy) > center {
						is_maximum = false;
					}
				}
			}
			// Seed cells for the skeleton distance are the maxima, so the
			// mask is inverted: false marks a seed.
			skeleton[offset] = !is_maximum;
		}
	}

	let to_skeleton = distance_transform(&skeleton, width, height);
	mask
		.iter()
		.enumerate()
		.map(|(offset, &valid)| {
			if !valid {
				return 0.0;
			}
			let db = distance[offset];
			let dc = to_skeleton[offset].min(FAR.sqrt());
			(db / (db + dc)).clamp(0.0, 1.0)
		})
		.collect()
}

/// In-place separable Gaussian blur that ignores masked-out cells and
/// renormalizes locally; masked cells keep their value.
pub fn gaussian_blur_masked(patch: &mut Patch, mask: &[bool], sigma: f64) {
	if sigma <= 0.0 {
		return;
	}
	let width = patch.bbox().width() as usize;
	let height = patch.bbox().height() as usize;
	let kernel = gaussian_kernel(sigma);
	let radius = (kernel.len() - 1) / 2;

	let blur_axis = |data: &[f64], out: &mut Vec<f64>, horizontal: bool| {
		out.clear();
		out.reserve(width * height);
		for y in 0..height {
			for x in 0..width {
				let offset = y * width + x;
				if !mask[offset] {
					out.push(data[offset]);
					continue;
				}
				let mut sum = 0.0;
				let mut norm = 0.0;
				for (k, &kw) in kernel.iter().enumerate() {
					let delta = k as i64 - radius as i64;
					let (nx, ny) = if horizontal {
						(x as i64 + delta, y as i64)
					} else {
						(x as i64, y as i64 + delta)
					};
					if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
						continue;
					}
					let neighbor = ny as usize * width + nx as usize;
					if mask[neighbor] {
						sum += kw * data[neighbor];
						norm += kw;
					}
				}
				out.push(if norm > 0.0 { sum / norm } else { data[offset] });
			}
		}
	};

	let mut pass = Vec::new();
	blur_axis(patch.values(), &mut pass, true);
	let mut result = Vec::new();
	blur_axis(&pass, &mut result, false);
	patch.values_mut().copy_from_slice(&result);
}

/// Normalized 1D Gaussian kernel with radius `ceil(3 sigma)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
	let radius = (3.0 * sigma).ceil() as i64;
	let mut kernel: Vec<f64> = (-radius..=radius)
		.map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
		.collect();
	let total: f64 = kernel.iter().sum();
	for w in &mut kernel {
		*w /= total;
	}
	kernel
}
