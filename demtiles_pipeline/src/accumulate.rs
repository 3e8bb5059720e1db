//! The per-pixel accumulation kernel.
//!
//! One accumulator per tile folds the reprojected inputs in their declared
//! order; its state layout depends on the mode. Blending keeps running
//! weighted sums, reductions keep running statistics, and the sample-
//! collecting modes (median, nmad) hold every value until finalization.

use demtiles_core::{Patch, PixelBBox};

use crate::MosaicMode;

/// Scale factor turning a median absolute deviation into a robust
/// standard deviation estimate.
const NMAD_FACTOR: f64 = 1.4826;

/// Accumulates (value, weight) patches over one tile crop box.
pub struct TileAccumulator {
	mode: MosaicMode,
	bbox: PixelBBox,
	nodata: f64,
	state: State,
}

enum State {
	/// `blend`: running weighted value sum and weight sum.
	Blend { sum_wv: Vec<f64>, sum_w: Vec<f64> },
	/// `first`/`last`/`min`/`max`: the chosen value and its input ordinal.
	Pick { value: Vec<f64>, index: Vec<i64> },
	/// `mean`/`stddev`: running moments.
	Moments {
		sum: Vec<f64>,
		sum_sq: Vec<f64>,
		count: Vec<u32>,
	},
	/// `count`: cover counts only.
	Count { count: Vec<u32> },
	/// `median`/`nmad`: every sample per pixel.
	Samples { samples: Vec<Vec<f64>> },
}

impl TileAccumulator {
	/// Creates the accumulator for one tile crop box.
	pub fn new(mode: MosaicMode, bbox: PixelBBox, nodata: f64) -> TileAccumulator {
		let len = bbox.area() as usize;
		let state = match mode {
			MosaicMode::Blend => State::Blend {
				sum_wv: vec![0.0; len],
				sum_w: vec![0.0; len],
			},
			MosaicMode::First | MosaicMode::Last | MosaicMode::Min | MosaicMode::Max => State::Pick {
				value: vec![f64::NAN; len],
				index: vec![-1; len],
			},
			MosaicMode::Mean | MosaicMode::StdDev => State::Moments {
				sum: vec![0.0; len],
				sum_sq: vec![0.0; len],
				count: vec![0; len],
			},
			MosaicMode::Count => State::Count { count: vec![0; len] },
			MosaicMode::Median | MosaicMode::Nmad => State::Samples {
				samples: vec![Vec::new(); len],
			},
		};
		TileAccumulator {
			mode,
			bbox,
			nodata,
			state,
		}
	}

	/// Folds one input's reprojected values into the state.
	///
	/// `ordinal` is the input's command-line position; `weights` is given
	/// exactly in blend mode. Inputs must arrive in ordinal order — that is
	/// the only ordering dependence of `first`/`last` and priority.
	pub fn accumulate(&mut self, ordinal: usize, values: &Patch, weights: Option<&Patch>) {
		debug_assert_eq!(values.bbox(), &self.bbox);
		for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
			if values.is_nodata(x, y) {
				continue;
			}
			let v = values.get(x, y);
			match &mut self.state {
				State::Blend { sum_wv, sum_w } => {
					let w = weights.expect("blend mode requires weights").get(x, y);
					if w > 0.0 {
						sum_wv[offset] += w * v;
						sum_w[offset] += w;
					}
				}
				State::Pick { value, index } => {
					let current = value[offset];
					let take = match self.mode {
						MosaicMode::First => index[offset] < 0,
						MosaicMode::Last => true,
						// Ties keep the earlier input.
						MosaicMode::Min => index[offset] < 0 || v < current,
						MosaicMode::Max => index[offset] < 0 || v > current,
						_ => unreachable!(),
					};
					if take {
						value[offset] = v;
						index[offset] = ordinal as i64;
					}
				}
				State::Moments { sum, sum_sq, count } => {
					sum[offset] += v;
					sum_sq[offset] += v * v;
					count[offset] += 1;
				}
				State::Count { count } => count[offset] += 1,
				State::Samples { samples } => samples[offset].push(v),
			}
		}
	}

	/// Finalizes the tile: the mosaic values, and the chosen-input index
	/// map for the modes that track one (no-data cells carry −1).
	pub fn finalize(self) -> (Patch, Option<Patch>) {
		let mut values = Patch::new_nodata(self.bbox, self.nodata);
		let mut index_map = None;

		match self.state {
			State::Blend { sum_wv, sum_w } => {
				for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
					if sum_w[offset] > 0.0 {
						values.set(x, y, sum_wv[offset] / sum_w[offset]);
					}
				}
			}
			State::Pick { value, index } => {
				let mut map = Patch::new_nodata(self.bbox, -1.0);
				for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
					if index[offset] >= 0 {
						values.set(x, y, value[offset]);
						map.set(x, y, index[offset] as f64);
					}
				}
				index_map = Some(map);
			}
			State::Moments { sum, sum_sq, count } => {
				for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
					let n = f64::from(count[offset]);
					match self.mode {
						MosaicMode::Mean if count[offset] > 0 => values.set(x, y, sum[offset] / n),
						MosaicMode::StdDev if count[offset] >= 2 => {
							let mean = sum[offset] / n;
							let variance = (sum_sq[offset] / n - mean * mean).max(0.0);
							values.set(x, y, variance.sqrt());
						}
						_ => {}
					}
				}
			}
			State::Count { count } => {
				for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
					values.set(x, y, f64::from(count[offset]));
				}
			}
			State::Samples { mut samples } => {
				for (offset, (x, y)) in self.bbox.iter_pixels().enumerate() {
					let list = &mut samples[offset];
					if list.is_empty() {
						continue;
					}
					match self.mode {
						MosaicMode::Median => values.set(x, y, median(list)),
						MosaicMode::Nmad => {
							let center = median(list);
							let mut deviations: Vec<f64> = list.iter().map(|v| (v - center).abs()).collect();
							values.set(x, y, NMAD_FACTOR * median(&mut deviations));
						}
						_ => unreachable!(),
					}
				}
			}
		}

		(values, index_map)
	}
}

/// The middle of a sample list (mean of the two middles for even counts).
fn median(samples: &mut [f64]) -> f64 {
	samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
	let n = samples.len();
	if n % 2 == 1 {
		samples[n / 2]
	} else {
		(samples[n / 2 - 1] + samples[n / 2]) / 2.0
	}
}
