//! Run configuration for a mosaicking job.

use anyhow::{Result, bail};
use demtiles_core::{MosaicError, Srs, WorldBBox};
use std::fmt::Display;

/// Default pixel budget per tile when no tile size is requested.
pub const DEFAULT_TILE_PIXELS: u64 = 1024 * 1024;

/// Default crop margin around each tile, in output pixels.
pub const DEFAULT_EXTRA_CROP_LENGTH: i64 = 200;

/// How overlapping pixels are resolved.
///
/// `Blend` feathers inputs by distance-transform weights; every other mode
/// is a per-pixel reduction over the reprojected values in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MosaicMode {
	#[default]
	Blend,
	First,
	Last,
	Min,
	Max,
	Mean,
	StdDev,
	Median,
	Nmad,
	Count,
}

impl MosaicMode {
	/// Blend is the only mode that computes weights.
	pub fn needs_weights(&self) -> bool {
		matches!(self, MosaicMode::Blend)
	}

	/// Modes that can emit an index map of the chosen input per pixel.
	pub fn carries_index(&self) -> bool {
		matches!(
			self,
			MosaicMode::First | MosaicMode::Last | MosaicMode::Min | MosaicMode::Max
		)
	}

	/// Modes that hold all samples per pixel until finalization.
	pub fn collects_samples(&self) -> bool {
		matches!(self, MosaicMode::Median | MosaicMode::Nmad)
	}
}

impl Display for MosaicMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			MosaicMode::Blend => "blend",
			MosaicMode::First => "first",
			MosaicMode::Last => "last",
			MosaicMode::Min => "min",
			MosaicMode::Max => "max",
			MosaicMode::Mean => "mean",
			MosaicMode::StdDev => "stddev",
			MosaicMode::Median => "median",
			MosaicMode::Nmad => "nmad",
			MosaicMode::Count => "count",
		})
	}
}

impl TryFrom<&str> for MosaicMode {
	type Error = anyhow::Error;

	fn try_from(value: &str) -> Result<Self> {
		Ok(match value.to_ascii_lowercase().as_str() {
			"blend" => MosaicMode::Blend,
			"first" => MosaicMode::First,
			"last" => MosaicMode::Last,
			"min" => MosaicMode::Min,
			"max" => MosaicMode::Max,
			"mean" => MosaicMode::Mean,
			"stddev" => MosaicMode::StdDev,
			"median" => MosaicMode::Median,
			"nmad" => MosaicMode::Nmad,
			"count" => MosaicMode::Count,
			_ => bail!("unknown mosaic mode '{value}'"),
		})
	}
}

/// All knobs of one mosaicking run.
///
/// Defaults follow the command-line surface; [`validate`](Self::validate)
/// rejects conflicting combinations before any tile work starts.
#[derive(Debug, Clone)]
pub struct MosaicParams {
	pub mode: MosaicMode,

	/// Output spatial reference system; defaults to the first input's.
	pub target_srs: Option<Srs>,
	/// Output pixel size in target units; defaults to the first input's.
	pub target_pixel_size: Option<f64>,
	/// Restricts (or, with `force_window`, replaces) the output extent.
	pub target_window: Option<WorldBBox>,
	pub force_window: bool,
	/// Snap the output extent outward onto pixel-size multiples.
	pub tap: bool,
	/// Output no-data value; defaults to the first input's.
	pub output_nodata: Option<f64>,
	/// Input values at or below this threshold are read as no-data.
	pub nodata_threshold: Option<f64>,

	/// Tile edge length in output pixels.
	pub tile_size_pixels: Option<u64>,
	/// Tile edge length in projected units; exclusive with `tile_size_pixels`.
	pub tile_size_georef: Option<f64>,
	/// Restrict the run to these tile indexes.
	pub tile_selection: Option<Vec<usize>>,

	pub extra_crop_length: i64,
	pub weights_exponent: f64,
	pub weights_blur_sigma: f64,
	pub use_centerline: bool,
	/// Engages priority blending; `Some(0)` degenerates to `first`.
	pub priority_blending_length: Option<i64>,

	pub hole_fill_length: i64,
	pub dem_blur_sigma: f64,
	pub erode_length: i64,

	pub save_index_map: bool,
	/// Emit the final weight raster of this input (command-line position).
	pub save_dem_weight: Option<usize>,

	pub threads: usize,
}

impl Default for MosaicParams {
	fn default() -> Self {
		MosaicParams {
			mode: MosaicMode::Blend,
			target_srs: None,
			target_pixel_size: None,
			target_window: None,
			force_window: false,
			tap: false,
			output_nodata: None,
			nodata_threshold: None,
			tile_size_pixels: None,
			tile_size_georef: None,
			tile_selection: None,
			extra_crop_length: DEFAULT_EXTRA_CROP_LENGTH,
			weights_exponent: 2.0,
			weights_blur_sigma: 5.0,
			use_centerline: false,
			priority_blending_length: None,
			hole_fill_length: 0,
			dem_blur_sigma: 0.0,
			erode_length: 0,
			save_index_map: false,
			save_dem_weight: None,
			threads: num_cpus::get(),
		}
	}
}

impl MosaicParams {
	/// Rejects invalid or conflicting options.
	pub fn validate(&self) -> Result<()> {
		if self.tile_size_pixels.is_some() && self.tile_size_georef.is_some() {
			return Err(MosaicError::config(
				"tile size was given both in pixels and in projected units; pick one",
			));
		}
		if let Some(size) = self.tile_size_pixels {
			if size == 0 {
				return Err(MosaicError::config("tile size must be positive"));
			}
		}
		if let Some(size) = self.tile_size_georef {
			if !(size > 0.0) {
				return Err(MosaicError::config("projected tile size must be positive"));
			}
		}
		if let Some(pixel_size) = self.target_pixel_size {
			if !(pixel_size > 0.0 && pixel_size.is_finite()) {
				return Err(MosaicError::config(format!("pixel size must be positive, got {pixel_size}")));
			}
		}
		if self.extra_crop_length < 0 {
			return Err(MosaicError::config("extra crop length cannot be negative"));
		}
		if !(self.weights_exponent >= 0.0) || !(self.weights_blur_sigma >= 0.0) {
			return Err(MosaicError::config("weight exponent and blur sigma cannot be negative"));
		}
		if self.priority_blending_length.is_some_and(|length| length < 0) {
			return Err(MosaicError::config("priority blending length cannot be negative"));
		}
		if self.priority_blending_length.is_some() && self.mode != MosaicMode::Blend {
			return Err(MosaicError::config(format!(
				"priority blending applies to blend mode only, not {}",
				self.mode
			)));
		}
		if self.hole_fill_length < 0 || self.erode_length < 0 {
			return Err(MosaicError::config("post-processing lengths cannot be negative"));
		}
		if !(self.dem_blur_sigma >= 0.0) {
			return Err(MosaicError::config("DEM blur sigma cannot be negative"));
		}
		if self.threads == 0 {
			return Err(MosaicError::config("thread count must be at least 1"));
		}

		let post_reach = self.hole_fill_length.max(self.erode_length).max((3.0 * self.dem_blur_sigma).ceil() as i64);
		if post_reach > self.extra_crop_length {
			log::warn!(
				"post-processing reaches {post_reach} pixels but the crop margin is only {}; \
				 tile seams may appear",
				self.extra_crop_length
			);
		}
		Ok(())
	}
}
