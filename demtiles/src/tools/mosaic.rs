//! The `mosaic` subcommand: the full mosaicking surface.

use anyhow::{Result, bail};
use clap::ArgGroup;
use demtiles_core::{MosaicError, Srs, WorldBBox};
use demtiles_pipeline::{MosaicMode, MosaicParams};
use demtiles_raster::{OutputType, TifCompression, read_dem_list_file};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(
	arg_required_else_help = true,
	disable_version_flag = true,
	group = ArgGroup::new("mode").multiple(false),
	group = ArgGroup::new("tile_pick").multiple(false),
)]
pub struct Subcommand {
	/// input DEMs; anything GDAL reads as a single-band raster
	#[arg(value_name = "DEM")]
	inputs: Vec<String>,

	/// read input paths from a whitespace-separated list file
	#[arg(long, value_name = "FILE", display_order = 0)]
	dem_list_file: Option<PathBuf>,

	/// output prefix producing "<prefix>-tile-<i>.tif"; a path ending in
	/// .tif forces single-file output
	#[arg(long, short = 'o', value_name = "PREFIX", display_order = 0)]
	output_prefix: String,

	/// tile size in output pixels
	#[arg(long, value_name = "int", display_order = 1)]
	tile_size: Option<u64>,

	/// tile size in projected units
	#[arg(long, value_name = "float", display_order = 1)]
	georef_tile_size: Option<f64>,

	/// compute only this tile
	#[arg(long, value_name = "int", group = "tile_pick", display_order = 1)]
	tile_index: Option<usize>,

	/// compute only these tiles
	#[arg(long, value_name = "int", num_args = 1.., group = "tile_pick", display_order = 1)]
	tile_list: Option<Vec<usize>>,

	/// internal block size of the written GeoTIFFs
	#[arg(long, value_name = "int", default_value_t = 256, display_order = 1)]
	tif_tile_size: u32,

	/// output pixel size in projected units; defaults to the first input's
	#[arg(long, value_name = "float", display_order = 2)]
	tr: Option<f64>,

	/// output spatial reference system; defaults to the first input's
	#[arg(long, value_name = "SRS", display_order = 2)]
	t_srs: Option<String>,

	/// restrict the output to this projected window
	#[arg(long, value_name = "xmin ymin xmax ymax", num_args = 4, allow_hyphen_values = true, display_order = 2)]
	t_projwin: Option<Vec<f64>>,

	/// snap the output extent outward onto pixel-size multiples
	#[arg(long, display_order = 2)]
	tap: bool,

	/// use the projection window verbatim instead of intersecting it
	#[arg(long, display_order = 2)]
	force_projwin: bool,

	/// keep the earliest valid input per pixel
	#[arg(long, group = "mode", display_order = 3)]
	first: bool,

	/// keep the latest valid input per pixel
	#[arg(long, group = "mode", display_order = 3)]
	last: bool,

	/// keep the minimum input per pixel
	#[arg(long, group = "mode", display_order = 3)]
	min: bool,

	/// keep the maximum input per pixel
	#[arg(long, group = "mode", display_order = 3)]
	max: bool,

	/// average the valid inputs per pixel
	#[arg(long, group = "mode", display_order = 3)]
	mean: bool,

	/// standard deviation of the valid inputs per pixel
	#[arg(long, group = "mode", display_order = 3)]
	stddev: bool,

	/// median of the valid inputs per pixel
	#[arg(long, group = "mode", display_order = 3)]
	median: bool,

	/// normalized median absolute deviation per pixel
	#[arg(long, group = "mode", display_order = 3)]
	nmad: bool,

	/// number of valid inputs per pixel
	#[arg(long, group = "mode", display_order = 3)]
	count: bool,

	/// Gaussian blur sigma applied to the blending weights
	#[arg(long, value_name = "float", default_value_t = 5.0, display_order = 4)]
	weights_blur_sigma: f64,

	/// exponent applied to the blending weights
	#[arg(long, value_name = "float", default_value_t = 2.0, display_order = 4)]
	weights_exponent: f64,

	/// weigh by distance-to-boundary over distance-to-centerline
	#[arg(long, display_order = 4)]
	use_centerline_weights: bool,

	/// prefer earlier inputs, feathering within this band of their boundary
	#[arg(long, value_name = "int", display_order = 4)]
	priority_blending_length: Option<i64>,

	/// crop margin around each tile, in output pixels
	#[arg(long, value_name = "int", default_value_t = 200, display_order = 4)]
	extra_crop_length: i64,

	/// also write the blending weights of this input (0-based position)
	#[arg(long, value_name = "int", display_order = 4)]
	save_dem_weight: Option<usize>,

	/// also write an index map of the chosen input per pixel
	#[arg(long, display_order = 4)]
	save_index_map: bool,

	/// fill no-data regions no larger than this edge length
	#[arg(long, value_name = "int", default_value_t = 0, display_order = 5)]
	hole_fill_length: i64,

	/// Gaussian blur sigma applied to the finished DEM
	#[arg(long, value_name = "float", default_value_t = 0.0, display_order = 5)]
	dem_blur_sigma: f64,

	/// erode this many pixels off every no-data boundary
	#[arg(long, value_name = "int", default_value_t = 0, display_order = 5)]
	erode_length: i64,

	/// output sample type
	#[arg(long, value_enum, default_value_t = OutputType::Float32, display_order = 6)]
	ot: OutputType,

	/// no-data value of the output; defaults to the first input's
	#[arg(long, value_name = "float", allow_hyphen_values = true, display_order = 6)]
	output_nodata_value: Option<f64>,

	/// treat input values at or below this threshold as no-data
	#[arg(long, value_name = "float", allow_hyphen_values = true, display_order = 6)]
	nodata_threshold: Option<f64>,

	/// never write BigTIFF output
	#[arg(long, display_order = 6)]
	no_bigtiff: bool,

	/// compression of the written GeoTIFFs
	#[arg(long, value_enum, default_value_t = TifCompression::Lzw, display_order = 6)]
	tif_compress: TifCompression,

	/// worker threads; defaults to the number of cores
	#[arg(long, value_name = "int", display_order = 6)]
	threads: Option<usize>,

	/// raster cache budget in megabytes
	#[arg(long, value_name = "int", default_value_t = 1024, display_order = 6)]
	cache_size_mb: usize,
}

impl Subcommand {
	fn mode(&self) -> MosaicMode {
		if self.first {
			MosaicMode::First
		} else if self.last {
			MosaicMode::Last
		} else if self.min {
			MosaicMode::Min
		} else if self.max {
			MosaicMode::Max
		} else if self.mean {
			MosaicMode::Mean
		} else if self.stddev {
			MosaicMode::StdDev
		} else if self.median {
			MosaicMode::Median
		} else if self.nmad {
			MosaicMode::Nmad
		} else if self.count {
			MosaicMode::Count
		} else {
			MosaicMode::Blend
		}
	}

	fn input_paths(&self) -> Result<Vec<String>> {
		let mut paths = self.inputs.clone();
		if let Some(list) = &self.dem_list_file {
			paths.extend(read_dem_list_file(list)?);
		}
		if paths.is_empty() {
			return Err(MosaicError::input("no input DEMs were given"));
		}
		Ok(paths)
	}

	fn params(&self) -> Result<MosaicParams> {
		let target_window = self
			.t_projwin
			.as_ref()
			.map(|w| WorldBBox::new(w[0], w[1], w[2], w[3]))
			.transpose()?;
		let tile_selection = self.tile_index.map(|index| vec![index]).or_else(|| self.tile_list.clone());

		let params = MosaicParams {
			mode: self.mode(),
			target_srs: self.t_srs.as_deref().map(Srs::new),
			target_pixel_size: self.tr,
			target_window,
			force_window: self.force_projwin,
			tap: self.tap,
			output_nodata: self.output_nodata_value,
			nodata_threshold: self.nodata_threshold,
			tile_size_pixels: self.tile_size,
			tile_size_georef: self.georef_tile_size,
			tile_selection,
			extra_crop_length: self.extra_crop_length,
			weights_exponent: self.weights_exponent,
			weights_blur_sigma: self.weights_blur_sigma,
			use_centerline: self.use_centerline_weights,
			priority_blending_length: self.priority_blending_length,
			hole_fill_length: self.hole_fill_length,
			dem_blur_sigma: self.dem_blur_sigma,
			erode_length: self.erode_length,
			save_index_map: self.save_index_map,
			save_dem_weight: self.save_dem_weight,
			threads: self.threads.unwrap_or_else(num_cpus::get),
		};
		params.validate()?;
		Ok(params)
	}
}

#[cfg(feature = "gdal")]
#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	use demtiles_pipeline::Mosaicker;
	use demtiles_raster::gdal::{
		GdalTileWriter, gdal_source_opener, gdal_transform_factory, set_cache_budget_mb,
	};
	use demtiles_raster::{OutputTarget, SourcePool, WriterConfig};
	use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

	let params = arguments.params()?;
	let paths = arguments.input_paths()?;
	log::info!("mosaicking {} inputs in {} mode", paths.len(), params.mode);

	set_cache_budget_mb(arguments.cache_size_mb)?;

	// Keep at most a cache-budget worth of readers open at once.
	let max_open = (arguments.cache_size_mb / 8).clamp(4, 1024);
	let openers = paths
		.iter()
		.map(|path| gdal_source_opener(std::path::Path::new(path), None))
		.collect();
	let pool = SourcePool::new(openers, max_open);

	let factory = gdal_transform_factory();
	let mosaicker = Arc::new(Mosaicker::new(params.clone(), paths, pool, &factory)?);

	let tiles = mosaicker.tiles()?;
	if tiles.is_empty() {
		bail!(MosaicError::grid("the plan contains no tiles"));
	}
	let writer = GdalTileWriter::create(
		OutputTarget::from_arg(&arguments.output_prefix),
		mosaicker.plan().grid.georef.clone(),
		mosaicker.plan().grid.pixel_bbox,
		tiles.len(),
		WriterConfig {
			output_type: arguments.ot,
			compression: arguments.tif_compress,
			bigtiff: !arguments.no_bigtiff,
			block_size: arguments.tif_tile_size,
		},
		params.save_index_map && params.mode.carries_index(),
		params.save_dem_weight.is_some(),
	)?;

	let cancel = Arc::new(AtomicBool::new(false));
	{
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				log::warn!("interrupted, finishing in-flight tiles");
				cancel.store(true, Ordering::Relaxed);
			}
		});
	}

	let written = mosaicker.run(Arc::new(writer), cancel.clone()).await?;
	if cancel.load(Ordering::Relaxed) {
		bail!("cancelled after {written} tiles");
	}
	log::info!("finished: {written} tiles");
	Ok(())
}

#[cfg(not(feature = "gdal"))]
pub fn run(arguments: &Subcommand) -> Result<()> {
	// Validate everything so configuration mistakes surface even here.
	arguments.params()?;
	arguments.input_paths()?;
	bail!("this build cannot read raster files; rebuild with --features gdal");
}
