//! Writing the mosaic as tiled GeoTIFFs through GDAL.

use anyhow::{Context, Result, ensure};
use demtiles_core::{Georef, MosaicError, Patch, PixelBBox};
use gdal::{
	Dataset, DriverManager,
	raster::{Buffer, RasterCreationOptions},
};
use std::{path::Path, sync::Mutex};

use super::spatial_ref_from;
use crate::{OutputTarget, OutputType, TileData, TileWriter, WriterConfig};

/// Writes finished tiles either into one GeoTIFF (windowed writes into a
/// pre-created full-size dataset) or into one GeoTIFF per tile.
///
/// Auxiliary rasters (index map, saved weights) go to companion files named
/// with `-index-map` / `-weight` suffixes, in Int32 / Float32 respectively.
pub struct GdalTileWriter {
	target: OutputTarget,
	georef: Georef,
	full_bbox: PixelBBox,
	config: WriterConfig,
	single: Option<Mutex<SingleFile>>,
}

struct SingleFile {
	values: Dataset,
	index_map: Option<Dataset>,
	weight_map: Option<Dataset>,
}

impl GdalTileWriter {
	/// Creates the writer for a planned grid.
	///
	/// `georef` describes the full output grid, `full_bbox` its pixel box;
	/// single-file targets fail here if the plan needs more than one tile.
	/// `with_index_map` / `with_weight_map` pre-declare the auxiliary
	/// outputs so single-file datasets can be created up front.
	pub fn create(
		target: OutputTarget,
		georef: Georef,
		full_bbox: PixelBBox,
		tile_count: usize,
		config: WriterConfig,
		with_index_map: bool,
		with_weight_map: bool,
	) -> Result<GdalTileWriter> {
		target.check_tile_count(tile_count)?;
		ensure!(!full_bbox.is_empty(), MosaicError::grid("output pixel box is empty"));

		let single = if let OutputTarget::SingleFile(path) = &target {
			let cropped = georef.crop(&full_bbox);
			let values = create_dataset(path, &cropped, &full_bbox, config.output_type, &config, georef.nodata())?;
			let index_map = with_index_map
				.then(|| {
					let path = OutputTarget::SingleFile(path.clone()).with_suffix("-index-map").tile_path(0);
					create_dataset(&path, &cropped, &full_bbox, OutputType::Int32, &config, -1.0)
				})
				.transpose()?;
			let weight_map = with_weight_map
				.then(|| {
					let path = OutputTarget::SingleFile(path.clone()).with_suffix("-weight").tile_path(0);
					create_dataset(&path, &cropped, &full_bbox, OutputType::Float32, &config, 0.0)
				})
				.transpose()?;
			Some(Mutex::new(SingleFile {
				values,
				index_map,
				weight_map,
			}))
		} else {
			None
		};

		Ok(GdalTileWriter {
			target,
			georef,
			full_bbox,
			config,
			single,
		})
	}

	fn write_tile_file(&self, suffix: Option<&str>, tile: usize, patch: &Patch, output_type: OutputType) -> Result<()> {
		let target = match suffix {
			Some(suffix) => self.target.with_suffix(suffix),
			None => self.target.clone(),
		};
		let path = target.tile_path(tile);
		let cropped = self.georef.crop(patch.bbox());
		let dataset = create_dataset(&path, &cropped, patch.bbox(), output_type, &self.config, patch.nodata())?;
		write_window(&dataset, output_type, (0, 0), patch)
			.with_context(|| format!("writing tile {tile} to {path:?} failed"))?;
		Ok(())
	}
}

impl TileWriter for GdalTileWriter {
	fn put_tile(&self, tile: TileData) -> Result<()> {
		if let Some(single) = &self.single {
			let single = single.lock().unwrap();
			let offset = (
				(tile.values.bbox().x_min - self.full_bbox.x_min) as isize,
				(tile.values.bbox().y_min - self.full_bbox.y_min) as isize,
			);
			write_window(&single.values, self.config.output_type, offset, &tile.values)?;
			if let (Some(dataset), Some(patch)) = (&single.index_map, &tile.index_map) {
				write_window(dataset, OutputType::Int32, offset, patch)?;
			}
			if let (Some(dataset), Some(patch)) = (&single.weight_map, &tile.weight_map) {
				write_window(dataset, OutputType::Float32, offset, patch)?;
			}
		} else {
			self.write_tile_file(None, tile.index, &tile.values, self.config.output_type)?;
			if let Some(patch) = &tile.index_map {
				self.write_tile_file(Some("-index-map"), tile.index, patch, OutputType::Int32)?;
			}
			if let Some(patch) = &tile.weight_map {
				self.write_tile_file(Some("-weight"), tile.index, patch, OutputType::Float32)?;
			}
		}
		Ok(())
	}

	fn finish(&self) -> Result<()> {
		if let Some(single) = &self.single {
			let mut single = single.lock().unwrap();
			single.values.flush_cache().map_err(|e| MosaicError::io(format!("flushing output failed: {e}")))?;
			if let Some(dataset) = &mut single.index_map {
				dataset.flush_cache().map_err(|e| MosaicError::io(format!("flushing index map failed: {e}")))?;
			}
			if let Some(dataset) = &mut single.weight_map {
				dataset.flush_cache().map_err(|e| MosaicError::io(format!("flushing weight map failed: {e}")))?;
			}
		}
		Ok(())
	}
}

fn create_dataset(
	path: &Path,
	georef: &Georef,
	bbox: &PixelBBox,
	output_type: OutputType,
	config: &WriterConfig,
	nodata: f64,
) -> Result<Dataset> {
	let driver = DriverManager::get_driver_by_name("GTiff")
		.map_err(|e| MosaicError::io(format!("GTiff driver unavailable: {e}")))?;

	let block_x = format!("BLOCKXSIZE={}", config.block_size);
	let block_y = format!("BLOCKYSIZE={}", config.block_size);
	let compress = format!("COMPRESS={}", config.compression);
	let bigtiff = if config.bigtiff { "BIGTIFF=IF_SAFER" } else { "BIGTIFF=NO" };
	let options = RasterCreationOptions::from_iter([
		"TILED=YES",
		block_x.as_str(),
		block_y.as_str(),
		compress.as_str(),
		bigtiff,
	]);

	let (width, height) = (bbox.width() as usize, bbox.height() as usize);
	let mut dataset = match output_type {
		OutputType::Byte => driver.create_with_band_type_with_options::<u8, _>(path, width, height, 1, &options),
		OutputType::UInt16 => driver.create_with_band_type_with_options::<u16, _>(path, width, height, 1, &options),
		OutputType::Int16 => driver.create_with_band_type_with_options::<i16, _>(path, width, height, 1, &options),
		OutputType::UInt32 => driver.create_with_band_type_with_options::<u32, _>(path, width, height, 1, &options),
		OutputType::Int32 => driver.create_with_band_type_with_options::<i32, _>(path, width, height, 1, &options),
		OutputType::Float32 => driver.create_with_band_type_with_options::<f32, _>(path, width, height, 1, &options),
	}
	.map_err(|e| MosaicError::io(format!("cannot create output {path:?}: {e}")))?;

	dataset.set_geo_transform(georef.affine())?;
	dataset.set_spatial_ref(&spatial_ref_from(georef.srs())?)?;
	dataset.rasterband(1)?.set_no_data_value(Some(nodata))?;
	Ok(dataset)
}

fn write_window(dataset: &Dataset, output_type: OutputType, offset: (isize, isize), patch: &Patch) -> Result<()> {
	let size = (patch.width() as usize, patch.height() as usize);
	let mut band = dataset.rasterband(1)?;

	macro_rules! write_as {
		($t:ty) => {{
			let data: Vec<$t> = patch.values().iter().map(|&v| output_type.convert(v) as $t).collect();
			band.write(offset, size, &mut Buffer::new(size, data))
		}};
	}

	match output_type {
		OutputType::Byte => write_as!(u8),
		OutputType::UInt16 => write_as!(u16),
		OutputType::Int16 => write_as!(i16),
		OutputType::UInt32 => write_as!(u32),
		OutputType::Int32 => write_as!(i32),
		OutputType::Float32 => write_as!(f32),
	}
	.map_err(|e| MosaicError::io(format!("writing block at {offset:?} failed: {e}")))?;
	Ok(())
}
