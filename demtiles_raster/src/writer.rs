//! The tile write interface and its in-memory implementation.
//!
//! Workers compute tiles in parallel and commit them through a shared
//! [`TileWriter`]; commits serialize internally, and the on-disk layout is
//! determined by tile index, never by completion order.

use anyhow::{Result, ensure};
use demtiles_core::{MosaicError, Patch, PixelBBox};
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
	sync::Mutex,
};

/// One finished output tile.
///
/// `values` carries the finalized mosaic with the output no-data value as
/// its sentinel. The optional auxiliary rasters are emitted next to the
/// values when requested: `index_map` records the chosen input per pixel
/// (no-data −1), `weight_map` the saved input's blending weight.
#[derive(Debug, Clone)]
pub struct TileData {
	pub index: usize,
	pub values: Patch,
	pub index_map: Option<Patch>,
	pub weight_map: Option<Patch>,
}

/// Accepts finished tiles; implementations serialize commits internally.
pub trait TileWriter: Send + Sync {
	/// Commits one tile. May be called from any worker in any order;
	/// each tile index is committed exactly once.
	fn put_tile(&self, tile: TileData) -> Result<()>;

	/// Flushes and closes the output. Called once, after the last tile.
	fn finish(&self) -> Result<()>;
}

/// Where the mosaic goes: one `.tif` file, or one file per tile under a
/// common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
	/// A path ending in `.tif`; writing fails if more than one tile is
	/// needed.
	SingleFile(PathBuf),
	/// A prefix; tile `i` is written to `<prefix>-tile-<i>.tif`.
	Prefix(PathBuf),
}

impl OutputTarget {
	/// Interprets an output argument: paths ending in `.tif` force
	/// single-file output, anything else is a prefix.
	pub fn from_arg(arg: &str) -> OutputTarget {
		if arg.to_ascii_lowercase().ends_with(".tif") {
			OutputTarget::SingleFile(PathBuf::from(arg))
		} else {
			OutputTarget::Prefix(PathBuf::from(arg))
		}
	}

	/// The file that tile `index` is written to.
	pub fn tile_path(&self, index: usize) -> PathBuf {
		match self {
			OutputTarget::SingleFile(path) => path.clone(),
			OutputTarget::Prefix(prefix) => {
				let mut name = prefix.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
				name.push_str(&format!("-tile-{index}.tif"));
				prefix.with_file_name(name)
			}
		}
	}

	/// Validates the target against the planned tile count.
	pub fn check_tile_count(&self, tile_count: usize) -> Result<()> {
		if let OutputTarget::SingleFile(path) = self {
			if tile_count > 1 {
				return Err(MosaicError::grid(format!(
					"output {path:?} is a single file but the grid needs {tile_count} tiles; \
					 use an output prefix or a larger tile size"
				)));
			}
		}
		Ok(())
	}

	/// A companion target for an auxiliary raster, e.g. `-index-map`.
	pub fn with_suffix(&self, suffix: &str) -> OutputTarget {
		fn append(path: &Path, suffix: &str) -> PathBuf {
			let stem = path.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
			path.with_file_name(format!("{stem}{suffix}.tif"))
		}
		match self {
			OutputTarget::SingleFile(path) => OutputTarget::SingleFile(append(path, suffix)),
			OutputTarget::Prefix(prefix) => {
				let name = prefix.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
				OutputTarget::Prefix(prefix.with_file_name(format!("{name}{suffix}")))
			}
		}
	}
}

/// On-disk parameters shared by every tile file of one run.
#[derive(Debug, Clone)]
pub struct WriterConfig {
	pub output_type: crate::OutputType,
	pub compression: crate::TifCompression,
	pub bigtiff: bool,
	/// Internal block size of the written GeoTIFFs.
	pub block_size: u32,
}

impl Default for WriterConfig {
	fn default() -> Self {
		WriterConfig {
			output_type: crate::OutputType::default(),
			compression: crate::TifCompression::default(),
			bigtiff: true,
			block_size: 256,
		}
	}
}

/// A [`TileWriter`] that keeps tiles in memory, ordered by tile index.
///
/// Backs the integration tests and library callers that post-process the
/// mosaic themselves.
#[derive(Debug, Default)]
pub struct MemoryTileSink {
	tiles: Mutex<BTreeMap<usize, TileData>>,
}

impl MemoryTileSink {
	pub fn new() -> MemoryTileSink {
		MemoryTileSink::default()
	}

	/// The committed tiles in tile-index order.
	pub fn into_tiles(self) -> Vec<TileData> {
		self.tiles.into_inner().unwrap().into_values().collect()
	}

	/// Stitches all committed tiles into one patch over their union box.
	pub fn assemble(&self, nodata: f64) -> Result<Patch> {
		let tiles = self.tiles.lock().unwrap();
		let mut union = PixelBBox::new_empty();
		for tile in tiles.values() {
			union = union.union(tile.values.bbox());
		}
		ensure!(!union.is_empty(), "no tiles have been committed");
		let mut mosaic = Patch::new_nodata(union, nodata);
		for tile in tiles.values() {
			for (x, y) in tile.values.bbox().iter_pixels() {
				mosaic.set(x, y, tile.values.get(x, y));
			}
		}
		Ok(mosaic)
	}

	pub fn tile_count(&self) -> usize {
		self.tiles.lock().unwrap().len()
	}
}

impl TileWriter for MemoryTileSink {
	fn put_tile(&self, tile: TileData) -> Result<()> {
		let mut tiles = self.tiles.lock().unwrap();
		ensure!(
			!tiles.contains_key(&tile.index),
			"tile {} was committed twice",
			tile.index
		);
		tiles.insert(tile.index, tile);
		Ok(())
	}

	fn finish(&self) -> Result<()> {
		Ok(())
	}
}

/// Reads a whitespace-separated DEM list file into input paths.
pub fn read_dem_list_file(path: &Path) -> Result<Vec<String>> {
	let content =
		std::fs::read_to_string(path).map_err(|e| MosaicError::input(format!("cannot read DEM list file {path:?}: {e}")))?;
	let paths: Vec<String> = content.split_whitespace().map(|s| s.to_string()).collect();
	if paths.is_empty() {
		return Err(MosaicError::input(format!("DEM list file {path:?} is empty")));
	}
	Ok(paths)
}

#[cfg(test)]
mod tests {
	use super::*;
	use demtiles_core::Patch;

	fn tile(index: usize, bbox: PixelBBox, value: f64) -> TileData {
		TileData {
			index,
			values: Patch::filled(bbox, value, -9999.0),
			index_map: None,
			weight_map: None,
		}
	}

	#[test]
	fn test_output_target_parsing() {
		assert_eq!(
			OutputTarget::from_arg("out/mosaic.tif"),
			OutputTarget::SingleFile(PathBuf::from("out/mosaic.tif"))
		);
		assert_eq!(
			OutputTarget::from_arg("out/mosaic"),
			OutputTarget::Prefix(PathBuf::from("out/mosaic"))
		);
	}

	#[test]
	fn test_tile_paths() {
		let prefix = OutputTarget::from_arg("out/run1");
		assert_eq!(prefix.tile_path(3), PathBuf::from("out/run1-tile-3.tif"));

		let single = OutputTarget::from_arg("out/mosaic.tif");
		assert_eq!(single.tile_path(0), PathBuf::from("out/mosaic.tif"));
	}

	#[test]
	fn test_single_file_rejects_multiple_tiles() {
		let single = OutputTarget::from_arg("mosaic.tif");
		assert!(single.check_tile_count(1).is_ok());
		assert!(single.check_tile_count(2).is_err());
		assert!(OutputTarget::from_arg("mosaic").check_tile_count(99).is_ok());
	}

	#[test]
	fn test_with_suffix() {
		let single = OutputTarget::from_arg("out/mosaic.tif").with_suffix("-index-map");
		assert_eq!(single.tile_path(0), PathBuf::from("out/mosaic-index-map.tif"));

		let prefix = OutputTarget::from_arg("out/run1").with_suffix("-index-map");
		assert_eq!(prefix.tile_path(1), PathBuf::from("out/run1-index-map-tile-1.tif"));
	}

	#[test]
	fn test_memory_sink_assembles_in_index_order() {
		let sink = MemoryTileSink::new();
		sink.put_tile(tile(1, PixelBBox::new(4, 0, 8, 4).unwrap(), 2.0)).unwrap();
		sink.put_tile(tile(0, PixelBBox::new(0, 0, 4, 4).unwrap(), 1.0)).unwrap();
		sink.finish().unwrap();

		let mosaic = sink.assemble(-9999.0).unwrap();
		assert_eq!(*mosaic.bbox(), PixelBBox::new(0, 0, 8, 4).unwrap());
		assert_eq!(mosaic.get(0, 0), 1.0);
		assert_eq!(mosaic.get(7, 3), 2.0);

		let tiles = sink.into_tiles();
		assert_eq!(tiles[0].index, 0);
		assert_eq!(tiles[1].index, 1);
	}

	#[test]
	fn test_memory_sink_rejects_duplicate_commits() {
		let sink = MemoryTileSink::new();
		let bbox = PixelBBox::new(0, 0, 2, 2).unwrap();
		sink.put_tile(tile(0, bbox, 1.0)).unwrap();
		assert!(sink.put_tile(tile(0, bbox, 1.0)).is_err());
	}

	#[test]
	fn test_read_dem_list_file() {
		use std::io::Write;
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "a.tif b.tif\n  c.tif\n").unwrap();
		let paths = read_dem_list_file(file.path()).unwrap();
		assert_eq!(paths, vec!["a.tif", "b.tif", "c.tif"]);
	}
}
