//! The driver: plans the run, fans tiles out over worker tasks and commits
//! finished tiles to the writer.

use anyhow::{Context, Result, anyhow, ensure};
use demtiles_core::{MosaicError, TransformFactory, progress::get_progress_bar};
use demtiles_raster::{RasterSource, SourcePool, TileData, TileWriter};
use futures::{StreamExt, stream};
use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use crate::{
	MosaicParams, MosaicPlan, PostProcessParams, TileAccumulator, TileSpec, WeightParams, apply_post_processing,
	apply_priority_blending, build_weight_patch, reproject_input,
};

/// One fully planned mosaicking run.
///
/// Owns the input index and the tile list; workers borrow input handles
/// read-only and resolve readers through the shared source pool.
pub struct Mosaicker {
	params: MosaicParams,
	plan: MosaicPlan,
	pool: Arc<SourcePool>,
}

impl Mosaicker {
	/// Registers the inputs and plans the grid.
	///
	/// `names` and the pool's openers correspond index-wise; each input is
	/// opened once here to capture its georeference and extent.
	pub fn new(params: MosaicParams, names: Vec<String>, pool: SourcePool, factory: &TransformFactory) -> Result<Mosaicker> {
		params.validate()?;
		ensure!(
			names.len() == pool.len(),
			MosaicError::internal(format!("{} names for {} registered inputs", names.len(), pool.len()))
		);

		let registered = names
			.into_iter()
			.enumerate()
			.map(|(ordinal, name)| {
				let source = pool.get(ordinal).with_context(|| format!("registering input {name:?}"))?;
				Ok((name, source.georef().clone(), source.pixel_bbox()))
			})
			.collect::<Result<Vec<_>>>()?;

		let plan = MosaicPlan::new(&params, registered, factory)?;
		log::info!(
			"planned a {}x{} output grid in {} tiles from {} inputs",
			plan.grid.pixel_bbox.width(),
			plan.grid.pixel_bbox.height(),
			plan.grid.tiles.len(),
			plan.inputs.len()
		);
		Ok(Mosaicker {
			params,
			plan,
			pool: Arc::new(pool),
		})
	}

	/// Convenience constructor over already-open sources.
	pub fn from_sources(
		params: MosaicParams,
		sources: Vec<(String, Arc<dyn RasterSource>)>,
		factory: &TransformFactory,
	) -> Result<Mosaicker> {
		let (names, sources): (Vec<String>, Vec<Arc<dyn RasterSource>>) = sources.into_iter().unzip();
		Mosaicker::new(params, names, SourcePool::from_sources(sources), factory)
	}

	pub fn plan(&self) -> &MosaicPlan {
		&self.plan
	}

	pub fn params(&self) -> &MosaicParams {
		&self.params
	}

	/// The tiles this run will produce, honoring `tile_selection`.
	pub fn tiles(&self) -> Result<Vec<TileSpec>> {
		self.plan.grid.selected_tiles(self.params.tile_selection.as_deref())
	}

	/// Runs the mosaic: tiles are pulled by `threads` workers, computed
	/// sequentially per tile, and committed to the writer as they finish.
	/// Returns the number of tiles written.
	///
	/// The cancel flag is checked between tiles and between inputs within
	/// a tile; a raised flag lets in-flight tiles finish their current
	/// input and ends the run without an error.
	pub async fn run(self: Arc<Self>, writer: Arc<dyn TileWriter>, cancel: Arc<AtomicBool>) -> Result<usize> {
		let tiles = self.tiles()?;
		if self.params.mode.collects_samples() && self.params.threads > 1 {
			log::warn!(
				"{} mode holds every overlapping sample in memory; consider fewer than {} threads",
				self.params.mode,
				self.params.threads
			);
		}

		let mut progress = get_progress_bar("mosaicking tiles", tiles.len() as u64);
		let mut results = stream::iter(tiles.into_iter().map(|tile| {
			let mosaicker = self.clone();
			let writer = writer.clone();
			let cancel = cancel.clone();
			tokio::spawn(async move {
				let cancel_inner = cancel.clone();
				let data = tokio::task::spawn_blocking(move || mosaicker.process_tile(tile, &cancel_inner))
					.await
					.map_err(|e| anyhow!("tile {} worker failed: {e}", tile.index))??;
				match data {
					Some(data) => {
						writer.put_tile(data).with_context(|| format!("committing tile {}", tile.index))?;
						Ok::<bool, anyhow::Error>(true)
					}
					None => Ok(false), // cancelled
				}
			})
		}))
		.buffer_unordered(self.params.threads);

		// A failing tile does not take the others down; the run keeps
		// going, flushes what succeeded, and reports the first failure.
		let mut written = 0;
		let mut first_error: Option<anyhow::Error> = None;
		while let Some(joined) = results.next().await {
			match joined {
				Ok(Ok(true)) => {
					written += 1;
					progress.inc(1);
				}
				Ok(Ok(false)) => {}
				Ok(Err(error)) => {
					log::error!("a tile failed: {error:#}");
					first_error.get_or_insert(error);
				}
				Err(join_error) => {
					cancel.store(true, Ordering::Relaxed);
					first_error.get_or_insert_with(|| anyhow!("a tile worker panicked: {join_error}"));
				}
			}
		}
		progress.finish();
		writer.finish()?;

		if let Some(error) = first_error {
			return Err(error);
		}
		log::info!("wrote {written} tiles");
		Ok(written)
	}

	/// Computes one tile: reprojects every selected input over the
	/// expanded crop box, folds them in input order, post-processes, and
	/// crops the result back to the tile. Returns `None` when cancelled.
	fn process_tile(&self, tile: TileSpec, cancel: &AtomicBool) -> Result<Option<TileData>> {
		if cancel.load(Ordering::Relaxed) {
			return Ok(None);
		}

		let crop = tile.bbox.expanded(self.params.extra_crop_length);
		let selected = self.plan.select_inputs(&tile, self.params.extra_crop_length);
		let total = selected.len();
		log::debug!("tile {}: {} inputs intersect", tile.index, total);

		let weight_params = WeightParams {
			exponent: self.params.weights_exponent,
			blur_sigma: self.params.weights_blur_sigma,
			use_centerline: self.params.use_centerline,
		};
		let mut accumulator = TileAccumulator::new(self.params.mode, crop, self.plan.output_nodata);
		let mut saved_weight = None;

		for (position, input) in selected.iter().enumerate() {
			if cancel.load(Ordering::Relaxed) {
				return Ok(None);
			}
			let source = self
				.pool
				.get(input.ordinal)
				.with_context(|| format!("opening input {:?} for tile {}", input.name, tile.index))?;
			let values = reproject_input(
				source.as_ref(),
				input,
				&self.plan.grid.georef,
				&crop,
				self.plan.output_nodata,
				self.params.nodata_threshold,
			)
			.with_context(|| format!("reprojecting input {:?} into tile {}", input.name, tile.index))?;
			let Some(values) = values else {
				continue;
			};

			if self.params.mode.needs_weights() {
				let (mut weights, boundary_distance) = build_weight_patch(&values, &input.footprint, &weight_params);
				if let Some(length) = self.params.priority_blending_length {
					apply_priority_blending(&mut weights, &boundary_distance, position, total, length);
				}
				if self.params.save_dem_weight == Some(input.ordinal) {
					saved_weight = Some(weights.clone());
				}
				accumulator.accumulate(input.ordinal, &values, Some(&weights));
			} else {
				accumulator.accumulate(input.ordinal, &values, None);
			}
		}

		let (mut values, index_map) = accumulator.finalize();
		apply_post_processing(
			&mut values,
			&PostProcessParams {
				hole_fill_length: self.params.hole_fill_length,
				dem_blur_sigma: self.params.dem_blur_sigma,
				erode_length: self.params.erode_length,
			},
		);

		let index_map = if self.params.save_index_map && self.params.mode.carries_index() {
			index_map.map(|map| map.cropped(&tile.bbox)).transpose()?
		} else {
			None
		};
		let weight_map = saved_weight.map(|weights| weights.cropped(&tile.bbox)).transpose()?;

		Ok(Some(TileData {
			index: tile.index,
			values: values.cropped(&tile.bbox)?,
			index_map,
			weight_map,
		}))
	}
}

impl std::fmt::Debug for Mosaicker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mosaicker")
			.field("mode", &self.params.mode)
			.field("inputs", &self.plan.inputs.len())
			.field("tiles", &self.plan.grid.tiles.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MosaicMode;
	use demtiles_core::{Georef, Srs, builtin_transform_factory};
	use demtiles_raster::{MemoryRaster, MemoryTileSink};

	fn source(x0: f64, y0: f64, size: u64, value: f64) -> Arc<dyn RasterSource> {
		let georef = Georef::from_origin(Srs::new("EPSG:32633"), x0, y0, 1.0, 1.0, -9999.0).unwrap();
		Arc::new(MemoryRaster::filled(georef, size, size, value))
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_run_writes_every_tile() {
		let params = MosaicParams {
			mode: MosaicMode::Mean,
			tile_size_pixels: Some(16),
			extra_crop_length: 4,
			threads: 4,
			..MosaicParams::default()
		};
		let mosaicker = Arc::new(
			Mosaicker::from_sources(
				params,
				vec![("a".to_string(), source(0.0, 40.0, 40, 7.0))],
				&builtin_transform_factory(),
			)
			.unwrap(),
		);

		let sink = Arc::new(MemoryTileSink::new());
		let written = mosaicker
			.clone()
			.run(sink.clone(), Arc::new(AtomicBool::new(false)))
			.await
			.unwrap();

		// 40/16 -> 3x3 tiles.
		assert_eq!(written, 9);
		let mosaic = sink.assemble(-9999.0).unwrap();
		assert_eq!(mosaic.bbox().area(), 1600);
		for (x, y) in mosaic.bbox().iter_pixels() {
			assert_eq!(mosaic.get(x, y), 7.0, "at ({x},{y})");
		}
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_cancel_before_start_writes_nothing() {
		let mosaicker = Arc::new(
			Mosaicker::from_sources(
				MosaicParams::default(),
				vec![("a".to_string(), source(0.0, 10.0, 10, 1.0))],
				&builtin_transform_factory(),
			)
			.unwrap(),
		);
		let sink = Arc::new(MemoryTileSink::new());
		let cancel = Arc::new(AtomicBool::new(true));
		let written = mosaicker.run(sink.clone(), cancel).await.unwrap();
		assert_eq!(written, 0);
		assert_eq!(sink.tile_count(), 0);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn test_tile_selection_runs_subset() {
		let params = MosaicParams {
			tile_size_pixels: Some(16),
			tile_selection: Some(vec![0, 3]),
			extra_crop_length: 2,
			..MosaicParams::default()
		};
		let mosaicker = Arc::new(
			Mosaicker::from_sources(
				params,
				vec![("a".to_string(), source(0.0, 40.0, 40, 3.0))],
				&builtin_transform_factory(),
			)
			.unwrap(),
		);
		let sink = Arc::new(MemoryTileSink::new());
		let written = mosaicker.run(sink.clone(), Arc::new(AtomicBool::new(false))).await.unwrap();
		assert_eq!(written, 2);
		let tiles = Arc::try_unwrap(sink).unwrap().into_tiles();
		assert_eq!(tiles[0].index, 0);
		assert_eq!(tiles[1].index, 3);
	}

	#[test]
	fn test_mismatched_names_fail() {
		let pool = SourcePool::from_sources(vec![source(0.0, 10.0, 10, 1.0)]);
		let result = Mosaicker::new(MosaicParams::default(), vec![], pool, &builtin_transform_factory());
		assert!(result.is_err());
	}
}
