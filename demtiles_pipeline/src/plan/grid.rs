//! The output grid planner: projects the output georeference from the
//! inputs and partitions its pixel box into tiles.

use anyhow::Result;
use demtiles_core::{Georef, MosaicError, PixelBBox, Srs, TransformFactory, WorldBBox};

use crate::{DEFAULT_TILE_PIXELS, MosaicParams, plan::world_footprint};

/// One output tile: an axis-aligned window of the output pixel box.
///
/// Tiles partition the pixel box exactly; indexes are row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSpec {
	pub index: usize,
	pub bbox: PixelBBox,
}

/// The planned output grid.
#[derive(Debug, Clone)]
pub struct GridPlan {
	/// Georeference of the output; pixel `(0, 0)` is the grid's upper-left
	/// corner.
	pub georef: Georef,
	/// The full output extent, anchored at the origin.
	pub pixel_bbox: PixelBBox,
	pub tiles: Vec<TileSpec>,
}

impl GridPlan {
	/// Computes the output georeference and tiling for the given inputs.
	///
	/// The target SRS and pixel size default to the first input's. Each
	/// input's footprint is projected into the target SRS via sampled
	/// perimeters; their union (or the supplied window) becomes the output
	/// extent.
	pub fn new(
		params: &MosaicParams,
		inputs: &[(Georef, PixelBBox)],
		factory: &TransformFactory,
	) -> Result<GridPlan> {
		params.validate()?;
		let (first_georef, _) = inputs.first().ok_or_else(|| MosaicError::input("no input DEMs were given"))?;

		let target_srs: Srs = params.target_srs.clone().unwrap_or_else(|| first_georef.srs().clone());
		let pixel_size = params.target_pixel_size.unwrap_or_else(|| first_georef.dx());
		if !(pixel_size > 0.0 && pixel_size.is_finite()) {
			return Err(MosaicError::config(format!("output pixel size must be positive, got {pixel_size}")));
		}

		let mut world: Option<WorldBBox> = None;
		for (georef, bbox) in inputs {
			let to_target = factory(georef.srs(), &target_srs)?;
			let footprint = world_footprint(georef, bbox, to_target.as_ref())?;
			world = Some(match world {
				Some(mut union) => {
					union.extend(&footprint);
					union
				}
				None => footprint,
			});
		}
		let mut world = world.ok_or_else(|| MosaicError::config("the input footprints form an empty union"))?;

		if let Some(window) = &params.target_window {
			if params.force_window {
				world = *window;
			} else {
				world = world
					.intersection(window)
					.ok_or_else(|| MosaicError::grid("the projection window does not intersect any input"))?;
			}
		}
		if params.tap {
			world = world.snapped_outward(pixel_size);
		}

		let georef = Georef::from_origin(
			target_srs,
			world.x_min,
			world.y_max,
			pixel_size,
			pixel_size,
			params.output_nodata.unwrap_or_else(|| first_georef.nodata()),
		)?;

		let width = ((world.width() / pixel_size) - 1e-9).ceil().max(1.0) as u64;
		let height = ((world.height() / pixel_size) - 1e-9).ceil().max(1.0) as u64;
		let pixel_bbox = PixelBBox::from_size(width, height);

		let tiles = partition(&pixel_bbox, tile_edge(params, pixel_size));
		Ok(GridPlan {
			georef,
			pixel_bbox,
			tiles,
		})
	}

	/// The tiles selected by the user, or all of them.
	pub fn selected_tiles(&self, selection: Option<&[usize]>) -> Result<Vec<TileSpec>> {
		match selection {
			None => Ok(self.tiles.clone()),
			Some(indexes) => indexes
				.iter()
				.map(|&index| {
					self.tiles.get(index).copied().ok_or_else(|| {
						MosaicError::config(format!("tile index {index} is out of range (0..{})", self.tiles.len()))
					})
				})
				.collect(),
		}
	}
}

/// Tile edge length in pixels for the given parameters.
fn tile_edge(params: &MosaicParams, pixel_size: f64) -> u64 {
	if let Some(pixels) = params.tile_size_pixels {
		return pixels;
	}
	if let Some(world_units) = params.tile_size_georef {
		return ((world_units / pixel_size).round() as u64).max(1);
	}
	(DEFAULT_TILE_PIXELS as f64).sqrt() as u64
}

/// Splits the pixel box into row-major tiles of at most `edge`×`edge`
/// pixels.
fn partition(pixel_bbox: &PixelBBox, edge: u64) -> Vec<TileSpec> {
	let edge = edge.max(1) as i64;
	let mut tiles = Vec::new();
	let mut index = 0;
	let mut y = pixel_bbox.y_min;
	while y < pixel_bbox.y_max {
		let y_max = (y + edge).min(pixel_bbox.y_max);
		let mut x = pixel_bbox.x_min;
		while x < pixel_bbox.x_max {
			let x_max = (x + edge).min(pixel_bbox.x_max);
			tiles.push(TileSpec {
				index,
				bbox: PixelBBox {
					x_min: x,
					y_min: y,
					x_max,
					y_max,
				},
			});
			index += 1;
			x = x_max;
		}
		y = y_max;
	}
	tiles
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use demtiles_core::builtin_transform_factory;

	fn input(x0: f64, y0: f64, step: f64, size: u64) -> (Georef, PixelBBox) {
		(
			Georef::from_origin(Srs::new("EPSG:32633"), x0, y0, step, step, -9999.0).unwrap(),
			PixelBBox::from_size(size, size),
		)
	}

	#[test]
	fn test_single_input_grid_matches_input() {
		let plan = GridPlan::new(&MosaicParams::default(), &[input(1000.0, 2000.0, 10.0, 50)], &builtin_transform_factory())
			.unwrap();
		assert_eq!(plan.pixel_bbox, PixelBBox::from_size(50, 50));
		assert_eq!(plan.georef.pixel_to_world(0.0, 0.0), (1000.0, 2000.0));
		assert_abs_diff_eq!(plan.georef.dx(), 10.0);
		assert_eq!(plan.tiles.len(), 1);
	}

	#[test]
	fn test_union_of_offset_inputs() {
		let inputs = [input(0.0, 1000.0, 10.0, 100), input(500.0, 1500.0, 10.0, 100)];
		let plan = GridPlan::new(&MosaicParams::default(), &inputs, &builtin_transform_factory()).unwrap();
		// Union: x 0..1500, y -0+0 .. 1500 => 150x150 pixels.
		assert_eq!(plan.pixel_bbox, PixelBBox::from_size(150, 150));
		assert_eq!(plan.georef.pixel_to_world(0.0, 0.0), (0.0, 1500.0));
	}

	#[test]
	fn test_no_inputs_fails() {
		let result = GridPlan::new(&MosaicParams::default(), &[], &builtin_transform_factory());
		assert!(result.is_err());
	}

	#[test]
	fn test_window_intersection_and_force() {
		let params = MosaicParams {
			target_window: Some(WorldBBox::new(200.0, 1200.0, 600.0, 1800.0).unwrap()),
			..MosaicParams::default()
		};
		let plan = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 100)], &builtin_transform_factory()).unwrap();
		// Input covers x 0..1000, y 1000..2000; window clips to 200..600 x 1200..1800.
		assert_eq!(plan.pixel_bbox, PixelBBox::from_size(40, 60));

		let params = MosaicParams {
			target_window: Some(WorldBBox::new(-500.0, 0.0, 1500.0, 3000.0).unwrap()),
			force_window: true,
			..MosaicParams::default()
		};
		let plan = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 100)], &builtin_transform_factory()).unwrap();
		assert_eq!(plan.pixel_bbox, PixelBBox::from_size(200, 300));
	}

	#[test]
	fn test_disjoint_window_fails() {
		let params = MosaicParams {
			target_window: Some(WorldBBox::new(10_000.0, 10_000.0, 11_000.0, 11_000.0).unwrap()),
			..MosaicParams::default()
		};
		let result = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 100)], &builtin_transform_factory());
		assert!(result.is_err());
	}

	#[test]
	fn test_tap_snaps_outward() {
		let params = MosaicParams {
			tap: true,
			..MosaicParams::default()
		};
		// Origin at 1003: not a multiple of the 10-unit pixel size.
		let plan = GridPlan::new(&params, &[input(1003.0, 2007.0, 10.0, 10)], &builtin_transform_factory()).unwrap();
		let (x0, y0) = plan.georef.pixel_to_world(0.0, 0.0);
		assert_abs_diff_eq!(x0, 1000.0);
		assert_abs_diff_eq!(y0, 2010.0);
		// Snapping expands by one pixel on each axis.
		assert_eq!(plan.pixel_bbox, PixelBBox::from_size(11, 11));
	}

	#[test]
	fn test_partition_is_exact_row_major() {
		let params = MosaicParams {
			tile_size_pixels: Some(64),
			..MosaicParams::default()
		};
		let plan = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 150)], &builtin_transform_factory()).unwrap();
		assert_eq!(plan.tiles.len(), 9);
		assert_eq!(plan.tiles[0].bbox, PixelBBox::new(0, 0, 64, 64).unwrap());
		assert_eq!(plan.tiles[1].bbox, PixelBBox::new(64, 0, 128, 64).unwrap());
		assert_eq!(plan.tiles[2].bbox, PixelBBox::new(128, 0, 150, 64).unwrap());
		assert_eq!(plan.tiles[8].bbox, PixelBBox::new(128, 128, 150, 150).unwrap());

		// No gap, no overlap: areas add up to the full box.
		let total: u64 = plan.tiles.iter().map(|t| t.bbox.area()).sum();
		assert_eq!(total, plan.pixel_bbox.area());
		for (i, tile) in plan.tiles.iter().enumerate() {
			assert_eq!(tile.index, i);
			for other in &plan.tiles[i + 1..] {
				assert!(!tile.bbox.intersects(&other.bbox));
			}
		}
	}

	#[test]
	fn test_georef_tile_size() {
		let params = MosaicParams {
			tile_size_georef: Some(500.0),
			..MosaicParams::default()
		};
		let plan = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 100)], &builtin_transform_factory()).unwrap();
		// 500 units at 10 units/pixel => 50-pixel tiles over a 100x100 grid.
		assert_eq!(plan.tiles.len(), 4);
	}

	#[test]
	fn test_selected_tiles() {
		let params = MosaicParams {
			tile_size_pixels: Some(64),
			..MosaicParams::default()
		};
		let plan = GridPlan::new(&params, &[input(0.0, 2000.0, 10.0, 150)], &builtin_transform_factory()).unwrap();
		let selected = plan.selected_tiles(Some(&[3, 0])).unwrap();
		assert_eq!(selected.len(), 2);
		assert_eq!(selected[0].index, 3);
		assert_eq!(selected[1].index, 0);
		assert!(plan.selected_tiles(Some(&[99])).is_err());
		assert_eq!(plan.selected_tiles(None).unwrap().len(), 9);
	}
}
