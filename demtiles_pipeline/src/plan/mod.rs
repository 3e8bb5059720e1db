//! Planning: the output grid, the per-input handles, and per-tile input
//! selection.

mod footprint;
pub use footprint::*;

mod grid;
pub use grid::*;

use anyhow::Result;
use demtiles_core::{Georef, MosaicError, PixelBBox, SrsTransform, TransformFactory};

use crate::MosaicParams;

/// One registered input DEM.
///
/// Created once during setup and immutable afterwards; workers share these
/// read-only. The actual reader is resolved lazily through the source pool
/// using `ordinal`.
pub struct InputHandle {
	/// Position on the command line; defines `first`/`last` and priority
	/// order.
	pub ordinal: usize,
	/// Display name, usually the input path.
	pub name: String,
	pub georef: Georef,
	/// Full extent in the input's own pixel coordinates.
	pub pixel_bbox: PixelBBox,
	/// The input's extent projected into output pixel space, rounded
	/// outward.
	pub footprint: PixelBBox,
	/// Transform from the output SRS into this input's SRS.
	pub to_input: Box<dyn SrsTransform>,
}

impl std::fmt::Debug for InputHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InputHandle")
			.field("ordinal", &self.ordinal)
			.field("name", &self.name)
			.field("footprint", &self.footprint)
			.finish()
	}
}

/// The full plan of a mosaicking run: grid, tiles and input handles.
#[derive(Debug)]
pub struct MosaicPlan {
	pub grid: GridPlan,
	pub inputs: Vec<InputHandle>,
	/// The no-data value written to the output.
	pub output_nodata: f64,
}

impl MosaicPlan {
	/// Plans the grid and projects every input's footprint into it.
	///
	/// `registered` carries one `(name, georef, pixel box)` triple per
	/// input, in command-line order.
	pub fn new(
		params: &MosaicParams,
		registered: Vec<(String, Georef, PixelBBox)>,
		factory: &TransformFactory,
	) -> Result<MosaicPlan> {
		if registered.is_empty() {
			return Err(MosaicError::input("no input DEMs were given"));
		}
		let georefs: Vec<(Georef, PixelBBox)> = registered.iter().map(|(_, g, b)| (g.clone(), *b)).collect();
		let grid = GridPlan::new(params, &georefs, factory)?;
		let output_nodata = grid.georef.nodata();

		let inputs = registered
			.into_iter()
			.enumerate()
			.map(|(ordinal, (name, georef, pixel_bbox))| {
				let to_output = factory(georef.srs(), grid.georef.srs())?;
				let footprint = pixel_footprint(&georef, &pixel_bbox, to_output.as_ref(), &grid.georef)?;
				let to_input = factory(grid.georef.srs(), georef.srs())?;
				Ok(InputHandle {
					ordinal,
					name,
					georef,
					pixel_bbox,
					footprint,
					to_input,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(MosaicPlan {
			grid,
			inputs,
			output_nodata,
		})
	}

	/// The inputs contributing to a tile, in command-line order: those
	/// whose footprint intersects the tile expanded by the crop margin.
	pub fn select_inputs(&self, tile: &TileSpec, extra_crop_length: i64) -> Vec<&InputHandle> {
		let crop = tile.bbox.expanded(extra_crop_length);
		self.inputs.iter().filter(|input| input.footprint.intersects(&crop)).collect()
	}
}
