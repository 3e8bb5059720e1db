//! The `probe` subcommand: inspect one DEM's georeference.

use anyhow::Result;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// the DEM to inspect
	#[arg(value_name = "DEM")]
	dem: PathBuf,
}

#[cfg(feature = "gdal")]
pub fn run(arguments: &Subcommand) -> Result<()> {
	use demtiles_raster::{RasterSource, gdal::GdalSource};

	let source = GdalSource::open(&arguments.dem, None)?;
	let georef = source.georef();
	let bbox = source.pixel_bbox();
	let world = georef.world_bbox(&bbox)?;

	println!("file:       {}", arguments.dem.display());
	println!("size:       {} x {} pixels", bbox.width(), bbox.height());
	println!("pixel size: {} x {}", georef.dx(), georef.dy());
	println!(
		"extent:     {} {} {} {}",
		world.x_min, world.y_min, world.x_max, world.y_max
	);
	println!("nodata:     {}", georef.nodata());
	println!("srs:        {}", georef.srs().as_str());
	Ok(())
}

#[cfg(not(feature = "gdal"))]
pub fn run(arguments: &Subcommand) -> Result<()> {
	anyhow::bail!(
		"this build cannot read raster files (wanted to probe {:?}); rebuild with --features gdal",
		arguments.dem
	);
}
