//! GDAL-backed raster I/O and coordinate transforms.
//!
//! Everything in this module requires the `gdal` feature and a system GDAL
//! installation. The rest of the workspace only consumes the
//! [`RasterSource`](crate::RasterSource), [`TileWriter`](crate::TileWriter)
//! and [`SrsTransform`](demtiles_core::SrsTransform) interfaces, so default
//! builds stay free of native dependencies.

mod source;
pub use source::{GdalSource, gdal_source_opener};

mod transform;
pub use transform::{GdalTransform, gdal_transform_factory};

mod writer;
pub use writer::GdalTileWriter;

use anyhow::{Context, Result};
use demtiles_core::Srs;
use gdal::spatial_ref::{AxisMappingStrategy, SpatialRef};

/// Caps GDAL's raster block cache.
pub fn set_cache_budget_mb(megabytes: usize) -> Result<()> {
	gdal::config::set_config_option("GDAL_CACHEMAX", &megabytes.to_string())?;
	Ok(())
}

/// Builds a GDAL spatial reference from an SRS identifier, forcing
/// traditional x/y axis order.
pub fn spatial_ref_from(srs: &Srs) -> Result<SpatialRef> {
	let mut spatial_ref = SpatialRef::from_definition(srs.as_str())
		.with_context(|| format!("cannot interpret spatial reference {:?}", srs))?;
	spatial_ref.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
	Ok(spatial_ref)
}
