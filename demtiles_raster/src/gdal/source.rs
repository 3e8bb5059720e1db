//! Reading DEMs through GDAL.

use anyhow::{Context, Result, ensure};
use demtiles_core::{DEFAULT_NODATA, Georef, MosaicError, Patch, PixelBBox, Srs};
use gdal::Dataset;
use std::{
	path::{Path, PathBuf},
	sync::{Arc, Mutex},
};

use crate::{RasterSource, SourceOpener};

/// A [`RasterSource`] over a GDAL dataset.
///
/// The dataset handle is not thread-safe, so block reads serialize behind a
/// mutex; distinct sources read in parallel.
pub struct GdalSource {
	path: PathBuf,
	georef: Georef,
	bbox: PixelBBox,
	dataset: Mutex<Dataset>,
}

impl GdalSource {
	/// Opens the first band of a georeferenced raster file.
	///
	/// `nodata_override` replaces the file's no-data value; files without
	/// one fall back to [`DEFAULT_NODATA`].
	pub fn open(path: &Path, nodata_override: Option<f64>) -> Result<GdalSource> {
		let dataset =
			Dataset::open(path).map_err(|e| MosaicError::input(format!("cannot open DEM {path:?}: {e}")))?;

		let affine = dataset
			.geo_transform()
			.map_err(|e| MosaicError::input(format!("DEM {path:?} has no georeference: {e}")))?;
		let srs = Srs::new(
			&dataset
				.spatial_ref()
				.and_then(|sr| sr.to_wkt())
				.map_err(|e| MosaicError::input(format!("DEM {path:?} has no spatial reference: {e}")))?,
		);
		let nodata = nodata_override
			.or_else(|| dataset.rasterband(1).ok().and_then(|band| band.no_data_value()))
			.unwrap_or(DEFAULT_NODATA);
		let georef = Georef::new(srs, affine, nodata)
			.with_context(|| format!("DEM {path:?} has an unusable geotransform"))?;

		let (width, height) = dataset.raster_size();
		ensure!(width > 0 && height > 0, MosaicError::input(format!("DEM {path:?} is empty")));

		Ok(GdalSource {
			path: path.to_path_buf(),
			georef,
			bbox: PixelBBox::from_size(width as u64, height as u64),
			dataset: Mutex::new(dataset),
		})
	}
}

impl RasterSource for GdalSource {
	fn georef(&self) -> &Georef {
		&self.georef
	}

	fn pixel_bbox(&self) -> PixelBBox {
		self.bbox
	}

	fn read_block(&self, bbox: &PixelBBox) -> Result<Patch> {
		ensure!(
			self.bbox.intersection(bbox) == *bbox,
			"read window {bbox:?} exceeds raster extent {:?} of {:?}",
			self.bbox,
			self.path
		);
		let size = (bbox.width() as usize, bbox.height() as usize);
		let dataset = self.dataset.lock().unwrap();
		let buffer = dataset
			.rasterband(1)
			.and_then(|band| band.read_as::<f64>((bbox.x_min as isize, bbox.y_min as isize), size, size, None))
			.map_err(|e| MosaicError::io(format!("reading {bbox:?} from {:?} failed: {e}", self.path)))?;

		let nodata = self.georef.nodata();
		let data = buffer.data().iter().map(|&v| if v.is_nan() { nodata } else { v }).collect();
		Patch::from_vec(*bbox, data, nodata)
	}
}

impl std::fmt::Debug for GdalSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GdalSource")
			.field("path", &self.path)
			.field("bbox", &self.bbox)
			.field("georef", &self.georef)
			.finish()
	}
}

/// An opener for [`SourcePool`](crate::SourcePool) registration.
pub fn gdal_source_opener(path: &Path, nodata_override: Option<f64>) -> SourceOpener {
	let path = path.to_path_buf();
	Arc::new(move || Ok(Arc::new(GdalSource::open(&path, nodata_override)?) as Arc<dyn RasterSource>))
}
