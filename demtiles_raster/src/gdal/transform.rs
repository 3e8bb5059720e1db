//! Arbitrary SRS transforms through GDAL/PROJ.

use anyhow::{Context, Result};
use demtiles_core::{IdentityTransform, Srs, SrsTransform, TransformFactory, builtin_transform};
use gdal::spatial_ref::CoordTransform;
use std::sync::Arc;

use super::spatial_ref_from;

/// A transform between two arbitrary spatial reference systems.
///
/// The underlying `OGRCoordinateTransformation` is not thread-safe, so one
/// is created per `transform_points` call; callers batch whole tiles of
/// points per call, which amortizes the setup.
#[derive(Debug)]
pub struct GdalTransform {
	src: Srs,
	dst: Srs,
}

impl GdalTransform {
	pub fn new(src: &Srs, dst: &Srs) -> Result<GdalTransform> {
		// Fail early if GDAL cannot resolve either system.
		let src_ref = spatial_ref_from(src)?;
		let dst_ref = spatial_ref_from(dst)?;
		CoordTransform::new(&src_ref, &dst_ref)
			.with_context(|| format!("no coordinate transform from {src:?} to {dst:?}"))?;
		Ok(GdalTransform {
			src: src.clone(),
			dst: dst.clone(),
		})
	}
}

impl SrsTransform for GdalTransform {
	fn transform_points(&self, points: &mut [(f64, f64)]) -> Result<()> {
		let transform = CoordTransform::new(&spatial_ref_from(&self.src)?, &spatial_ref_from(&self.dst)?)?;
		let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
		let mut ys: Vec<f64> = points.iter().map(|p| p.1).collect();
		let mut zs = vec![0.0; points.len()];
		transform
			.transform_coords(&mut xs, &mut ys, &mut zs)
			.with_context(|| format!("coordinate transform {:?} -> {:?} failed", self.src, self.dst))?;
		for (point, (x, y)) in points.iter_mut().zip(xs.into_iter().zip(ys)) {
			*point = (x, y);
		}
		Ok(())
	}
}

/// A [`TransformFactory`] that answers every SRS pair GDAL knows,
/// keeping the cheap built-in paths for trivial cases.
pub fn gdal_transform_factory() -> TransformFactory {
	Arc::new(|src, dst| {
		if src == dst {
			return Ok(Box::new(IdentityTransform) as Box<dyn SrsTransform>);
		}
		if let Ok(transform) = builtin_transform(src, dst) {
			return Ok(transform);
		}
		Ok(Box::new(GdalTransform::new(src, dst)?) as Box<dyn SrsTransform>)
	})
}
