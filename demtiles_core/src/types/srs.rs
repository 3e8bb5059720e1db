//! Spatial reference system identifiers and coordinate transforms.
//!
//! An [`Srs`] is an opaque identifier (an `EPSG:nnnn` code or a WKT string).
//! Transforms between two systems are expressed through the [`SrsTransform`]
//! trait. Two transforms are built in: the identity (equal systems) and the
//! geographic ↔ spherical-mercator pair; anything else must be supplied by a
//! [`TransformFactory`], e.g. one backed by a projection library.

use anyhow::Result;
use std::{fmt::Debug, sync::Arc};

use crate::MosaicError;

static MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;
static EARTH_RADIUS: f64 = 6_378_137.0; // meters

/// An opaque spatial reference system identifier.
///
/// Equality is normalized-string equality: `epsg:4326` and `EPSG:4326`
/// compare equal, two distinct WKT strings do not, even when they describe
/// the same datum.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Srs(String);

impl Srs {
	pub fn new(id: &str) -> Srs {
		let trimmed = id.trim();
		if trimmed.len() < 12 && trimmed.to_ascii_uppercase().starts_with("EPSG:") {
			Srs(trimmed.to_ascii_uppercase())
		} else {
			Srs(trimmed.to_string())
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// True for plain geographic WGS84 coordinates.
	pub fn is_geographic(&self) -> bool {
		self.0 == "EPSG:4326"
	}

	/// True for spherical web-mercator coordinates.
	pub fn is_mercator(&self) -> bool {
		self.0 == "EPSG:3857"
	}
}

impl Debug for Srs {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Srs({})", self.0)
	}
}

impl From<&str> for Srs {
	fn from(id: &str) -> Srs {
		Srs::new(id)
	}
}

/// A point transform between two spatial reference systems.
///
/// Implementations must be safe to call from multiple worker threads.
pub trait SrsTransform: Send + Sync + Debug {
	/// Transforms the points in place from the source to the destination system.
	fn transform_points(&self, points: &mut [(f64, f64)]) -> Result<()>;

	/// True if this transform leaves every point unchanged.
	fn is_identity(&self) -> bool {
		false
	}
}

/// The identity transform between equal systems.
#[derive(Debug)]
pub struct IdentityTransform;

impl SrsTransform for IdentityTransform {
	fn transform_points(&self, _points: &mut [(f64, f64)]) -> Result<()> {
		Ok(())
	}

	fn is_identity(&self) -> bool {
		true
	}
}

/// Spherical mercator projection of geographic coordinates, or its inverse.
#[derive(Debug)]
pub struct MercatorTransform {
	inverse: bool,
}

impl MercatorTransform {
	/// EPSG:4326 → EPSG:3857.
	pub fn forward() -> MercatorTransform {
		MercatorTransform { inverse: false }
	}

	/// EPSG:3857 → EPSG:4326.
	pub fn inverse() -> MercatorTransform {
		MercatorTransform { inverse: true }
	}
}

impl SrsTransform for MercatorTransform {
	fn transform_points(&self, points: &mut [(f64, f64)]) -> Result<()> {
		use std::f64::consts::PI;
		if self.inverse {
			for (x, y) in points.iter_mut() {
				let lng = (*x / EARTH_RADIUS).to_degrees();
				let lat = (2.0 * (*y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
				*x = lng;
				*y = lat;
			}
		} else {
			for (x, y) in points.iter_mut() {
				let lat = y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
				*x = x.to_radians() * EARTH_RADIUS;
				*y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
			}
		}
		Ok(())
	}
}

/// Builds transforms for arbitrary SRS pairs.
///
/// The pipeline resolves every needed transform through one of these; the
/// default is [`builtin_transform_factory`], a projection-library-backed
/// factory can be injected by the caller.
pub type TransformFactory = Arc<dyn Fn(&Srs, &Srs) -> Result<Box<dyn SrsTransform>> + Send + Sync>;

/// Builds a transform from the built-in set.
///
/// Supports equal systems and the geographic ↔ mercator pair; everything
/// else is a `ConfigError`.
pub fn builtin_transform(src: &Srs, dst: &Srs) -> Result<Box<dyn SrsTransform>> {
	if src == dst {
		return Ok(Box::new(IdentityTransform));
	}
	if src.is_geographic() && dst.is_mercator() {
		return Ok(Box::new(MercatorTransform::forward()));
	}
	if src.is_mercator() && dst.is_geographic() {
		return Ok(Box::new(MercatorTransform::inverse()));
	}
	Err(MosaicError::config(format!(
		"no transform available from {:?} to {:?}; only identity and EPSG:4326 <-> EPSG:3857 are built in",
		src, dst
	)))
}

pub fn builtin_transform_factory() -> TransformFactory {
	Arc::new(|src, dst| builtin_transform(src, dst))
}
