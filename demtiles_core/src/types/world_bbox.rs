//! Projected-coordinate bounding boxes.

use anyhow::{Result, ensure};

/// An axis-aligned rectangle in projected coordinates, maximum exclusive.
///
/// Unlike a geographic bounding box this type carries no datum knowledge;
/// the owning [`Georef`](crate::Georef) decides what the numbers mean.
///
/// # Examples
/// ```
/// use demtiles_core::WorldBBox;
///
/// let mut bbox = WorldBBox::new(0.0, 0.0, 100.0, 50.0).unwrap();
/// bbox.extend(&WorldBBox::new(-20.0, 10.0, 80.0, 70.0).unwrap());
/// assert_eq!(bbox.as_tuple(), (-20.0, 0.0, 100.0, 70.0));
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct WorldBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl WorldBBox {
	/// Creates a new box, validating that all coordinates are finite and
	/// `min < max` component-wise.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<WorldBBox> {
		ensure!(
			x_min.is_finite() && y_min.is_finite() && x_max.is_finite() && y_max.is_finite(),
			"world bbox coordinates must be finite"
		);
		ensure!(x_min < x_max, "x_min ({x_min}) must be < x_max ({x_max})");
		ensure!(y_min < y_max, "y_min ({y_min}) must be < y_max ({y_max})");
		Ok(WorldBBox { x_min, y_min, x_max, y_max })
	}

	/// The smallest box covering a set of points; `None` for an empty set.
	pub fn from_points(points: &[(f64, f64)]) -> Option<WorldBBox> {
		let mut iter = points.iter();
		let &(x, y) = iter.next()?;
		let mut bbox = WorldBBox {
			x_min: x,
			y_min: y,
			x_max: x,
			y_max: y,
		};
		for &(x, y) in iter {
			bbox.x_min = bbox.x_min.min(x);
			bbox.y_min = bbox.y_min.min(y);
			bbox.x_max = bbox.x_max.max(x);
			bbox.y_max = bbox.y_max.max(y);
		}
		Some(bbox)
	}

	pub fn width(&self) -> f64 {
		self.x_max - self.x_min
	}

	pub fn height(&self) -> f64 {
		self.y_max - self.y_min
	}

	pub fn is_empty(&self) -> bool {
		self.x_max <= self.x_min || self.y_max <= self.y_min
	}

	pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
		(self.x_min, self.y_min, self.x_max, self.y_max)
	}

	/// Grows the box to cover `other`.
	pub fn extend(&mut self, other: &WorldBBox) {
		self.x_min = self.x_min.min(other.x_min);
		self.y_min = self.y_min.min(other.y_min);
		self.x_max = self.x_max.max(other.x_max);
		self.y_max = self.y_max.max(other.y_max);
	}

	/// The shared region of two boxes; `None` if they are disjoint.
	pub fn intersection(&self, other: &WorldBBox) -> Option<WorldBBox> {
		let x_min = self.x_min.max(other.x_min);
		let y_min = self.y_min.max(other.y_min);
		let x_max = self.x_max.min(other.x_max);
		let y_max = self.y_max.min(other.y_max);
		if x_min < x_max && y_min < y_max {
			Some(WorldBBox { x_min, y_min, x_max, y_max })
		} else {
			None
		}
	}

	/// Snaps every edge outward onto an integer multiple of `step`
	/// ("target aligned pixels").
	pub fn snapped_outward(&self, step: f64) -> WorldBBox {
		WorldBBox {
			x_min: (self.x_min / step).floor() * step,
			y_min: (self.y_min / step).floor() * step,
			x_max: (self.x_max / step).ceil() * step,
			y_max: (self.y_max / step).ceil() * step,
		}
	}
}

impl std::fmt::Debug for WorldBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"WorldBBox[{},{} .. {},{}]",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn test_new_validates() {
		assert!(WorldBBox::new(0.0, 0.0, 0.0, 1.0).is_err());
		assert!(WorldBBox::new(0.0, 2.0, 1.0, 1.0).is_err());
		assert!(WorldBBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
		assert!(WorldBBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
	}

	#[test]
	fn test_from_points() {
		assert!(WorldBBox::from_points(&[]).is_none());
		let bbox = WorldBBox::from_points(&[(3.0, -1.0), (-2.0, 4.0), (1.0, 1.0)]).unwrap();
		assert_eq!(bbox.as_tuple(), (-2.0, -1.0, 3.0, 4.0));
	}

	#[test]
	fn test_extend_and_intersection() {
		let mut a = WorldBBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
		let b = WorldBBox::new(5.0, -5.0, 15.0, 5.0).unwrap();

		assert_eq!(a.intersection(&b).unwrap().as_tuple(), (5.0, 0.0, 10.0, 5.0));

		a.extend(&b);
		assert_eq!(a.as_tuple(), (0.0, -5.0, 15.0, 10.0));

		let far = WorldBBox::new(100.0, 100.0, 101.0, 101.0).unwrap();
		assert!(a.intersection(&far).is_none());
	}

	#[test]
	fn test_snapped_outward() {
		let bbox = WorldBBox::new(1.2, -0.7, 9.1, 4.0).unwrap();
		let snapped = bbox.snapped_outward(0.5);
		assert_abs_diff_eq!(snapped.x_min, 1.0);
		assert_abs_diff_eq!(snapped.y_min, -1.0);
		assert_abs_diff_eq!(snapped.x_max, 9.5);
		assert_abs_diff_eq!(snapped.y_max, 4.0);
	}
}
