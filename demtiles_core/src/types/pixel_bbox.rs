//! Integer pixel bounding boxes.
//!
//! A [`PixelBBox`] is an axis-aligned rectangle of pixel coordinates with an
//! exclusive maximum, used both for windows into input rasters and for
//! output tiles. Coordinates are signed: an input's footprint projected into
//! the output grid can start left of or above the output origin.

use anyhow::{Result, ensure};

/// An axis-aligned rectangle of integer pixel coordinates, maximum exclusive.
///
/// A box is empty iff `x_max <= x_min` or `y_max <= y_min`.
///
/// # Examples
/// ```
/// use demtiles_core::PixelBBox;
///
/// let bbox = PixelBBox::new(0, 0, 10, 5).unwrap();
/// assert_eq!(bbox.width(), 10);
/// assert_eq!(bbox.height(), 5);
/// assert_eq!(bbox.area(), 50);
/// assert!(bbox.contains(9, 4));
/// assert!(!bbox.contains(10, 4));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelBBox {
	pub x_min: i64,
	pub y_min: i64,
	pub x_max: i64,
	pub y_max: i64,
}

impl PixelBBox {
	/// Creates a new box, validating `min <= max` component-wise.
	pub fn new(x_min: i64, y_min: i64, x_max: i64, y_max: i64) -> Result<PixelBBox> {
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		Ok(PixelBBox { x_min, y_min, x_max, y_max })
	}

	/// Creates an empty box.
	pub fn new_empty() -> PixelBBox {
		PixelBBox {
			x_min: 0,
			y_min: 0,
			x_max: 0,
			y_max: 0,
		}
	}

	/// Creates a box anchored at the origin with the given size.
	pub fn from_size(width: u64, height: u64) -> PixelBBox {
		PixelBBox {
			x_min: 0,
			y_min: 0,
			x_max: width as i64,
			y_max: height as i64,
		}
	}

	pub fn width(&self) -> u64 {
		(self.x_max - self.x_min).max(0) as u64
	}

	pub fn height(&self) -> u64 {
		(self.y_max - self.y_min).max(0) as u64
	}

	pub fn area(&self) -> u64 {
		self.width() * self.height()
	}

	pub fn is_empty(&self) -> bool {
		self.x_max <= self.x_min || self.y_max <= self.y_min
	}

	/// True if the pixel coordinate lies inside the box.
	pub fn contains(&self, x: i64, y: i64) -> bool {
		x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
	}

	/// True if the two boxes share at least one pixel.
	pub fn intersects(&self, other: &PixelBBox) -> bool {
		!self.intersection(other).is_empty()
	}

	/// The shared region of two boxes; empty if they are disjoint.
	pub fn intersection(&self, other: &PixelBBox) -> PixelBBox {
		let x_min = self.x_min.max(other.x_min);
		let y_min = self.y_min.max(other.y_min);
		let x_max = self.x_max.min(other.x_max);
		let y_max = self.y_max.min(other.y_max);
		if x_min >= x_max || y_min >= y_max {
			PixelBBox::new_empty()
		} else {
			PixelBBox { x_min, y_min, x_max, y_max }
		}
	}

	/// The smallest box covering both boxes.
	pub fn union(&self, other: &PixelBBox) -> PixelBBox {
		if self.is_empty() {
			return *other;
		}
		if other.is_empty() {
			return *self;
		}
		PixelBBox {
			x_min: self.x_min.min(other.x_min),
			y_min: self.y_min.min(other.y_min),
			x_max: self.x_max.max(other.x_max),
			y_max: self.y_max.max(other.y_max),
		}
	}

	/// Grows the box by `margin` pixels on every side.
	pub fn expanded(&self, margin: i64) -> PixelBBox {
		PixelBBox {
			x_min: self.x_min - margin,
			y_min: self.y_min - margin,
			x_max: self.x_max + margin,
			y_max: self.y_max + margin,
		}
	}

	/// The smallest box covering a set of fractional pixel coordinates,
	/// rounded outward. The points are treated as a region boundary: a box
	/// built from a region's perimeter covers exactly that region.
	pub fn bounding(points: &[(f64, f64)]) -> PixelBBox {
		let mut iter = points.iter();
		let Some(&(x, y)) = iter.next() else {
			return PixelBBox::new_empty();
		};
		let mut bbox = PixelBBox {
			x_min: x.floor() as i64,
			y_min: y.floor() as i64,
			x_max: x.ceil() as i64,
			y_max: y.ceil() as i64,
		};
		for &(x, y) in iter {
			bbox.x_min = bbox.x_min.min(x.floor() as i64);
			bbox.y_min = bbox.y_min.min(y.floor() as i64);
			bbox.x_max = bbox.x_max.max(x.ceil() as i64);
			bbox.y_max = bbox.y_max.max(y.ceil() as i64);
		}
		bbox
	}

	/// Row-major offset of a pixel inside the box.
	///
	/// The pixel must lie inside; callers check with [`contains`](Self::contains).
	pub fn offset_of(&self, x: i64, y: i64) -> usize {
		debug_assert!(self.contains(x, y));
		((y - self.y_min) as u64 * self.width() + (x - self.x_min) as u64) as usize
	}

	/// Iterates all pixel coordinates in row-major order.
	pub fn iter_pixels(self) -> impl Iterator<Item = (i64, i64)> {
		(self.y_min..self.y_max).flat_map(move |y| (self.x_min..self.x_max).map(move |x| (x, y)))
	}
}

impl std::fmt::Debug for PixelBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"PixelBBox[{},{} .. {},{}]",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_validates_order() {
		assert!(PixelBBox::new(5, 0, 4, 10).is_err());
		assert!(PixelBBox::new(0, 5, 10, 4).is_err());
		assert!(PixelBBox::new(-3, -2, 4, 10).is_ok());
	}

	#[test]
	fn test_size_and_emptiness() {
		let bbox = PixelBBox::new(2, 3, 12, 8).unwrap();
		assert_eq!(bbox.width(), 10);
		assert_eq!(bbox.height(), 5);
		assert_eq!(bbox.area(), 50);
		assert!(!bbox.is_empty());

		assert!(PixelBBox::new_empty().is_empty());
		assert_eq!(PixelBBox::new_empty().area(), 0);
		assert!(PixelBBox::new(4, 4, 4, 9).unwrap().is_empty());
	}

	#[test]
	fn test_intersection() {
		let a = PixelBBox::new(0, 0, 10, 10).unwrap();
		let b = PixelBBox::new(5, 5, 15, 15).unwrap();
		let c = a.intersection(&b);
		assert_eq!(c, PixelBBox::new(5, 5, 10, 10).unwrap());
		assert!(a.intersects(&b));

		let d = PixelBBox::new(10, 0, 20, 10).unwrap();
		assert!(a.intersection(&d).is_empty());
		assert!(!a.intersects(&d));
	}

	#[test]
	fn test_union() {
		let a = PixelBBox::new(0, 0, 10, 10).unwrap();
		let b = PixelBBox::new(-5, 5, 3, 15).unwrap();
		assert_eq!(a.union(&b), PixelBBox::new(-5, 0, 10, 15).unwrap());
		assert_eq!(a.union(&PixelBBox::new_empty()), a);
		assert_eq!(PixelBBox::new_empty().union(&b), b);
	}

	#[test]
	fn test_expanded() {
		let bbox = PixelBBox::new(0, 0, 10, 10).unwrap().expanded(200);
		assert_eq!(bbox, PixelBBox::new(-200, -200, 210, 210).unwrap());
	}

	#[test]
	fn test_bounding_rounds_outward() {
		assert!(PixelBBox::bounding(&[]).is_empty());

		let bbox = PixelBBox::bounding(&[(2.3, 4.7), (-1.5, 8.0)]);
		assert_eq!(bbox, PixelBBox::new(-2, 4, 3, 8).unwrap());

		// Integral boundary points cover exactly the enclosed region.
		let bbox = PixelBBox::bounding(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)]);
		assert_eq!(bbox, PixelBBox::new(0, 0, 10, 5).unwrap());
	}

	#[test]
	fn test_offset_of_row_major() {
		let bbox = PixelBBox::new(10, 20, 14, 24).unwrap();
		assert_eq!(bbox.offset_of(10, 20), 0);
		assert_eq!(bbox.offset_of(13, 20), 3);
		assert_eq!(bbox.offset_of(10, 21), 4);
		assert_eq!(bbox.offset_of(13, 23), 15);
	}

	#[test]
	fn test_iter_pixels_covers_box_in_order() {
		let bbox = PixelBBox::new(0, 0, 3, 2).unwrap();
		let pixels: Vec<(i64, i64)> = bbox.iter_pixels().collect();
		assert_eq!(pixels, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
	}
}
