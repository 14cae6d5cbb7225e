//! Double-precision bounding volumes for huge scenes.

use glam::DVec3;

/// Double-precision axis-aligned bounding box.
///
/// Node bounds are stored in model space as f32 and widened to f64 once the
/// node offset is applied, so city-scale coordinates keep sub-millimetre
/// precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl DAabb3 {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	pub fn from_center_half_extents(center: DVec3, half_extents: DVec3) -> Self {
		Self {
			min: center - half_extents,
			max: center + half_extents,
		}
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.cmpge(self.min).all() && point.cmple(self.max).all()
	}

	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// The 8 corners, indexed by octant bits (X bit 0, Y bit 1, Z bit 2).
	pub fn corners(&self) -> [DVec3; 8] {
		std::array::from_fn(|octant| {
			DVec3::new(
				if octant & 1 != 0 { self.max.x } else { self.min.x },
				if octant & 2 != 0 { self.max.y } else { self.min.y },
				if octant & 4 != 0 { self.max.z } else { self.min.z },
			)
		})
	}

	/// Sub-box of one octant, same bit convention as [`corners`](Self::corners).
	pub fn octant(&self, octant: u8) -> Self {
		let center = self.center();
		let pick = |bit: u8, lo: f64, mid: f64, hi: f64| {
			if octant & bit != 0 {
				(mid, hi)
			} else {
				(lo, mid)
			}
		};
		let (min_x, max_x) = pick(1, self.min.x, center.x, self.max.x);
		let (min_y, max_y) = pick(2, self.min.y, center.y, self.max.y);
		let (min_z, max_z) = pick(4, self.min.z, center.z, self.max.z);
		Self {
			min: DVec3::new(min_x, min_y, min_z),
			max: DVec3::new(max_x, max_y, max_z),
		}
	}
}

/// Bounding sphere, used for distance-based LOD metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
	pub center: DVec3,
	pub radius: f64,
}

impl BoundingSphere {
	pub fn new(center: DVec3, radius: f64) -> Self {
		Self { center, radius }
	}

	/// Circumscribed sphere of a box.
	pub fn from_aabb(aabb: &DAabb3) -> Self {
		Self {
			center: aabb.center(),
			radius: aabb.size().length() * 0.5,
		}
	}

	/// Distance from `point` to the sphere surface, zero inside.
	#[inline]
	pub fn distance_to(&self, point: DVec3) -> f64 {
		(self.center.distance(point) - self.radius).max(0.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_from_center_half_extents() {
		let aabb = DAabb3::from_center_half_extents(DVec3::ZERO, DVec3::splat(10.0));
		assert_eq!(aabb.min, DVec3::splat(-10.0));
		assert_eq!(aabb.max, DVec3::splat(10.0));
	}

	#[test]
	fn test_contains_point() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));

		assert!(aabb.contains_point(DVec3::splat(5.0)));
		// On boundary
		assert!(aabb.contains_point(DVec3::ZERO));
		assert!(aabb.contains_point(DVec3::splat(10.0)));

		assert!(!aabb.contains_point(DVec3::splat(-1.0)));
		assert!(!aabb.contains_point(DVec3::new(5.0, 11.0, 5.0)));
	}

	#[test]
	fn test_size_and_center() {
		let aabb = DAabb3::new(DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0));
		assert_eq!(aabb.size(), DVec3::new(2.0, 4.0, 6.0));
		assert_eq!(aabb.center(), DVec3::ZERO);
	}

	/// Corner `i` and octant `i` sit on the same side of the center.
	#[test]
	fn test_corners_match_octants() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(2.0));
		let corners = aabb.corners();
		for octant in 0u8..8 {
			let sub = aabb.octant(octant);
			assert!(sub.contains_point(corners[octant as usize]), "octant {octant}");
			assert_eq!(sub.size(), DVec3::ONE);
		}
		assert_eq!(corners[0], DVec3::ZERO);
		assert_eq!(corners[7], DVec3::splat(2.0));
		assert_eq!(corners[1], DVec3::new(2.0, 0.0, 0.0));
	}

	#[test]
	fn test_sphere_from_aabb() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::new(2.0, 2.0, 1.0));
		let sphere = BoundingSphere::from_aabb(&aabb);
		assert_eq!(sphere.center, DVec3::new(1.0, 1.0, 0.5));
		assert!((sphere.radius - 1.5).abs() < 1e-12);
		assert_eq!(sphere.distance_to(sphere.center), 0.0);
		assert!((sphere.distance_to(DVec3::new(1.0, 1.0, 4.0)) - 2.0).abs() < 1e-12);
	}
}
