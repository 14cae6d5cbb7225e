//! View frustum culling and projected screen size.

use glam::{DMat4, DVec3, DVec4};

use super::bounds::{BoundingSphere, DAabb3};

/// How much of a node lies inside the view frustum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
	/// Entirely outside.
	None,
	/// Straddles at least one plane.
	#[default]
	Partial,
	/// Entirely inside; descendants inherit this without testing.
	Full,
}

impl Visibility {
	/// Whether descendants can reuse this result without a fresh test.
	#[inline]
	pub fn is_conclusive(&self) -> bool {
		!matches!(self, Self::Partial)
	}
}

/// Six inward-facing planes `(n, d)` with `n · p + d >= 0` inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
	pub planes: [DVec4; 6],
}

impl Frustum {
	/// Extract planes from a view-projection matrix with a `0..1` clip depth
	/// range (glam's `perspective_rh` / `orthographic_rh`).
	pub fn from_view_projection(m: &DMat4) -> Self {
		let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
		let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(|plane| {
			let len = plane.truncate().length();
			if len > 0.0 {
				plane / len
			} else {
				plane
			}
		});
		Self { planes }
	}

	#[inline]
	fn signed_distance(plane: DVec4, point: DVec3) -> f64 {
		plane.truncate().dot(point) + plane.w
	}

	/// Sphere test with a box-corner fallback when the sphere straddles every
	/// plane and so says nothing.
	pub fn visibility(&self, sphere: &BoundingSphere, aabb: &DAabb3) -> Visibility {
		let mut straddled = 0;
		for &plane in &self.planes {
			let d = Self::signed_distance(plane, sphere.center);
			if d < -sphere.radius {
				return Visibility::None;
			}
			if d < sphere.radius {
				straddled += 1;
			}
		}
		match straddled {
			0 => Visibility::Full,
			6 => self.box_visibility(aabb),
			_ => Visibility::Partial,
		}
	}

	/// Test all 8 corners against all planes.
	pub fn box_visibility(&self, aabb: &DAabb3) -> Visibility {
		let corners = aabb.corners();
		let mut fully_inside = 0;
		for &plane in &self.planes {
			let inside = corners
				.iter()
				.filter(|&&corner| Self::signed_distance(plane, corner) >= 0.0)
				.count();
			if inside == 0 {
				return Visibility::None;
			}
			if inside == corners.len() {
				fully_inside += 1;
			}
		}
		if fully_inside == self.planes.len() {
			Visibility::Full
		} else {
			Visibility::Partial
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
	/// Vertical field of view in radians.
	Perspective { fov_y: f64 },
	/// Visible world height.
	Orthographic { height: f64 },
}

/// What the LOD pass needs to know about the viewer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
	pub position: DVec3,
	pub frustum: Frustum,
	pub projection: Projection,
	/// Viewport height in pixels.
	pub viewport_height: f64,
}

impl Camera {
	pub fn new(position: DVec3, view_projection: &DMat4, projection: Projection, viewport_height: f64) -> Self {
		Self {
			position,
			frustum: Frustum::from_view_projection(view_projection),
			projection,
			viewport_height,
		}
	}

	/// Right-handed perspective camera looking at `target`.
	#[allow(clippy::too_many_arguments)]
	pub fn perspective(
		position: DVec3,
		target: DVec3,
		up: DVec3,
		fov_y: f64,
		aspect: f64,
		near: f64,
		far: f64,
		viewport_height: f64,
	) -> Self {
		let view = DMat4::look_at_rh(position, target, up);
		let proj = DMat4::perspective_rh(fov_y, aspect, near, far);
		Self::new(position, &(proj * view), Projection::Perspective { fov_y }, viewport_height)
	}

	/// Right-handed orthographic camera looking at `target`.
	#[allow(clippy::too_many_arguments)]
	pub fn orthographic(
		position: DVec3,
		target: DVec3,
		up: DVec3,
		height: f64,
		aspect: f64,
		near: f64,
		far: f64,
		viewport_height: f64,
	) -> Self {
		let view = DMat4::look_at_rh(position, target, up);
		let half_h = height * 0.5;
		let half_w = half_h * aspect;
		let proj = DMat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far);
		Self::new(position, &(proj * view), Projection::Orthographic { height }, viewport_height)
	}

	/// Pixels per world unit at unit distance (perspective) or anywhere
	/// (orthographic).
	pub fn clip_scale(&self) -> f64 {
		match self.projection {
			Projection::Perspective { fov_y } => self.viewport_height / (2.0 * (fov_y * 0.5).tan()),
			Projection::Orthographic { height } => self.viewport_height / height,
		}
	}

	/// Approximate pixel extent of `size` world units on `sphere`. Perspective
	/// uses the distance to the sphere's near side, floored at `min_distance`.
	pub fn projected_size(&self, size: f64, sphere: &BoundingSphere, min_distance: f64) -> f64 {
		match self.projection {
			Projection::Perspective { .. } => {
				let distance = sphere.distance_to(self.position).max(min_distance);
				size * self.clip_scale() / distance
			}
			Projection::Orthographic { .. } => size * self.clip_scale(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::f64::consts::FRAC_PI_2;

	use super::*;

	/// 90 degree square camera at the origin looking down -Z.
	fn camera() -> Camera {
		Camera::perspective(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y, FRAC_PI_2, 1.0, 0.1, 1000.0, 800.0)
	}

	fn sphere_vis(camera: &Camera, center: DVec3, radius: f64) -> Visibility {
		let sphere = BoundingSphere::new(center, radius);
		let aabb = DAabb3::from_center_half_extents(center, DVec3::splat(radius / 3f64.sqrt()));
		camera.frustum.visibility(&sphere, &aabb)
	}

	#[test]
	fn test_sphere_inside_is_full() {
		assert_eq!(sphere_vis(&camera(), DVec3::new(0.0, 0.0, -50.0), 1.0), Visibility::Full);
	}

	#[test]
	fn test_sphere_outside_one_plane_is_none() {
		let camera = camera();
		assert_eq!(sphere_vis(&camera, DVec3::new(0.0, 0.0, 50.0), 1.0), Visibility::None);
		assert_eq!(sphere_vis(&camera, DVec3::new(0.0, 0.0, -2000.0), 1.0), Visibility::None);
		assert_eq!(sphere_vis(&camera, DVec3::new(-100.0, 0.0, -10.0), 1.0), Visibility::None);
	}

	/// On the right plane (x = -z) and well inside all others.
	#[test]
	fn test_sphere_straddling_one_plane_is_partial() {
		assert_eq!(sphere_vis(&camera(), DVec3::new(10.0, 0.0, -10.0), 1.0), Visibility::Partial);
	}

	/// A sphere straddling all six planes falls back to the box corners.
	#[test]
	fn test_box_fallback() {
		let camera = camera();
		let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, -5.0), 5000.0);

		let behind = DAabb3::from_center_half_extents(DVec3::new(0.0, 0.0, 100.0), DVec3::ONE);
		assert_eq!(camera.frustum.visibility(&sphere, &behind), Visibility::None);

		let ahead = DAabb3::from_center_half_extents(DVec3::new(0.0, 0.0, -50.0), DVec3::ONE);
		assert_eq!(camera.frustum.visibility(&sphere, &ahead), Visibility::Full);

		let around = DAabb3::from_center_half_extents(DVec3::ZERO, DVec3::splat(3000.0));
		assert_eq!(camera.frustum.visibility(&sphere, &around), Visibility::Partial);
	}

	#[test]
	fn test_perspective_projected_size() {
		let camera = camera();
		// 800 px / (2 * tan 45deg)
		assert!((camera.clip_scale() - 400.0).abs() < 1e-9);

		let near = BoundingSphere::new(DVec3::new(0.0, 0.0, -11.0), 1.0);
		let far = BoundingSphere::new(DVec3::new(0.0, 0.0, -21.0), 1.0);
		assert!((camera.projected_size(2.0, &near, 0.01) - 80.0).abs() < 1e-9);
		assert!((camera.projected_size(2.0, &far, 0.01) - 40.0).abs() < 1e-9);

		// Camera inside the sphere: distance floors at the epsilon.
		let around = BoundingSphere::new(DVec3::ZERO, 5.0);
		assert!((camera.projected_size(2.0, &around, 0.5) - 1600.0).abs() < 1e-9);
	}

	#[test]
	fn test_orthographic_projected_size_ignores_distance() {
		let camera =
			Camera::orthographic(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y, 100.0, 1.0, 0.1, 1000.0, 800.0);
		let near = BoundingSphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0);
		let far = BoundingSphere::new(DVec3::new(0.0, 0.0, -500.0), 1.0);
		assert_eq!(camera.projected_size(2.0, &near, 0.01), 16.0);
		assert_eq!(camera.projected_size(2.0, &far, 0.01), 16.0);
		assert_eq!(
			camera.frustum.visibility(&far, &DAabb3::from_center_half_extents(far.center, DVec3::ONE)),
			Visibility::Full
		);
	}

	#[test]
	fn test_conclusive() {
		assert!(Visibility::None.is_conclusive());
		assert!(Visibility::Full.is_conclusive());
		assert!(!Visibility::Partial.is_conclusive());
	}
}
