use glam::DVec3;

use super::*;

/// Tolerance 0 is one scale unit; every step doubles.
#[test]
fn test_geometric_size() {
  let profile = LodProfile::DESKTOP;
  assert_eq!(profile.geometric_size(0), 128.0);
  assert_eq!(profile.geometric_size(1), 256.0);
  assert_eq!(profile.geometric_size(-2), 32.0);
}

#[test]
fn test_should_split() {
  let profile = LodProfile::DESKTOP;
  assert!(profile.should_split(true, Visibility::None, 0.0), "root always splits");
  assert!(profile.should_split(false, Visibility::Partial, 201.0));
  assert!(profile.should_split(false, Visibility::Full, 201.0));
  assert!(!profile.should_split(false, Visibility::Full, 200.0), "threshold is exclusive");
  assert!(!profile.should_split(false, Visibility::None, 1e9), "culled nodes never split");
}

/// The mobile profile needs twice the screen size to split.
#[test]
fn test_mobile_is_coarser() {
  let camera = Camera::perspective(
    DVec3::ZERO,
    DVec3::NEG_Z,
    DVec3::Y,
    std::f64::consts::FRAC_PI_2,
    1.0,
    0.1,
    1000.0,
    800.0,
  );
  let sphere = BoundingSphere::new(DVec3::new(0.0, 0.0, -257.0), 1.0);
  // 128 * 400 / 256
  let size = LodProfile::DESKTOP.projected_size(&camera, 0, &sphere);
  assert!((size - 200.0).abs() < 1e-9);
  assert_eq!(LodProfile::MOBILE.projected_size(&camera, 0, &sphere), size);

  assert!(LodProfile::DESKTOP.should_split(false, Visibility::Full, size * 1.5));
  assert!(!LodProfile::MOBILE.should_split(false, Visibility::Full, size * 1.5));
}

#[test]
fn test_failure_policy() {
  assert!(FailurePolicy::default().allows_retry(u32::MAX));
  let policy = FailurePolicy { max_attempts: 3 };
  assert!(policy.allows_retry(2));
  assert!(!policy.allows_retry(3));
}
