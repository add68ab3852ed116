// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub latitude: f64,
	pub longitude: f64,
}

impl GeoPoint {
	pub fn new(latitude: f64, longitude: f64) -> Self {
		Self {
			latitude,
			longitude,
		}
	}

	/// Builds a point only when both halves were submitted.
	pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
		match (latitude, longitude) {
			(Some(latitude), Some(longitude)) => Some(Self::new(latitude, longitude)),
			_ => None,
		}
	}

	/// Finite and inside the WGS84 degree ranges.
	pub fn is_valid(&self) -> bool {
		self.latitude.is_finite()
			&& self.longitude.is_finite()
			&& (-90.0..=90.0).contains(&self.latitude)
			&& (-180.0..=180.0).contains(&self.longitude)
	}

	pub fn distance_to(&self, other: &GeoPoint) -> f64 {
		haversine_distance(*self, *other)
	}
}

/// Great-circle distance in meters between two points.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
	let lat_a = a.latitude.to_radians();
	let lat_b = b.latitude.to_radians();
	let delta_lat = (b.latitude - a.latitude).to_radians();
	let delta_lon = (b.longitude - a.longitude).to_radians();

	let h = (delta_lat / 2.0).sin().powi(2)
		+ lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
	let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

	EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn zero_distance_for_same_point() {
		let p = GeoPoint::new(40.0, -73.0);
		assert_eq!(haversine_distance(p, p), 0.0);
	}

	#[test]
	fn one_degree_of_latitude_is_about_111km() {
		let a = GeoPoint::new(40.0, -73.0);
		let b = GeoPoint::new(41.0, -73.0);
		let d = haversine_distance(a, b);
		assert!((d - 111_195.0).abs() < 10.0, "got {d}");
	}

	#[test]
	fn from_parts_requires_both() {
		assert!(GeoPoint::from_parts(Some(1.0), None).is_none());
		assert!(GeoPoint::from_parts(None, Some(1.0)).is_none());
		assert_eq!(
			GeoPoint::from_parts(Some(1.0), Some(2.0)),
			Some(GeoPoint::new(1.0, 2.0))
		);
	}

	#[test]
	fn rejects_non_finite_and_out_of_range() {
		assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
		assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
		assert!(!GeoPoint::new(91.0, 0.0).is_valid());
		assert!(!GeoPoint::new(0.0, -180.5).is_valid());
		assert!(GeoPoint::new(-90.0, 180.0).is_valid());
	}

	proptest! {
		#[test]
		fn distance_is_symmetric(
			lat1 in -90.0f64..90.0,
			lon1 in -180.0f64..180.0,
			lat2 in -90.0f64..90.0,
			lon2 in -180.0f64..180.0,
		) {
			let a = GeoPoint::new(lat1, lon1);
			let b = GeoPoint::new(lat2, lon2);
			let ab = haversine_distance(a, b);
			let ba = haversine_distance(b, a);
			prop_assert!((ab - ba).abs() < 1e-6);
			prop_assert!(ab >= 0.0);
		}

		#[test]
		fn distance_to_self_is_zero(lat in -90.0f64..90.0, lon in -180.0f64..180.0) {
			let p = GeoPoint::new(lat, lon);
			prop_assert_eq!(p.distance_to(&p), 0.0);
		}
	}
}
