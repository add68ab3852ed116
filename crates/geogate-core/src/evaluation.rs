// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{NaiveTime, Timelike, Utc};

use crate::context::AccessContext;
use crate::decision::{CheckResult, Decision, DecisionChecks};
use crate::geo::GeoPoint;
use crate::policy::{format_time_of_day, GeofenceConfig};
use crate::wfh::WfhRequest;

/// Evaluates an access context against the policy and the employee's WFH
/// record.
///
/// The evaluation order is:
/// 1. An approved WFH record whose window contains the evaluation time
///    allows access outright, with every check skipped
/// 2. Otherwise location, wifi and time are checked independently
/// 3. Access is allowed only when all three pass
///
/// Both the dry-run listing path and the enforcing download path call this
/// function; it performs no I/O.
pub fn evaluate(
	context: &AccessContext,
	config: &GeofenceConfig,
	wfh: Option<&WfhRequest>,
) -> Decision {
	let at = context.evaluation_time.with_timezone(&Utc);
	if wfh.is_some_and(|request| request.is_active_at(at)) {
		tracing::debug!(employee_id = %context.employee_id, "WFH window active, bypassing checks");
		return Decision::wfh_override();
	}

	let (location, distance_meters) = check_location(context.valid_location(), config);
	let wifi = check_wifi(context.ssid.as_deref(), &config.allowed_ssid);
	let time = check_time(context.evaluation_time.time(), config);

	Decision::from_checks(
		DecisionChecks {
			location,
			wifi,
			time,
		},
		distance_meters,
	)
}

fn check_location(
	location: Option<GeoPoint>,
	config: &GeofenceConfig,
) -> (CheckResult, Option<f64>) {
	let Some(location) = location else {
		return (
			CheckResult::fail("location not provided", "location not provided"),
			None,
		);
	};

	let distance = location.distance_to(&config.center());
	let radius = f64::from(config.radius_meters);
	let result = if distance <= radius {
		CheckResult::pass(
			"within geofence",
			format!("within geofence (distance {distance:.2}m)"),
		)
	} else {
		CheckResult::fail(
			"location out of range",
			format!(
				"outside allowed area (distance {distance:.2}m, max {}m)",
				config.radius_meters
			),
		)
	};
	(result, Some(distance))
}

fn check_wifi(ssid: Option<&str>, allowed_ssid: &str) -> CheckResult {
	match ssid {
		None => CheckResult::fail("wifi not provided", "WiFi SSID not provided"),
		Some(ssid) if ssid == allowed_ssid => {
			CheckResult::pass("wifi matched", format!("connected to allowed network ({ssid})"))
		}
		Some(ssid) => CheckResult::fail(
			"wifi mismatch",
			format!("unauthorized WiFi network ({ssid})"),
		),
	}
}

fn check_time(time: NaiveTime, config: &GeofenceConfig) -> CheckResult {
	let current = format_time_of_day(time.with_nanosecond(0).unwrap_or(time));
	if config.is_within_hours(time) {
		CheckResult::pass(
			"within allowed hours",
			format!("within allowed hours ({current})"),
		)
	} else {
		CheckResult::fail(
			"outside allowed hours",
			format!(
				"outside allowed hours (current {current}, allowed {})",
				config.window_label()
			),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::EmployeeId;
	use crate::decision::{CheckStatus, ALL_CONDITIONS_MET_REASON, WFH_OVERRIDE_REASON};
	use crate::wfh::WfhWindow;
	use chrono::{DateTime, FixedOffset, TimeZone};
	use proptest::prelude::*;

	fn office_config() -> GeofenceConfig {
		GeofenceConfig::new(
			40.0,
			-73.0,
			100,
			"Office",
			NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
			NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
		)
		.unwrap()
	}

	fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
		FixedOffset::east_opt(0)
			.unwrap()
			.with_ymd_and_hms(2026, 3, 2, h, m, 0)
			.unwrap()
	}

	fn approved_wfh(start_h: u32, end_h: u32) -> WfhRequest {
		let start = Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap();
		let end = Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap();
		WfhRequest::pending(EmployeeId::from("alice"), "remote", start)
			.approved(WfhWindow::new(start, end).unwrap(), None, start)
	}

	#[test]
	fn all_checks_pass_at_center() {
		let ctx = AccessContext::new("alice", at(10, 0))
			.with_coordinates(Some(40.0), Some(-73.0))
			.with_ssid(Some("Office"));
		let decision = evaluate(&ctx, &office_config(), None);

		assert!(decision.allowed);
		assert_eq!(decision.reason, ALL_CONDITIONS_MET_REASON);
		assert_eq!(decision.checks.location.status, CheckStatus::Pass);
		assert_eq!(decision.checks.wifi.status, CheckStatus::Pass);
		assert_eq!(decision.checks.time.status, CheckStatus::Pass);
		assert_eq!(decision.distance_meters, Some(0.0));
	}

	#[test]
	fn one_degree_north_fails_location_only() {
		let ctx = AccessContext::new("alice", at(10, 0))
			.with_coordinates(Some(41.0), Some(-73.0))
			.with_ssid(Some("Office"));
		let decision = evaluate(&ctx, &office_config(), None);

		assert!(!decision.allowed);
		assert_eq!(decision.checks.location.status, CheckStatus::Fail);
		assert_eq!(decision.checks.wifi.status, CheckStatus::Pass);
		assert_eq!(decision.checks.time.status, CheckStatus::Pass);
		assert_eq!(decision.reason, "location out of range");
	}

	#[test]
	fn wfh_override_ignores_wrong_context() {
		let ctx = AccessContext::new("alice", at(9, 0)).with_ssid(Some("WrongWifi"));
		let wfh = approved_wfh(8, 20);
		let decision = evaluate(&ctx, &office_config(), Some(&wfh));

		assert!(decision.allowed);
		assert!(decision.wfh_override);
		assert_eq!(decision.reason, WFH_OVERRIDE_REASON);
		assert_eq!(decision.checks.location.status, CheckStatus::Skipped);
		assert_eq!(decision.checks.wifi.status, CheckStatus::Skipped);
		assert_eq!(decision.checks.time.status, CheckStatus::Skipped);
	}

	#[test]
	fn approved_wfh_outside_window_falls_through() {
		let ctx = AccessContext::new("alice", at(21, 0)).with_ssid(Some("Office"));
		let wfh = approved_wfh(8, 20);
		let decision = evaluate(&ctx, &office_config(), Some(&wfh));

		assert!(!decision.allowed);
		assert!(!decision.wfh_override);
		assert_eq!(decision.reason, "location not provided; outside allowed hours");
	}

	#[test]
	fn pending_wfh_does_not_override() {
		let ctx = AccessContext::new("alice", at(10, 0));
		let wfh = WfhRequest::pending(EmployeeId::from("alice"), "remote", at(7, 0).into());
		let decision = evaluate(&ctx, &office_config(), Some(&wfh));
		assert!(!decision.allowed);
	}

	#[test]
	fn missing_context_fails_location_and_wifi() {
		let ctx = AccessContext::new("alice", at(10, 0));
		let decision = evaluate(&ctx, &office_config(), None);

		assert!(!decision.allowed);
		assert_eq!(decision.checks.location.status, CheckStatus::Fail);
		assert_eq!(decision.checks.wifi.status, CheckStatus::Fail);
		assert_eq!(decision.reason, "location not provided; wifi not provided");
		assert_eq!(decision.distance_meters, None);
	}

	#[test]
	fn non_finite_coordinates_behave_like_missing() {
		let ctx = AccessContext::new("alice", at(10, 0))
			.with_coordinates(Some(f64::NAN), Some(-73.0))
			.with_ssid(Some("Office"));
		let decision = evaluate(&ctx, &office_config(), None);

		assert_eq!(decision.checks.location.status, CheckStatus::Fail);
		assert_eq!(decision.checks.location.summary, "location not provided");
	}

	#[test]
	fn ssid_match_is_case_sensitive() {
		let ctx = AccessContext::new("alice", at(10, 0))
			.with_coordinates(Some(40.0), Some(-73.0))
			.with_ssid(Some("office"));
		let decision = evaluate(&ctx, &office_config(), None);
		assert_eq!(decision.checks.wifi.status, CheckStatus::Fail);
		assert_eq!(decision.reason, "wifi mismatch");
	}

	#[test]
	fn time_window_end_is_exclusive() {
		let base = AccessContext::new("alice", at(17, 0))
			.with_coordinates(Some(40.0), Some(-73.0))
			.with_ssid(Some("Office"));
		let decision = evaluate(&base, &office_config(), None);
		assert_eq!(decision.checks.time.status, CheckStatus::Fail);
		assert_eq!(decision.reason, "outside allowed hours");

		let mut start = base.clone();
		start.evaluation_time = at(9, 0);
		assert!(evaluate(&start, &office_config(), None).allowed);
	}

	#[test]
	fn time_of_day_uses_reference_offset() {
		// 08:30 UTC is 14:00 at +05:30
		let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
		let when = Utc
			.with_ymd_and_hms(2026, 3, 2, 8, 30, 0)
			.unwrap()
			.with_timezone(&ist);
		let ctx = AccessContext::new("alice", when)
			.with_coordinates(Some(40.0), Some(-73.0))
			.with_ssid(Some("Office"));
		assert!(evaluate(&ctx, &office_config(), None).allowed);
	}

	proptest! {
		#[test]
		fn evaluation_is_deterministic(
			lat in -90.0f64..90.0,
			lon in -180.0f64..180.0,
			ssid in proptest::option::of("[A-Za-z]{0,8}"),
			hour in 0u32..24,
			minute in 0u32..60,
		) {
			let ctx = AccessContext::new("alice", at(hour, minute))
				.with_coordinates(Some(lat), Some(lon))
				.with_ssid(ssid);
			let config = office_config();
			prop_assert_eq!(evaluate(&ctx, &config, None), evaluate(&ctx, &config, None));
		}

		#[test]
		fn active_wfh_always_allows(
			lat in proptest::option::of(-90.0f64..90.0),
			lon in proptest::option::of(-180.0f64..180.0),
			ssid in proptest::option::of("[A-Za-z]{0,8}"),
			hour in 9u32..19,
			minute in 0u32..60,
		) {
			let ctx = AccessContext::new("alice", at(hour, minute))
				.with_coordinates(lat, lon)
				.with_ssid(ssid);
			let wfh = approved_wfh(8, 20);
			let decision = evaluate(&ctx, &office_config(), Some(&wfh));
			prop_assert!(decision.allowed);
			prop_assert!(decision.wfh_override);
		}
	}
}
