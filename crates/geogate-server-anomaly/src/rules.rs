// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Independent detectors. Each scans the whole snapshot and returns zero or
//! more findings; none depends on another's output.

use std::collections::BTreeMap;

use chrono::{Duration, FixedOffset};
use geogate_core::{AccessLogEntry, EmployeeId, GeofenceConfig, LogType};
use geogate_server_config::AnomalyConfig;

use crate::finding::{AnomalyFinding, FindingKind, Severity};

/// Inputs shared by every detector.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
	pub settings: &'a AnomalyConfig,
	pub policy: &'a GeofenceConfig,
	/// Offset in which the policy's daily window is read.
	pub offset: FixedOffset,
}

pub type DetectFn = fn(&[AccessLogEntry], &RuleContext<'_>) -> Vec<AnomalyFinding>;

/// A named detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectionRule {
	pub kind: FindingKind,
	pub description: &'static str,
	pub detect: DetectFn,
}

pub fn default_rules() -> Vec<DetectionRule> {
	vec![
		DetectionRule {
			kind: FindingKind::RepeatedFailedAttempts,
			description: "bursts of failures from one employee inside a sliding window",
			detect: repeated_failed_attempts,
		},
		DetectionRule {
			kind: FindingKind::OffHoursAccess,
			description: "successful file access outside the daily window",
			detect: off_hours_access,
		},
		DetectionRule {
			kind: FindingKind::GeofenceBoundaryFailures,
			description: "failures clustered just outside the geofence",
			detect: geofence_boundary_failures,
		},
		DetectionRule {
			kind: FindingKind::ImplausibleRelocation,
			description: "consecutive locations implying impossible travel speed",
			detect: implausible_relocation,
		},
		DetectionRule {
			kind: FindingKind::RapidAccess,
			description: "many file accesses in a short span",
			detect: rapid_access,
		},
	]
}

/// Groups entries by employee, each group in (timestamp, log id) order.
pub(crate) fn by_employee<'a>(
	logs: &'a [AccessLogEntry],
	keep: impl Fn(&AccessLogEntry) -> bool,
) -> BTreeMap<&'a EmployeeId, Vec<&'a AccessLogEntry>> {
	let mut groups: BTreeMap<&EmployeeId, Vec<&AccessLogEntry>> = BTreeMap::new();
	for entry in logs.iter().filter(|&e| keep(e)) {
		groups.entry(&entry.employee_id).or_default().push(entry);
	}
	for entries in groups.values_mut() {
		entries.sort_by_key(|e| (e.timestamp, e.log_id));
	}
	groups
}

fn finding(
	kind: FindingKind,
	severity: Severity,
	entry: &AccessLogEntry,
	description: String,
) -> AnomalyFinding {
	AnomalyFinding {
		kind,
		severity,
		employee_id: entry.employee_id.clone(),
		description,
		log_id: entry.log_id,
		timestamp: entry.timestamp,
	}
}

/// Saturates instead of panicking on windows chrono cannot represent.
fn seconds(secs: u64) -> Duration {
	i64::try_from(secs)
		.ok()
		.and_then(Duration::try_seconds)
		.unwrap_or(Duration::MAX)
}

/// Finds non-overlapping runs of at least `min_count` entries whose first and
/// last entries are no more than `window` apart. Returns `(start, end)`
/// index pairs, end inclusive, each run extended as far as the window allows.
fn bursts(entries: &[&AccessLogEntry], window: Duration, min_count: usize) -> Vec<(usize, usize)> {
	let mut runs = Vec::new();
	let mut start = 0;
	while start < entries.len() {
		let mut end = start;
		while end + 1 < entries.len()
			&& entries[end + 1].timestamp - entries[start].timestamp <= window
		{
			end += 1;
		}
		if end - start + 1 >= min_count {
			runs.push((start, end));
			start = end + 1;
		} else {
			start += 1;
		}
	}
	runs
}

/// Several failures (any log type) from one employee inside the window.
/// Raised to high severity at the configured burst size.
pub fn repeated_failed_attempts(
	logs: &[AccessLogEntry],
	ctx: &RuleContext<'_>,
) -> Vec<AnomalyFinding> {
	let s = ctx.settings;
	let window = seconds(s.failed_attempts_window_secs);
	let mut findings = Vec::new();

	for (employee, failures) in by_employee(logs, |e| !e.success) {
		for (start, end) in bursts(&failures, window, s.failed_attempts_threshold) {
			let count = end - start + 1;
			let span = failures[end].timestamp - failures[start].timestamp;
			let severity = if count >= s.failed_attempts_high_threshold {
				Severity::High
			} else {
				Severity::Medium
			};
			findings.push(finding(
				FindingKind::RepeatedFailedAttempts,
				severity,
				failures[end],
				format!(
					"{count} failed attempts by {employee} within {} seconds",
					span.num_seconds()
				),
			));
		}
	}
	findings
}

/// Successful file access whose time of day is outside the policy window,
/// typically granted through a WFH override. Informational.
pub fn off_hours_access(logs: &[AccessLogEntry], ctx: &RuleContext<'_>) -> Vec<AnomalyFinding> {
	logs.iter()
		.filter(|e| e.log_type == LogType::File && e.success)
		.filter_map(|e| {
			let local = e.timestamp.with_timezone(&ctx.offset).time();
			if ctx.policy.is_within_hours(local) {
				return None;
			}
			Some(finding(
				FindingKind::OffHoursAccess,
				Severity::Low,
				e,
				format!(
					"file access by {} at {} outside allowed hours {}",
					e.employee_id,
					local.format("%H:%M"),
					ctx.policy.window_label()
				),
			))
		})
		.collect()
}

/// Failures whose submitted location lies outside the radius but inside the
/// boundary band, clustered for one employee.
pub fn geofence_boundary_failures(
	logs: &[AccessLogEntry],
	ctx: &RuleContext<'_>,
) -> Vec<AnomalyFinding> {
	let radius = f64::from(ctx.policy.radius_meters);
	let outer = radius * ctx.settings.boundary_margin_factor;
	let center = ctx.policy.center();

	let near_miss = |e: &AccessLogEntry| {
		!e.success
			&& e
				.location
				.filter(|p| p.is_valid())
				.map(|p| p.distance_to(&center))
				.is_some_and(|d| d > radius && d <= outer)
	};

	by_employee(logs, near_miss)
		.into_iter()
		.filter(|(_, misses)| misses.len() >= ctx.settings.boundary_cluster_threshold)
		.filter_map(|(employee, misses)| {
			let last = misses.last()?;
			Some(finding(
				FindingKind::GeofenceBoundaryFailures,
				Severity::Medium,
				last,
				format!(
					"{} failed attempts by {employee} just outside the geofence ({}m to {:.0}m)",
					misses.len(),
					ctx.policy.radius_meters,
					outer
				),
			))
		})
		.collect()
}

/// Consecutive located entries for one employee implying travel faster than
/// the configured bound.
pub fn implausible_relocation(
	logs: &[AccessLogEntry],
	ctx: &RuleContext<'_>,
) -> Vec<AnomalyFinding> {
	let s = ctx.settings;
	let mut findings = Vec::new();

	let located = |e: &AccessLogEntry| e.location.is_some_and(|p| p.is_valid());
	for (employee, entries) in by_employee(logs, located) {
		for pair in entries.windows(2) {
			let (prev, next) = (pair[0], pair[1]);
			let (Some(a), Some(b)) = (prev.location, next.location) else {
				continue;
			};
			let meters = a.distance_to(&b);
			if meters < s.min_relocation_meters {
				continue;
			}
			let elapsed_secs = (next.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
			let speed_kmh = if elapsed_secs > 0.0 {
				(meters / 1000.0) / (elapsed_secs / 3600.0)
			} else {
				f64::INFINITY
			};
			if speed_kmh <= s.max_speed_kmh {
				continue;
			}
			let speed = if speed_kmh.is_finite() {
				format!("{speed_kmh:.0} km/h")
			} else {
				"no elapsed time".to_string()
			};
			findings.push(finding(
				FindingKind::ImplausibleRelocation,
				Severity::High,
				next,
				format!(
					"{employee} moved {:.1} km between entries {} and {} ({speed})",
					meters / 1000.0,
					prev.log_id,
					next.log_id
				),
			));
		}
	}
	findings
}

/// Bursts of file entries from one employee in a short span.
pub fn rapid_access(logs: &[AccessLogEntry], ctx: &RuleContext<'_>) -> Vec<AnomalyFinding> {
	let s = ctx.settings;
	let window = seconds(s.rapid_access_window_secs);
	let mut findings = Vec::new();

	for (employee, files) in by_employee(logs, |e| e.log_type == LogType::File) {
		for (start, end) in bursts(&files, window, s.rapid_access_count) {
			let span = files[end].timestamp - files[start].timestamp;
			findings.push(finding(
				FindingKind::RapidAccess,
				Severity::Medium,
				files[end],
				format!(
					"{} file accesses by {employee} in {} seconds",
					end - start + 1,
					span.num_seconds()
				),
			));
		}
	}
	findings
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use chrono::{DateTime, NaiveTime, TimeZone, Utc};
	use geogate_core::{GeoPoint, LogId};

	pub(crate) fn office() -> GeofenceConfig {
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

	pub(crate) fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap()
	}

	pub(crate) fn log(
		id: i64,
		employee: &str,
		log_type: LogType,
		success: bool,
		ts: DateTime<Utc>,
		location: Option<GeoPoint>,
	) -> AccessLogEntry {
		AccessLogEntry::builder(employee, log_type)
			.success(success)
			.location(location)
			.timestamp(ts)
			.build()
			.with_id(LogId(id))
	}

	fn run(detect: DetectFn, logs: &[AccessLogEntry]) -> Vec<AnomalyFinding> {
		run_with(detect, logs, AnomalyConfig::default(), FixedOffset::east_opt(0).unwrap())
	}

	fn run_with(
		detect: DetectFn,
		logs: &[AccessLogEntry],
		settings: AnomalyConfig,
		offset: FixedOffset,
	) -> Vec<AnomalyFinding> {
		let policy = office();
		let ctx = RuleContext {
			settings: &settings,
			policy: &policy,
			offset,
		};
		detect(logs, &ctx)
	}

	#[test]
	fn unrepresentable_window_saturates() {
		assert_eq!(seconds(600), Duration::seconds(600));
		assert_eq!(seconds(100_000_000_000_000_000), Duration::MAX);
		assert_eq!(seconds(u64::MAX), Duration::MAX);

		let settings = AnomalyConfig {
			failed_attempts_window_secs: u64::MAX,
			rapid_access_window_secs: 100_000_000_000_000_000,
			..AnomalyConfig::default()
		};
		let logs: Vec<_> = (0..5)
			.map(|i| log(i + 1, "alice", LogType::File, false, at(10 + i as u32, 0, 0), None))
			.collect();
		let offset = FixedOffset::east_opt(0).unwrap();
		let failures = run_with(repeated_failed_attempts, &logs, settings.clone(), offset);
		assert_eq!(failures.len(), 1);
		assert_eq!(failures[0].severity, Severity::High);
		assert_eq!(run_with(rapid_access, &logs, settings, offset).len(), 1);
	}

	#[test]
	fn off_hours_uses_reference_offset() {
		let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
		let logs = vec![
			// 14:00 at +05:30, inside 09:00-17:00
			log(1, "alice", LogType::File, true, at(8, 30, 0), None),
			// 20:30 at +05:30, outside even though 15:00 UTC is inside
			log(2, "alice", LogType::File, true, at(15, 0, 0), None),
			// 07:30 at +05:30
			log(3, "alice", LogType::File, true, at(2, 0, 0), None),
		];
		let findings = run_with(off_hours_access, &logs, AnomalyConfig::default(), ist);
		let ids: Vec<_> = findings.iter().map(|f| f.log_id).collect();
		assert_eq!(ids, vec![LogId(2), LogId(3)]);
		assert!(findings[0].description.contains("at 20:30"));

		let utc = run(off_hours_access, &logs);
		let ids: Vec<_> = utc.iter().map(|f| f.log_id).collect();
		assert_eq!(ids, vec![LogId(1), LogId(3)]);
	}

	#[test]
	fn four_failures_in_five_minutes_is_one_medium_burst() {
		let logs: Vec<_> = (0..4)
			.map(|i| log(i + 1, "alice", LogType::File, false, at(10, i as u32, 0), None))
			.collect();
		let findings = run(repeated_failed_attempts, &logs);
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].kind, FindingKind::RepeatedFailedAttempts);
		assert_eq!(findings[0].severity, Severity::Medium);
		assert_eq!(findings[0].log_id, LogId(4));
		assert!(findings[0].description.starts_with("4 failed attempts by alice"));
	}

	#[test]
	fn five_failures_is_high() {
		let logs: Vec<_> = (0..5)
			.map(|i| log(i + 1, "alice", LogType::Authentication, false, at(10, i as u32, 0), None))
			.collect();
		let findings = run(repeated_failed_attempts, &logs);
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].severity, Severity::High);
	}

	#[test]
	fn spread_out_failures_do_not_fire() {
		let logs = vec![
			log(1, "alice", LogType::File, false, at(10, 0, 0), None),
			log(2, "alice", LogType::File, false, at(10, 11, 0), None),
			log(3, "alice", LogType::File, false, at(10, 22, 0), None),
			log(4, "bob", LogType::File, false, at(10, 1, 0), None),
			log(5, "bob", LogType::File, false, at(10, 2, 0), None),
		];
		assert!(run(repeated_failed_attempts, &logs).is_empty());
	}

	#[test]
	fn successes_break_nothing_but_do_not_count() {
		let logs = vec![
			log(1, "alice", LogType::File, false, at(10, 0, 0), None),
			log(2, "alice", LogType::File, true, at(10, 1, 0), None),
			log(3, "alice", LogType::File, false, at(10, 2, 0), None),
			log(4, "alice", LogType::File, false, at(10, 3, 0), None),
		];
		let findings = run(repeated_failed_attempts, &logs);
		assert_eq!(findings.len(), 1);
		assert!(findings[0].description.starts_with("3 failed"));
	}

	#[test]
	fn off_hours_only_flags_successful_file_entries() {
		let logs = vec![
			log(1, "alice", LogType::File, true, at(20, 0, 0), None),
			log(2, "alice", LogType::File, false, at(20, 5, 0), None),
			log(3, "alice", LogType::Authentication, true, at(20, 10, 0), None),
			log(4, "alice", LogType::File, true, at(10, 0, 0), None),
			log(5, "alice", LogType::File, true, at(17, 0, 0), None),
		];
		let findings = run(off_hours_access, &logs);
		let ids: Vec<i64> = findings.iter().map(|f| f.log_id.0).collect();
		assert_eq!(ids, vec![1, 5]);
		assert!(findings.iter().all(|f| f.severity == Severity::Low));
	}

	#[test]
	fn boundary_failures_cluster() {
		// ~0.0015 degrees of latitude is ~167 m: outside 100 m, inside 200 m.
		let near = Some(GeoPoint::new(40.0015, -73.0));
		let far = Some(GeoPoint::new(41.0, -73.0));
		let logs = vec![
			log(1, "alice", LogType::File, false, at(10, 0, 0), near),
			log(2, "alice", LogType::File, false, at(11, 0, 0), near),
			log(3, "alice", LogType::File, false, at(12, 0, 0), far),
			log(4, "alice", LogType::File, false, at(13, 0, 0), near),
			log(5, "bob", LogType::File, false, at(10, 0, 0), near),
			log(6, "bob", LogType::File, false, at(10, 30, 0), near),
		];
		let findings = run(geofence_boundary_failures, &logs);
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].employee_id.as_str(), "alice");
		assert_eq!(findings[0].log_id, LogId(4));
		assert_eq!(findings[0].severity, Severity::Medium);
	}

	#[test]
	fn implausible_relocation_flags_fast_jumps_only() {
		let office_point = Some(GeoPoint::new(40.0, -73.0));
		let one_degree_north = Some(GeoPoint::new(41.0, -73.0));
		let logs = vec![
			log(1, "alice", LogType::File, true, at(10, 0, 0), office_point),
			// ~111 km in 5 minutes
			log(2, "alice", LogType::File, false, at(10, 5, 0), one_degree_north),
			// ~111 km in 5 hours is fine
			log(3, "alice", LogType::File, true, at(15, 5, 0), office_point),
			log(4, "alice", LogType::File, true, at(15, 6, 0), None),
		];
		let findings = run(implausible_relocation, &logs);
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].log_id, LogId(2));
		assert_eq!(findings[0].severity, Severity::High);
	}

	#[test]
	fn same_instant_relocation_is_flagged() {
		let logs = vec![
			log(1, "alice", LogType::File, true, at(10, 0, 0), Some(GeoPoint::new(40.0, -73.0))),
			log(2, "alice", LogType::File, true, at(10, 0, 0), Some(GeoPoint::new(40.1, -73.0))),
		];
		let findings = run(implausible_relocation, &logs);
		assert_eq!(findings.len(), 1);
		assert!(findings[0].description.contains("no elapsed time"));
	}

	#[test]
	fn short_jitter_is_not_relocation() {
		let logs = vec![
			log(1, "alice", LogType::File, true, at(10, 0, 0), Some(GeoPoint::new(40.0, -73.0))),
			log(2, "alice", LogType::File, true, at(10, 0, 1), Some(GeoPoint::new(40.001, -73.0))),
		];
		assert!(run(implausible_relocation, &logs).is_empty());
	}

	#[test]
	fn rapid_access_needs_five_file_entries_within_a_minute() {
		let mut logs: Vec<_> = (0..5)
			.map(|i| log(i + 1, "alice", LogType::File, true, at(10, 0, (i * 10) as u32), None))
			.collect();
		let findings = run(rapid_access, &logs);
		assert_eq!(findings.len(), 1);
		assert_eq!(findings[0].kind, FindingKind::RapidAccess);

		logs[4].timestamp = at(10, 1, 1);
		assert!(run(rapid_access, &logs).is_empty());
	}

	#[test]
	fn bursts_do_not_overlap() {
		let logs: Vec<_> = (0..6)
			.map(|i| log(i + 1, "alice", LogType::File, false, at(10, 0, (i * 5) as u32), None))
			.collect();
		let refs: Vec<&AccessLogEntry> = logs.iter().collect();
		assert_eq!(bursts(&refs, Duration::seconds(60), 3), vec![(0, 5)]);
		assert_eq!(bursts(&refs, Duration::seconds(10), 3), vec![(0, 2), (3, 5)]);
	}
}
