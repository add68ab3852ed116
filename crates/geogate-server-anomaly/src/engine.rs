// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, BTreeSet};

use chrono::FixedOffset;
use geogate_core::{AccessLogEntry, EmployeeId, GeofenceConfig};
use geogate_server_config::AnomalyConfig;

use crate::finding::{AnomalyFinding, FindingKind, Severity};
use crate::report::{AnomalyReport, EmployeeRisk, FailurePattern, PatternStatus, RiskLevel};
use crate::rules::{default_rules, DetectionRule, RuleContext};

const FAILED_RATIO_WEIGHT: f64 = 0.5;
const FAILED_VOLUME_WEIGHT: f64 = 0.2;
const FINDING_DENSITY_WEIGHT: f64 = 0.3;
/// Failures at which the volume term saturates.
const FAILED_VOLUME_SATURATION: f64 = 10.0;
/// Employees need more than this many failures to get a failure pattern.
const PATTERN_MIN_FAILURES: usize = 2;
const LOCKOUT_FAILED_COUNT: usize = 5;

pub const REVIEW_FLAGGED: &str = "Review flagged activities in detail";
pub const CONSIDER_LOCKOUT: &str =
	"Consider implementing account lockout after repeated failed attempts";

/// Fixed text per finding category.
pub fn recommendation_for(kind: FindingKind) -> &'static str {
	match kind {
		FindingKind::RepeatedFailedAttempts => {
			"Review repeated-failure employees and their authentication logs"
		}
		FindingKind::ImplausibleRelocation => {
			"Investigate implausible relocations for possible location spoofing"
		}
		FindingKind::GeofenceBoundaryFailures => {
			"Review the geofence radius; failures cluster just outside the boundary"
		}
		FindingKind::RapidAccess => "Investigate rapid file access patterns",
		FindingKind::OffHoursAccess => "Confirm that off-hours file access was expected",
	}
}

/// Batch analysis over an access log snapshot.
///
/// Pure: performs no I/O and keeps no state between calls.
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
	settings: AnomalyConfig,
	policy: GeofenceConfig,
	offset: FixedOffset,
	rules: Vec<DetectionRule>,
}

impl AnomalyEngine {
	pub fn new(settings: AnomalyConfig, policy: GeofenceConfig, offset: FixedOffset) -> Self {
		Self {
			settings,
			policy,
			offset,
			rules: default_rules(),
		}
	}

	/// Replaces the detector pipeline.
	pub fn with_rules(mut self, rules: Vec<DetectionRule>) -> Self {
		self.rules = rules;
		self
	}

	pub fn settings(&self) -> &AnomalyConfig {
		&self.settings
	}

	#[tracing::instrument(skip(self, logs), fields(entries = logs.len()))]
	pub fn analyze(&self, logs: &[AccessLogEntry]) -> AnomalyReport {
		if logs.is_empty() {
			return AnomalyReport::empty();
		}

		let ctx = RuleContext {
			settings: &self.settings,
			policy: &self.policy,
			offset: self.offset,
		};

		let mut findings: Vec<AnomalyFinding> = self
			.rules
			.iter()
			.flat_map(|rule| {
				let found = (rule.detect)(logs, &ctx);
				tracing::debug!(rule = %rule.kind, count = found.len(), "rule evaluated");
				found
			})
			.collect();
		findings.sort_by(|a, b| {
			b.severity
				.cmp(&a.severity)
				.then_with(|| a.kind.cmp(&b.kind))
				.then_with(|| a.log_id.cmp(&b.log_id))
				.then_with(|| a.employee_id.cmp(&b.employee_id))
		});

		let total_activities = logs.len();
		let suspicious_count = logs.iter().filter(|e| !e.success).count();
		let risk_level = self.risk_level(total_activities, suspicious_count, &findings);

		let employees = self.employee_risks(logs, &findings);
		let recommendations = recommendations(&findings, &employees);
		let mut high_risk_employees: Vec<EmployeeRisk> = employees
			.into_iter()
			.filter(|e| e.risk_score > self.settings.employee_risk_threshold)
			.collect();
		high_risk_employees.sort_by(|a, b| {
			b.risk_score
				.total_cmp(&a.risk_score)
				.then_with(|| a.employee_id.cmp(&b.employee_id))
		});
		high_risk_employees.truncate(self.settings.max_high_risk_employees);

		let patterns = self.failure_patterns(logs);
		let total_findings = findings.len();
		findings.truncate(self.settings.max_reported_findings);

		tracing::info!(
			total_activities,
			suspicious_count,
			risk_level = %risk_level,
			findings = total_findings,
			"anomaly analysis complete"
		);

		AnomalyReport {
			total_activities,
			suspicious_count,
			risk_level,
			high_risk_employees,
			total_findings,
			rule_based_anomalies: findings,
			patterns,
			recommendations,
		}
	}

	/// Runs the same analysis over one employee's entries.
	pub fn analyze_employee(
		&self,
		employee_id: &EmployeeId,
		logs: &[AccessLogEntry],
	) -> AnomalyReport {
		let own: Vec<AccessLogEntry> = logs
			.iter()
			.filter(|e| &e.employee_id == employee_id)
			.cloned()
			.collect();
		self.analyze(&own)
	}

	fn risk_level(
		&self,
		total: usize,
		suspicious: usize,
		findings: &[AnomalyFinding],
	) -> RiskLevel {
		let ratio = suspicious as f64 / total as f64;
		let any_high = findings.iter().any(|f| f.severity == Severity::High);
		if ratio > self.settings.high_risk_ratio || any_high {
			RiskLevel::High
		} else if ratio > self.settings.medium_risk_ratio {
			RiskLevel::Medium
		} else {
			RiskLevel::Low
		}
	}

	/// Every employee in the snapshot, ordered by id.
	fn employee_risks(
		&self,
		logs: &[AccessLogEntry],
		findings: &[AnomalyFinding],
	) -> Vec<EmployeeRisk> {
		#[derive(Default)]
		struct Tally {
			total: usize,
			failed: usize,
			findings: usize,
		}

		let mut tallies: BTreeMap<&EmployeeId, Tally> = BTreeMap::new();
		for entry in logs {
			let tally = tallies.entry(&entry.employee_id).or_default();
			tally.total += 1;
			if !entry.success {
				tally.failed += 1;
			}
		}
		for finding in findings {
			if let Some(tally) = tallies.get_mut(&finding.employee_id) {
				tally.findings += 1;
			}
		}

		tallies
			.into_iter()
			.map(|(employee_id, t)| EmployeeRisk {
				employee_id: employee_id.clone(),
				total_activities: t.total,
				failed_count: t.failed,
				suspicious_count: t.findings,
				risk_score: risk_score(t.total, t.failed, t.findings),
			})
			.collect()
	}

	fn failure_patterns(&self, logs: &[AccessLogEntry]) -> Vec<FailurePattern> {
		let mut counts: BTreeMap<&EmployeeId, (usize, usize)> = BTreeMap::new();
		for entry in logs {
			let (total, failed) = counts.entry(&entry.employee_id).or_default();
			*total += 1;
			if !entry.success {
				*failed += 1;
			}
		}

		counts
			.into_iter()
			.filter(|(_, (_, failed))| *failed > PATTERN_MIN_FAILURES)
			.map(|(employee_id, (total, failed))| {
				let failure_rate = failed as f64 / total as f64;
				let status = if failure_rate > self.settings.failure_anomaly_ratio {
					PatternStatus::Anomaly
				} else if failure_rate > self.settings.failure_warning_ratio {
					PatternStatus::Warning
				} else {
					PatternStatus::Normal
				};
				FailurePattern {
					employee_id: employee_id.clone(),
					failure_rate,
					failed_count: failed,
					total_activities: total,
					status,
					description: format!(
						"{employee_id} has {:.1}% failed access rate ({failed}/{total})",
						failure_rate * 100.0
					),
				}
			})
			.collect()
	}
}

/// Weighted combination favouring the failure ratio over raw volume.
pub fn risk_score(total: usize, failed: usize, findings: usize) -> f64 {
	if total == 0 {
		return 0.0;
	}
	let total = total as f64;
	let failed = failed as f64;
	let failed_ratio = failed / total;
	let volume = (failed / FAILED_VOLUME_SATURATION).min(1.0);
	let density = (findings as f64 / total).min(1.0);
	FAILED_RATIO_WEIGHT * failed_ratio
		+ FAILED_VOLUME_WEIGHT * volume
		+ FINDING_DENSITY_WEIGHT * density
}

fn recommendations(findings: &[AnomalyFinding], employees: &[EmployeeRisk]) -> Vec<String> {
	let mut out = Vec::new();
	if !findings.is_empty() {
		out.push(REVIEW_FLAGGED.to_string());
	}
	if employees.iter().any(|e| e.failed_count > LOCKOUT_FAILED_COUNT) {
		out.push(CONSIDER_LOCKOUT.to_string());
	}
	let kinds: BTreeSet<FindingKind> = findings.iter().map(|f| f.kind).collect();
	out.extend(kinds.into_iter().map(|k| recommendation_for(k).to_string()));
	out
}
