// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The access service: the operations the (external) UI layer calls.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Offset, Utc};
use geogate_core::{
	actions, evaluate, AccessContext, AccessLogEntry, Clock, Decision, DecisionChecks, EmployeeId,
	GeoPoint, GeofenceConfig, LogId, LogType, WfhRequest, WfhWindow,
};
use geogate_server_anomaly::{AnomalyEngine, AnomalyReport};
use geogate_server_config::AnomalyConfig;
use geogate_server_db::{AccessLogFilter, AuditLog, DbError, GeofenceConfigStore, WfhStore};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::store::{FileMetadata, FileStore, FileStoreError};

/// What a client submits about its surroundings. The server adds the time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextClaim {
	pub latitude: Option<f64>,
	pub longitude: Option<f64>,
	pub ssid: Option<String>,
}

impl ContextClaim {
	pub fn new(latitude: Option<f64>, longitude: Option<f64>, ssid: Option<String>) -> Self {
		Self {
			latitude,
			longitude,
			ssid,
		}
	}

	pub fn at(latitude: f64, longitude: f64, ssid: impl Into<String>) -> Self {
		Self::new(Some(latitude), Some(longitude), Some(ssid.into()))
	}
}

/// A file listing row annotated by a dry-run decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedFile {
	#[serde(flatten)]
	pub metadata: FileMetadata,
	pub accessible: bool,
	pub access_reason: String,
	pub validations: DecisionChecks,
}

/// Result of an enforcing file request. Either way an audit entry exists.
#[derive(Debug, Clone)]
pub enum FileAccessOutcome {
	Granted {
		decision: Decision,
		metadata: FileMetadata,
		content: Bytes,
		log_id: LogId,
	},
	Denied {
		decision: Decision,
		log_id: LogId,
	},
}

impl FileAccessOutcome {
	pub fn decision(&self) -> &Decision {
		match self {
			FileAccessOutcome::Granted { decision, .. }
			| FileAccessOutcome::Denied { decision, .. } => decision,
		}
	}

	pub fn log_id(&self) -> LogId {
		match self {
			FileAccessOutcome::Granted { log_id, .. }
			| FileAccessOutcome::Denied { log_id, .. } => *log_id,
		}
	}

	pub fn is_granted(&self) -> bool {
		matches!(self, FileAccessOutcome::Granted { .. })
	}
}

fn storage(e: DbError) -> GatewayError {
	tracing::warn!(error = %e, "store failure");
	GatewayError::StorageUnavailable(e.to_string())
}

/// Wraps the decision engine around the stores, the audit log and file
/// storage.
pub struct AccessService {
	config: Arc<dyn GeofenceConfigStore>,
	wfh: Arc<dyn WfhStore>,
	audit: Arc<dyn AuditLog>,
	files: Arc<dyn FileStore>,
	clock: Arc<dyn Clock>,
	anomaly: AnomalyConfig,
}

impl AccessService {
	pub fn new(
		config: Arc<dyn GeofenceConfigStore>,
		wfh: Arc<dyn WfhStore>,
		audit: Arc<dyn AuditLog>,
		files: Arc<dyn FileStore>,
		clock: Arc<dyn Clock>,
		anomaly: AnomalyConfig,
	) -> Self {
		Self {
			config,
			wfh,
			audit,
			files,
			clock,
			anomaly,
		}
	}

	fn context(&self, employee_id: &EmployeeId, claim: &ContextClaim) -> AccessContext {
		AccessContext::new(employee_id.clone(), self.clock.now())
			.with_coordinates(claim.latitude, claim.longitude)
			.with_ssid(claim.ssid.clone())
	}

	/// Reads the current policy and the employee's WFH record, then evaluates.
	async fn decide(&self, context: &AccessContext) -> Result<Decision> {
		let config = self.config.get().await.map_err(storage)?;
		let wfh = self.wfh.get(&context.employee_id).await.map_err(storage)?;
		let decision = evaluate(context, &config, wfh.as_ref());

		if decision.wfh_override {
			tracing::info!(employee_id = %context.employee_id, "access allowed by WFH window");
		} else if !decision.allowed {
			let failing: Vec<String> = decision
				.checks
				.failing()
				.into_iter()
				.map(|k| k.to_string())
				.collect();
			tracing::info!(
				employee_id = %context.employee_id,
				failing = ?failing,
				reason = %decision.reason,
				"access denied"
			);
		}
		Ok(decision)
	}

	/// Evaluates without writing to the audit log.
	#[tracing::instrument(skip(self, claim), fields(employee_id = %employee_id))]
	pub async fn evaluate_dry_run(
		&self,
		employee_id: &EmployeeId,
		claim: &ContextClaim,
	) -> Result<Decision> {
		self.decide(&self.context(employee_id, claim)).await
	}

	/// Every file with the dry-run verdict for this employee. One decision
	/// covers the whole listing.
	#[tracing::instrument(skip(self, claim), fields(employee_id = %employee_id))]
	pub async fn annotate_listing(
		&self,
		employee_id: &EmployeeId,
		claim: &ContextClaim,
	) -> Result<Vec<AnnotatedFile>> {
		let decision = self.evaluate_dry_run(employee_id, claim).await?;
		let files = self.files.list().await?;
		Ok(files
			.into_iter()
			.map(|metadata| AnnotatedFile {
				metadata,
				accessible: decision.allowed,
				access_reason: decision.reason.clone(),
				validations: decision.checks.clone(),
			})
			.collect())
	}

	/// Enforcing path: evaluate, audit, and release bytes only when allowed.
	///
	/// The decision is appended before file storage is consulted, so an
	/// audit failure fails the request without reading the file. Denied
	/// requests never touch file storage. An allowed request whose file
	/// cannot be served gets a second, failed entry.
	#[tracing::instrument(skip(self, claim), fields(employee_id = %employee_id))]
	pub async fn fetch_file(
		&self,
		employee_id: &EmployeeId,
		file_id: &str,
		claim: &ContextClaim,
	) -> Result<FileAccessOutcome> {
		let context = self.context(employee_id, claim);
		let decision = self.decide(&context).await?;
		let entry = AccessLogEntry::builder(employee_id.clone(), LogType::File)
			.action(actions::FILE_DOWNLOAD)
			.file_id(file_id)
			.location(context.valid_location())
			.wifi_ssid(context.ssid.clone())
			.timestamp(context.evaluation_time.with_timezone(&Utc));

		let log_id = self
			.audit
			.append(entry.clone().decision(&decision).build())
			.await
			.map_err(storage)?;
		if !decision.allowed {
			return Ok(FileAccessOutcome::Denied { decision, log_id });
		}

		match self.files.fetch(file_id).await {
			Ok((metadata, content)) => {
				tracing::info!(%log_id, size = metadata.size, "file released");
				Ok(FileAccessOutcome::Granted {
					decision,
					metadata,
					content,
					log_id,
				})
			}
			Err(e) => {
				let reason = match &e {
					FileStoreError::NotFound(_) | FileStoreError::InvalidId(_) => "file not found",
					_ => "file storage unavailable",
				};
				tracing::warn!(error = %e, %log_id, "allowed request could not be served");
				self.audit
					.append(entry.success(false).reason(reason).build())
					.await
					.map_err(storage)?;
				Err(e.into())
			}
		}
	}

	/// Records an outcome from the external authentication flow.
	#[tracing::instrument(skip(self, reason, claim), fields(employee_id = %employee_id))]
	pub async fn record_authentication(
		&self,
		employee_id: &EmployeeId,
		action: &str,
		success: bool,
		reason: &str,
		claim: Option<&ContextClaim>,
	) -> Result<LogId> {
		let location = claim.and_then(|c| GeoPoint::from_parts(c.latitude, c.longitude));
		let entry = AccessLogEntry::builder(employee_id.clone(), LogType::Authentication)
			.action(action)
			.success(success)
			.reason(reason)
			.location(location.filter(|p| p.is_valid()))
			.wifi_ssid(claim.and_then(|c| c.ssid.clone()))
			.timestamp(self.clock.now().with_timezone(&Utc))
			.build();
		self.audit.append(entry).await.map_err(storage)
	}

	pub async fn policy(&self) -> Result<GeofenceConfig> {
		self.config.get().await.map_err(storage)
	}

	/// Validates and atomically replaces the policy. Rejected updates leave
	/// the current policy in place.
	#[tracing::instrument(skip(self, config))]
	pub async fn update_policy(&self, config: GeofenceConfig) -> Result<()> {
		config.validate()?;
		self.config.replace(config).await.map_err(|e| match e {
			DbError::Validation(v) => GatewayError::Validation(v),
			other => storage(other),
		})
	}

	pub async fn request_wfh(&self, employee_id: &EmployeeId, reason: &str) -> Result<WfhRequest> {
		let now = self.clock.now().with_timezone(&Utc);
		Ok(self.wfh.submit(employee_id, reason, now).await?)
	}

	pub async fn approve_wfh(
		&self,
		employee_id: &EmployeeId,
		access_start: DateTime<Utc>,
		access_end: DateTime<Utc>,
		comment: Option<String>,
	) -> Result<WfhRequest> {
		let window = WfhWindow::new(access_start, access_end)?;
		let now = self.clock.now().with_timezone(&Utc);
		Ok(self.wfh.approve(employee_id, window, comment, now).await?)
	}

	pub async fn reject_wfh(
		&self,
		employee_id: &EmployeeId,
		comment: Option<String>,
	) -> Result<WfhRequest> {
		let now = self.clock.now().with_timezone(&Utc);
		Ok(self.wfh.reject(employee_id, comment, now).await?)
	}

	pub async fn wfh_status(&self, employee_id: &EmployeeId) -> Result<Option<WfhRequest>> {
		self.wfh.get(employee_id).await.map_err(storage)
	}

	pub async fn list_wfh(&self) -> Result<Vec<WfhRequest>> {
		self.wfh.list().await.map_err(storage)
	}

	pub async fn logs(&self, filter: &AccessLogFilter) -> Result<Vec<AccessLogEntry>> {
		self.audit.query(filter).await.map_err(storage)
	}

	/// Newest first, capped for display.
	pub async fn display_logs(&self) -> Result<Vec<AccessLogEntry>> {
		self.logs(&AccessLogFilter::display()).await
	}

	async fn engine(&self) -> Result<AnomalyEngine> {
		let policy = self.policy().await?;
		let offset = self.clock.now().offset().fix();
		Ok(AnomalyEngine::new(self.anomaly.clone(), policy, offset))
	}

	/// Report over a point-in-time snapshot of the whole log.
	#[tracing::instrument(skip(self))]
	pub async fn analyze(&self) -> Result<AnomalyReport> {
		let snapshot = self.logs(&AccessLogFilter::all()).await?;
		Ok(self.engine().await?.analyze(&snapshot))
	}

	#[tracing::instrument(skip(self), fields(employee_id = %employee_id))]
	pub async fn analyze_employee(&self, employee_id: &EmployeeId) -> Result<AnomalyReport> {
		let snapshot = self
			.logs(&AccessLogFilter::for_employee(employee_id.clone()))
			.await?;
		Ok(self.engine().await?.analyze_employee(employee_id, &snapshot))
	}
}
