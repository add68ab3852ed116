// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use chrono::Utc;
use geogate_core::{parse_time_of_day, EmployeeId, GeofenceConfig, SystemClock};
use geogate_server_config::ServerConfig;
use geogate_server_db::{
	create_pool, run_migrations, AccessLogFilter, GeofenceConfigStore, LogOrder, SqliteAuditLog,
	SqliteGeofenceConfigStore, SqliteWfhStore,
};
use geogate_server_gateway::{AccessService, ContextClaim, DirectoryFileStore, FileAccessOutcome};
use serde_json::json;

use crate::cli::{Command, FilesCommand, PolicyCommand, WfhCommand};

fn print<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

/// Opens storage, seeds the policy if needed, and assembles the service.
async fn connect(
	config: &ServerConfig,
) -> anyhow::Result<(AccessService, Arc<DirectoryFileStore>)> {
	let pool = create_pool(&config.database.url)
		.await
		.with_context(|| format!("opening database {}", config.database.url))?;
	run_migrations(&pool).await.context("running migrations")?;

	let policy = Arc::new(SqliteGeofenceConfigStore::new(pool.clone()));
	policy
		.ensure_default(&config.policy.seed)
		.await
		.context("seeding policy")?;

	let files = Arc::new(DirectoryFileStore::new(config.files.root.clone()));
	let service = AccessService::new(
		policy,
		Arc::new(SqliteWfhStore::new(pool.clone())),
		Arc::new(SqliteAuditLog::new(pool)),
		files.clone(),
		Arc::new(SystemClock::new(config.policy.reference_offset())),
		config.anomaly.clone(),
	);
	Ok((service, files))
}

pub async fn run(command: Command, config: &ServerConfig) -> anyhow::Result<()> {
	let (service, files) = connect(config).await?;

	match command {
		Command::Init => {
			tracing::info!(database = %config.database.url, "database initialized");
			print(&service.policy().await?)
		}
		Command::Policy { action } => match action {
			PolicyCommand::Show => print(&service.policy().await?),
			PolicyCommand::Set {
				latitude,
				longitude,
				radius,
				ssid,
				start,
				end,
			} => {
				let current = service.policy().await?;
				let daily_start = match start {
					Some(s) => parse_time_of_day(&s)?,
					None => current.daily_start,
				};
				let daily_end = match end {
					Some(s) => parse_time_of_day(&s)?,
					None => current.daily_end,
				};
				let next = GeofenceConfig::new(
					latitude.unwrap_or(current.latitude),
					longitude.unwrap_or(current.longitude),
					radius.unwrap_or(current.radius_meters),
					ssid.unwrap_or(current.allowed_ssid),
					daily_start,
					daily_end,
				)?;
				service.update_policy(next.clone()).await?;
				tracing::info!("policy replaced");
				print(&next)
			}
		},
		Command::Evaluate { employee, claim } => {
			let decision = service
				.evaluate_dry_run(&EmployeeId::new(employee), &claim.into())
				.await?;
			print(&decision)
		}
		Command::Fetch {
			employee,
			file_id,
			claim,
			output,
		} => {
			let outcome = service
				.fetch_file(&EmployeeId::new(employee), &file_id, &claim.into())
				.await?;
			match outcome {
				FileAccessOutcome::Granted {
					decision,
					metadata,
					content,
					log_id,
				} => {
					if let Some(path) = &output {
						write_content(path, &content).await?;
					}
					print(&json!({
						"granted": true,
						"log_id": log_id,
						"file": metadata,
						"decision": decision,
					}))
				}
				FileAccessOutcome::Denied { decision, log_id } => print(&json!({
					"granted": false,
					"log_id": log_id,
					"decision": decision,
				})),
			}
		}
		Command::Auth {
			employee,
			action,
			failed,
			reason,
			claim,
		} => {
			let claim = (!claim.is_empty()).then(|| ContextClaim::from(claim));
			let log_id = service
				.record_authentication(
					&EmployeeId::new(employee),
					&action,
					!failed,
					&reason,
					claim.as_ref(),
				)
				.await?;
			print(&json!({ "log_id": log_id }))
		}
		Command::Logs { employee, limit } => {
			let filter = AccessLogFilter {
				employee_id: employee.map(EmployeeId::new),
				limit: Some(limit),
				order: LogOrder::NewestFirst,
				..AccessLogFilter::all()
			};
			print(&service.logs(&filter).await?)
		}
		Command::Analyze { employee } => {
			let report = match employee {
				Some(id) => service.analyze_employee(&EmployeeId::new(id)).await?,
				None => service.analyze().await?,
			};
			print(&report)
		}
		Command::Wfh { action } => match action {
			WfhCommand::Request { employee, reason } => {
				print(&service.request_wfh(&EmployeeId::new(employee), &reason).await?)
			}
			WfhCommand::Approve {
				employee,
				start,
				end,
				comment,
			} => print(
				&service
					.approve_wfh(&EmployeeId::new(employee), start, end, comment)
					.await?,
			),
			WfhCommand::Reject { employee, comment } => {
				print(&service.reject_wfh(&EmployeeId::new(employee), comment).await?)
			}
			WfhCommand::Status { employee } => {
				print(&service.wfh_status(&EmployeeId::new(employee)).await?)
			}
			WfhCommand::List => print(&service.list_wfh().await?),
		},
		Command::Files { action } => match action {
			FilesCommand::List { employee, claim } => print(
				&service
					.annotate_listing(&EmployeeId::new(employee), &claim.into())
					.await?,
			),
			FilesCommand::Add {
				id,
				path,
				name,
				uploaded_by,
			} => {
				let content = tokio::fs::read(&path)
					.await
					.with_context(|| format!("reading {}", path.display()))?;
				let filename = match name {
					Some(name) => name,
					None => path
						.file_name()
						.and_then(|n| n.to_str())
						.map(str::to_string)
						.with_context(|| format!("{} has no file name", path.display()))?,
				};
				let metadata = files
					.put(&id, &filename, uploaded_by, Bytes::from(content), Utc::now())
					.await?;
				print(&metadata)
			}
		},
		Command::Version => Ok(()),
	}
}

async fn write_content(path: &Path, content: &[u8]) -> anyhow::Result<()> {
	tokio::fs::write(path, content)
		.await
		.with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use geogate_server_config::{DatabaseConfig, FilesConfig};

	fn config(dir: &Path) -> ServerConfig {
		ServerConfig {
			database: DatabaseConfig {
				url: format!("sqlite://{}?mode=rwc", dir.join("geogate.db").display()),
			},
			files: FilesConfig {
				root: dir.join("files"),
			},
			..ServerConfig::default()
		}
	}

	#[tokio::test]
	async fn connect_seeds_policy_from_config() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(dir.path());
		let (service, _) = connect(&config).await.unwrap();
		assert_eq!(service.policy().await.unwrap(), config.policy.seed);
	}

	#[tokio::test]
	async fn stored_file_is_listed_for_employee() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(dir.path());
		let (service, files) = connect(&config).await.unwrap();
		files
			.put("f-1", "plan.pdf", None, Bytes::from_static(b"plan"), Utc::now())
			.await
			.unwrap();

		let listing = service
			.annotate_listing(&EmployeeId::from("alice"), &ContextClaim::default())
			.await
			.unwrap();
		assert_eq!(listing.len(), 1);
		assert!(!listing[0].accessible);
	}

	#[tokio::test]
	async fn denied_fetch_writes_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(dir.path());
		let (_, files) = connect(&config).await.unwrap();
		files
			.put("f-1", "plan.pdf", None, Bytes::from_static(b"plan"), Utc::now())
			.await
			.unwrap();
		let out = dir.path().join("out.bin");

		run(
			Command::Fetch {
				employee: "alice".to_string(),
				file_id: "f-1".to_string(),
				claim: Default::default(),
				output: Some(out.clone()),
			},
			&config,
		)
		.await
		.unwrap();
		assert!(!out.exists());
	}
}
