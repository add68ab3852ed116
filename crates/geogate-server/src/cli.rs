// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use geogate_server_gateway::ContextClaim;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Create the schema and seed the policy from configuration
	Init,

	/// Show or replace the geofence policy
	Policy {
		#[command(subcommand)]
		action: PolicyCommand,
	},

	/// Dry-run an access decision (not audited)
	Evaluate {
		#[arg(long)]
		employee: String,
		#[command(flatten)]
		claim: ClaimArgs,
	},

	/// Request a file; audited, content written only when allowed
	Fetch {
		#[arg(long)]
		employee: String,
		#[arg(long = "file")]
		file_id: String,
		#[command(flatten)]
		claim: ClaimArgs,
		/// Where to write the file content
		#[arg(long, short)]
		output: Option<PathBuf>,
	},

	/// Record an authentication outcome from the login flow
	Auth {
		#[arg(long)]
		employee: String,
		/// Action verb, for example login, login_failed, otp_verified
		#[arg(long)]
		action: String,
		#[arg(long)]
		failed: bool,
		#[arg(long, default_value = "")]
		reason: String,
		#[command(flatten)]
		claim: ClaimArgs,
	},

	/// Show audit log entries, newest first
	Logs {
		#[arg(long)]
		employee: Option<String>,
		#[arg(long, default_value_t = geogate_server_db::MAX_DISPLAY_ENTRIES)]
		limit: usize,
	},

	/// Run the anomaly report over the audit log
	Analyze {
		#[arg(long)]
		employee: Option<String>,
	},

	/// Manage work-from-home requests
	Wfh {
		#[command(subcommand)]
		action: WfhCommand,
	},

	/// Manage stored files
	Files {
		#[command(subcommand)]
		action: FilesCommand,
	},

	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
	Show,
	/// Replace the policy; unspecified fields keep their current value
	Set {
		#[arg(long, allow_hyphen_values = true)]
		latitude: Option<f64>,
		#[arg(long, allow_hyphen_values = true)]
		longitude: Option<f64>,
		#[arg(long)]
		radius: Option<u32>,
		#[arg(long)]
		ssid: Option<String>,
		/// HH:MM
		#[arg(long)]
		start: Option<String>,
		/// HH:MM
		#[arg(long)]
		end: Option<String>,
	},
}

#[derive(Subcommand, Debug)]
pub enum WfhCommand {
	Request {
		#[arg(long)]
		employee: String,
		#[arg(long)]
		reason: String,
	},
	/// Approve a pending request with an RFC 3339 access window
	Approve {
		#[arg(long)]
		employee: String,
		#[arg(long)]
		start: DateTime<Utc>,
		#[arg(long)]
		end: DateTime<Utc>,
		#[arg(long)]
		comment: Option<String>,
	},
	Reject {
		#[arg(long)]
		employee: String,
		#[arg(long)]
		comment: Option<String>,
	},
	Status {
		#[arg(long)]
		employee: String,
	},
	List,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
	/// List files annotated with the employee's dry-run verdict
	List {
		#[arg(long)]
		employee: String,
		#[command(flatten)]
		claim: ClaimArgs,
	},
	/// Copy a local file into the store
	Add {
		#[arg(long)]
		id: String,
		path: PathBuf,
		/// Display name; defaults to the file name of `path`
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		uploaded_by: Option<String>,
	},
}

/// Context a client would submit.
#[derive(Args, Debug, Clone, Default)]
pub struct ClaimArgs {
	#[arg(long, allow_hyphen_values = true)]
	pub latitude: Option<f64>,
	#[arg(long, allow_hyphen_values = true)]
	pub longitude: Option<f64>,
	#[arg(long)]
	pub ssid: Option<String>,
}

impl ClaimArgs {
	pub fn is_empty(&self) -> bool {
		self.latitude.is_none() && self.longitude.is_none() && self.ssid.is_none()
	}
}

impl From<ClaimArgs> for ContextClaim {
	fn from(args: ClaimArgs) -> Self {
		ContextClaim::new(args.latitude, args.longitude, args.ssid)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	#[derive(Parser, Debug)]
	struct TestArgs {
		#[command(subcommand)]
		command: Command,
	}

	#[test]
	fn parses_negative_coordinates() {
		let args = TestArgs::try_parse_from([
			"geogate",
			"evaluate",
			"--employee",
			"alice",
			"--latitude",
			"40.0",
			"--longitude",
			"-73.5",
			"--ssid",
			"Office",
		])
		.unwrap();
		let Command::Evaluate { employee, claim } = args.command else {
			panic!("wrong command");
		};
		assert_eq!(employee, "alice");
		assert_eq!(
			ContextClaim::from(claim),
			ContextClaim::at(40.0, -73.5, "Office")
		);
	}

	#[test]
	fn parses_wfh_window() {
		let args = TestArgs::try_parse_from([
			"geogate",
			"wfh",
			"approve",
			"--employee",
			"alice",
			"--start",
			"2026-03-02T08:00:00Z",
			"--end",
			"2026-03-02T20:00:00Z",
		])
		.unwrap();
		let Command::Wfh {
			action: WfhCommand::Approve { start, end, .. },
		} = args.command
		else {
			panic!("wrong command");
		};
		assert!(start < end);
	}

	#[test]
	fn missing_context_is_allowed() {
		let args = TestArgs::try_parse_from(["geogate", "evaluate", "--employee", "bob"]).unwrap();
		let Command::Evaluate { claim, .. } = args.command else {
			panic!("wrong command");
		};
		assert_eq!(ContextClaim::from(claim), ContextClaim::default());
	}
}
