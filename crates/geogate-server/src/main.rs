// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! geogate administrative binary.

use std::path::PathBuf;

use clap::Parser;
use geogate_server_config::{LogFormat, LoggingConfig, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod version;

use cli::Command;

/// geogate - context-aware access control for sensitive files.
#[derive(Parser, Debug)]
#[command(name = "geogate", about = "Context-aware file access control", version)]
struct Args {
	/// Configuration file layered over /etc/geogate/server.toml and the
	/// GEOGATE_SERVER_* environment.
	#[arg(long, env = "GEOGATE_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
			.init(),
		LogFormat::Text => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

fn load(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
	let config = match path {
		Some(path) => geogate_server_config::load_config_with_file(path)?,
		None => geogate_server_config::load_config()?,
	};
	Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	let config = load(args.config)?;
	init_tracing(&config.logging);
	tracing::debug!(
		database = %config.database.url,
		files = %config.files.root.display(),
		"configuration loaded"
	);

	commands::run(args.command, &config).await
}
