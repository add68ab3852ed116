// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! File storage section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FILES_ROOT: &str = "./files";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilesConfigLayer {
	pub root: Option<String>,
}

impl FilesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.root.is_some() {
			self.root = other.root;
		}
	}

	pub fn finalize(self) -> FilesConfig {
		FilesConfig {
			root: PathBuf::from(self.root.unwrap_or_else(|| DEFAULT_FILES_ROOT.to_string())),
		}
	}
}

/// Where the directory-backed file store keeps content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilesConfig {
	pub root: PathBuf,
}

impl Default for FilesConfig {
	fn default() -> Self {
		FilesConfigLayer::default().finalize()
	}
}
