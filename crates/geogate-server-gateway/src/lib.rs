// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context-gated file access.
//!
//! [`AccessService`] is the single entry point for the UI layer:
//!
//! - dry-run evaluation and listing annotation (no audit write)
//! - enforcing file fetch (always audited, bytes only when allowed)
//! - authentication event recording
//! - policy and WFH administration
//! - raw log display and the anomaly report

pub mod error;
pub mod service;
pub mod store;

pub use error::{GatewayError, Result};
pub use service::{AccessService, AnnotatedFile, ContextClaim, FileAccessOutcome};
pub use store::{DirectoryFileStore, FileMetadata, FileStore, FileStoreError, InMemoryFileStore};
