// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! File storage collaborators. The access service never inspects content.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
	#[error("{0}")]
	NotFound(String),

	#[error("invalid file id: {0}")]
	InvalidId(String),

	#[error("file storage I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("corrupt file metadata: {0}")]
	Metadata(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
	pub file_id: String,
	pub filename: String,
	pub size: u64,
	pub uploaded_by: Option<String>,
	pub uploaded_at: DateTime<Utc>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
	/// All files, ordered by id.
	async fn list(&self) -> Result<Vec<FileMetadata>, FileStoreError>;

	async fn fetch(&self, file_id: &str) -> Result<(FileMetadata, Bytes), FileStoreError>;
}

/// Process-local file store.
#[derive(Default)]
pub struct InMemoryFileStore {
	files: RwLock<BTreeMap<String, (FileMetadata, Bytes)>>,
}

impl InMemoryFileStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn put(
		&self,
		file_id: impl Into<String>,
		filename: impl Into<String>,
		content: impl Into<Bytes>,
		uploaded_at: DateTime<Utc>,
	) -> FileMetadata {
		let content = content.into();
		let metadata = FileMetadata {
			file_id: file_id.into(),
			filename: filename.into(),
			size: content.len() as u64,
			uploaded_by: None,
			uploaded_at,
		};
		self.files
			.write()
			.await
			.insert(metadata.file_id.clone(), (metadata.clone(), content));
		metadata
	}
}

#[async_trait]
impl FileStore for InMemoryFileStore {
	async fn list(&self) -> Result<Vec<FileMetadata>, FileStoreError> {
		Ok(self
			.files
			.read()
			.await
			.values()
			.map(|(m, _)| m.clone())
			.collect())
	}

	async fn fetch(&self, file_id: &str) -> Result<(FileMetadata, Bytes), FileStoreError> {
		self.files
			.read()
			.await
			.get(file_id)
			.cloned()
			.ok_or_else(|| FileStoreError::NotFound(file_id.to_string()))
	}
}

const METADATA_SUFFIX: &str = ".json";

/// Files on disk: `<root>/<file_id>` holds the bytes and
/// `<root>/<file_id>.json` the metadata.
pub struct DirectoryFileStore {
	root: PathBuf,
}

impl DirectoryFileStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Ids are plain names; anything that could leave the root is rejected.
	fn validate_id(file_id: &str) -> Result<(), FileStoreError> {
		let ok = !file_id.is_empty()
			&& !file_id.starts_with('.')
			&& !file_id.ends_with(METADATA_SUFFIX)
			&& file_id
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
		if ok {
			Ok(())
		} else {
			Err(FileStoreError::InvalidId(file_id.to_string()))
		}
	}

	fn content_path(&self, file_id: &str) -> PathBuf {
		self.root.join(file_id)
	}

	fn metadata_path(&self, file_id: &str) -> PathBuf {
		self.root.join(format!("{file_id}{METADATA_SUFFIX}"))
	}

	async fn read_metadata(&self, file_id: &str) -> Result<FileMetadata, FileStoreError> {
		let raw = tokio::fs::read(self.metadata_path(file_id))
			.await
			.map_err(|e| not_found_or_io(e, file_id))?;
		Ok(serde_json::from_slice(&raw)?)
	}

	/// Writes content then metadata, creating the root if needed.
	#[tracing::instrument(skip(self, content), fields(root = %self.root.display()))]
	pub async fn put(
		&self,
		file_id: &str,
		filename: &str,
		uploaded_by: Option<String>,
		content: Bytes,
		uploaded_at: DateTime<Utc>,
	) -> Result<FileMetadata, FileStoreError> {
		Self::validate_id(file_id)?;
		tokio::fs::create_dir_all(&self.root).await?;

		let metadata = FileMetadata {
			file_id: file_id.to_string(),
			filename: filename.to_string(),
			size: content.len() as u64,
			uploaded_by,
			uploaded_at,
		};
		tokio::fs::write(self.content_path(file_id), &content).await?;
		tokio::fs::write(self.metadata_path(file_id), serde_json::to_vec_pretty(&metadata)?).await?;
		tracing::debug!(size = metadata.size, "file stored");
		Ok(metadata)
	}
}

fn not_found_or_io(e: std::io::Error, file_id: &str) -> FileStoreError {
	if e.kind() == std::io::ErrorKind::NotFound {
		FileStoreError::NotFound(file_id.to_string())
	} else {
		FileStoreError::Io(e)
	}
}

#[async_trait]
impl FileStore for DirectoryFileStore {
	#[tracing::instrument(skip(self), fields(root = %self.root.display()))]
	async fn list(&self) -> Result<Vec<FileMetadata>, FileStoreError> {
		let mut dir = match tokio::fs::read_dir(&self.root).await {
			Ok(dir) => dir,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};

		let mut files = Vec::new();
		while let Some(item) = dir.next_entry().await? {
			let name = item.file_name();
			let Some(name) = name.to_str() else {
				continue;
			};
			let Some(file_id) = name.strip_suffix(METADATA_SUFFIX) else {
				continue;
			};
			if Self::validate_id(file_id).is_err() {
				continue;
			}
			match self.read_metadata(file_id).await {
				Ok(metadata) => files.push(metadata),
				Err(e) => tracing::warn!(file_id, error = %e, "skipping unreadable metadata"),
			}
		}
		files.sort_by(|a, b| a.file_id.cmp(&b.file_id));
		Ok(files)
	}

	#[tracing::instrument(skip(self), fields(root = %self.root.display()))]
	async fn fetch(&self, file_id: &str) -> Result<(FileMetadata, Bytes), FileStoreError> {
		Self::validate_id(file_id)?;
		let metadata = self.read_metadata(file_id).await?;
		let content = tokio::fs::read(self.content_path(file_id))
			.await
			.map_err(|e| not_found_or_io(e, file_id))?;
		Ok((metadata, Bytes::from(content)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn t() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
	}

	#[tokio::test]
	async fn in_memory_put_list_fetch() {
		let store = InMemoryFileStore::new();
		store.put("f2", "b.txt", "bbb", t()).await;
		store.put("f1", "a.txt", "a", t()).await;

		let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|m| m.file_id).collect();
		assert_eq!(ids, vec!["f1", "f2"]);

		let (meta, bytes) = store.fetch("f2").await.unwrap();
		assert_eq!(meta.size, 3);
		assert_eq!(&bytes[..], b"bbb");
		assert!(matches!(
			store.fetch("nope").await,
			Err(FileStoreError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn directory_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirectoryFileStore::new(dir.path().join("files"));

		assert!(store.list().await.unwrap().is_empty());

		let stored = store
			.put("plan-1", "plan.pdf", Some("admin".into()), Bytes::from_static(b"%PDF"), t())
			.await
			.unwrap();
		assert_eq!(stored.size, 4);

		let (meta, bytes) = store.fetch("plan-1").await.unwrap();
		assert_eq!(meta, stored);
		assert_eq!(&bytes[..], b"%PDF");
		assert_eq!(store.list().await.unwrap(), vec![stored]);
	}

	#[tokio::test]
	async fn directory_rejects_escaping_ids() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirectoryFileStore::new(dir.path());
		for bad in ["../etc/passwd", "", ".hidden", "a/b", "x.json"] {
			assert!(
				matches!(store.fetch(bad).await, Err(FileStoreError::InvalidId(_))),
				"{bad} should be rejected"
			);
		}
	}

	#[tokio::test]
	async fn directory_missing_file_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirectoryFileStore::new(dir.path());
		assert!(matches!(
			store.fetch("ghost").await,
			Err(FileStoreError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn directory_corrupt_metadata_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("bad.json"), b"{ not json").unwrap();
		std::fs::write(dir.path().join("bad"), b"x").unwrap();
		let store = DirectoryFileStore::new(dir.path());
		assert!(matches!(
			store.fetch("bad").await,
			Err(FileStoreError::Metadata(_))
		));
		assert!(store.list().await.unwrap().is_empty());
	}
}
