//! Discovery of per-architecture image archives.
//!
//! Archives are produced by an earlier build step and are only ever read here.
//! Each discovered file is paired with the transport scheme the container tool
//! needs to import it, e.g. `docker-archive:containers/amd64.tar.gz`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::ARCHIVE_EXTENSION;

#[derive(Debug, Error)]
pub enum DiscoveryError {
  #[error("archive root does not exist: {0}")]
  RootNotFound(PathBuf),

  #[error("archive root is not a directory: {0}")]
  NotADirectory(PathBuf),

  #[error("failed to read archive root '{path}': {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },
}

/// Scheme marker telling the container tool how to read a local archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveTransport {
  #[default]
  DockerArchive,
  OciArchive,
}

impl ArchiveTransport {
  pub fn as_str(&self) -> &'static str {
    match self {
      ArchiveTransport::DockerArchive => "docker-archive",
      ArchiveTransport::OciArchive => "oci-archive",
    }
  }
}

impl fmt::Display for ArchiveTransport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ArchiveTransport {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "docker-archive" => Ok(ArchiveTransport::DockerArchive),
      "oci-archive" => Ok(ArchiveTransport::OciArchive),
      other => Err(format!(
        "unknown archive transport '{}' (expected docker-archive or oci-archive)",
        other
      )),
    }
  }
}

/// A locally stored image archive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArchiveRef {
  pub transport: ArchiveTransport,
  pub path: PathBuf,
}

impl ArchiveRef {
  pub fn new(transport: ArchiveTransport, path: impl Into<PathBuf>) -> Self {
    Self {
      transport,
      path: path.into(),
    }
  }

  /// The reference as passed to the container tool.
  pub fn reference(&self) -> String {
    format!("{}:{}", self.transport, self.path.display())
  }
}

impl fmt::Display for ArchiveRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.transport, self.path.display())
  }
}

/// Deduplicated, sorted set of archive references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArchiveSet(BTreeSet<ArchiveRef>);

impl ArchiveSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds a reference, returning `false` if it was already present.
  pub fn insert(&mut self, archive: ArchiveRef) -> bool {
    self.0.insert(archive)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ArchiveRef> {
    self.0.iter()
  }

  pub fn references(&self) -> Vec<String> {
    self.0.iter().map(ArchiveRef::reference).collect()
  }
}

impl FromIterator<ArchiveRef> for ArchiveSet {
  fn from_iter<I: IntoIterator<Item = ArchiveRef>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a ArchiveSet {
  type Item = &'a ArchiveRef;
  type IntoIter = std::collections::btree_set::Iter<'a, ArchiveRef>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

fn is_archive(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .is_some_and(|name| name.len() > ARCHIVE_EXTENSION.len() && name.ends_with(ARCHIVE_EXTENSION))
}

/// Recursively collect every `*.tar.gz` file under `root`.
///
/// Returns an empty set when nothing matches; callers that need at least one
/// archive must check for that themselves.
pub fn discover_archives(root: &Path, transport: ArchiveTransport) -> Result<ArchiveSet, DiscoveryError> {
  if !root.exists() {
    return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
  }
  if !root.is_dir() {
    return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
  }

  let mut archives = ArchiveSet::new();

  for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
    let entry = entry.map_err(|source| DiscoveryError::Walk {
      path: root.to_path_buf(),
      source,
    })?;

    if !entry.file_type().is_file() || !is_archive(entry.path()) {
      continue;
    }

    debug!(path = %entry.path().display(), "found archive");
    archives.insert(ArchiveRef::new(transport, entry.path()));
  }

  info!(root = %root.display(), count = archives.len(), "discovered archives");
  Ok(archives)
}
