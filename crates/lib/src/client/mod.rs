//! The registry client capability.
//!
//! All real work (manifest creation, inspection, login, push) is done by an
//! external container tool. [`RegistryClient`] is the narrow seam the
//! publisher talks through: [`process::ProcessClient`] drives the real tool,
//! [`fake::FakeRegistry`] keeps everything in memory.

pub mod command;
pub mod fake;
pub mod process;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveSet;
use crate::config::Credentials;
use crate::coordinate::ImageCoordinate;
use crate::metadata::ManifestMetadata;

pub use command::CommandError;

#[derive(Debug, Error)]
pub enum ManifestCreationError {
  #[error("no archives to reference; refusing to create an empty manifest list")]
  NoArchives,

  #[error("manifest list '{0}' already exists locally; remove it before publishing again")]
  AlreadyExists(String),

  #[error("invalid archive '{reference}': {reason}")]
  InvalidArchive { reference: String, reason: String },

  #[error(transparent)]
  Tool(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum InspectError {
  #[error("manifest list '{0}' not found")]
  NotFound(String),

  #[error("failed to parse manifest description: {0}")]
  Parse(#[from] serde_json::Error),

  #[error(transparent)]
  Tool(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
  #[error("login to {registry} rejected: {reason}")]
  Rejected { registry: String, reason: String },

  #[error(transparent)]
  Tool(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum PushError {
  #[error("push to {destination} rejected: {reason}")]
  Rejected { destination: String, reason: String },

  #[error("failed to read pushed digest: {0}")]
  Digest(#[source] std::io::Error),

  #[error(transparent)]
  Tool(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum RemoveError {
  #[error(transparent)]
  Tool(#[from] CommandError),
}

/// A manifest list created in the tool's local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestHandle {
  /// Local name of the list, `repository:tag`.
  pub name: String,
  /// Archive references the list was created from.
  pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
  #[serde(default)]
  pub architecture: String,
  #[serde(default)]
  pub os: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
}

impl std::fmt::Display for PlatformDescriptor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.os, self.architecture)?;
    if let Some(variant) = &self.variant {
      write!(f, "/{}", variant)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
  #[serde(default)]
  pub media_type: String,
  pub digest: String,
  #[serde(default)]
  pub size: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platform: Option<PlatformDescriptor>,
}

/// What the tool reports about a manifest list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDescription {
  #[serde(default)]
  pub schema_version: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub media_type: Option<String>,
  #[serde(default)]
  pub manifests: Vec<ManifestEntry>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub annotations: BTreeMap<String, String>,
}

impl ManifestDescription {
  pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(raw)
  }

  pub fn platforms(&self) -> Vec<String> {
    self
      .manifests
      .iter()
      .filter_map(|m| m.platform.as_ref().map(ToString::to_string))
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushResult {
  pub destination: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub digest: Option<String>,
}

/// Operations the publisher needs from a container tool.
///
/// Authentication is ambient: after a successful [`login`](Self::login) the
/// session lives inside the tool and later pushes rely on it.
#[allow(async_fn_in_trait)]
pub trait RegistryClient {
  /// Whether a manifest list with this local name already exists.
  async fn manifest_exists(&self, name: &str) -> Result<bool, ManifestCreationError>;

  async fn create_manifest(
    &self,
    coordinate: &ImageCoordinate,
    archives: &ArchiveSet,
    metadata: &ManifestMetadata,
  ) -> Result<ManifestHandle, ManifestCreationError>;

  async fn inspect(&self, handle: &ManifestHandle) -> Result<ManifestDescription, InspectError>;

  async fn login(&self, registry: &str, credentials: &Credentials) -> Result<(), AuthenticationError>;

  /// Push the list and every platform image it references to `destination`.
  async fn push(&self, handle: &ManifestHandle, destination: &str) -> Result<PushResult, PushError>;

  /// Remove a local manifest list. Returns `false` if there was none.
  async fn remove_manifest(&self, name: &str) -> Result<bool, RemoveError>;
}
