//! The manifest publisher.
//!
//! Sequences discovery, coordinate construction, manifest creation,
//! inspection, login and push. Steps run strictly in order and the first
//! failure aborts the run: nothing is retried, rolled back or cleaned up.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::archive::{ArchiveSet, DiscoveryError, discover_archives};
use crate::client::{
  AuthenticationError, InspectError, ManifestCreationError, ManifestDescription, ManifestHandle, PushError, PushResult,
  RegistryClient,
};
use crate::config::{ConfigError, PublishConfig, env};
use crate::coordinate::{CoordinateError, ImageCoordinate, build_image_coordinate};
use crate::metadata::{ManifestMetadata, MetadataError};

#[derive(Debug, Error)]
pub enum PublishError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("archive discovery failed: {0}")]
  Discovery(#[from] DiscoveryError),

  #[error("invalid image coordinate: {0}")]
  Coordinate(#[from] CoordinateError),

  #[error("invalid manifest metadata: {0}")]
  Metadata(#[from] MetadataError),

  #[error("manifest creation failed: {0}")]
  Creation(#[from] ManifestCreationError),

  #[error("manifest inspection failed: {0}")]
  Inspect(#[from] InspectError),

  #[error("registry authentication failed: {0}")]
  Authentication(#[from] AuthenticationError),

  #[error("push failed: {0}")]
  Push(#[from] PushError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
  /// Stop after creating and inspecting the manifest list.
  pub skip_push: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
  pub coordinate: ImageCoordinate,
  pub archives: ArchiveSet,
  pub metadata: ManifestMetadata,
  pub manifest: ManifestHandle,
  pub description: ManifestDescription,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub push: Option<PushResult>,
}

pub struct Publisher<C> {
  config: PublishConfig,
  client: C,
  options: PublishOptions,
}

impl<C: RegistryClient> Publisher<C> {
  pub fn new(config: PublishConfig, client: C) -> Self {
    Self {
      config,
      client,
      options: PublishOptions::default(),
    }
  }

  pub fn with_options(mut self, options: PublishOptions) -> Self {
    self.options = options;
    self
  }

  pub fn config(&self) -> &PublishConfig {
    &self.config
  }

  pub fn client(&self) -> &C {
    &self.client
  }

  pub fn coordinate(&self) -> Result<ImageCoordinate, CoordinateError> {
    build_image_coordinate(&self.config.repo_id, &self.config.ref_name)
  }

  /// Run the whole publish sequence.
  pub async fn run(&self) -> Result<PublishReport, PublishError> {
    let credentials = match (&self.config.credentials, self.options.skip_push) {
      (Some(credentials), false) => Some(credentials),
      (None, false) => return Err(ConfigError::Missing(env::ACTOR).into()),
      (_, true) => None,
    };

    let archives = discover_archives(&self.config.archive_root, self.config.transport)?;
    for archive in &archives {
      info!(archive = %archive, "using archive");
    }

    let coordinate = self.coordinate()?;
    info!(coordinate = %coordinate, "image coordinate");

    let metadata = ManifestMetadata::from_provenance(&self.config.provenance)?;

    if archives.is_empty() {
      return Err(ManifestCreationError::NoArchives.into());
    }
    if self.client.manifest_exists(&coordinate.to_string()).await? {
      return Err(ManifestCreationError::AlreadyExists(coordinate.to_string()).into());
    }

    info!(coordinate = %coordinate, archives = archives.len(), "creating manifest list");
    let manifest = self.client.create_manifest(&coordinate, &archives, &metadata).await?;

    let description = self.client.inspect(&manifest).await?;
    info!(
      manifests = description.manifests.len(),
      platforms = ?description.platforms(),
      "inspected manifest list"
    );
    for entry in &description.manifests {
      info!(digest = %entry.digest, platform = ?entry.platform, "manifest entry");
    }

    let Some(credentials) = credentials else {
      warn!("skipping login and push");
      return Ok(PublishReport {
        coordinate,
        archives,
        metadata,
        manifest,
        description,
        push: None,
      });
    };

    info!(registry = %self.config.registry_host, actor = %credentials.actor, "logging in");
    self.client.login(&self.config.registry_host, credentials).await?;

    let destination = coordinate.destination(&self.config.registry_host);
    info!(destination = %destination, "pushing manifest list");
    let push = self.client.push(&manifest, &destination).await?;
    info!(destination = %push.destination, digest = ?push.digest, "push complete");

    Ok(PublishReport {
      coordinate,
      archives,
      metadata,
      manifest,
      description,
      push: Some(push),
    })
  }
}
