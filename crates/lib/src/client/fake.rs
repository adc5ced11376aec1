//! In-memory [`RegistryClient`] for exercising the publisher without a tool.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{
  AuthenticationError, InspectError, ManifestCreationError, ManifestDescription, ManifestEntry, ManifestHandle,
  PlatformDescriptor, PushError, PushResult, RegistryClient, RemoveError,
};
use crate::archive::ArchiveSet;
use crate::config::Credentials;
use crate::consts::PUSH_TRANSPORT;
use crate::coordinate::ImageCoordinate;
use crate::metadata::ManifestMetadata;

/// Operation names recorded by [`FakeRegistry::calls`].
pub mod ops {
  pub const EXISTS: &str = "exists";
  pub const CREATE: &str = "create";
  pub const INSPECT: &str = "inspect";
  pub const LOGIN: &str = "login";
  pub const PUSH: &str = "push";
  pub const REMOVE: &str = "rm";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeManifest {
  pub references: Vec<String>,
  pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
  local: BTreeMap<String, FakeManifest>,
  remote: BTreeMap<String, FakeManifest>,
  sessions: HashSet<String>,
  calls: Vec<&'static str>,
}

/// A registry and local manifest store that live in memory.
///
/// Accepts logins only for the configured credentials and rejects pushes to
/// registries without a session.
#[derive(Debug, Default)]
pub struct FakeRegistry {
  credentials: Option<(String, String)>,
  invalid_archives: BTreeSet<String>,
  state: Mutex<State>,
}

impl FakeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Only this actor/token pair will be accepted by `login`.
  pub fn with_credentials(mut self, actor: &str, token: &str) -> Self {
    self.credentials = Some((actor.to_string(), token.to_string()));
    self
  }

  /// Treat this archive reference as unreadable.
  pub fn with_invalid_archive(mut self, reference: &str) -> Self {
    self.invalid_archives.insert(reference.to_string());
    self
  }

  /// Pretend a manifest list with this name was left behind by an earlier run.
  pub fn with_existing_manifest(self, name: &str) -> Self {
    self.state().local.insert(
      name.to_string(),
      FakeManifest {
        references: Vec::new(),
        annotations: BTreeMap::new(),
      },
    );
    self
  }

  fn state(&self) -> MutexGuard<'_, State> {
    // A panic while holding the lock only happens in a failing test.
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn calls(&self) -> Vec<&'static str> {
    self.state().calls.clone()
  }

  pub fn local_manifest(&self, name: &str) -> Option<FakeManifest> {
    self.state().local.get(name).cloned()
  }

  pub fn pushed(&self, destination: &str) -> Option<FakeManifest> {
    self.state().remote.get(destination).cloned()
  }

  fn registry_of(destination: &str) -> &str {
    let rest = destination
      .strip_prefix(PUSH_TRANSPORT)
      .and_then(|r| r.strip_prefix("://"))
      .unwrap_or(destination);
    rest.split('/').next().unwrap_or(rest)
  }

  fn fake_digest(reference: &str) -> String {
    let sum = reference
      .bytes()
      .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    format!("sha256:{:064x}", sum)
  }

  fn fake_platform(reference: &str) -> PlatformDescriptor {
    let stem = reference
      .rsplit('/')
      .next()
      .unwrap_or(reference)
      .trim_end_matches(".tar.gz");
    let architecture = stem.rsplit(':').next().unwrap_or(stem).to_string();
    PlatformDescriptor {
      architecture,
      os: "linux".to_string(),
      variant: None,
    }
  }
}

impl RegistryClient for FakeRegistry {
  async fn manifest_exists(&self, name: &str) -> Result<bool, ManifestCreationError> {
    let mut state = self.state();
    state.calls.push(ops::EXISTS);
    Ok(state.local.contains_key(name))
  }

  async fn create_manifest(
    &self,
    coordinate: &ImageCoordinate,
    archives: &ArchiveSet,
    metadata: &ManifestMetadata,
  ) -> Result<ManifestHandle, ManifestCreationError> {
    let mut state = self.state();
    state.calls.push(ops::CREATE);

    if archives.is_empty() {
      return Err(ManifestCreationError::NoArchives);
    }
    let name = coordinate.to_string();
    if state.local.contains_key(&name) {
      return Err(ManifestCreationError::AlreadyExists(name));
    }

    let references = archives.references();
    if let Some(bad) = references.iter().find(|r| self.invalid_archives.contains(*r)) {
      return Err(ManifestCreationError::InvalidArchive {
        reference: bad.clone(),
        reason: "not a valid image archive".to_string(),
      });
    }

    let annotations = metadata.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    state.local.insert(
      name.clone(),
      FakeManifest {
        references: references.clone(),
        annotations,
      },
    );

    Ok(ManifestHandle { name, references })
  }

  async fn inspect(&self, handle: &ManifestHandle) -> Result<ManifestDescription, InspectError> {
    let mut state = self.state();
    state.calls.push(ops::INSPECT);

    let manifest = state
      .local
      .get(&handle.name)
      .ok_or_else(|| InspectError::NotFound(handle.name.clone()))?;

    Ok(ManifestDescription {
      schema_version: 2,
      media_type: Some("application/vnd.oci.image.index.v1+json".to_string()),
      manifests: manifest
        .references
        .iter()
        .map(|r| ManifestEntry {
          media_type: "application/vnd.oci.image.manifest.v1+json".to_string(),
          digest: Self::fake_digest(r),
          size: 0,
          platform: Some(Self::fake_platform(r)),
        })
        .collect(),
      annotations: manifest.annotations.clone(),
    })
  }

  async fn login(&self, registry: &str, credentials: &Credentials) -> Result<(), AuthenticationError> {
    let mut state = self.state();
    state.calls.push(ops::LOGIN);

    let accepted = self
      .credentials
      .as_ref()
      .is_some_and(|(actor, token)| *actor == credentials.actor && token == credentials.token.expose());
    if !accepted {
      return Err(AuthenticationError::Rejected {
        registry: registry.to_string(),
        reason: "invalid username or password".to_string(),
      });
    }

    state.sessions.insert(registry.to_string());
    Ok(())
  }

  async fn push(&self, handle: &ManifestHandle, destination: &str) -> Result<PushResult, PushError> {
    let mut state = self.state();
    state.calls.push(ops::PUSH);

    if !state.sessions.contains(Self::registry_of(destination)) {
      return Err(PushError::Rejected {
        destination: destination.to_string(),
        reason: "authentication required".to_string(),
      });
    }
    let manifest = state
      .local
      .get(&handle.name)
      .cloned()
      .ok_or_else(|| PushError::Rejected {
        destination: destination.to_string(),
        reason: format!("manifest list '{}' not found", handle.name),
      })?;

    let digest = Self::fake_digest(&manifest.references.join(","));
    state.remote.insert(destination.to_string(), manifest);

    Ok(PushResult {
      destination: destination.to_string(),
      digest: Some(digest),
    })
  }

  async fn remove_manifest(&self, name: &str) -> Result<bool, RemoveError> {
    let mut state = self.state();
    state.calls.push(ops::REMOVE);
    Ok(state.local.remove(name).is_some())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::archive::{ArchiveRef, ArchiveTransport};
  use crate::config::RegistryToken;
  use crate::coordinate::build_image_coordinate;

  fn creds(token: &str) -> Credentials {
    Credentials {
      actor: "bot".to_string(),
      token: RegistryToken::new(token),
    }
  }

  #[test]
  fn registry_is_taken_from_destination() {
    assert_eq!(FakeRegistry::registry_of("docker://ghcr.io/org/app:main"), "ghcr.io");
    assert_eq!(FakeRegistry::registry_of("ghcr.io/org/app:main"), "ghcr.io");
  }

  #[test]
  fn platform_is_guessed_from_file_stem() {
    let platform = FakeRegistry::fake_platform("docker-archive:containers/arm64.tar.gz");
    assert_eq!(platform.architecture, "arm64");
  }

  #[tokio::test]
  async fn login_checks_credentials() {
    let registry = FakeRegistry::new().with_credentials("bot", "good");

    assert!(registry.login("ghcr.io", &creds("bad")).await.is_err());
    assert!(registry.login("ghcr.io", &creds("good")).await.is_ok());
  }

  #[tokio::test]
  async fn push_requires_session() {
    let registry = FakeRegistry::new().with_credentials("bot", "good");
    let coordinate = build_image_coordinate("org/app", "main").unwrap();
    let archives: ArchiveSet = [ArchiveRef::new(ArchiveTransport::DockerArchive, "a.tar.gz")]
      .into_iter()
      .collect();
    let handle = registry
      .create_manifest(&coordinate, &archives, &ManifestMetadata::default())
      .await
      .unwrap();

    let destination = coordinate.destination("ghcr.io");
    assert!(matches!(
      registry.push(&handle, &destination).await,
      Err(PushError::Rejected { .. })
    ));

    registry.login("ghcr.io", &creds("good")).await.unwrap();
    let result = registry.push(&handle, &destination).await.unwrap();
    assert!(result.digest.is_some());
    assert_eq!(
      registry.pushed(&destination).unwrap().references,
      vec!["docker-archive:a.tar.gz"]
    );
  }
}
