//! [`RegistryClient`] backed by a buildah/podman-compatible command-line tool.

use std::sync::Mutex;

use tracing::{debug, info};

use super::command::{self, CommandError, Invocation};
use super::{
  AuthenticationError, InspectError, ManifestCreationError, ManifestDescription, ManifestHandle, PushError, PushResult,
  RegistryClient, RemoveError,
};
use crate::archive::ArchiveSet;
use crate::config::{Credentials, PublishConfig};
use crate::consts::PUSH_FORMAT;
use crate::coordinate::ImageCoordinate;
use crate::metadata::ManifestMetadata;

/// Drives the container tool as child processes.
///
/// In dry-run mode nothing is executed; every invocation is recorded and can
/// be read back with [`planned`](Self::planned).
#[derive(Debug)]
pub struct ProcessClient {
  tool: String,
  elevate: bool,
  dry_run: bool,
  planned: Mutex<Vec<String>>,
}

impl ProcessClient {
  pub fn new(tool: impl Into<String>, elevate: bool) -> Self {
    Self {
      tool: tool.into(),
      elevate,
      dry_run: false,
      planned: Mutex::new(Vec::new()),
    }
  }

  pub fn from_config(config: &PublishConfig) -> Self {
    Self::new(config.tool.clone(), config.elevate_privileges)
  }

  pub fn dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  /// Invocations recorded in dry-run mode, in order.
  pub fn planned(&self) -> Vec<String> {
    self.planned.lock().map(|p| p.clone()).unwrap_or_default()
  }

  fn invocation<I, S>(&self, args: I) -> Invocation
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Invocation::new(&self.tool, self.elevate, args.into_iter().map(Into::into).collect())
  }

  fn record(&self, invocation: &Invocation, stdin: Option<&str>) {
    let mut line = invocation.to_string();
    if stdin.is_some() {
      line.push_str(" < (stdin)");
    }
    info!(command = %line, "dry run: not executing");
    if let Ok(mut planned) = self.planned.lock() {
      planned.push(line);
    }
  }

  async fn run_checked(&self, invocation: &Invocation, stdin: Option<&str>) -> Result<String, CommandError> {
    if self.dry_run {
      self.record(invocation, stdin);
      return Ok(String::new());
    }
    command::run_checked(invocation, stdin).await
  }

  pub fn create_args(name: &str, archives: &ArchiveSet, metadata: &ManifestMetadata) -> Vec<String> {
    let mut args = vec!["manifest".to_string(), "create".to_string(), "--all".to_string()];
    for annotation in metadata.annotation_args() {
      args.push("--annotation".to_string());
      args.push(annotation);
    }
    args.push(name.to_string());
    args.extend(archives.references());
    args
  }

  pub fn push_args(name: &str, destination: &str, digest_file: Option<&str>) -> Vec<String> {
    let mut args = vec![
      "manifest".to_string(),
      "push".to_string(),
      "--all".to_string(),
      "--format".to_string(),
      PUSH_FORMAT.to_string(),
    ];
    if let Some(file) = digest_file {
      args.push("--digestfile".to_string());
      args.push(file.to_string());
    }
    args.push(name.to_string());
    args.push(destination.to_string());
    args
  }
}

impl RegistryClient for ProcessClient {
  async fn manifest_exists(&self, name: &str) -> Result<bool, ManifestCreationError> {
    let invocation = self.invocation(["manifest", "exists", name]);
    if self.dry_run {
      self.record(&invocation, None);
      return Ok(false);
    }

    let output = command::run(&invocation, None).await?;
    match output.code {
      Some(0) => Ok(true),
      Some(1) => Ok(false),
      code => Err(ManifestCreationError::Tool(CommandError::Failed {
        command: invocation.to_string(),
        code,
        stderr: output.stderr,
      })),
    }
  }

  async fn create_manifest(
    &self,
    coordinate: &ImageCoordinate,
    archives: &ArchiveSet,
    metadata: &ManifestMetadata,
  ) -> Result<ManifestHandle, ManifestCreationError> {
    if archives.is_empty() {
      return Err(ManifestCreationError::NoArchives);
    }

    let name = coordinate.to_string();
    let invocation = self.invocation(Self::create_args(&name, archives, metadata));
    let id = self.run_checked(&invocation, None).await?;
    debug!(name = %name, id = %id, "manifest list created");

    Ok(ManifestHandle {
      name,
      references: archives.references(),
    })
  }

  async fn inspect(&self, handle: &ManifestHandle) -> Result<ManifestDescription, InspectError> {
    let invocation = self.invocation(["manifest", "inspect", handle.name.as_str()]);
    let raw = self.run_checked(&invocation, None).await?;
    if self.dry_run {
      return Ok(ManifestDescription::default());
    }
    Ok(ManifestDescription::parse(&raw)?)
  }

  async fn login(&self, registry: &str, credentials: &Credentials) -> Result<(), AuthenticationError> {
    let invocation = self.invocation([
      "login",
      "--username",
      credentials.actor.as_str(),
      "--password-stdin",
      registry,
    ]);
    self.run_checked(&invocation, Some(credentials.token.expose())).await?;
    Ok(())
  }

  async fn push(&self, handle: &ManifestHandle, destination: &str) -> Result<PushResult, PushError> {
    if self.dry_run {
      let invocation = self.invocation(Self::push_args(&handle.name, destination, None));
      self.run_checked(&invocation, None).await?;
      return Ok(PushResult {
        destination: destination.to_string(),
        digest: None,
      });
    }

    let digest_file = tempfile::NamedTempFile::new().map_err(PushError::Digest)?;
    let digest_path = digest_file.path().to_string_lossy().to_string();
    let invocation = self.invocation(Self::push_args(&handle.name, destination, Some(&digest_path)));
    self.run_checked(&invocation, None).await?;

    let digest = tokio::fs::read_to_string(digest_file.path())
      .await
      .map_err(PushError::Digest)?
      .trim()
      .to_string();

    Ok(PushResult {
      destination: destination.to_string(),
      digest: (!digest.is_empty()).then_some(digest),
    })
  }

  async fn remove_manifest(&self, name: &str) -> Result<bool, RemoveError> {
    let invocation = self.invocation(["manifest", "rm", name]);
    if self.dry_run {
      self.record(&invocation, None);
      return Ok(true);
    }

    let output = command::run(&invocation, None).await?;
    if output.success() {
      return Ok(true);
    }
    if output.stderr.contains("not known") || output.stderr.contains("not found") {
      debug!(name = %name, "no manifest list to remove");
      return Ok(false);
    }
    Err(RemoveError::Tool(CommandError::Failed {
      command: invocation.to_string(),
      code: output.code,
      stderr: output.stderr,
    }))
  }
}
