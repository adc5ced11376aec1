//! Publisher configuration.
//!
//! Everything the publisher reads from its surroundings is collected into a
//! [`PublishConfig`] once, up front. Process-global state (environment
//! variables, whether we are running in CI, whether the tool must run under
//! `sudo`) is resolved here and never consulted again later.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::archive::ArchiveTransport;
use crate::consts::{DEFAULT_ARCHIVE_ROOT, DEFAULT_REGISTRY, DEFAULT_SERVER_URL, DEFAULT_TOOL, DEFAULT_VENDOR};
use crate::metadata::{MetadataError, Provenance, creation_timestamp, source_url};
use crate::platform;

pub mod env {
  pub const REPOSITORY: &str = "GITHUB_REPOSITORY";
  pub const REF_NAME: &str = "GITHUB_REF_NAME";
  pub const ACTOR: &str = "GITHUB_ACTOR";
  pub const TOKEN: &str = "GITHUB_TOKEN";
  pub const SHA: &str = "GITHUB_SHA";
  pub const SERVER_URL: &str = "GITHUB_SERVER_URL";
  pub const CI: &str = "CI";
  pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";
  pub const REGISTRY: &str = "IMGPUB_REGISTRY";
  pub const TOOL: &str = "IMGPUB_TOOL";
  pub const VENDOR: &str = "IMGPUB_VENDOR";
  pub const TITLE: &str = "IMGPUB_TITLE";
  pub const URL: &str = "IMGPUB_URL";
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("missing required setting: {0}")]
  Missing(&'static str),

  #[error(transparent)]
  Metadata(#[from] MetadataError),
}

/// Registry password or token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryToken(String);

impl RegistryToken {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for RegistryToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("RegistryToken(***)")
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub actor: String,
  pub token: RegistryToken,
}

/// Raw, unvalidated settings. Filled from the environment or from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
  pub repo_id: Option<String>,
  pub ref_name: Option<String>,
  pub ci: Option<String>,
  pub registry: Option<String>,
  pub actor: Option<String>,
  pub token: Option<String>,
  pub revision: Option<String>,
  pub server_url: Option<String>,
  pub source_date_epoch: Option<String>,
  pub vendor: Option<String>,
  pub title: Option<String>,
  pub url: Option<String>,
  pub tool: Option<String>,
  pub archive_root: Option<PathBuf>,
  pub transport: ArchiveTransport,
  /// Forces elevation on or off instead of deriving it from the CI flag.
  pub elevate: Option<bool>,
}

impl ConfigInputs {
  pub fn from_env() -> Self {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    Self {
      repo_id: var(env::REPOSITORY),
      ref_name: var(env::REF_NAME),
      ci: var(env::CI),
      registry: var(env::REGISTRY),
      actor: var(env::ACTOR),
      token: var(env::TOKEN),
      revision: var(env::SHA),
      server_url: var(env::SERVER_URL),
      source_date_epoch: var(env::SOURCE_DATE_EPOCH),
      vendor: var(env::VENDOR),
      title: var(env::TITLE),
      url: var(env::URL),
      tool: var(env::TOOL),
      archive_root: None,
      transport: ArchiveTransport::default(),
      elevate: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct PublishConfig {
  pub repo_id: String,
  pub ref_name: String,
  pub is_ci: bool,
  pub registry_host: String,
  pub credentials: Option<Credentials>,
  pub elevate_privileges: bool,
  pub archive_root: PathBuf,
  pub transport: ArchiveTransport,
  pub tool: String,
  pub provenance: Provenance,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
  value
    .filter(|v| !v.trim().is_empty())
    .ok_or(ConfigError::Missing(name))
}

/// Elevation is needed in CI (where the tool's store is root-owned) unless we
/// already are root.
pub fn resolve_elevation(is_ci: bool, already_root: bool, forced: Option<bool>) -> bool {
  forced.unwrap_or(is_ci && !already_root)
}

impl PublishConfig {
  /// Validate inputs into a configuration.
  ///
  /// Credentials are only demanded when `require_credentials` is set, so local
  /// runs that stop before pushing need not provide a token.
  pub fn resolve(inputs: ConfigInputs, require_credentials: bool) -> Result<Self, ConfigError> {
    let repo_id = required(inputs.repo_id, env::REPOSITORY)?;
    let ref_name = required(inputs.ref_name, env::REF_NAME)?;
    let revision = required(inputs.revision, env::SHA)?;

    let credentials = match (inputs.actor, inputs.token) {
      (Some(actor), Some(token)) if !actor.trim().is_empty() && !token.is_empty() => Some(Credentials {
        actor,
        token: RegistryToken::new(token),
      }),
      (actor, _) if require_credentials => {
        return Err(ConfigError::Missing(if actor.is_none_or(|a| a.trim().is_empty()) {
          env::ACTOR
        } else {
          env::TOKEN
        }));
      }
      _ => None,
    };

    let is_ci = platform::is_ci_value(inputs.ci.as_deref());
    let elevate_privileges = resolve_elevation(is_ci, platform::is_elevated(), inputs.elevate);

    let server_url = inputs.server_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let source = source_url(&server_url, &repo_id);
    let title = inputs
      .title
      .unwrap_or_else(|| repo_id.rsplit('/').next().unwrap_or(&repo_id).to_string());

    let provenance = Provenance {
      vendor: inputs.vendor.unwrap_or_else(|| DEFAULT_VENDOR.to_string()),
      title,
      created: creation_timestamp(inputs.source_date_epoch.as_deref())?,
      revision,
      url: inputs.url.unwrap_or_else(|| source.clone()),
      source,
    };

    let config = Self {
      repo_id,
      ref_name,
      is_ci,
      registry_host: inputs.registry.unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
      credentials,
      elevate_privileges,
      archive_root: inputs
        .archive_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_ROOT)),
      transport: inputs.transport,
      tool: inputs.tool.unwrap_or_else(|| DEFAULT_TOOL.to_string()),
      provenance,
    };

    debug!(
      repo = %config.repo_id,
      ref_name = %config.ref_name,
      ci = config.is_ci,
      elevate = config.elevate_privileges,
      registry = %config.registry_host,
      "resolved configuration"
    );

    Ok(config)
  }
}
