//! Arguments shared by commands that address a specific image coordinate.
//!
//! Every flag is optional: values left unset fall back to the environment
//! (`GITHUB_REPOSITORY`, `GITHUB_REF_NAME`, ...). The registry token can only
//! come from `GITHUB_TOKEN` so it never shows up in a process listing.

use std::path::PathBuf;

use clap::Args;

use imgpub_lib::{ArchiveTransport, ConfigInputs};

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
  /// Repository id, e.g. org/app [env: GITHUB_REPOSITORY]
  #[arg(long = "repo")]
  pub repo_id: Option<String>,

  /// Ref name used as the image tag [env: GITHUB_REF_NAME]
  #[arg(long = "ref")]
  pub ref_name: Option<String>,

  /// Commit hash recorded as the revision annotation [env: GITHUB_SHA]
  #[arg(long)]
  pub revision: Option<String>,

  /// Registry host [env: IMGPUB_REGISTRY, default: ghcr.io]
  #[arg(long)]
  pub registry: Option<String>,

  /// Registry user [env: GITHUB_ACTOR]
  #[arg(long)]
  pub actor: Option<String>,

  /// Container tool binary [env: IMGPUB_TOOL, default: buildah]
  #[arg(long)]
  pub tool: Option<String>,

  /// Directory holding the per-architecture archives
  #[arg(long = "archives")]
  pub archive_root: Option<PathBuf>,

  /// Transport prefix for archive references (docker-archive, oci-archive)
  #[arg(long)]
  pub transport: Option<ArchiveTransport>,

  /// Vendor annotation [env: IMGPUB_VENDOR]
  #[arg(long)]
  pub vendor: Option<String>,

  /// Title annotation [env: IMGPUB_TITLE, default: repository name]
  #[arg(long)]
  pub title: Option<String>,

  /// Project URL annotation [env: IMGPUB_URL, default: source URL]
  #[arg(long)]
  pub url: Option<String>,

  /// Run the tool through sudo regardless of the CI flag
  #[arg(long, conflicts_with = "no_elevate")]
  pub elevate: bool,

  /// Never run the tool through sudo
  #[arg(long)]
  pub no_elevate: bool,
}

impl TargetArgs {
  /// Environment values, overridden by whatever was given on the command line.
  pub fn into_inputs(self) -> ConfigInputs {
    let mut inputs = ConfigInputs::from_env();

    fn set<T>(slot: &mut Option<T>, value: Option<T>) {
      if value.is_some() {
        *slot = value;
      }
    }

    set(&mut inputs.repo_id, self.repo_id);
    set(&mut inputs.ref_name, self.ref_name);
    set(&mut inputs.revision, self.revision);
    set(&mut inputs.registry, self.registry);
    set(&mut inputs.actor, self.actor);
    set(&mut inputs.tool, self.tool);
    set(&mut inputs.archive_root, self.archive_root);
    set(&mut inputs.vendor, self.vendor);
    set(&mut inputs.title, self.title);
    set(&mut inputs.url, self.url);

    if let Some(transport) = self.transport {
      inputs.transport = transport;
    }
    inputs.elevate = match (self.elevate, self.no_elevate) {
      (true, _) => Some(true),
      (_, true) => Some(false),
      _ => None,
    };

    inputs
  }
}
