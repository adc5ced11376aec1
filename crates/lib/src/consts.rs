pub const APP_NAME: &str = "imgpub";

/// Directory searched for per-architecture image archives when none is given.
pub const DEFAULT_ARCHIVE_ROOT: &str = "containers";

/// File name suffix identifying an image archive.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

pub const DEFAULT_REGISTRY: &str = "ghcr.io";
pub const DEFAULT_TOOL: &str = "buildah";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_VENDOR: &str = APP_NAME;

/// Transport used for the push destination.
pub const PUSH_TRANSPORT: &str = "docker";

/// Manifest format requested when pushing.
pub const PUSH_FORMAT: &str = "oci";

pub mod annotations {
  pub const VENDOR: &str = "org.opencontainers.image.vendor";
  pub const TITLE: &str = "org.opencontainers.image.title";
  pub const CREATED: &str = "org.opencontainers.image.created";
  pub const REVISION: &str = "org.opencontainers.image.revision";
  pub const SOURCE: &str = "org.opencontainers.image.source";
  pub const URL: &str = "org.opencontainers.image.url";
}
