//! imgpub-lib: assembling and publishing multi-architecture manifest lists.
//!
//! - `archive`: discovering per-architecture image archives on disk
//! - `coordinate`: the `repository:tag` an image list is published under
//! - `metadata`: OCI provenance annotations
//! - `config`: explicit configuration resolved from the environment
//! - `client`: the registry client seam (process-backed and in-memory)
//! - `publish`: the publisher sequencing all of the above

pub mod archive;
pub mod client;
pub mod config;
pub mod consts;
pub mod coordinate;
pub mod metadata;
pub mod platform;
pub mod publish;

pub use archive::{ArchiveRef, ArchiveSet, ArchiveTransport, DiscoveryError, discover_archives};
pub use client::RegistryClient;
pub use config::{ConfigInputs, PublishConfig};
pub use coordinate::{ImageCoordinate, build_image_coordinate};
pub use metadata::ManifestMetadata;
pub use publish::{PublishError, PublishOptions, PublishReport, Publisher};
