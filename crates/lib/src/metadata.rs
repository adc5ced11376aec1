//! Provenance annotations attached to the manifest list.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::consts::annotations;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
  #[error("annotation '{0}' has an empty value")]
  EmptyValue(&'static str),

  #[error("SOURCE_DATE_EPOCH '{0}' is not a valid unix timestamp")]
  InvalidEpoch(String),
}

/// Values the annotations are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
  pub vendor: String,
  pub title: String,
  pub created: String,
  pub revision: String,
  pub source: String,
  pub url: String,
}

/// Ordered annotation map passed to manifest creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestMetadata(BTreeMap<String, String>);

impl ManifestMetadata {
  pub fn from_provenance(provenance: &Provenance) -> Result<Self, MetadataError> {
    let entries = [
      (annotations::VENDOR, &provenance.vendor),
      (annotations::TITLE, &provenance.title),
      (annotations::CREATED, &provenance.created),
      (annotations::REVISION, &provenance.revision),
      (annotations::SOURCE, &provenance.source),
      (annotations::URL, &provenance.url),
    ];

    let mut map = BTreeMap::new();
    for (key, value) in entries {
      if value.trim().is_empty() {
        return Err(MetadataError::EmptyValue(key));
      }
      map.insert(key.to_string(), value.clone());
    }
    Ok(Self(map))
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// `key=value` pairs in the form the container tool's `--annotation` expects.
  pub fn annotation_args(&self) -> Vec<String> {
    self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
  }
}

/// RFC 3339 creation timestamp.
///
/// Honours `SOURCE_DATE_EPOCH` when given so reproducible builds produce
/// identical annotations; otherwise uses the current time.
pub fn creation_timestamp(source_date_epoch: Option<&str>) -> Result<String, MetadataError> {
  let time = match source_date_epoch {
    Some(raw) => {
      let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| MetadataError::InvalidEpoch(raw.to_string()))?;
      DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| MetadataError::InvalidEpoch(raw.to_string()))?
    }
    None => Utc::now(),
  };
  Ok(time.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Repository URL on the source-control server, e.g. `https://github.com/org/app`.
pub fn source_url(server_url: &str, repo_id: &str) -> String {
  format!("{}/{}", server_url.trim_end_matches('/'), repo_id)
}
