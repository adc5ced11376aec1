//! Image coordinates: `repository:tag`, optionally qualified by a registry host.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::consts::PUSH_TRANSPORT;

const MAX_TAG_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
  #[error("repository id is empty")]
  EmptyRepository,

  #[error("ref name is empty")]
  EmptyRef,

  #[error("{field} contains whitespace: '{value}'")]
  Whitespace { field: &'static str, value: String },

  #[error("{field} contains reserved delimiter '{delimiter}': '{value}'")]
  Delimiter {
    field: &'static str,
    delimiter: char,
    value: String,
  },

  #[error("invalid repository path component '{component}' in '{value}'")]
  InvalidRepository { component: String, value: String },

  #[error("ref name '{0}' is not a valid image tag")]
  InvalidTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageCoordinate {
  pub repository: String,
  pub tag: String,
}

impl ImageCoordinate {
  /// Registry-qualified form, e.g. `ghcr.io/org/app:v1`.
  pub fn qualified(&self, registry: &str) -> String {
    format!("{}/{}", registry.trim_end_matches('/'), self)
  }

  /// Push destination including the transport, e.g. `docker://ghcr.io/org/app:v1`.
  pub fn destination(&self, registry: &str) -> String {
    format!("{}://{}", PUSH_TRANSPORT, self.qualified(registry))
  }
}

impl fmt::Display for ImageCoordinate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.repository, self.tag)
  }
}

fn check_common(field: &'static str, value: &str) -> Result<(), CoordinateError> {
  if value.chars().any(char::is_whitespace) {
    return Err(CoordinateError::Whitespace {
      field,
      value: value.to_string(),
    });
  }
  for delimiter in [':', '@'] {
    if value.contains(delimiter) {
      return Err(CoordinateError::Delimiter {
        field,
        delimiter,
        value: value.to_string(),
      });
    }
  }
  Ok(())
}

// [a-z0-9]+([._-][a-z0-9]+)*
fn is_valid_component(component: &str) -> bool {
  let mut prev_separator = true;
  for c in component.chars() {
    let separator = matches!(c, '.' | '_' | '-');
    if separator {
      if prev_separator {
        return false;
      }
    } else if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
      return false;
    }
    prev_separator = separator;
  }
  !prev_separator
}

// [A-Za-z0-9_][A-Za-z0-9_.-]{0,127}
fn is_valid_tag(tag: &str) -> bool {
  let mut chars = tag.chars();
  let Some(first) = chars.next() else {
    return false;
  };
  tag.len() <= MAX_TAG_LEN
    && (first.is_ascii_alphanumeric() || first == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Build the coordinate `repo_id:ref_name`.
///
/// The repository id is lowercased since registries only accept lowercase
/// repository names; the ref name is used verbatim as the tag.
pub fn build_image_coordinate(repo_id: &str, ref_name: &str) -> Result<ImageCoordinate, CoordinateError> {
  if repo_id.is_empty() {
    return Err(CoordinateError::EmptyRepository);
  }
  if ref_name.is_empty() {
    return Err(CoordinateError::EmptyRef);
  }
  check_common("repository id", repo_id)?;
  check_common("ref name", ref_name)?;

  let repository = repo_id.to_ascii_lowercase();
  if let Some(component) = repository.split('/').find(|c| !is_valid_component(c)) {
    return Err(CoordinateError::InvalidRepository {
      component: component.to_string(),
      value: repo_id.to_string(),
    });
  }

  if !is_valid_tag(ref_name) {
    return Err(CoordinateError::InvalidTag(ref_name.to_string()));
  }

  Ok(ImageCoordinate {
    repository,
    tag: ref_name.to_string(),
  })
}
