//! Shared test helpers for CLI integration tests.
//!
//! Tests run the real `imgpub` binary against a fake container tool: a small
//! shell script that records its arguments and imitates the tool's exit codes.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const TOKEN: &str = "s3cret-token";

const FAKE_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$IMGPUB_FAKE_LOG"
case "$1 $2" in
  "manifest exists")
    [ -n "$IMGPUB_FAKE_EXISTING" ] && exit 0
    exit 1
    ;;
  "manifest create")
    echo "sha256:1111111111111111111111111111111111111111111111111111111111111111"
    exit 0
    ;;
  "manifest inspect")
    printf '%s' '{"schemaVersion":2,"mediaType":"application/vnd.oci.image.index.v1+json","manifests":[{"digest":"sha256:aa","platform":{"architecture":"amd64","os":"linux"}},{"digest":"sha256:bb","platform":{"architecture":"arm64","os":"linux"}}]}'
    exit 0
    ;;
  "manifest push")
    while [ $# -gt 0 ]; do
      if [ "$1" = "--digestfile" ]; then
        printf '%s' "sha256:2222222222222222222222222222222222222222222222222222222222222222" > "$2"
      fi
      shift
    done
    exit 0
    ;;
  "manifest rm")
    [ -n "$IMGPUB_FAKE_EXISTING" ] && exit 0
    echo "Error: $3: image not known" >&2
    exit 1
    ;;
esac
if [ "$1" = "login" ]; then
  read -r password
  if [ "$password" != "$IMGPUB_FAKE_TOKEN" ]; then
    echo "Error: logging into registry: invalid username/password" >&2
    exit 1
  fi
  echo "Login Succeeded!"
  exit 0
fi
echo "unexpected invocation: $*" >&2
exit 125
"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory with an archive root, a fake
/// tool and a log of every tool invocation.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an environment whose archive root holds the given archives.
  pub fn with_archives(names: &[&str]) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("containers")).unwrap();
    let env = Self { temp };
    for name in names {
      env.write_file(&format!("containers/{}", name), "archive");
    }
    env.install_tool();
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  fn install_tool(&self) {
    use std::os::unix::fs::PermissionsExt;

    let path = self.tool_path();
    std::fs::write(&path, FAKE_TOOL).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn tool_path(&self) -> PathBuf {
    self.temp.path().join("fake-buildah")
  }

  pub fn archive_root(&self) -> PathBuf {
    self.temp.path().join("containers")
  }

  pub fn log_path(&self) -> PathBuf {
    self.temp.path().join("tool.log")
  }

  /// Every recorded tool invocation, one per line.
  pub fn tool_log(&self) -> Vec<String> {
    std::fs::read_to_string(self.log_path())
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Get a pre-configured Command for the imgpub binary.
  ///
  /// Starts from an empty environment and sets what a CI job would provide:
  /// - `GITHUB_REPOSITORY`, `GITHUB_REF_NAME`, `GITHUB_SHA`
  /// - `GITHUB_ACTOR`, `GITHUB_TOKEN`
  /// - `IMGPUB_TOOL` pointing at the fake tool
  /// - `SOURCE_DATE_EPOCH` for a stable creation annotation
  pub fn imgpub_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("imgpub");
    cmd.env_clear();
    cmd.env("GITHUB_REPOSITORY", "org/app");
    cmd.env("GITHUB_REF_NAME", "v1.2.3");
    cmd.env("GITHUB_SHA", "0123456789abcdef");
    cmd.env("GITHUB_ACTOR", "bot");
    cmd.env("GITHUB_TOKEN", TOKEN);
    cmd.env("SOURCE_DATE_EPOCH", "315532800");
    cmd.env("IMGPUB_TOOL", self.tool_path());
    cmd.env("IMGPUB_FAKE_LOG", self.log_path());
    cmd.env("IMGPUB_FAKE_TOKEN", TOKEN);
    cmd
  }
}
