use predicates::prelude::*;

use super::common::{TOKEN, TestEnv};

#[test]
fn publish_two_architectures() {
  let env = TestEnv::with_archives(&["amd64.tar.gz", "arm64.tar.gz"]);

  env
    .imgpub_cmd()
    .current_dir(env.temp.path())
    .arg("publish")
    .assert()
    .success()
    .stdout(predicate::str::contains("Published docker://ghcr.io/org/app:v1.2.3"))
    .stdout(predicate::str::contains("Archives: 2"))
    .stdout(predicate::str::contains("linux/amd64, linux/arm64"))
    .stdout(predicate::str::contains("sha256:222222222222"));

  let log = env.tool_log();
  let ops: Vec<_> = log
    .iter()
    .map(|line| line.split_whitespace().take(2).collect::<Vec<_>>().join(" "))
    .collect();
  assert_eq!(
    ops,
    vec![
      "manifest exists",
      "manifest create",
      "manifest inspect",
      "login --username",
      "manifest push",
    ]
  );

  let create = &log[1];
  assert!(create.contains("--all"));
  assert!(create.contains("--annotation org.opencontainers.image.revision=0123456789abcdef"));
  assert!(create.contains("--annotation org.opencontainers.image.created=1980-01-01T00:00:00Z"));
  assert!(create.contains("--annotation org.opencontainers.image.source=https://github.com/org/app"));
  assert!(create.contains("org/app:v1.2.3 docker-archive:"));
  assert_eq!(create.matches("docker-archive:").count(), 2);

  assert_eq!(log[3], "login --username bot --password-stdin ghcr.io");
  assert!(log[4].contains("--all --format oci"));
  assert!(log[4].ends_with("org/app:v1.2.3 docker://ghcr.io/org/app:v1.2.3"));
}

#[test]
fn token_never_reaches_arguments_or_output() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  env
    .imgpub_cmd()
    .args(["--verbose", "publish", "--archives"])
    .arg(env.archive_root())
    .assert()
    .success()
    .stdout(predicate::str::contains(TOKEN).not())
    .stderr(predicate::str::contains(TOKEN).not());

  assert!(env.tool_log().iter().all(|line| !line.contains(TOKEN)));
}

#[test]
fn bad_credentials_prevent_push() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  env
    .imgpub_cmd()
    .env("GITHUB_TOKEN", "wrong")
    .args(["publish", "--archives"])
    .arg(env.archive_root())
    .assert()
    .failure()
    .stderr(predicate::str::contains("registry authentication failed"))
    .stderr(predicate::str::contains("invalid username/password"));

  let log = env.tool_log();
  assert!(log.last().unwrap().starts_with("login"));
  assert!(log.iter().all(|line| !line.starts_with("manifest push")));
}

#[test]
fn empty_archive_root_fails_before_create() {
  let env = TestEnv::with_archives(&[]);

  env
    .imgpub_cmd()
    .args(["publish", "--archives"])
    .arg(env.archive_root())
    .assert()
    .failure()
    .stderr(predicate::str::contains("refusing to create an empty manifest list"));

  assert!(env.tool_log().is_empty());
}

#[test]
fn existing_manifest_fails() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  env
    .imgpub_cmd()
    .env("IMGPUB_FAKE_EXISTING", "1")
    .args(["publish", "--archives"])
    .arg(env.archive_root())
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists locally"));

  assert_eq!(env.tool_log().len(), 1);
}

#[test]
fn missing_archive_root_fails() {
  let env = TestEnv::with_archives(&[]);

  env
    .imgpub_cmd()
    .args(["publish", "--archives"])
    .arg(env.temp.path().join("nope"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("archive discovery failed"));
}

#[test]
fn skip_push_does_not_need_credentials() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  env
    .imgpub_cmd()
    .env_remove("GITHUB_TOKEN")
    .env_remove("GITHUB_ACTOR")
    .args(["publish", "--skip-push", "--archives"])
    .arg(env.archive_root())
    .assert()
    .success()
    .stdout(predicate::str::contains("Created manifest list org/app:v1.2.3"));

  assert_eq!(env.tool_log().len(), 3);
}

#[test]
fn dry_run_executes_nothing() {
  let env = TestEnv::with_archives(&["amd64.tar.gz", "arm64.tar.gz"]);

  env
    .imgpub_cmd()
    .args(["publish", "--dry-run", "--no-elevate", "--archives"])
    .arg(env.archive_root())
    .assert()
    .success()
    .stdout(predicate::str::contains("Dry run"))
    .stdout(predicate::str::contains("manifest create --all"))
    .stdout(predicate::str::contains("login --username bot --password-stdin ghcr.io"))
    .stdout(predicate::str::contains(TOKEN).not());

  assert!(env.tool_log().is_empty());
}

#[test]
fn cli_flags_override_environment() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  env
    .imgpub_cmd()
    .args([
      "publish",
      "--repo",
      "Other/Thing",
      "--ref",
      "main",
      "--registry",
      "registry.example.com",
      "--transport",
      "oci-archive",
      "--archives",
    ])
    .arg(env.archive_root())
    .assert()
    .success()
    .stdout(predicate::str::contains("Published docker://registry.example.com/other/thing:main"));

  let log = env.tool_log();
  assert!(log[1].contains("other/thing:main oci-archive:"));
  assert_eq!(log[3], "login --username bot --password-stdin registry.example.com");
}

#[test]
fn json_report() {
  let env = TestEnv::with_archives(&["amd64.tar.gz"]);

  let output = env
    .imgpub_cmd()
    .args(["-o", "json", "publish", "--archives"])
    .arg(env.archive_root())
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["coordinate"]["repository"], "org/app");
  assert_eq!(report["coordinate"]["tag"], "v1.2.3");
  assert_eq!(report["manifest"]["name"], "org/app:v1.2.3");
  assert_eq!(report["push"]["destination"], "docker://ghcr.io/org/app:v1.2.3");
  assert_eq!(
    report["metadata"]["org.opencontainers.image.title"],
    "app"
  );
  assert_eq!(report["dry_run"], false);
}
