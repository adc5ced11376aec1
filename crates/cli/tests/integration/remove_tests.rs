use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn remove_existing_manifest() {
  let env = TestEnv::with_archives(&[]);

  env
    .imgpub_cmd()
    .env("IMGPUB_FAKE_EXISTING", "1")
    .arg("remove")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed manifest list org/app:v1.2.3"));

  assert_eq!(env.tool_log(), vec!["manifest rm org/app:v1.2.3"]);
}

#[test]
fn remove_missing_manifest_is_not_an_error() {
  let env = TestEnv::with_archives(&[]);

  env
    .imgpub_cmd()
    .arg("remove")
    .assert()
    .success()
    .stdout(predicate::str::contains("No manifest list named org/app:v1.2.3"));
}

#[test]
fn remove_does_not_need_credentials_or_revision() {
  let env = TestEnv::with_archives(&[]);

  env
    .imgpub_cmd()
    .env_remove("GITHUB_TOKEN")
    .env_remove("GITHUB_SHA")
    .env("IMGPUB_FAKE_EXISTING", "1")
    .args(["-o", "json", "remove"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"removed\": true"));
}
