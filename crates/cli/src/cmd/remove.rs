//! Implementation of the `imgpub remove` command.
//!
//! `publish` refuses to overwrite a manifest list that already exists for its
//! coordinate. This is the explicit way to clear one out before re-running.

use anyhow::{Context, Result, anyhow};

use imgpub_lib::RegistryClient;
use imgpub_lib::build_image_coordinate;
use imgpub_lib::client::process::ProcessClient;
use imgpub_lib::config::{env, resolve_elevation};
use imgpub_lib::consts::DEFAULT_TOOL;
use imgpub_lib::platform;

use crate::args::TargetArgs;
use crate::output::{OutputFormat, print_info, print_json, print_success};

pub fn cmd_remove(target: TargetArgs, output: OutputFormat) -> Result<()> {
  let inputs = target.into_inputs();

  let repo_id = inputs
    .repo_id
    .ok_or_else(|| anyhow!("missing required setting: {}", env::REPOSITORY))?;
  let ref_name = inputs
    .ref_name
    .ok_or_else(|| anyhow!("missing required setting: {}", env::REF_NAME))?;
  let coordinate = build_image_coordinate(&repo_id, &ref_name).context("Invalid image coordinate")?;

  let is_ci = platform::is_ci_value(inputs.ci.as_deref());
  let elevate = resolve_elevation(is_ci, platform::is_elevated(), inputs.elevate);
  let client = ProcessClient::new(inputs.tool.as_deref().unwrap_or(DEFAULT_TOOL), elevate);

  let name = coordinate.to_string();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let removed = rt
    .block_on(client.remove_manifest(&name))
    .with_context(|| format!("Failed to remove manifest list {}", name))?;

  if output.is_json() {
    return print_json(&serde_json::json!({ "coordinate": name, "removed": removed }));
  }

  if removed {
    print_success(&format!("Removed manifest list {}", name));
  } else {
    print_info(&format!("No manifest list named {}", name));
  }

  Ok(())
}
