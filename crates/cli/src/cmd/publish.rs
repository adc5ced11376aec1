//! Implementation of the `imgpub publish` command.
//!
//! Discovers archives, creates the manifest list, inspects it, logs in and
//! pushes. With `--dry-run` the container tool is never executed and the
//! planned invocations are printed instead.

use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use imgpub_lib::client::process::ProcessClient;
use imgpub_lib::{PublishConfig, PublishOptions, PublishReport, Publisher};

use crate::args::TargetArgs;
use crate::output::{
  OutputFormat, format_duration, print_info, print_item, print_json, print_stat, print_success, short_digest,
};

#[derive(Serialize)]
struct PublishOutput<'a> {
  #[serde(flatten)]
  report: &'a PublishReport,
  dry_run: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  planned: Vec<String>,
  duration_ms: u128,
}

pub fn cmd_publish(target: TargetArgs, dry_run: bool, skip_push: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let inputs = target.into_inputs();
  let config = PublishConfig::resolve(inputs, !(skip_push || dry_run)).context("Invalid configuration")?;

  // A dry run without credentials still shows everything up to the push.
  let skip_push = skip_push || config.credentials.is_none();

  let client = ProcessClient::from_config(&config).dry_run(dry_run);
  let publisher = Publisher::new(config, client).with_options(PublishOptions { skip_push });

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(publisher.run()).context("Publish failed")?;
  let planned = publisher.client().planned();

  if output.is_json() {
    return print_json(&PublishOutput {
      report: &report,
      dry_run,
      planned,
      duration_ms: start.elapsed().as_millis(),
    });
  }

  println!();
  if dry_run {
    print_info("Dry run - no commands executed");
    for line in &planned {
      print_item(line);
    }
    println!();
  } else if let Some(push) = &report.push {
    print_success(&format!("Published {}", push.destination));
  } else {
    print_success(&format!("Created manifest list {}", report.manifest.name));
  }

  print_stat("Coordinate", &report.coordinate.to_string());
  print_stat("Archives", &report.archives.len().to_string());
  for archive in &report.archives {
    print_item(&archive.to_string());
  }
  let platforms = report.description.platforms();
  if !platforms.is_empty() {
    print_stat("Platforms", &platforms.join(", "));
  }
  if let Some(digest) = report.push.as_ref().and_then(|p| p.digest.as_deref()) {
    print_stat("Digest", short_digest(digest));
  }
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
