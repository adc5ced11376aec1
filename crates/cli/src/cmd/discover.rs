use std::path::Path;

use anyhow::{Context, Result};

use imgpub_lib::{ArchiveTransport, discover_archives};

use crate::output::{OutputFormat, print_info, print_item, print_json, print_warning};

pub fn cmd_discover(root: &Path, transport: ArchiveTransport, output: OutputFormat) -> Result<()> {
  let archives = discover_archives(root, transport)
    .with_context(|| format!("Failed to discover archives under {}", root.display()))?;

  if output.is_json() {
    return print_json(&archives.references());
  }

  if archives.is_empty() {
    print_warning(&format!("No archives found under {}", root.display()));
    return Ok(());
  }

  print_info(&format!("{} archive(s) under {}", archives.len(), root.display()));
  for archive in &archives {
    print_item(&archive.reference());
  }

  Ok(())
}
