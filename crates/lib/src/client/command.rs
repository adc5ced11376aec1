//! Running the container tool as a child process.

use std::fmt;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write to stdin of '{program}': {source}")]
  Stdin {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {command}\n{stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// A fully resolved tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
}

impl Invocation {
  /// `tool args...`, wrapped in `sudo` when `elevate` is set.
  pub fn new(tool: &str, elevate: bool, args: Vec<String>) -> Self {
    if elevate {
      let mut full = Vec::with_capacity(args.len() + 1);
      full.push(tool.to_string());
      full.extend(args);
      Self {
        program: "sudo".to_string(),
        args: full,
      }
    } else {
      Self {
        program: tool.to_string(),
        args,
      }
    }
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
      } else {
        write!(f, " {}", arg)?;
      }
    }
    Ok(())
  }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Run an invocation to completion, optionally feeding `stdin`.
///
/// Does not judge the exit status; see [`run_checked`].
pub async fn run(invocation: &Invocation, stdin: Option<&str>) -> Result<CommandOutput, CommandError> {
  debug!(command = %invocation, "spawning process");

  let mut command = Command::new(&invocation.program);
  command
    .args(&invocation.args)
    .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

  let mut child = command.spawn().map_err(|source| CommandError::Spawn {
    program: invocation.program.clone(),
    source,
  })?;

  if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
    pipe
      .write_all(input.as_bytes())
      .await
      .map_err(|source| CommandError::Stdin {
        program: invocation.program.clone(),
        source,
      })?;
    // Closing the pipe signals end of input.
    drop(pipe);
  }

  let output = child.wait_with_output().await.map_err(|source| CommandError::Spawn {
    program: invocation.program.clone(),
    source,
  })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command stdout");
  }

  Ok(CommandOutput {
    code: output.status.code(),
    stdout,
    stderr,
  })
}

/// Like [`run`], but a non-zero exit becomes [`CommandError::Failed`].
pub async fn run_checked(invocation: &Invocation, stdin: Option<&str>) -> Result<String, CommandError> {
  let output = run(invocation, stdin).await?;
  if !output.success() {
    return Err(CommandError::Failed {
      command: invocation.to_string(),
      code: output.code,
      stderr: output.stderr,
    });
  }
  Ok(output.stdout)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sh(script: &str) -> Invocation {
    Invocation::new("/bin/sh", false, vec!["-c".to_string(), script.to_string()])
  }

  #[test]
  fn elevation_prefixes_sudo() {
    let inv = Invocation::new("buildah", true, vec!["manifest".to_string(), "inspect".to_string()]);
    assert_eq!(inv.program, "sudo");
    assert_eq!(inv.args, vec!["buildah", "manifest", "inspect"]);
  }

  #[test]
  fn display_quotes_awkward_arguments() {
    let inv = Invocation::new(
      "buildah",
      false,
      vec!["--annotation".to_string(), "title=my app".to_string(), "it's".to_string()],
    );
    assert_eq!(inv.to_string(), r"buildah --annotation 'title=my app' 'it'\''s'");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn captures_stdout() {
    let out = run_checked(&sh("echo hello"), None).await.unwrap();
    assert_eq!(out, "hello");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn feeds_stdin() {
    let out = run_checked(&sh("cat"), Some("from-stdin")).await.unwrap();
    assert_eq!(out, "from-stdin");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn non_zero_exit_is_an_error() {
    let result = run_checked(&sh("echo boom >&2; exit 3"), None).await;
    match result {
      Err(CommandError::Failed { code, stderr, .. }) => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "boom");
      }
      other => panic!("expected failure, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let inv = Invocation::new("imgpub-definitely-not-installed", false, vec![]);
    assert!(matches!(run(&inv, None).await, Err(CommandError::Spawn { .. })));
  }
}
