/// Returns true if the current process runs with root privileges.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

/// Returns true if the current process runs with root privileges.
#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}

/// Interpret a CI-context flag value (`CI=true`, `CI=1`).
pub fn is_ci_value(value: Option<&str>) -> bool {
  value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}
