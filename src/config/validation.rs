use super::AppConfig;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path};

const MAX_POLL_INTERVAL_MS: u64 = 1_000;
const MAX_INPUT_CHANNEL_CAPACITY: usize = 1_024;
const MAX_REAP_TIMEOUT_MS: u64 = 10_000;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the command path.
    pub fn validate(&mut self) -> Result<()> {
        if !(1..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            bail!(
                "--poll-interval-ms must be between 1 and {MAX_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            );
        }
        if !(1..=MAX_INPUT_CHANNEL_CAPACITY).contains(&self.input_channel_capacity) {
            bail!(
                "--input-channel-capacity must be between 1 and {MAX_INPUT_CHANNEL_CAPACITY}, got {}",
                self.input_channel_capacity
            );
        }
        if self.reap_timeout_ms > MAX_REAP_TIMEOUT_MS {
            bail!(
                "--reap-timeout-ms must be at most {MAX_REAP_TIMEOUT_MS}, got {}",
                self.reap_timeout_ms
            );
        }

        self.command = sanitize_command(&self.command, "--command")?;
        Ok(())
    }
}

/// The session execs the command directly (no PATH search), so insist on a real executable file.
pub(super) fn sanitize_command(value: &str, flag: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if trimmed.contains('\0') {
        bail!("{flag} cannot contain NUL bytes");
    }

    let path = Path::new(trimmed);
    if !path.is_absolute() && !trimmed.contains(std::path::MAIN_SEPARATOR) {
        bail!("{flag} must be a path to an executable, got '{trimmed}'");
    }
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
    if !metadata.is_file() {
        bail!("{flag} '{}' is not a file", canonical.display());
    }
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            bail!(
                "{flag} '{}' exists but is not executable (mode {:o})",
                canonical.display(),
                mode
            );
        }
    }
    canonical
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"))
}
