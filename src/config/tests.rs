use super::validation::sanitize_command;
use super::{
    AppConfig, LogLevel, DEFAULT_COMMAND, DEFAULT_INPUT_CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL_MS,
};
use clap::Parser;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("shellpty-{name}-{}-{nanos}", std::process::id()))
}

#[test]
fn defaults_parse_and_validate() {
    let mut cfg = AppConfig::parse_from(["test-app", "--command", DEFAULT_COMMAND]);
    assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(cfg.input_channel_capacity, DEFAULT_INPUT_CHANNEL_CAPACITY);
    assert!(!cfg.logs);
    cfg.validate().unwrap();
    assert!(cfg.command.starts_with('/'));
}

#[test]
fn rejects_poll_interval_out_of_bounds() {
    for (value, ok) in [("0", false), ("1", true), ("1000", true), ("1001", false)] {
        let mut cfg = AppConfig::parse_from([
            "test-app",
            "--command",
            "/bin/sh",
            "--poll-interval-ms",
            value,
        ]);
        assert_eq!(cfg.validate().is_ok(), ok, "--poll-interval-ms {value}");
    }
}

#[test]
fn rejects_input_channel_capacity_out_of_bounds() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--command",
        "/bin/sh",
        "--input-channel-capacity",
        "0",
    ]);
    assert!(cfg.validate().is_err());

    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--command",
        "/bin/sh",
        "--input-channel-capacity",
        "2048",
    ]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_reap_timeout_above_limit() {
    let mut cfg = AppConfig::parse_from([
        "test-app",
        "--command",
        "/bin/sh",
        "--reap-timeout-ms",
        "10001",
    ]);
    assert!(cfg.validate().is_err());

    let mut cfg =
        AppConfig::parse_from(["test-app", "--command", "/bin/sh", "--reap-timeout-ms", "0"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn no_logs_overrides_logs() {
    let cfg = AppConfig::parse_from(["test-app", "--logs"]);
    assert!(cfg.logging_enabled());
    let cfg = AppConfig::parse_from(["test-app", "--logs", "--no-logs"]);
    assert!(!cfg.logging_enabled());
}

#[test]
fn sanitize_command_rejects_empty_and_bare_names() {
    assert!(sanitize_command("", "--command").is_err());
    assert!(sanitize_command("   ", "--command").is_err());
    assert!(sanitize_command("sh", "--command").is_err());
}

#[test]
fn sanitize_command_rejects_missing_and_directories() {
    assert!(sanitize_command("/nonexistent/shellpty-missing", "--command").is_err());
    let dir = std::env::temp_dir();
    assert!(sanitize_command(dir.to_str().unwrap(), "--command").is_err());
}

#[test]
fn sanitize_command_rejects_non_executable_file() {
    let path = temp_path("noexec");
    fs::write(&path, b"#!/bin/sh\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    let err = sanitize_command(path.to_str().unwrap(), "--command").unwrap_err();
    assert!(err.to_string().contains("not executable"));
    let _ = fs::remove_file(&path);
}

#[test]
fn sanitize_command_canonicalizes_executable_path() {
    let path = temp_path("exec");
    fs::write(&path, b"#!/bin/sh\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    let canonical = path.canonicalize().unwrap();
    let resolved = sanitize_command(path.to_str().unwrap(), "--command").unwrap();
    assert_eq!(resolved, canonical.to_str().unwrap());
    let _ = fs::remove_file(&path);
}

#[test]
fn log_level_defaults_to_debug_and_maps_to_tracing_levels() {
    let cfg = AppConfig::parse_from(["test-app", "--command", "/bin/sh"]);
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.log_level.as_tracing(), tracing::Level::DEBUG);

    let cfg = AppConfig::parse_from(["test-app", "--log-level", "trace"]);
    assert_eq!(cfg.log_level.as_tracing(), tracing::Level::TRACE);
    let cfg = AppConfig::parse_from(["test-app", "--log-level", "warn"]);
    assert_eq!(cfg.log_level.as_tracing(), tracing::Level::WARN);

    assert!(AppConfig::try_parse_from(["test-app", "--log-level", "loud"]).is_err());
}
