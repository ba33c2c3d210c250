//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary home directory
//! so the user's configuration and history are never touched.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_commute"))
        .args(args)
        .env("HOME", home)
        .env_remove("COMMUTE_ENV")
        .env("COMMUTE_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "schedule.start"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "09:00");
    assert!(home.path().join(".config/commute/config.toml").exists());
}

#[test]
fn test_config_set_and_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "engine.baseline_total", "80"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("engine.baseline_total = 80"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "engine.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_rejects_inverted_schedule() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "schedule.start", "20:00"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("schedule.start"));
}

#[test]
fn test_estimate_quiet_afternoon() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["estimate", "--day", "wed", "--at", "14:00"],
    );
    assert_eq!(code, 0);
    let out = json(&stdout);
    let minutes = out["outbound"]["minutes"].as_u64().unwrap();
    // Default 35 min within the +/-5% duration jitter
    assert!((33..=37).contains(&minutes));
    assert_eq!(out["outbound"]["condition"], "flowing");
}

#[test]
fn test_estimate_all_prints_full_report() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["estimate", "--day", "mon", "--at", "08:00", "--weather", "rain", "--all"],
    );
    assert_eq!(code, 0);
    let out = json(&stdout);
    assert_eq!(out["outbound"]["condition"], "congested");
    assert!(out["productivity"]["score"].is_i64());
    assert!(out["recommendations"].is_array());
}

#[test]
fn test_observe_then_history() {
    let home = tempfile::tempdir().unwrap();
    let args = ["observe", "--direction", "outbound", "--at", "08:05", "--minutes", "42"];
    let (code, stdout, _) = run_cli(home.path(), &args);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["bucket"], 32);

    let (code, stdout, _) = run_cli(home.path(), &["history", "--direction", "outbound"]);
    assert_eq!(code, 0);
    let rows = json(&stdout);
    assert_eq!(rows[0]["slot"], "08:00");
    assert_eq!(rows[0]["mean_minutes"], 42);
}

#[test]
fn test_observe_rejects_out_of_range_minutes() {
    let home = tempfile::tempdir().unwrap();
    let args = ["observe", "--direction", "return", "--at", "18:00", "--minutes", "0"];
    let (code, _, stderr) = run_cli(home.path(), &args);
    assert_eq!(code, 1);
    assert!(stderr.contains("minutes"));
}

#[test]
fn test_report_weekly_after_estimate() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["estimate"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(home.path(), &["report", "weekly"]);
    assert_eq!(code, 0);
    let report = json(&stdout);
    assert_eq!(report["total_days"], 1);
}

#[test]
fn test_watch_stops_after_ticks() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["watch", "--ticks", "1"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn test_invalid_time_argument() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["estimate", "--at", "25:00"]);
    assert_ne!(code, 0);
}

#[test]
fn test_weather_code_maps_to_storm() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["estimate", "--day", "mon", "--at", "08:00", "--weather-code", "95", "--all"],
    );
    assert_eq!(code, 0);
    let out = json(&stdout);
    assert_eq!(out["weather"], "storm");
    assert_eq!(out["outbound"]["condition"], "congested");
}

#[test]
fn test_weather_code_conflicts_with_named_weather() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(
        home.path(),
        &["estimate", "--weather", "rain", "--weather-code", "61"],
    );
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_unknown_key_names_it() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "engine.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown configuration key: engine.nope"));
}
