//! Smoke tests -- verify the binary runs end to end against local sources.

use assert_cmd::Command;
use predicates::prelude::*;

fn readings_json(n: usize) -> String {
    let rows: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            let temp = if i == n - 1 { 35.0 } else { 21.0 + (i % 3) as f64 * 0.1 };
            serde_json::json!({
                "id": i + 1,
                "temperature": temp,
                "humidity": 45.0 + (i % 4) as f64 * 0.5,
                "created_at": format!("2024-03-01T00:{:02}:00Z", i),
            })
        })
        .collect();
    serde_json::to_string(&rows).unwrap()
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("sensorsentry").unwrap();
    cmd.env_remove("SENSORSENTRY_CONFIG")
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_KEY");
    cmd
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("anomaly detection"));
}

#[test]
fn test_cli_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sensorsentry"));
}

#[test]
fn test_detect_from_file_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("readings.json");
    let output = dir.path().join("report.json");
    std::fs::write(&input, readings_json(40)).unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["detect", "--source", "file", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Data points analyzed: 40"))
        .stdout(predicate::str::contains("ANOMALIES DETECTED"));

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(report["summary"]["data_points_analyzed"], 40);
    assert!(report["summary"]["anomalies"]["by_method"]["rate_of_change"].as_u64().unwrap() >= 1);
    assert_eq!(report["summary"]["anomaly_details"][0]["id"], 40);
}

#[test]
fn test_detect_empty_file_reports_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("readings.json");
    let output = dir.path().join("report.json");
    std::fs::write(&input, "[]").unwrap();

    cmd()
        .current_dir(dir.path())
        .args(["detect", "--source", "file", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("No data found"));

    assert!(!output.exists());
}

#[test]
fn test_import_then_detect_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("readings.json");
    let db = dir.path().join("readings.db");
    std::fs::write(&input, readings_json(30)).unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("import")
        .arg("--input")
        .arg(&input)
        .arg("--db")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 30 of 30 readings"));

    cmd()
        .current_dir(dir.path())
        .args(["detect", "--source", "sqlite", "--json", "--no-write", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"data_points_analyzed\": 30"));
}

#[test]
fn test_config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("contamination = 0.05"));
}

#[test]
fn test_detect_from_missing_sqlite_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("typo.db");

    cmd()
        .current_dir(dir.path())
        .args(["detect", "--source", "sqlite", "--no-write", "--db"])
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("typo.db"));

    assert!(!db.exists());
}

#[test]
fn test_config_redacts_supabase_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("sensorsentry.toml");
    std::fs::write(&config, "[source]\nsupabase_key = \"secret-key\"\n").unwrap();

    cmd()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("secret-key").not());
}
