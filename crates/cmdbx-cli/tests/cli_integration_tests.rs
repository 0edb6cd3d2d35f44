//! CLI integration tests
//!
//! Each test drives the `cmdbx` binary against a scratch database.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cmdbx"))
        .args(args)
        .args(["--db", db.to_str().unwrap()])
        .output()
        .expect("Failed to execute CLI")
}

fn run_json(db: &Path, args: &[&str]) -> serde_json::Value {
    let output = run(db, args);
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn setup(temp_dir: &TempDir) -> PathBuf {
    let db = temp_dir.path().join("store.db");
    run_json(
        &db,
        &["definition", "add", "--tenant", "acme", "--obj-id", "host"],
    );
    db
}

#[test]
fn test_cli_create_then_search() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);

    let created = run_json(
        &db,
        &[
            "inst", "create", "--tenant", "acme", "--obj-id", "host", "--data",
            r#"{"ip": "10.0.0.1"}"#,
        ],
    );
    assert_eq!(created["owner_id"], "acme");

    let found = run_json(
        &db,
        &[
            "inst", "search", "--tenant", "acme", "--obj-id", "host", "--filter",
            r#"{"condition": {"ip": "10.0.0.1"}}"#,
        ],
    );
    assert_eq!(found["count"], 1);
}

#[test]
fn test_cli_update_get_delete() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);

    let created = run_json(
        &db,
        &["inst", "create", "--tenant", "acme", "--obj-id", "host"],
    );
    let inst_id = created["inst_id"].as_i64().unwrap().to_string();

    let updated = run_json(
        &db,
        &[
            "inst", "update", "--tenant", "acme", "--obj-id", "host", "--inst-id", &inst_id,
            "--data", r#"{"os": "linux"}"#,
        ],
    );
    assert_eq!(updated["count"], 1);

    let found = run_json(
        &db,
        &["inst", "get", "--tenant", "acme", "--obj-id", "host", "--inst-id", &inst_id],
    );
    assert_eq!(found["info"][0]["os"], "linux");

    let deleted = run_json(
        &db,
        &["inst", "delete", "--tenant", "acme", "--obj-id", "host", "--inst-id", &inst_id],
    );
    assert_eq!(deleted["count"], 1);
}

#[test]
fn test_cli_reports_malformed_filter() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);

    let output = run(
        &db,
        &[
            "inst", "search", "--tenant", "acme", "--obj-id", "host", "--filter",
            r#"{"condition": {"owner_id": "globex"}}"#,
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "stderr was: {}", stderr);
}

#[test]
fn test_cli_lists_only_tenant_definitions() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);
    run_json(
        &db,
        &["definition", "add", "--tenant", "globex", "--obj-id", "router"],
    );

    let defs = run_json(&db, &["definition", "list", "--tenant", "acme"]);
    let defs = defs.as_array().unwrap();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0]["obj_id"], "host");
}

#[test]
fn test_cli_invalid_filter_json_is_malformed_filter() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);

    let output = run(
        &db,
        &[
            "inst", "search", "--tenant", "acme", "--obj-id", "host", "--filter", "{not json",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_MALFORMED_FILTER"), "stderr was: {}", stderr);
}

#[test]
fn test_cli_adopts_request_id() {
    let temp_dir = TempDir::new().unwrap();
    let db = setup(&temp_dir);

    let output = run(
        &db,
        &[
            "inst", "delete", "--tenant", "acme", "--obj-id", "host", "--inst-id", "abc",
            "--request-id", "req-cli-7",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("(request_id: req-cli-7)"), "stderr was: {}", stderr);
}
