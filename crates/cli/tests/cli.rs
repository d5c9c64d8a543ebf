// Integration tests for the fplsnap binary: exit codes, stderr contract,
// and the published tree on disk.
//
// Run with: cargo test -p fplsnap-cli --test cli -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use httpmock::prelude::*;
use serde_json::{json, Value};

fn fplsnap(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fplsnap"));
    cmd.current_dir(cwd)
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_KEY")
        .env_remove("FPLSNAP_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn tables() -> Vec<(&'static str, Value)> {
    vec![
        (
            "gameweeks",
            json!([{"id": 1, "finished": true}, {"id": 2, "finished": false}]),
        ),
        (
            "players",
            json!([{"player_id": 10, "web_name": "Saka"}, {"player_id": 11, "web_name": "Rice"}]),
        ),
        (
            "teams",
            json!([{"code": 3, "name": "Arsenal"}, {"code": 14, "name": "Liverpool"}]),
        ),
        (
            "matches",
            json!([
                {"match_id": "2025-2026-premier-league-gw1-ars-liv", "gameweek": 1, "home_team": 3, "away_team": 14},
                {"match_id": "2025-2026-premier-league-gw2-liv-ars", "gameweek": 2, "home_team": 14, "away_team": 3}
            ]),
        ),
        (
            "playermatchstats",
            json!([
                {"player_id": 10, "match_id": "2025-2026-premier-league-gw1-ars-liv", "minutes_played": 90},
                {"player_id": 11, "match_id": "2025-2026-premier-league-gw2-liv-ars", "minutes_played": 70}
            ]),
        ),
        (
            "playerstats",
            json!([
                {"id": 10, "gw": 1, "total_points": 6, "minutes": 90},
                {"id": 11, "gw": 1, "total_points": 0, "minutes": 0},
                {"id": 10, "gw": 2, "total_points": 6, "minutes": 90},
                {"id": 11, "gw": 2, "total_points": 3, "minutes": 70}
            ]),
        ),
    ]
}

fn write_dumps(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (name, rows) in tables() {
        fs::write(dir.join(format!("{name}.json")), rows.to_string()).unwrap();
    }
}

/// Publish from a dump directory into `<root>/data/2025-2026`.
fn publish_from_dir(root: &Path) {
    write_dumps(&root.join("dumps"));
    let output = fplsnap(root)
        .args(["run", "--input", "dumps", "--out", "data"])
        .output()
        .expect("fplsnap run");
    assert!(output.status.success(), "exit {:?}\nstderr: {}", output.status, stderr(&output));
}

// ===========================================================================
// fplsnap run
// ===========================================================================

#[test]
fn run_from_directory_then_validate() {
    let root = tempfile::tempdir().unwrap();
    publish_from_dir(root.path());

    let season = root.path().join("data/2025-2026");
    assert!(season.join("manifest.json").is_file());
    assert!(season.join("By Gameweek/GW2/player_gameweek_stats.csv").is_file());
    assert!(season.join("By Tournament/Premier League/GW1/matches.csv").is_file());

    let output = fplsnap(root.path())
        .args(["validate", "--out", "data", "--json"])
        .output()
        .expect("fplsnap validate");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: Value = serde_json::from_slice(&output.stdout).expect("validate --json emits JSON");
    assert_eq!(report["findings"], json!([]));
    assert_eq!(report["views_checked"], json!(4));
}

#[test]
fn run_without_credentials_exits_50() {
    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .args(["run", "--out", "data"])
        .output()
        .expect("fplsnap run");

    assert_eq!(output.status.code(), Some(50));
    let err = stderr(&output);
    assert!(err.contains("error:"), "{err}");
    assert!(err.contains("SUPABASE_URL"), "{err}");
    assert!(!root.path().join("data").exists());
}

#[test]
fn bad_policy_is_usage_error() {
    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .args(["run", "--input", "dumps", "--on-violation", "ignore"])
        .output()
        .expect("fplsnap run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_config_file_is_io_error() {
    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .args(["validate", "--config", "nope.toml"])
        .output()
        .expect("fplsnap validate");
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("nope.toml"));
}

#[test]
fn fail_policy_exits_60_and_publishes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let dumps = root.path().join("dumps");
    write_dumps(&dumps);
    fs::write(
        dumps.join("playermatchstats.json"),
        json!([{"player_id": 99, "match_id": "2025-2026-premier-league-gw1-ars-liv"}]).to_string(),
    )
    .unwrap();

    let output = fplsnap(root.path())
        .args(["run", "--input", "dumps", "--out", "data", "--on-violation", "fail"])
        .output()
        .expect("fplsnap run");

    assert_eq!(output.status.code(), Some(60), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("hint:"));
    assert!(!root.path().join("data/2025-2026").exists());
}

#[test]
fn run_reads_local_config_file() {
    let root = tempfile::tempdir().unwrap();
    write_dumps(&root.path().join("dumps"));
    fs::write(
        root.path().join("fplsnap.toml"),
        "season = \"2024-2025\"\noutput_dir = \"public\"\n\n[source]\nkind = \"directory\"\ninput_dir = \"dumps\"\n",
    )
    .unwrap();

    let output = fplsnap(root.path()).arg("run").output().expect("fplsnap run");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(root.path().join("public/2024-2025/matches.csv").is_file());
}

#[test]
fn run_from_supabase() {
    let server = MockServer::start();
    let mocks: Vec<_> = tables()
        .into_iter()
        .map(|(name, rows)| {
            server.mock(|when, then| {
                when.method(GET)
                    .path(format!("/rest/v1/{name}"))
                    .header("apikey", "service-key");
                then.status(200).json_body(rows);
            })
        })
        .collect();

    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .env("SUPABASE_URL", server.base_url())
        .env("SUPABASE_KEY", "service-key")
        .args(["run", "--out", "data"])
        .output()
        .expect("fplsnap run");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    for mock in &mocks {
        mock.assert();
    }
    let manifest: Value =
        serde_json::from_slice(&fs::read(root.path().join("data/2025-2026/manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["source"], json!("supabase"));
}

#[test]
fn rejected_key_exits_51() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(401).json_body(json!({"message": "Invalid API key"}));
    });

    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .args(["run", "--out", "data", "--supabase-key", "wrong"])
        .arg("--supabase-url")
        .arg(server.base_url())
        .output()
        .expect("fplsnap run");

    assert_eq!(output.status.code(), Some(51), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Invalid API key"));
}

// ===========================================================================
// fplsnap validate / deltas
// ===========================================================================

#[test]
fn validate_flags_tampered_tree() {
    let root = tempfile::tempdir().unwrap();
    publish_from_dir(root.path());

    let matches = root.path().join("data/2025-2026/By Gameweek/GW1/matches.csv");
    let mut text = fs::read_to_string(&matches).unwrap();
    text.push_str("2025-2026-premier-league-gw9-xxx-yyy,9,3,14,Premier League\n");
    fs::write(&matches, text).unwrap();

    let output = fplsnap(root.path())
        .args(["validate", "--out", "data"])
        .output()
        .expect("fplsnap validate");

    assert_eq!(output.status.code(), Some(61));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("By Gameweek/GW1"), "{stdout}");
}

#[test]
fn deltas_rewrites_discrete_files() {
    let root = tempfile::tempdir().unwrap();
    publish_from_dir(root.path());

    let file = root.path().join("data/2025-2026/By Gameweek/GW2/player_gameweek_stats.csv");
    let original = fs::read(&file).unwrap();
    fs::remove_file(&file).unwrap();

    let output = fplsnap(root.path())
        .args(["deltas", "--out", "data"])
        .output()
        .expect("fplsnap deltas");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(fs::read(&file).unwrap(), original);
}

#[test]
fn deltas_without_tree_fails() {
    let root = tempfile::tempdir().unwrap();
    let output = fplsnap(root.path())
        .args(["deltas", "--out", "data"])
        .output()
        .expect("fplsnap deltas");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("By Gameweek"));
}
