//! End-to-end tests of the `lava` binary against the built-in simulator.

use std::path::Path;
use std::process::{Command, Output};

fn lava(args: &[&str], home: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lava"))
        .args(args)
        .env("HOME", home)
        .env_remove("LAVA_CONFIG")
        .env_remove("LAVA_MASTER_HOST")
        .env_remove("LAVA_MASTER_PORT")
        .env_remove("RUST_LOG")
        .current_dir(home)
        .output()
        .expect("failed to run lava")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_version() {
    let home = tempfile::tempdir().unwrap();
    let out = lava(&["version"], home.path());
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("lava-client"));
}

#[test]
fn test_hosts_json() {
    let home = tempfile::tempdir().unwrap();
    let hosts = json(&lava(&["--sim", "--json", "hosts"], home.path()));
    let names: Vec<&str> = hosts
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["host"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["master01", "node01", "node02"]);
}

#[test]
fn test_queue_selection_json() {
    let home = tempfile::tempdir().unwrap();
    let queues = json(&lava(&["--sim", "--json", "queues", "normal"], home.path()));
    assert_eq!(queues.as_array().unwrap().len(), 1);
    assert_eq!(queues[0]["queue"], "normal");
}

#[test]
fn test_jobs_of_user() {
    let home = tempfile::tempdir().unwrap();
    let jobs = json(&lava(&["--sim", "--json", "jobs", "-u", "alice", "-a"], home.path()));
    let ids: Vec<i64> = jobs
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["job_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn test_submit_prints_job_id() {
    let home = tempfile::tempdir().unwrap();
    let reply = json(&lava(
        &["--sim", "--json", "submit", "-n", "1", "--", "hostname"],
        home.path(),
    ));
    assert!(reply["job_id"].as_i64().is_some());
    assert_eq!(reply["queue"], "normal");
}

#[test]
fn test_unknown_queue_exits_nonzero() {
    let home = tempfile::tempdir().unwrap();
    let out = lava(&["--sim", "queues", "nosuch"], home.path());
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error:"));
}

#[test]
fn test_config_file_from_home() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir(home.path().join(".lava")).unwrap();
    std::fs::write(home.path().join(".lava/config.yaml"), "master_port: 0\n").unwrap();

    // port 0 fails validation before anything is sent
    let out = lava(&["--sim", "cluster"], home.path());
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_events_from_file() {
    let home = tempfile::tempdir().unwrap();
    let log = home.path().join("lsb.events");
    std::fs::write(
        &log,
        "\"JOB_CLEAN\" \"2.0\" 1389283800 101 0\n\"LOG_SWITCH\" \"2.0\" 1389283900 101\n",
    )
    .unwrap();

    let events = json(&lava(
        &["--json", "events", "--file", log.to_str().unwrap(), "--job", "101"],
        home.path(),
    ));
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["event_type"], "JobClean");
}
