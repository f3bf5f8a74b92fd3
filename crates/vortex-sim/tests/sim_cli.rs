#![forbid(unsafe_code)]

//! End-to-end runs of the `vortex-sim` command surface.
//!
//! Run:
//!   cargo test -p vortex-sim --test sim_cli

use std::io::Write;

use clap::Parser;
use vortex_sim::SimError;
use vortex_sim::cli::{Cli, run};

fn run_cli(args: &[&str]) -> Result<String, SimError> {
    let cli = Cli::try_parse_from(std::iter::once("vortex-sim").chain(args.iter().copied()))
        .expect("arguments parse");
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

fn json_lines(text: &str) -> Vec<serde_json::Value> {
    text.lines()
        .map(|line| serde_json::from_str(line).expect("valid JSON line"))
        .collect()
}

#[test]
fn text_run_reports_signals_in_order() {
    let text = run_cli(&[
        "run",
        "--duration-ms",
        "2500",
        "--collapse-at",
        "200",
        "--expand-at",
        "1200",
    ])
    .unwrap();

    let signals: Vec<_> = text
        .lines()
        .filter(|l| l.contains(" signal "))
        .map(|l| l.split_whitespace().last().unwrap())
        .collect();
    assert_eq!(signals, vec!["ready", "done_collapsing", "done_expanding"]);
    assert!(text.contains("    900ms  signal  done_collapsing"));
    assert!(text.contains("   1900ms  signal  done_expanding"));
    assert!(text.lines().last().unwrap().contains("phase=idle"));
}

#[test]
fn json_run_emits_intents_signals_and_summary() {
    let text = run_cli(&[
        "run",
        "--json",
        "--duration-ms",
        "1500",
        "--collapse-at",
        "100",
        "--collapse-at",
        "300",
        "--boost",
        "4",
    ])
    .unwrap();
    let records = json_lines(&text);

    let intents: Vec<_> = records
        .iter()
        .filter(|r| r["event"] == "intent")
        .map(|r| (r["t_ms"].as_u64().unwrap(), r["accepted"].as_bool().unwrap()))
        .collect();
    assert_eq!(intents, vec![(100, true), (300, false)]);

    let summary = records.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["phase"], "collapsed");
    assert_eq!(summary["stats"]["accepted_intents"], 1);
    assert_eq!(summary["stats"]["ignored_intents"], 1);
    assert_eq!(summary["stats"]["burst_shots"], 84);
    assert_eq!(
        summary["signals"],
        serde_json::json!(["ready", "done_collapsing"])
    );
}

#[test]
fn frames_follow_the_frame_interval() {
    let text = run_cli(&[
        "run",
        "--json",
        "--frames",
        "--duration-ms",
        "100",
        "--frame-ms",
        "25",
    ])
    .unwrap();
    let times: Vec<_> = json_lines(&text)
        .iter()
        .filter(|r| r["event"] == "frame")
        .map(|r| r["t_ms"].as_u64().unwrap())
        .collect();
    assert_eq!(times, vec![0, 25, 50, 75, 100]);
}

#[test]
fn collapsed_frame_is_scaled_down_and_hidden() {
    let text = run_cli(&[
        "run",
        "--json",
        "--frames",
        "--duration-ms",
        "1000",
        "--frame-ms",
        "100",
        "--collapse-at",
        "0",
    ])
    .unwrap();
    let last_frame = json_lines(&text)
        .into_iter()
        .filter(|r| r["event"] == "frame")
        .last()
        .unwrap();
    assert_eq!(last_frame["phase"], "collapsed");
    assert_eq!(last_frame["opacity"], 0.0);
    assert!((last_frame["scale"].as_f64().unwrap() - 0.06).abs() < 1e-9);
}

#[test]
fn config_file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[transition]\nduration_ms = 300").unwrap();
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    let text = run_cli(&[
        "run",
        "--config",
        path,
        "--duration-ms",
        "1000",
        "--collapse-at",
        "100",
    ])
    .unwrap();
    assert!(text.contains("    400ms  signal  done_collapsing"));
}

#[test]
fn print_config_json_round_trips_through_run() {
    let json = run_cli(&["print-config", "--format", "json"]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["stack_count"], 6);
    assert_eq!(value["stack_depth"], 10);

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    let text = run_cli(&[
        "run",
        "--config",
        file.path().to_str().unwrap(),
        "--duration-ms",
        "50",
    ])
    .unwrap();
    assert!(text.contains("signal  ready"));
}

#[test]
fn print_config_toml_by_default() {
    let toml = run_cli(&["print-config"]).unwrap();
    assert!(toml.contains("stack_count = 6"));
    assert!(toml.contains("[transition]"));
}

#[test]
fn bad_inputs_map_to_exit_codes() {
    let err = run_cli(&["run", "--frame-ms", "0"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let err = run_cli(&["run", "--duration-ms", "100", "--expand-at", "200"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let err = run_cli(&["print-config", "--config", "/no/such/vortex.toml"]).unwrap_err();
    assert_eq!(err.exit_code(), 3);

    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "stack_depth = 0\n").unwrap();
    let err = run_cli(&["run", "--config", bad.to_str().unwrap()]).unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("stack_depth"));

    let err = run_cli(&["run", "--images", "0"]).unwrap_err();
    assert_eq!(err.exit_code(), 5);
}
