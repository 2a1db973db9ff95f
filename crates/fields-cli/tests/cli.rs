use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_fs::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SPEC: &str = include_str!("../../fields-spec/tests/fixtures/membership_form.json");

fn write_spec(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("membership.form.json");
    fs::write(&path, SPEC).expect("write spec");
    path
}

fn greentic_fields() -> Command {
    Command::cargo_bin("greentic-fields").expect("greentic-fields binary")
}

#[test]
fn refresh_prints_indented_text() -> TestResult {
    let workspace = TempDir::new()?;
    let spec = write_spec(&workspace);
    let state = workspace.path().join("state.json");
    fs::write(&state, r#"{"age": 15}"#)?;

    let output = greentic_fields()
        .arg("refresh")
        .arg("--spec")
        .arg(&spec)
        .arg("--state")
        .arg(&state)
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Visible fields: 3/7"));
    assert!(stdout.contains("  + Guardian name (guardian) [required]"));
    Ok(())
}

#[test]
fn refresh_json_matches_component_view() -> TestResult {
    let workspace = TempDir::new()?;
    let spec = write_spec(&workspace);

    let output = greentic_fields()
        .args(["refresh", "--format", "json", "--spec"])
        .arg(&spec)
        .output()?;
    assert!(output.status.success());
    let view: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(view["form_id"], "membership");
    assert_eq!(view["progress"]["visible"], 2);
    Ok(())
}

#[test]
fn refresh_fails_on_missing_spec() -> TestResult {
    let workspace = TempDir::new()?;
    greentic_fields()
        .arg("refresh")
        .arg("--spec")
        .arg(workspace.path().join("absent.json"))
        .assert()
        .failure();
    Ok(())
}

#[test]
fn watch_replays_stdin() -> TestResult {
    let workspace = TempDir::new()?;
    let spec = write_spec(&workspace);

    let output = greentic_fields()
        .args(["watch", "--debounce-ms", "10", "--spec"])
        .arg(&spec)
        .write_stdin("{\"field\":\"subscribe\",\"value\":true}\n")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("--- pass 1 ---"));
    assert!(stdout.contains("--- pass 2 ---"));
    assert!(stdout.contains("  + Topics (topics) [required]"));
    Ok(())
}

#[test]
fn check_fails_on_forward_reference() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let spec_file = temp.child("broken.form.json");
    spec_file.write_str(
        &json!({
            "id": "broken",
            "title": "Broken",
            "version": "1.0",
            "fields": [
                {
                    "id": "first",
                    "label": "First",
                    "type": "singleline",
                    "rule": { "entry": { "target": "second", "opr": "eq", "val": "x" } }
                },
                { "id": "second", "label": "Second", "type": "singleline" }
            ]
        })
        .to_string(),
    )?;

    let output = greentic_fields()
        .arg("check")
        .arg("--spec")
        .arg(spec_file.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Rule check: invalid"));
    assert!(stdout.contains("[forward_reference]"));
    Ok(())
}

#[test]
fn check_accepts_clean_form() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let spec_file = temp.child("membership.form.json");
    spec_file.write_str(SPEC)?;

    let output = greentic_fields()
        .arg("check")
        .arg("--spec")
        .arg(spec_file.path())
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("Rule check: valid"));
    Ok(())
}

#[test]
fn submit_reports_missing_enabled_fields() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let spec_file = temp.child("membership.form.json");
    spec_file.write_str(SPEC)?;
    let answers = temp.child("answers.json");
    answers.write_str(r#"{"age": 12}"#)?;

    let output = greentic_fields()
        .arg("submit")
        .arg("--spec")
        .arg(spec_file.path())
        .arg("--answers")
        .arg(answers.path())
        .output()?;
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Missing required answers: guardian"));

    answers.write_str(r#"{"age": 40}"#)?;
    greentic_fields()
        .arg("submit")
        .arg("--spec")
        .arg(spec_file.path())
        .arg("--answers")
        .arg(answers.path())
        .assert()
        .success();
    Ok(())
}

#[test]
fn operators_lists_kind_specific_entries() -> TestResult {
    let output = greentic_fields()
        .args(["operators", "--kind", "date"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("is after than"));
    assert!(!stdout.contains("is checked"));
    Ok(())
}

#[test]
fn operators_rejects_unknown_kind() -> TestResult {
    greentic_fields()
        .args(["operators", "--kind", "colour"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn schema_prints_form_schema() -> TestResult {
    let output = greentic_fields().arg("schema").output()?;
    assert!(output.status.success());
    let schema: Value = serde_json::from_slice(&output.stdout)?;
    assert!(schema.to_string().contains("visibility_policy"));
    Ok(())
}
