use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../flow-spec/tests/fixtures/contact_form.json"
);

fn write_values(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("values.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn inspect_lists_fields_and_steps() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("formflow")?;
    let assert = cmd
        .arg("inspect")
        .arg("--schema")
        .arg(FIXTURE)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    assert!(stdout.contains("Form: Contact (contact-form)"));
    assert!(stdout.contains("email (Email) [required] [conditional]"));
    assert!(stdout.contains("step-confirm"));
    assert!(stdout.contains("Multiflow entries:"));
    Ok(())
}

#[test]
fn visibility_reports_hidden_fields() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let values = write_values(&dir, r#"{"country":"ca"}"#);

    let mut cmd = Command::cargo_bin("formflow")?;
    let assert = cmd
        .arg("visibility")
        .arg("--schema")
        .arg(FIXTURE)
        .arg("--values")
        .arg(&values)
        .assert()
        .success();
    let parsed: Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let top_final = parsed["bucket"]["topFinal"].as_array().unwrap();
    assert!(top_final.iter().any(|name| name == "email"));
    Ok(())
}

#[test]
fn step_follows_multiflow_branch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let values = write_values(&dir, r#"{"plan":"pro"}"#);

    let mut cmd = Command::cargo_bin("formflow")?;
    let assert = cmd
        .arg("step")
        .arg("--schema")
        .arg(FIXTURE)
        .arg("--current")
        .arg("step-plan")
        .arg("--values")
        .arg(&values)
        .assert()
        .success();
    let parsed: Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(parsed["stepNextStep"], "step-confirm");
    assert_eq!(parsed["stepProgressBarItems"], 3);
    Ok(())
}

#[test]
fn step_rejects_unknown_step_id() -> Result<(), Box<dyn std::error::Error>> {
    use assert_fs::prelude::*;
    let dir = assert_fs::TempDir::new()?;
    let values = dir.child("values.json");
    values.write_str("{}")?;

    let mut cmd = Command::cargo_bin("formflow")?;
    cmd.arg("step")
        .arg("--schema")
        .arg(FIXTURE)
        .arg("--current")
        .arg("no-such-step")
        .arg("--values")
        .arg(values.path())
        .assert()
        .failure();
    Ok(())
}
