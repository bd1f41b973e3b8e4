//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALID_CSV: &str = "\
Question,Option 1,Option 2,Option 3,Option 4,Answer
What is 2+2?,3,4,5,6,2
Capital of France?,Berlin,Madrid,Paris,Rome,3
";

fn mcqbench() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("mcqbench").unwrap()
}

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("bench.toml");
    let content = format!(
        r#"
backend = "local"
request_delay_ms = 0

[retry]
max_attempts = 2
backoff_ms = 10
rate_limit_backoff_ms = 10

[backends.local]
type = "local"
base_url = "{base_url}"
"#
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    mcqbench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created mcqbench.toml"))
        .stdout(predicate::str::contains("Created test_set.csv"));

    assert!(dir.path().join("mcqbench.toml").exists());
    assert!(dir.path().join("test_set.csv").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    mcqbench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    // Second init should skip
    mcqbench()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_output_validates() {
    let dir = TempDir::new().unwrap();
    mcqbench().current_dir(dir.path()).arg("init").assert().success();

    mcqbench()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--dataset")
        .arg("test_set.csv")
        .assert()
        .success()
        .stdout(predicate::str::contains("5 questions"))
        .stdout(predicate::str::contains("Dataset valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("q.csv");
    std::fs::write(
        &path,
        "Question,Option 1,Option 2,Option 3,Option 4,Answer\nq1,a,b,c,d,7\nq1,a,b,c,d,1\n",
    )
    .unwrap();

    mcqbench()
        .arg("validate")
        .arg("--dataset")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[row 1]"))
        .stdout(predicate::str::contains("duplicate question"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_missing_columns_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "Question,Option 1,Option 2\nq,a,b\n").unwrap();

    mcqbench()
        .arg("validate")
        .arg("--dataset")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("Option 3"));
}

#[test]
fn validate_nonexistent_file() {
    mcqbench()
        .arg("validate")
        .arg("--dataset")
        .arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn run_with_missing_dataset_fails_before_network() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:9/v1");

    mcqbench()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--dataset")
        .arg(dir.path().join("missing.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot use dataset"));
}

#[test]
fn run_against_unreachable_server_fails_setup() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:9/v1");
    let dataset = dir.path().join("q.csv");
    std::fs::write(&dataset, VALID_CSV).unwrap();

    mcqbench()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--dataset")
        .arg(&dataset)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot reach the local server"));
}

#[test]
fn run_with_unknown_backend_is_rejected() {
    mcqbench()
        .arg("run")
        .arg("--backend")
        .arg("openai")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

#[test]
fn missing_config_file_fails() {
    mcqbench()
        .arg("list-models")
        .arg("--config")
        .arg("no_such_config.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_against_local_server_writes_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": "tiny-model"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("2+2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "2"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Capital of France"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Berlin, so 1"}}]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &format!("{}/v1", server.uri()));
    let dataset = dir.path().join("q.csv");
    std::fs::write(&dataset, VALID_CSV).unwrap();
    let output = dir.path().join("out").join("results.csv");

    mcqbench()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--dataset")
        .arg(&dataset)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("tiny-model"))
        .stderr(predicate::str::contains("50.00%"))
        .stderr(predicate::str::contains("Results saved to"));

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with('\u{feff}'));
    assert!(text.contains("SUMMARY - Model: tiny-model"));
    assert!(text.contains("Correct: 1/2"));
    assert!(text.contains("Final Accuracy: 50.00%"));
}

#[test]
fn help_output() {
    mcqbench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multiple-choice benchmark harness"));
}

#[test]
fn version_output() {
    mcqbench()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcqbench"));
}
