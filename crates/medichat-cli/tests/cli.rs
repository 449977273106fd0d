use assert_cmd::Command;
use predicates::str::{contains, starts_with};
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn medichat() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medichat"));
    cmd.env("MEDICHAT_CONFIG", "/nonexistent/medichat.toml")
        .env("MEDICHAT_DISABLE_SYSTEM_PROXY", "1")
        .env_remove("MEDICHAT_RELAY_URL")
        .env_remove("MEDICHAT_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    medichat()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Medichat"));
}

#[test]
fn test_cli_version() {
    medichat().arg("--version").assert().success();
}

#[test]
fn test_cli_completions() {
    medichat()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(starts_with("_medichat"));
}

#[test]
fn test_doctors_lists_catalog() {
    medichat()
        .arg("doctors")
        .assert()
        .success()
        .stdout(contains("cardiologist"))
        .stdout(contains("(default)"));
}

#[test]
fn test_doctors_json() {
    let output = medichat()
        .args(["doctors", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let doctors: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doctors.as_array().unwrap().len(), 12);
    assert_eq!(doctors[0]["id"], "general");
}

#[test]
fn test_ask_without_relay_url_suggests_setup() {
    medichat()
        .args(["ask", "Is this normal?"])
        .assert()
        .failure()
        .stderr(contains("No relay URL configured"))
        .stderr(contains("MEDICHAT_RELAY_URL"));
}

#[test]
fn test_ask_unknown_doctor() {
    medichat()
        .args(["ask", "hi", "--doctor", "vet", "--relay-url", "http://127.0.0.1:9", "--token", "t"])
        .assert()
        .failure()
        .stderr(contains("Unknown doctor"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_streams_answer_to_stdout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/medical-chat"))
        .and(bearer_token("session"))
        .and(body_partial_json(serde_json::json!({
            "question": "Can I take ibuprofen?",
            "doctorType": "general",
            "patientInfo": {"allergies": "aspirin"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Avoid it \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"given your allergy.\"}}]}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/medical-chat", server.uri());
    tokio::task::spawn_blocking(move || {
        medichat()
            .args([
                "ask",
                "Can I take ibuprofen?",
                "--doctor",
                "general",
                "--allergies",
                "aspirin",
                "--relay-url",
                &url,
                "--token",
                "session",
            ])
            .assert()
            .success()
            .stdout("Avoid it given your allergy.\n");
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_reports_relay_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "You do not have permission to use the medical assistant"
            })),
        )
        .mount(&server)
        .await;

    let url = server.uri();
    tokio::task::spawn_blocking(move || {
        medichat()
            .args(["ask", "hi", "--relay-url", &url, "--token", "t"])
            .assert()
            .failure()
            .stderr(contains("You do not have permission"))
            .stderr(contains("administrators"));
    })
    .await
    .unwrap();
}
