use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FUNCTION_PATH: &str = "/functions/v1/lab-ai-coaching";

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn write_config(&self, contents: &str) {
        let dir = self.xdg_config.join("camplab");
        fs::create_dir_all(&dir).expect("failed to create config dir");
        fs::write(dir.join("config.toml"), contents).expect("failed to write config");
    }

    fn write_gateway_config(&self, server_uri: &str) {
        self.write_config(&format!(
            "[gateway]\nendpoint = \"{}{}\"\napi_key = \"cli-key\"\ntimeout_secs = 5\n",
            server_uri, FUNCTION_PATH
        ));
    }
}

fn run_camplab(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("camplab"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("NO_COLOR", "1")
        .env_remove("CAMPLAB_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute camplab: {e}"))
}

/// Run the binary off the async runtime so the mock server keeps serving
async fn run_camplab_async(env: &CliTestEnv, args: &[&str]) -> Output {
    let home = env.home.clone();
    let xdg_config = env.xdg_config.clone();
    let xdg_state = env.xdg_state.clone();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    tokio::task::spawn_blocking(move || {
        Command::new(PathBuf::from(assert_cmd::cargo::cargo_bin!("camplab")))
            .args(&args)
            .env("HOME", home)
            .env("XDG_CONFIG_HOME", xdg_config)
            .env("XDG_STATE_HOME", xdg_state)
            .env("NO_COLOR", "1")
            .env_remove("CAMPLAB_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .unwrap_or_else(|e| panic!("failed to execute camplab: {e}"))
    })
    .await
    .expect("camplab task panicked")
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "camplab {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn prompts_lists_partner_starters_by_default() {
    let env = CliTestEnv::new();

    let output = run_camplab(&env, &["prompts"]);
    assert_success(&["prompts"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Starter prompts (CAMP Lab)"));
    assert!(
        stdout.contains("Let's optimize my USDca minting and yield strategy"),
        "expected partner prompts, got:\n{stdout}"
    );
}

#[test]
fn persona_flag_switches_prompts() {
    let env = CliTestEnv::new();
    let args = ["--persona", "advisor", "prompts"];

    let output = run_camplab(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Analyze my portfolio performance"));
    assert!(!stdout.contains("USDca minting"));
}

#[test]
fn unknown_persona_is_rejected() {
    let env = CliTestEnv::new();
    let output = run_camplab(&env, &["--persona", "oracle", "prompts"]);
    assert!(!output.status.success());
}

#[test]
fn knowledge_search_finds_insurance_fund() {
    let env = CliTestEnv::new();
    let args = ["knowledge", "insurance"];

    let output = run_camplab(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("result(s) for 'insurance'"));
    assert!(stdout.contains("insurance."));
}

#[test]
fn knowledge_search_without_hits() {
    let env = CliTestEnv::new();
    let args = ["knowledge", "zzqqxx"];

    let output = run_camplab(&env, &args);
    assert_success(&args, &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No knowledge found"));
}

#[test]
fn status_reports_unconfigured_gateway() {
    let env = CliTestEnv::new();

    let output = run_camplab(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Endpoint:        <not set>"));
    assert!(stdout.contains("Gateway:         not ready"));
    assert!(stdout.contains("Persona:         partner"));

    let log_dir = env.xdg_state.join("camplab");
    assert!(stdout.contains(&format!("Log directory:   {}", log_dir.display())));
    assert!(
        stdout.contains(&format!("{}/camplab.log.20", log_dir.display())),
        "expected dated log file, got:\n{stdout}"
    );
}

#[test]
fn status_reports_configured_gateway() {
    let env = CliTestEnv::new();
    env.write_gateway_config("http://127.0.0.1:9");

    let output = run_camplab(&env, &["status"]);
    assert_success(&["status"], &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Gateway:         ready"));
    assert!(stdout.contains("API Key:         <set>"));
}

#[test]
fn history_explains_disabled_archive() {
    let env = CliTestEnv::new();

    let output = run_camplab(&env, &["history"]);
    assert_success(&["history"], &output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("archive is disabled"));
}

#[test]
fn ask_without_gateway_fails() {
    let env = CliTestEnv::new();

    let output = run_camplab(&env, &["ask", "hello"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not configured"));
}

#[tokio::test]
async fn ask_prints_reply_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .and(header("authorization", "Bearer cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "response": "Let's build a proposal together.",
                "analysis": { "riskLevel": "low", "confidence": 90, "responseType": "plan" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = CliTestEnv::new();
    env.write_gateway_config(&server.uri());
    let args = ["ask", "--json", "Draft a proposal"];

    let output = run_camplab_async(&env, &args).await;
    assert_success(&args, &output);

    let message: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(message["role"], "assistant");
    assert_eq!(message["content"], "Let's build a proposal together.");
    assert_eq!(message["analysis"]["riskLevel"], "low");
    assert_eq!(message["solutionProgress"]["phase"], "Solution Documentation");
}

#[tokio::test]
async fn ask_reports_gateway_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FUNCTION_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let env = CliTestEnv::new();
    env.write_gateway_config(&server.uri());

    let output = run_camplab_async(&env, &["ask", "hello"]).await;
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("experiencing technical difficulties"),
        "expected the failure entry, got:\n{stdout}"
    );
}
