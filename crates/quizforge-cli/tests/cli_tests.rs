use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const QUIZ_JSON: &str = r#"{
  "id": "net-quiz",
  "title": "Networks",
  "topic": "networking",
  "questions": [
    {
      "id": "q1",
      "type": "single",
      "prompt": "Which record maps a name to an IPv4 address?",
      "choices": [
        {"id": "q1-a", "text": "A", "correct": true},
        {"id": "q1-b", "text": "MX"}
      ],
      "explanation": "A records hold IPv4 addresses.",
      "tags": ["dns"]
    },
    {
      "id": "q2",
      "type": "short",
      "prompt": "Which port does HTTPS use by default?",
      "answerText": "443",
      "tags": ["ports"]
    }
  ]
}"#;

/// A scratch directory with its own state and config paths.
struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quizforge.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = quizforge();
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env_remove("QUIZFORGE_OPENAI_KEY")
            .arg("--state")
            .arg(self.path("state.json"))
            .arg("--config")
            .arg(self.path("quizforge.toml"));
        cmd
    }

    fn import_quiz(&self) {
        let file = self.write("quiz.json", QUIZ_JSON);
        self.cmd()
            .args(["quiz", "import-json"])
            .arg(file)
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 'Networks' with 2 questions"));
    }
}

fn quizforge() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("quizforge").unwrap()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn help_lists_commands() {
    quizforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exam"))
        .stdout(predicate::str::contains("review"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn init_writes_config_and_sample() {
    let dir = tempfile::tempdir().unwrap();
    quizforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizforge.toml"))
        .stdout(predicate::str::contains("Created sample-quiz.csv"));

    let config = read(&dir.path().join("quizforge.toml"));
    assert!(config.contains("[providers.openai]"));
    assert!(config.contains("type = \"mock\""));
    assert!(read(&dir.path().join("sample-quiz.csv")).starts_with("prompt;answer;tags"));

    quizforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));
}

#[test]
fn presets_lists_builtins() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("aws-ccp-65x90"))
        .stdout(predicate::str::contains("secplus-90x90"))
        .stdout(predicate::str::contains("custom-20x30"));
}

#[test]
fn csv_import_list_show_and_export() {
    let sandbox = Sandbox::new();
    let csv = sandbox.write(
        "deck.csv",
        "Prompt;Answer;Tags\nWhat does DNS translate?;Names to addresses;dns basics\n;443;\n",
    );
    sandbox
        .cmd()
        .args(["quiz", "import-csv"])
        .arg(&csv)
        .args(["--title", "Deck"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 questions as 'Deck'"));

    sandbox
        .cmd()
        .args(["quiz", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deck"));

    sandbox
        .cmd()
        .args(["quiz", "show", "--answers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("What does DNS translate?"))
        .stdout(predicate::str::contains("Q2"))
        .stdout(predicate::str::contains("answer: 443"));

    sandbox
        .cmd()
        .args(["quiz", "export-csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("prompt;answer;tags"))
        .stdout(predicate::str::contains(
            "What does DNS translate?;Names to addresses;dns basics",
        ));
}

#[test]
fn state_persists_between_runs() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    let state: serde_json::Value =
        serde_json::from_str(&read(&sandbox.path("state.json"))).unwrap();
    assert_eq!(state["activeQuizId"], "net-quiz");
    assert_eq!(state["quizzes"][0]["questions"][1]["answerText"], "443");
}

#[test]
fn importing_the_same_quiz_twice_keeps_both() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox.import_quiz();
    let state: serde_json::Value =
        serde_json::from_str(&read(&sandbox.path("state.json"))).unwrap();
    let quizzes = state["quizzes"].as_array().unwrap();
    assert_eq!(quizzes.len(), 2);
    assert_ne!(quizzes[0]["id"], quizzes[1]["id"]);
}

#[test]
fn sources_drive_trust_score() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["quiz", "add-source", "q1", "--url", "https://example.org/dns"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["quiz", "add-source", "q1", "--note", "RFC 1035 (2024 errata)"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["quiz", "trust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Which record maps"))
        .stdout(predicate::str::contains("yes"));

    sandbox
        .cmd()
        .args(["quiz", "remove-source", "q1", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source positions start at 1"));

    sandbox
        .cmd()
        .args(["quiz", "add-source", "q1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one of"));
}

#[test]
fn backup_export_and_import() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["quiz", "add-source", "q1", "--url", "https://example.org/2025/dns"])
        .assert()
        .success();
    let backup = sandbox.path("backup.json");
    sandbox
        .cmd()
        .arg("export")
        .arg("--output")
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 quizzes"));

    let bundle: serde_json::Value = serde_json::from_str(&read(&backup)).unwrap();
    assert_eq!(bundle["quizzes"][0]["id"], "net-quiz");
    assert!(bundle["examPresets"].as_array().is_some_and(|p| !p.is_empty()));

    let fresh = tempfile::tempdir().unwrap();
    let fresh_state = fresh.path().join("state.json");
    quizforge()
        .current_dir(fresh.path())
        .env("HOME", fresh.path())
        .arg("--state")
        .arg(&fresh_state)
        .arg("--config")
        .arg(sandbox.path("quizforge.toml"))
        .arg("import")
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 quizzes"));
    let original: serde_json::Value =
        serde_json::from_str(&read(&sandbox.path("state.json"))).unwrap();
    let restored: serde_json::Value = serde_json::from_str(&read(&fresh_state)).unwrap();
    assert_eq!(restored["quizzes"][0], original["quizzes"][0]);
    assert_eq!(
        restored["quizzes"][0]["sources"]["q1"][0]["url"],
        "https://example.org/2025/dns"
    );
}

#[test]
fn import_rejects_non_bundle() {
    let sandbox = Sandbox::new();
    let file = sandbox.write("bad.json", "[1, 2, 3]");
    sandbox
        .cmd()
        .arg("import")
        .arg(file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn review_seed_due_and_grade() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["review", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 2 new review cards for 'Networks'"));

    sandbox
        .cmd()
        .args(["review", "due"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 card(s) due"));

    sandbox
        .cmd()
        .args(["review", "grade", "q1", "good"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Graded good. Next review in"));

    sandbox
        .cmd()
        .args(["review", "due"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 card(s) due"));

    sandbox
        .cmd()
        .args(["review", "grade", "q2", "perfect"])
        .assert()
        .failure();

    // Seeding again adds nothing.
    sandbox
        .cmd()
        .args(["review", "seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded 0 new review cards"));
}

#[test]
fn practice_session_records_answers() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["practice", "start", "--mode", "cram"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started cram practice on 'Networks'"));

    sandbox
        .cmd()
        .args(["practice", "answer", "q1", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Correct."))
        .stdout(predicate::str::contains("Why: A records hold IPv4 addresses."));

    sandbox
        .cmd()
        .args(["practice", "answer", "q2", "443"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not auto-scored"));

    sandbox
        .cmd()
        .args(["practice", "finish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice finished: 2 answered, 1 correct"));

    sandbox
        .cmd()
        .args(["practice", "finish"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no open practice session"));
}

#[test]
fn unknown_quiz_is_an_error() {
    let sandbox = Sandbox::new();
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["quiz", "show", "--quiz", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quiz not found: nope"));
}

#[test]
fn no_active_quiz_is_an_error() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["quiz", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no active quiz"));
}

#[test]
fn missing_explicit_config_fails() {
    let sandbox = Sandbox::new();
    quizforge()
        .current_dir(sandbox.dir.path())
        .arg("--config")
        .arg(sandbox.path("missing.toml"))
        .arg("presets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn generate_creates_quiz_from_mock_reply() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "quizforge.toml",
        r#"
default_provider = "offline"

[providers.offline]
type = "mock"
response = '''Here you go:
[{"type":"single","prompt":"Which record type holds an IPv6 address?","choices":[{"text":"AAAA","correct":true},{"text":"CNAME"}],"tags":["dns"]},
 {"type":"short","prompt":"What does TTL stand for?","answerText":"Time to live"}]'''
"#,
    );

    sandbox
        .cmd()
        .args(["generate", "--topic", "dns", "--count", "2", "--title", "DNS drill"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 'DNS drill' with 2 questions"));

    sandbox
        .cmd()
        .args(["quiz", "show", "--answers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AAAA"))
        .stdout(predicate::str::contains("Time to live"));
}

#[test]
fn generate_fails_without_items() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "quizforge.toml",
        "default_provider = \"offline\"\n\n[providers.offline]\ntype = \"mock\"\nresponse = \"I cannot help with that.\"\n",
    );
    sandbox
        .cmd()
        .args(["generate", "--topic", "dns"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did not contain any quiz items"));
}

#[test]
fn generate_with_unconfigured_provider_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["generate", "--topic", "dns", "--provider", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'nowhere' is not configured"));
}

#[test]
fn models_lists_configured_providers() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "quizforge.toml",
        "default_provider = \"offline\"\n\n[providers.offline]\ntype = \"mock\"\n",
    );
    sandbox
        .cmd()
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("offline"))
        .stdout(predicate::str::contains("mock-model"));

    sandbox
        .cmd()
        .args(["models", "--provider", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'nowhere' is not configured"));
}

#[test]
fn models_without_providers_points_to_init() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("No providers configured"));
}

#[test]
fn coach_replies_through_provider() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "quizforge.toml",
        r#"
default_provider = "offline"

[providers.offline]
type = "mock"
response = "Focus on record types first."
"#,
    );
    sandbox.import_quiz();
    sandbox
        .cmd()
        .args(["coach", "--message", "What should I study?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("> What should I study?"))
        .stdout(predicate::str::contains("Focus on record types first."));
}
