//! End-to-end exam runs through the binary: start, answer, submit, review,
//! report and analysis.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

/// Two single-choice questions on one tag; the first choice is always right.
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
      "type": "single",
      "prompt": "Which record names a domain's mail server?",
      "choices": [
        {"id": "q2-a", "text": "MX", "correct": true},
        {"id": "q2-b", "text": "TXT"}
      ],
      "tags": ["dns"]
    }
  ]
}"#;

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn with_quiz() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quizforge.toml"), "").unwrap();
        std::fs::write(dir.path().join("quiz.json"), QUIZ_JSON).unwrap();
        let sandbox = Self { dir };
        sandbox
            .cmd()
            .args(["quiz", "import-json", "quiz.json"])
            .assert()
            .success();
        sandbox
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("quizforge").unwrap();
        cmd.current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .arg("--state")
            .arg(self.path("state.json"))
            .arg("--config")
            .arg(self.path("quizforge.toml"));
        cmd
    }

    fn exam(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.cmd().arg("exam").args(args).assert()
    }

    fn start(&self) {
        self.exam(&["start", "--questions", "2", "--minutes", "5", "--seed", "1"])
            .success()
            .stdout(predicate::str::contains(
                "Started 'Networks': 2 questions, 5 minutes",
            ))
            .stdout(predicate::str::contains(" left]"));
    }
}

#[test]
fn perfect_exam_scores_full_marks() {
    let sandbox = Sandbox::with_quiz();
    sandbox.start();
    sandbox.exam(&["select", "a"]).success();
    sandbox
        .exam(&["next"])
        .success()
        .stdout(predicate::str::contains("Question 2/2"));
    sandbox.exam(&["select", "1"]).success();
    sandbox
        .exam(&["submit"])
        .success()
        .stdout(predicate::str::contains("Score: 100% (2/2 correct)"));

    sandbox
        .exam(&["status"])
        .success()
        .stdout(predicate::str::contains("No exam is running."))
        .stdout(predicate::str::contains("Last attempt: 100% on Networks"));
}

#[test]
fn wrong_answers_flow_into_review_report_and_drill() {
    let sandbox = Sandbox::with_quiz();
    sandbox.start();
    sandbox.exam(&["select", "b"]).success();
    sandbox.exam(&["flag"]).success();
    sandbox.exam(&["goto", "2"]).success();
    sandbox.exam(&["select", "b"]).success();
    sandbox
        .exam(&["submit"])
        .success()
        .stdout(predicate::str::contains("Score: 0% (0/2 correct)"));

    sandbox
        .exam(&["review", "--filter", "wrong"])
        .success()
        .stdout(predicate::str::contains("filter: wrong"))
        .stdout(predicate::str::contains("1/2  wrong"))
        .stdout(predicate::str::contains("Correct answer"));

    sandbox
        .exam(&["review", "--filter", "flagged"])
        .success()
        .stdout(predicate::str::contains("1/1  wrong (flagged)"));

    sandbox
        .exam(&["review", "--filter", "all", "--next"])
        .success()
        .stdout(predicate::str::contains("2/2"));

    // Reports read finished attempts in any phase.
    sandbox
        .cmd()
        .args(["report", "--format", "md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Networks"))
        .stdout(predicate::str::contains("0%"));

    let json = sandbox
        .cmd()
        .args(["report", "--format", "json"])
        .output()
        .unwrap();
    assert!(json.status.success());
    let report: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert!(report.is_object());

    let html = sandbox.path("report.html");
    sandbox
        .cmd()
        .args(["report", "--format", "html", "--output"])
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let page = std::fs::read_to_string(&html).unwrap();
    assert!(page.contains("<html"));
    assert!(page.contains("Networks"));

    sandbox
        .cmd()
        .args(["report", "--format", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown report format 'pdf'"));

    sandbox
        .exam(&["close"])
        .success()
        .stdout(predicate::str::contains("Review closed."));

    sandbox
        .cmd()
        .arg("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("Weaknesses:"))
        .stdout(predicate::str::contains("dns"));

    let analysis = sandbox
        .cmd()
        .args(["analyze", "--json"])
        .output()
        .unwrap();
    assert!(analysis.status.success());
    let analysis: serde_json::Value = serde_json::from_slice(&analysis.stdout).unwrap();
    assert_eq!(analysis["topWeaknesses"][0]["tag"], "dns");

    sandbox
        .cmd()
        .args(["drill", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Micro-drill of 2 questions targeting dns"));

    sandbox
        .cmd()
        .args(["drill", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Micro-drill cleared."));
}

#[test]
fn new_exam_can_start_from_review() {
    let sandbox = Sandbox::with_quiz();
    sandbox.start();
    sandbox.exam(&["submit"]).success();
    sandbox.exam(&["review"]).success();
    sandbox.start();
}

#[test]
fn interactive_run_reads_commands_from_stdin() {
    let sandbox = Sandbox::with_quiz();
    sandbox.start();
    sandbox
        .cmd()
        .args(["exam", "run"])
        .write_stdin("s a\nn\ns a\nsubmit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 100% (2/2 correct)"));
}

#[test]
fn interactive_run_keeps_exam_on_quit() {
    let sandbox = Sandbox::with_quiz();
    sandbox.start();
    sandbox
        .cmd()
        .args(["exam", "run"])
        .write_stdin("f\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("The exam is still running"));
    sandbox
        .exam(&["status"])
        .success()
        .stdout(predicate::str::contains("Question 1/2"));
}

#[test]
fn expired_exam_is_submitted_on_next_command() {
    let sandbox = Sandbox::with_quiz();
    let mut state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(sandbox.path("state.json")).unwrap())
            .unwrap();
    state["currentExam"] = serde_json::json!({
        "id": "stale",
        "quizId": "net-quiz",
        "startedAt": 1000,
        "totalMinutes": 1,
        "questionIds": ["q1", "q2"]
    });
    state["examPhase"] = serde_json::json!("running");
    std::fs::write(sandbox.path("state.json"), state.to_string()).unwrap();

    sandbox
        .exam(&["select", "a"])
        .success()
        .stdout(predicate::str::contains(
            "Time is up. The exam was submitted automatically.",
        ))
        .stdout(predicate::str::contains("Score: 0% (0/2 correct)"));

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(sandbox.path("state.json")).unwrap())
            .unwrap();
    assert_eq!(state["examPhase"], "results");
    assert_eq!(state["examAttempts"][0]["autoSubmitted"], true);
}

#[test]
fn exam_commands_need_a_running_exam() {
    let sandbox = Sandbox::with_quiz();
    sandbox
        .exam(&["submit"])
        .failure()
        .stderr(predicate::str::contains("no exam is running"));
    sandbox
        .exam(&["next"])
        .failure()
        .stderr(predicate::str::contains("no exam is running"));
}

#[test]
fn exam_start_validates_input() {
    let sandbox = Sandbox::with_quiz();
    sandbox
        .exam(&["start", "--preset", "nope"])
        .failure()
        .stderr(predicate::str::contains("preset not found: nope"));
    sandbox.start();
    sandbox
        .exam(&["goto", "9"])
        .failure()
        .stderr(predicate::str::contains("question number must be between 1 and 2"));
    sandbox
        .exam(&["select", "z"])
        .failure()
        .stderr(predicate::str::contains("no choice 'z'"));
    sandbox
        .exam(&["start", "--questions", "2", "--minutes", "5"])
        .failure()
        .stdout(predicate::str::contains("Started").not())
        .stderr(predicate::str::contains("start exam failed"));
}
