//! CLI integration tests for chattermate
//!
//! Tests the chattermate CLI commands end-to-end using assert_cmd. Every test
//! gets its own database file and config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("chattermate").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env("CHATTERMATE_CONFIG_DIR", self.dir.path().join("config"));
        cmd.env_remove("CHATTERMATE_DATABASE_PATH");
        cmd.env_remove("RUST_LOG");
        cmd.arg("--database").arg(self.dir.path().join("chattermate.db"));
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(["--format", "json"])
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn create_org(&self, name: &str, domain: &str) -> Value {
        self.json(&["orgs", "create", name, "--domain", domain])
    }

    fn create_agent(&self, org: &str, name: &str, extra: &[&str]) -> Value {
        let mut args = vec!["agents", "create", org, name];
        args.extend_from_slice(extra);
        self.json(&args)
    }
}

#[test]
fn test_help_command() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("agents"))
        .stdout(predicate::str::contains("orgs"));
}

#[test]
fn test_version_output() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chattermate"));
}

#[test]
fn test_info_command() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("ChatterMate API"))
        .stdout(predicate::str::contains("pong"));
}

#[test]
fn test_setup_status_flips_after_first_org() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["orgs", "status"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("not_setup"));

    sandbox
        .cmd()
        .args(["orgs", "create", "Acme", "--domain", "acme.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Organization created successfully"));

    let status = sandbox.json(&["orgs", "status"]);
    assert_eq!(status["status"], "setup");
    assert_eq!(status["organization_count"], 1);
}

#[test]
fn test_agent_lifecycle() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");

    let agent = sandbox.create_agent(
        "acme.com",
        "Support",
        &[
            "--type",
            "customer_support",
            "-i",
            "Greet the customer",
            "-i",
            "Be concise",
            "--tools",
            r#"{"search":{"enabled":true}}"#,
        ],
    );
    let id = agent["id"].as_str().unwrap().to_string();
    assert_eq!(agent["agent_type"], "customer_support");
    assert_eq!(
        agent["instructions"],
        serde_json::json!(["Greet the customer", "Be concise"])
    );
    assert_eq!(agent["tools"]["search"]["enabled"], true);

    let shown = sandbox.json(&["agents", "show", &id]);
    assert_eq!(shown["name"], "Support");
    assert_eq!(shown["organization"]["domain"], "acme.com");
    assert_eq!(shown["groups"], serde_json::json!([]));

    let updated = sandbox.json(&["agents", "update", &id, "--instructions", "not json"]);
    assert_eq!(updated["instructions"], serde_json::json!(["not json"]));

    let updated = sandbox.json(&["agents", "update", &id, "--instructions", r#"["a","b"]"#]);
    assert_eq!(updated["instructions"], serde_json::json!(["a", "b"]));

    sandbox
        .cmd()
        .args(["agents", "delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("deactivated"));
    sandbox.cmd().args(["agents", "delete", &id]).assert().success();

    assert_eq!(sandbox.json(&["agents", "list", "acme.com"]), serde_json::json!([]));
    assert_eq!(
        sandbox.json(&["agents", "list", "acme.com", "--all"])[0]["is_active"],
        false
    );
    assert_eq!(sandbox.json(&["agents", "count", "acme.com"])["count"], 1);
}

#[test]
fn test_default_agent_is_reassigned_by_update() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");

    let first = sandbox.create_agent("acme.com", "First", &["--default"]);
    let second = sandbox.create_agent("acme.com", "Second", &[]);
    let second_id = second["id"].as_str().unwrap();

    assert_eq!(
        sandbox.json(&["agents", "default", "acme.com"])["id"],
        first["id"]
    );

    sandbox.json(&["agents", "update", second_id, "--default", "true"]);

    let current = sandbox.json(&["agents", "default", "acme.com"]);
    assert_eq!(current["id"], second["id"]);

    let all = sandbox.json(&["agents", "list", "acme.com"]);
    let defaults = all
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["is_default"] == true)
        .count();
    assert_eq!(defaults, 1);
}

#[test]
fn test_duplicate_agent_name_rejected() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");
    sandbox.create_agent("acme.com", "Support", &[]);

    sandbox
        .cmd()
        .args(["agents", "create", "acme.com", "Support"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E003"));
}

#[test]
fn test_same_agent_name_in_two_organizations() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");
    sandbox.create_org("Globex", "globex.io");

    let a = sandbox.create_agent("acme.com", "Support", &[]);
    let b = sandbox.create_agent("globex.io", "Support", &[]);
    assert_ne!(a["id"], b["id"]);
}

#[test]
fn test_show_malformed_and_missing_agent() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["agents", "show", "12345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E100"));

    sandbox
        .cmd()
        .args(["agents", "show", "00000000-0000-4000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"))
        .stderr(predicate::str::contains("chattermate agents list"));
}

#[test]
fn test_agent_for_unknown_organization_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["agents", "create", "nowhere.io", "Bot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E002"));
}

#[test]
fn test_groups_show_up_on_agent() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");
    let agent = sandbox.create_agent("acme.com", "Support", &[]);
    let agent_id = agent["id"].as_str().unwrap();

    let group = sandbox.json(&["groups", "create", "acme.com", "Escalations"]);
    let group_id = group["id"].as_str().unwrap();

    sandbox.json(&["groups", "assign", group_id, agent_id]);
    sandbox.json(&["groups", "assign", group_id, agent_id]);

    let shown = sandbox.json(&["agents", "show", agent_id]);
    let groups = shown["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["name"], "Escalations");
}

#[test]
fn test_groups_assign_across_organizations_fails() {
    let sandbox = Sandbox::new();
    sandbox.create_org("Acme", "acme.com");
    sandbox.create_org("Globex", "globex.io");
    let agent = sandbox.create_agent("acme.com", "Support", &[]);
    let agent_id = agent["id"].as_str().unwrap();
    let group = sandbox.json(&["groups", "create", "globex.io", "Escalations"]);
    let group_id = group["id"].as_str().unwrap();

    sandbox
        .cmd()
        .args(["groups", "assign", group_id, agent_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E101"));

    let shown = sandbox.json(&["agents", "show", agent_id]);
    assert!(shown["groups"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_set_and_get() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "set", "service.name", "Support Desk"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config", "get", "service.name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Support Desk"));

    sandbox
        .cmd()
        .args(["config", "set", "database.max_connections", "0"])
        .assert()
        .failure();

    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_db_status_after_migrate() {
    let sandbox = Sandbox::new();

    sandbox.cmd().args(["db", "migrate"]).assert().success();

    let status = sandbox.json(&["db", "status"]);
    assert_eq!(status["current_version"], status["target_version"]);
    assert_eq!(status["needs_migration"], false);
}

#[test]
fn test_doctor_command() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database"));
}
