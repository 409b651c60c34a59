mod support;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

use support::TestBase;

#[test]
fn blacklock_help_works() {
    Command::cargo_bin("blacklock")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("local task and progress store"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "init", "status", "migrate", "account", "task", "category", "folder", "backup", "data",
        "settings", "focus", "log",
    ];

    for cmd in subcommands {
        Command::cargo_bin("blacklock")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn init_creates_store_and_config() {
    let base = TestBase::new();
    let out = base.json(&["init"]);
    assert_eq!(out["schema_version"], "blacklock.v1");
    assert_eq!(out["command"], "init");
    assert_eq!(out["status"], "success");
    assert_eq!(out["data"]["created"]["store"], Value::Bool(true));
    assert_eq!(out["data"]["created"]["config"], Value::Bool(true));
    assert_eq!(out["data"]["seeded_categories"], 8);
    assert!(base.path().join("blacklock.toml").is_file());

    let again = base.json(&["init"]);
    assert_eq!(again["data"]["created"]["store"], Value::Bool(false));
    assert_eq!(again["data"]["seeded_categories"], 0);
}

#[test]
fn task_lifecycle_through_the_cli() {
    let base = TestBase::new();
    base.cmd()
        .args(["account", "create", "hero"])
        .assert()
        .success()
        .stdout(contains("account created"));

    let added = base.json(&["task", "add", "Buy milk", "--reward", "150"]);
    assert_eq!(added["command"], "task add");
    let id = added["data"]["id"].as_str().expect("id").to_string();
    assert_eq!(added["data"]["taskName"], "Buy milk");

    let listed = base.json(&["task", "list", "--open"]);
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["tasks"][0]["id"], id.as_str());

    let done = base.json(&["task", "complete", &id]);
    assert_eq!(done["data"]["experienceGained"], 150);
    assert_eq!(done["data"]["levelAfter"], 2);
    assert_eq!(done["data"]["leveledUp"], Value::Bool(true));

    let again = base.json(&["task", "complete", &id]);
    assert_eq!(again["data"]["experienceGained"], 0);

    let account = base.json(&["account", "show"]);
    assert_eq!(account["data"]["experience"], 150);
    assert_eq!(base.json(&["task", "list", "--open"])["data"]["total"], 0);
}

#[test]
fn pin_guards_completion() {
    let base = TestBase::new();
    base.cmd().args(["settings", "set-pin", "4321"]).assert().success();
    let added = base.json(&["task", "add", "Guarded"]);
    let id = added["data"]["id"].as_str().expect("id").to_string();

    base.cmd()
        .args(["task", "complete", &id, "--pin", "0000"])
        .assert()
        .code(2);
    base.cmd()
        .args(["task", "complete", &id, "--pin", "4321"])
        .assert()
        .success();
}

#[test]
fn backup_create_and_list() {
    let base = TestBase::new();
    base.cmd().args(["task", "add", "Stretch"]).assert().success();

    let created = base.json(&["backup", "create"]);
    let filename = created["data"]["filename"].as_str().expect("filename");
    assert!(filename.starts_with("backup-"));

    let listed = base.json(&["backup", "list"]);
    assert_eq!(listed["data"].as_array().expect("array").len(), 1);
    assert_eq!(listed["data"][0]["filename"], filename);
}

#[test]
fn backup_clean_rejects_out_of_range_window() {
    let base = TestBase::new();
    base.cmd()
        .args(["backup", "clean", "--keep-days", "200000000"])
        .assert()
        .code(2);
    base.cmd()
        .args(["backup", "clean", "--keep-days", "36500"])
        .assert()
        .success();
}

#[test]
fn data_export_then_import_into_another_base() {
    let source = TestBase::new();
    source.cmd().args(["task", "add", "Carry over"]).assert().success();
    let export_path = source.path().join("export.json");
    source
        .cmd()
        .args(["data", "export"])
        .arg(&export_path)
        .assert()
        .success();

    let target = TestBase::new();
    let out = target
        .cmd()
        .arg("--json")
        .args(["data", "import"])
        .arg(&export_path)
        .output()
        .expect("run");
    assert!(out.status.success());
    let envelope: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(envelope["data"]["tasks"], 1);

    let listed = target.json(&["task", "list"]);
    assert_eq!(listed["data"]["tasks"][0]["taskName"], "Carry over");
}

#[test]
fn unknown_task_exits_with_user_error_and_hint() {
    let base = TestBase::new();
    base.cmd()
        .args(["task", "show", "missing"])
        .assert()
        .code(2)
        .stderr(contains("Task not found: missing"))
        .stderr(contains("hint: blacklock task list"));

    let out = base.json(&["task", "show", "missing"]);
    assert_eq!(out["status"], "error");
    assert_eq!(out["error"]["kind"], "user_error");
    assert_eq!(out["next_steps"][0], "blacklock task list");
}

#[test]
fn default_category_delete_is_blocked() {
    let base = TestBase::new();
    let categories = base.json(&["category", "list"]);
    let id = categories["data"][0]["id"].as_str().expect("id").to_string();
    base.cmd().args(["category", "rm", &id]).assert().code(3);
}

#[test]
fn blocked_commands_land_in_the_activity_log() {
    let base = TestBase::new();
    let categories = base.json(&["category", "list"]);
    let id = categories["data"][0]["id"].as_str().expect("id").to_string();
    base.cmd().args(["category", "rm", &id]).assert().code(3);
    base.cmd().args(["task", "show", "missing"]).assert().code(2);

    let logs = base.json(&["log", "list"]);
    assert_eq!(logs["command"], "log list");
    let entries = logs["data"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "warning");
    assert_eq!(entries[0]["data"]["code"], 3);

    base.cmd()
        .args(["log", "list"])
        .assert()
        .success()
        .stdout(contains("warning"));
}
