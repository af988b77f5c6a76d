use assert_cmd::Command;
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

fn bizunit() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bizunit"));
    for var in [
        "BIZUNIT_ENV",
        "BIZUNIT_RDB_URL",
        "BIZUNIT_REDIS_URL",
        "BIZUNIT_STORE_URL",
        "DATABASE_URL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write");
    path.to_string_lossy().into_owned()
}

fn json_stdout(cmd: &mut Command, code: i32) -> JsonValue {
    let out = cmd.assert().code(code).get_output().stdout.clone();
    serde_json::from_slice(&out).expect("json output")
}

const ECHO_PLAN: &str = r#"
name: echo
blocks:
  - type: operator
    action: request
    template:
      id: in
      body: [sku]
  - type: operator
    action: response
    template:
      context:
        type: reference
        action: operator
        template:
          id: in
"#;

#[test]
fn run_prints_the_response() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", ECHO_PLAN);
    let request = write(
        &dir,
        "request.json",
        r#"{"method": "POST", "path": "/orders", "body": {"sku": "A-1", "qty": 2}}"#,
    );
    let result = json_stdout(
        bizunit().args(["run", &plan, "--request", &request, "--format", "json"]),
        0,
    );
    assert_eq!(result["outcome"], "responded");
    assert_eq!(result["response"]["status"], 200);
    assert_eq!(result["response"]["body"], json!({"sku": "A-1"}));
    assert_eq!(result["runId"].as_str().unwrap().len(), 36);
}

#[test]
fn completed_plans_answer_no_content() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        &dir,
        "plan.yaml",
        r#"
name: quiet
blocks:
  - type: flow
    action: store
    template:
      name: greeting
      value: {type: primitive, action: string, template: {value: hi}}
"#,
    );
    let result = json_stdout(bizunit().args(["run", &plan, "--format", "json"]), 0);
    assert_eq!(result["outcome"], "completed");
    assert_eq!(result["response"]["status"], 204);
}

#[test]
fn failed_runs_exit_3_with_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        &dir,
        "plan.yaml",
        r#"
name: fails
blocks:
  - type: reference
    action: block
    template:
      name: nothing-stored
"#,
    );
    let result = json_stdout(bizunit().args(["run", &plan, "--format", "json"]), 3);
    assert_eq!(result["outcome"], "failed");
    assert_eq!(result["response"]["status"], 400);
    assert_eq!(result["response"]["body"]["kind"], "invalid_argument");
    assert_eq!(result["response"]["body"]["field"], "name");
}

#[test]
fn invalid_plans_do_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", "name: ''\nblocks: []\n");
    bizunit().args(["run", &plan]).assert().code(2);
}

#[test]
fn config_and_env_flags_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", ECHO_PLAN);
    let config = write(&dir, "bizunit.yaml", "app_env: staging\nlog:\n  level: warn\n");

    let result = json_stdout(
        bizunit().args(["run", &plan, "--config", &config, "--env", "production", "--format", "json"]),
        0,
    );
    assert_eq!(result["outcome"], "responded");

    bizunit()
        .args(["run", &plan, "--config", &config, "--env", "mars"])
        .assert()
        .code(4);

    let broken = write(&dir, "broken.yaml", "app_env: [1, 2]\n");
    bizunit().args(["run", &plan, "--config", &broken]).assert().code(4);

    let no_timeout = write(&dir, "no-timeout.yaml", "transport:\n  timeout_ms: 0\n");
    bizunit().args(["run", &plan, "--config", &no_timeout]).assert().code(4);
}

#[test]
fn map_entries_named_type_run() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        &dir,
        "plan.yaml",
        r#"
name: payment
blocks:
  - type: flow
    action: store
    template:
      name: payment
      value:
        type: primitive
        action: map
        template:
          entries:
            type: {type: primitive, action: string, template: {value: card}}
            amount: {type: primitive, action: integer, template: {value: 5}}
"#,
    );
    bizunit().args(["validate", &plan]).assert().success();
    let result = json_stdout(bizunit().args(["run", &plan, "--format", "json"]), 0);
    assert_eq!(result["outcome"], "completed");
}

#[test]
fn unresolvable_secrets_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", ECHO_PLAN);
    let config = write(&dir, "bizunit.yaml", "resources:\n  rdb_url: file://missing-secret\n");
    bizunit()
        .args(["run", &plan, "--config", &config])
        .assert()
        .code(4);
}

#[test]
fn publish_requires_a_store_url() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", ECHO_PLAN);
    bizunit().args(["publish", &plan]).assert().code(4);
    bizunit().args(["show", "echo"]).assert().code(4);
}

#[test]
fn publish_validates_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(&dir, "plan.yaml", "name: x\nblocks:\n  - type: nope\n    action: nope\n");
    bizunit()
        .args(["publish", &plan, "--store", "postgres://app:pw@127.0.0.1:1/plans"])
        .assert()
        .code(2);
}
