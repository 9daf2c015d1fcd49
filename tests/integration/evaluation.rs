//! End-to-end evaluation: references, splices, promotion and narrowing.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_hello_world() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "a = 'hello'\nb = '{{.a}} world'", "-q", "b"])
        .assert()
        .success()
        .stdout("hello world\n");
}

#[test]
fn test_relative_references_inside_tables() {
    let project = TestProject::new();
    let file = project.write(
        "app.toml",
        r#"
[server]
host = "example.com"
port = 8080
url = "http://{{ .host }}:{{ .port }}"

[client]
endpoint = "{{ .server.url }}/api"
"#,
    );

    project
        .uncached()
        .arg("-t")
        .arg(&file)
        .args(["-q", "client.endpoint"])
        .assert()
        .success()
        .stdout("http://example.com:8080/api\n");
}

#[test]
fn test_later_sources_win() {
    let project = TestProject::new();
    let base = project.write("base.toml", "[db]\nhost = 'base'\nport = 1\n");
    let prod = project.write("prod.toml", "[db]\nhost = 'prod'\n");

    project
        .uncached()
        .arg("-t")
        .arg(&base)
        .arg("-t")
        .arg(&prod)
        .args(["-T", "db.port = 2", "-o", "flat"])
        .assert()
        .success()
        .stdout("db.host: prod\ndb.port: 2\n");
}

#[test]
fn test_splices_into_tables_and_arrays() {
    let project = TestProject::new();
    let file = project.write(
        "splice.toml",
        r#"
[shared]
base_args = ["--quiet", "--color=never"]

[shared.defaults]
retries = 3

[job]
"-" = "shared.defaults"
args = [{ "-" = ["shared.base_args"] }, "run"]
"#,
    );

    project
        .uncached()
        .arg("-t")
        .arg(&file)
        .args(["-n", "job", "-o", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retries = 3"))
        .stdout(predicate::str::contains(r#"args = ["--quiet", "--color=never", "run"]"#));
}

#[test]
fn test_promotion_exposes_environment() {
    let project = TestProject::new();
    let file = project.write(
        "envs.toml",
        r#"
name = "svc"

[env.prod]
host = "prod.example.com"

[env.dev]
host = "localhost"
"#,
    );

    project
        .uncached()
        .arg("-t")
        .arg(&file)
        .args(["-p", "env.prod", "-R", "{{ .name }}@{{ .host }}"])
        .assert()
        .success()
        .stdout("svc@prod.example.com\n");
}

#[test]
fn test_shell_helpers() {
    let project = TestProject::new();

    project
        .uncached()
        .args([
            "-T",
            "greeting = \"{{ sh(cmd='echo hello') }}\"\nloud = \"{{ .greeting | shpipe(cmd='tr a-z A-Z') }}\"",
            "-q",
            "loud",
        ])
        .assert()
        .success()
        .stdout("HELLO\n");
}

#[test]
fn test_chained_references_resolve_in_one_run() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "a = '{{ .b }}-a'\nb = '{{ .c }}-b'\nc = 'c'", "-o", "keys", "-q", "a"])
        .assert()
        .success()
        .stdout("a\nb\nc\nc-b-a\n");
}
