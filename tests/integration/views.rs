//! Output formats, queries and render targets.

use predicates::prelude::*;

use crate::common::TestProject;

const APP: &str = r#"
name = "svc"
ports = [80, 443]

[my-app]
"log.level" = "info"
motd = "it's {{ .name }}"
"#;

#[test]
fn test_keys_view_is_sorted_and_skips_arrays() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", APP, "-o", "keys"])
        .assert()
        .success()
        .stdout("my-app.log.level\nmy-app.motd\nname\n");
}

#[test]
fn test_shell_view_escapes_names_and_quotes() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", APP, "-o", "shell"])
        .assert()
        .success()
        .stdout("my_app_log_level='info'\nmy_app_motd='it'\\''s svc'\nname='svc'\n");
}

#[test]
fn test_toml_view_keeps_arrays() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", APP, "-o", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ports = [80, 443]"))
        .stdout(predicate::str::contains("motd = \"it's svc\""));
}

#[test]
fn test_narrow_before_view() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", APP, "-n", "my-app", "-o", "flat"])
        .assert()
        .success()
        .stdout("log.level: info\nmotd: it's svc\n");
}

#[test]
fn test_render_targets_then_query_then_string() {
    let project = TestProject::new();
    let first = project.write("first.tmpl", "name={{ .name }}");
    let second = project.write("second.tmpl", "{% for p in ports %}{{ p }};{% endfor %}");

    project
        .uncached()
        .args(["-T", APP])
        .arg("-r")
        .arg(&first)
        .arg("-r")
        .arg(&second)
        .args(["-q", "ports.1", "-R", "done"])
        .assert()
        .success()
        .stdout("name=svc\n80;443;\n443\ndone\n");
}

#[test]
fn test_no_output_flags_prints_nothing() {
    let project = TestProject::new();

    project.uncached().args(["-T", APP]).assert().success().stdout("");
}
