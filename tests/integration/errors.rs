//! Exit status and error reporting.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_missing_splice_target() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "[job]\n\"-\" = \"shared.nope\"", "-o", "keys"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing target 'shared.nope'"));
}

#[test]
fn test_reference_cycle() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "a = '{{ .b }}'\nb = '{{ .a }}'", "-q", "a"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not terminate"));
}

#[test]
fn test_missing_source_file() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-t", "does-not-exist.toml", "-o", "keys"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to read source file"))
        .stderr(predicate::str::contains("does-not-exist.toml"));
}

#[test]
fn test_invalid_toml() {
    let project = TestProject::new();
    let file = project.write("broken.toml", "[server\nhost = 1\n");

    project
        .uncached()
        .arg("-t")
        .arg(&file)
        .args(["-o", "keys"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse"))
        .stderr(predicate::str::contains("broken.toml"));
}

#[test]
fn test_narrow_to_missing_path() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "[server]\nhost = 'h'", "-n", "sever", "-o", "keys"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Path 'sever' not found"))
        .stderr(predicate::str::contains("Did you mean: server?"));
}

#[test]
fn test_invalid_settings_file() {
    let project = TestProject::new();
    project.write("settings.toml", "max_render_iterations = 0\n");

    project
        .uncached()
        .args(["-T", "a = 1", "-q", "a"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("max_render_iterations"));
}

#[test]
fn test_unknown_output_kind_is_a_usage_error() {
    let project = TestProject::new();

    project
        .uncached()
        .args(["-T", "a = 1", "-o", "yaml"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value 'yaml'"));
}
