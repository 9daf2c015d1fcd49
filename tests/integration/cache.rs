//! Reuse and invalidation of cached evaluations.

use std::fs;
use std::time::{Duration, SystemTime};

use crate::common::TestProject;

fn cache_entries(project: &TestProject) -> usize {
    fs::read_dir(project.cache_dir())
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

#[test]
fn test_evaluation_is_cached() {
    let project = TestProject::new();
    let file = project.write("app.toml", "a = 'x'\nb = '{{ .a }}y'\n");

    project.cmd().arg("-t").arg(&file).args(["-q", "b"]).assert().success().stdout("xy\n");
    assert_eq!(cache_entries(&project), 1);

    // Same sources, same key: still one entry and the same answer
    project.cmd().arg("-t").arg(&file).args(["-q", "b"]).assert().success().stdout("xy\n");
    assert_eq!(cache_entries(&project), 1);
}

#[test]
fn test_skip_cache_writes_nothing() {
    let project = TestProject::new();
    let file = project.write("app.toml", "a = 1\n");

    project.uncached().arg("-t").arg(&file).args(["-q", "a"]).assert().success().stdout("1\n");
    assert_eq!(cache_entries(&project), 0);
}

#[test]
fn test_modified_source_invalidates_cache() {
    let project = TestProject::new();
    let file = project.write("app.toml", "a = 'old'\n");

    project.cmd().arg("-t").arg(&file).args(["-q", "a"]).assert().success().stdout("old\n");

    fs::write(&file, "a = 'new'\n").unwrap();
    let handle = fs::File::options().write(true).open(&file).unwrap();
    handle.set_modified(SystemTime::now() + Duration::from_secs(3600)).unwrap();

    project.cmd().arg("-t").arg(&file).args(["-q", "a"]).assert().success().stdout("new\n");
}

#[test]
fn test_cached_evaluation_is_projected_per_run() {
    let project = TestProject::new();
    let file = project.write("envs.toml", "[env.prod]\nhost = 'p'\n[env.dev]\nhost = 'd'\n");

    project.cmd().arg("-t").arg(&file).args(["-p", "env.prod", "-q", "host"]).assert().stdout("p\n");
    project.cmd().arg("-t").arg(&file).args(["-p", "env.dev", "-q", "host"]).assert().stdout("d\n");
    assert_eq!(cache_entries(&project), 1);
}

#[test]
fn test_cache_disabled_in_settings() {
    let project = TestProject::new();
    let settings = format!("shell = \"sh\"\ncache = false\ncache_dir = {:?}\n", project.cache_dir().display().to_string());
    project.write("settings.toml", &settings);
    let file = project.write("app.toml", "a = 1\n");

    project.cmd().arg("-t").arg(&file).args(["-q", "a"]).assert().success().stdout("1\n");
    assert_eq!(cache_entries(&project), 0);
}

#[test]
fn test_same_relative_path_in_two_directories() {
    let project = TestProject::new();
    fs::create_dir(project.path().join("first")).unwrap();
    fs::create_dir(project.path().join("second")).unwrap();
    project.write("first/app.toml", "name = 'first'\n");
    project.write("second/app.toml", "name = 'second'\n");

    project
        .cmd()
        .current_dir(project.path().join("first"))
        .args(["-t", "app.toml", "-q", "name"])
        .assert()
        .success()
        .stdout("first\n");
    project
        .cmd()
        .current_dir(project.path().join("second"))
        .args(["-t", "app.toml", "-q", "name"])
        .assert()
        .success()
        .stdout("second\n");
    assert_eq!(cache_entries(&project), 2);
}
