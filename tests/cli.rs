mod common;

use common::TestEnv;
use predicates::str::contains;

#[test]
fn top_level_help_names_the_pipeline_steps() {
    let env = TestEnv::new();
    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("compile"))
        .stdout(contains("publish"))
        .stdout(contains("compliance"));
}

#[test]
fn compile_text_output() {
    let env = TestEnv::new();
    env.cmd()
        .args([
            "compile",
            "--account",
            "svc-backup",
            "--node",
            "web-01",
            "--out",
            "./output",
        ])
        .assert()
        .success()
        .stdout(contains("compiled"))
        .stdout(contains("web-01.mof"));
}

#[test]
fn cache_clear_text_output_when_nothing_cached() {
    let env = TestEnv::new();
    env.cmd()
        .args(["cache", "clear", "--name", "svc-backup-audit", "--version", "1.0.0"])
        .assert()
        .success()
        .stdout(contains("cleared 0 cached extraction(s)"));
}

#[test]
fn package_test_rejects_malformed_parameter() {
    let env = TestEnv::new();
    std::fs::write(env.work.join("pkg-1.0.0.tar.gz"), "stub").expect("stub archive");
    env.cmd()
        .args([
            "package",
            "test",
            "--package",
            "./pkg-1.0.0.tar.gz",
            "--parameter",
            "not-a-pair",
        ])
        .assert()
        .failure()
        .stderr(contains("expected key=value"));
}
