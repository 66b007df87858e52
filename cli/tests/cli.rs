use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use std::process::Output;

const TWO_STEPS: &str = "\
# @begin A
# @out x = file1
# @end A
# @begin B
# @in y = file1
# @end B
";

fn yw() -> Command {
    Command::new(assert_cmd::cargo_bin!("yw"))
}

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write script");
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn graph_writes_dot_to_stdout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "steps.py", TWO_STEPS);

    let assert = yw()
        .current_dir(tmp.path())
        .args(["graph", "-s", script.to_string_lossy().as_ref()])
        .assert()
        .success();
    let out = stdout(assert.get_output());
    assert!(out.starts_with("digraph \"program\" {"), "{}", out);
    assert!(out.contains("\"A\" -> \"B\" [label=\"file1\"];"), "{}", out);
}

#[test]
fn command_option_selects_the_subcommand() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "steps.py", TWO_STEPS);

    let assert = yw()
        .current_dir(tmp.path())
        .args(["-s", script.to_string_lossy().as_ref(), "-c", "graph"])
        .assert()
        .success();
    assert!(stdout(assert.get_output()).contains("\"A\" -> \"B\""));
}

#[test]
fn reads_stdin_with_an_explicit_marker() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let assert = yw()
        .current_dir(tmp.path())
        .args(["graph", "--comment", "#", "--view", "data"])
        .write_stdin(TWO_STEPS)
        .assert()
        .success();
    let out = stdout(assert.get_output());
    assert!(out.contains("\"A\" -> \"A#x\""), "{}", out);
    assert!(out.contains("\"A#x\" -> \"B\""), "{}", out);
}

#[test]
fn lines_and_graph_go_to_files() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(
        tmp.path(),
        "steps.sh",
        "echo start\n# plain note\n# @begin A\n# @end A\n",
    );
    let lines = tmp.path().join("lines.txt");
    let dot = tmp.path().join("out.gv");

    yw()
        .current_dir(tmp.path())
        .args([
            "graph",
            "-s",
            script.to_string_lossy().as_ref(),
            "-l",
            lines.to_string_lossy().as_ref(),
            "-g",
            dot.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&lines).expect("read lines"),
        "plain note\n@begin A\n@end A\n"
    );
    assert!(fs::read_to_string(&dot).expect("read dot").contains("\"A\""));
}

#[test]
fn extract_prints_a_summary() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "steps.py", TWO_STEPS);

    let assert = yw()
        .current_dir(tmp.path())
        .args(["extract", "-s", script.to_string_lossy().as_ref()])
        .assert()
        .success();
    let output = assert.get_output();
    assert!(stdout(output).is_empty());
    assert!(
        stderr(output).contains("2 block(s), 2 port(s), 1 channel(s)"),
        "{}",
        stderr(output)
    );
}

#[test]
fn markup_error_points_at_the_line() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "broken.py", "x = 1\n# @begin load\n# @out table\n");

    let assert = yw()
        .current_dir(tmp.path())
        .args(["--no-color", "graph", "-s", script.to_string_lossy().as_ref()])
        .assert()
        .failure()
        .code(1);
    let output = assert.get_output();
    let err = stderr(output);
    assert!(stdout(output).is_empty());
    assert!(err.contains("block `load` is never closed"), "{}", err);
    assert!(err.contains("broken.py:2:"), "{}", err);
}

#[test]
fn unknown_extension_needs_a_marker() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "notes.txt", TWO_STEPS);

    let assert = yw()
        .current_dir(tmp.path())
        .args(["graph", "-s", script.to_string_lossy().as_ref()])
        .assert()
        .failure();
    let err = stderr(assert.get_output());
    assert!(err.contains("no comment marker given"), "{}", err);
}

#[test]
fn unknown_view_is_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = write_script(tmp.path(), "steps.py", TWO_STEPS);

    let assert = yw()
        .current_dir(tmp.path())
        .args([
            "graph",
            "-s",
            script.to_string_lossy().as_ref(),
            "--view",
            "timeline",
        ])
        .assert()
        .failure();
    assert!(stderr(assert.get_output()).contains("unknown view `timeline`"));
}

#[test]
fn config_file_supplies_marker_and_view() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("yw.toml"),
        "[extract]\ncomment = \"%\"\n\n[graph]\nview = \"data\"\nroot = \"analysis\"\n",
    )
    .expect("write config");
    let script = write_script(tmp.path(), "run.txt", &TWO_STEPS.replace('#', "%"));

    let assert = yw()
        .current_dir(tmp.path())
        .args(["graph", "-s", script.to_string_lossy().as_ref()])
        .assert()
        .success();
    let out = stdout(assert.get_output());
    assert!(out.starts_with("digraph \"analysis\" {"), "{}", out);
    assert!(out.contains("\"A#x\" -> \"B\""), "{}", out);
}

#[test]
fn fixture_runner_passes_bundled_fixtures() {
    let assert = yw()
        .args(["--no-color", "test", fixtures().to_string_lossy().as_ref()])
        .assert()
        .success();
    let err = stderr(assert.get_output());
    assert!(err.contains("test result: ok. 9 passed, 0 failed"), "{}", err);
}

#[test]
fn fixture_runner_filters_by_category() {
    let assert = yw()
        .args([
            "--no-color",
            "test",
            fixtures().to_string_lossy().as_ref(),
            "--category",
            "errors",
        ])
        .assert()
        .success();
    let err = stderr(assert.get_output());
    assert!(err.contains("PASS  an @end with nothing open"), "{}", err);
    assert!(err.contains("4 passed"), "{}", err);
}

#[test]
fn fixture_runner_reports_failures() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("wrong.test.yw"),
        "---\nexpect_channels = 5\n---\n# @begin A\n# @end A\n",
    )
    .expect("write fixture");

    let assert = yw()
        .args(["--no-color", "test", tmp.path().to_string_lossy().as_ref()])
        .assert()
        .failure();
    let err = stderr(assert.get_output());
    assert!(err.contains("FAIL  wrong"), "{}", err);
    assert!(err.contains("expected 5 channel(s), got 0"), "{}", err);
}
