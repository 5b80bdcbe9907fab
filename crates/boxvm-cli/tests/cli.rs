//! End-to-end tests for the `boxvm` binary.

use std::path::Path;
use std::process::{Command, Output};

fn boxvm(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_boxvm"))
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to spawn boxvm")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ═══════════════════════════════════════════════════════════════════════
//  run
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn run_prints_guest_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("hello.wat"),
        r#"(module
             (import "api" "print" (func $print (param i32 i32)))
             (memory (export "memory") 1)
             (data (i32.const 0) "hi")
             (func (export "main") (call $print (i32.const 0) (i32.const 2))))"#,
    )
    .unwrap();

    let output = boxvm(dir.path(), &["run", "hello.wat", "--no-display"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("[VM Output]: hi"));
}

#[test]
fn run_fails_on_guest_trap() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("trap.wat"),
        r#"(module (func (export "main") unreachable))"#,
    )
    .unwrap();

    let output = boxvm(dir.path(), &["run", "trap.wat"]);
    assert!(!output.status.success());
}

#[test]
fn run_enforces_cpu_budget() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("spin.wat"),
        r#"(module
             (import "api" "check_cpu" (func $check_cpu))
             (func (export "main") (loop $l (call $check_cpu) (br $l))))"#,
    )
    .unwrap();

    let output = boxvm(dir.path(), &["run", "spin.wat", "--cpu-secs", "0.1"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("Guest stopped"));
}

// ═══════════════════════════════════════════════════════════════════════
//  vm
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn vm_new_list_launch_remove() {
    let dir = tempfile::tempdir().unwrap();

    let output = boxvm(dir.path(), &["vm", "new", "Demo", "--ram", "1"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("guests/demo/main.wat").exists());

    let listing = stdout(&boxvm(dir.path(), &["vm", "list"]));
    assert!(listing.contains("demo"));

    let output = boxvm(dir.path(), &["vm", "launch", "demo", "--no-display"]);
    assert!(output.status.success());
    let launched = stdout(&output);
    assert!(launched.contains("[VM Output]: Hello from demo!"));
    assert!(launched.contains("Memory: 0 / 1024 KB"));

    assert!(boxvm(dir.path(), &["vm", "remove", "demo"]).status.success());
    assert!(!boxvm(dir.path(), &["vm", "remove", "demo"]).status.success());
    assert!(stdout(&boxvm(dir.path(), &["vm", "list"])).contains("No VMs registered"));
}

#[test]
fn vm_add_requires_existing_guest() {
    let dir = tempfile::tempdir().unwrap();
    let output = boxvm(dir.path(), &["vm", "add", "ghost", "missing.wat"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("vms.json").exists());
}

#[test]
fn vm_launch_unknown_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!boxvm(dir.path(), &["vm", "launch", "nope"]).status.success());
}
