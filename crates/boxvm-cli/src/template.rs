//! Starter guest scaffolding for `boxvm vm new`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

const MAX_NAME_LEN: usize = 32;

/// Normalize and check a VM name: lowercase ASCII letters, digits, `-`, `_`.
pub fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        bail!("VM name must be 1 to {MAX_NAME_LEN} characters");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("VM name `{name}` may only contain letters, digits, `-` and `_`");
    }
    Ok(name)
}

/// WebAssembly text of the starter guest for `name`.
pub fn starter_guest(name: &str) -> String {
    let greeting = format!("Hello from {name}!");
    format!(
        r#";; Starter guest for {name}.
(module
  (import "api" "print" (func $print (param i32 i32)))
  (import "api" "write_file" (func $write_file (param i32 i32 i32 i32) (result i32)))
  (import "api" "create_window" (func $create_window (param i32 i32 i32 i32 i32 i32) (result i32)))
  (import "api" "window_clear" (func $window_clear (param i32 i32 i32 i32)))
  (import "api" "draw_all" (func $draw_all))
  (memory (export "memory") 1)
  (data (i32.const 0) "{greeting}")
  (data (i32.const 128) "/hello.txt")
  (data (i32.const 160) "{name}")
  (func (export "main")
    (local $win i32)
    (call $print (i32.const 0) (i32.const {greeting_len}))
    (drop (call $write_file (i32.const 128) (i32.const 10) (i32.const 0) (i32.const {greeting_len})))
    (local.set $win
      (call $create_window (i32.const 10) (i32.const 10) (i32.const 100) (i32.const 60)
                           (i32.const 160) (i32.const {name_len})))
    ;; negative means no display
    (if (i32.gt_s (local.get $win) (i32.const 0))
      (then (call $window_clear (local.get $win) (i32.const 20) (i32.const 40) (i32.const 80))))
    (call $draw_all)))
"#,
        greeting_len = greeting.len(),
        name_len = name.len(),
    )
}

/// Write `<dir>/<name>/main.wat`. Existing files are never overwritten.
pub fn scaffold(name: &str, dir: &Path) -> Result<PathBuf> {
    let guest_dir = dir.join(name);
    std::fs::create_dir_all(&guest_dir)
        .with_context(|| format!("failed to create {}", guest_dir.display()))?;

    let path = guest_dir.join("main.wat");
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(&path, starter_guest(name))
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(vm = %name, path = %path.display(), "starter guest created");
    Ok(path)
}
