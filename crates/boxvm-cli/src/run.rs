//! Running a guest from the command line.
//!
//! Flags layer on top of the optional config file, which layers on top of
//! the kernel defaults. The guest itself runs on a blocking thread so that
//! Ctrl-C can interrupt it.

use std::path::Path;

use anyhow::{Context, Result, bail};
use boxvm_kernel::{DisplayServer, KernelConfig, MediatedApi, ScriptedInput};
use boxvm_sandbox::{RunOutcome, SandboxConfig, SandboxLoader};
use tracing::{info, warn};

use crate::cli::RunOptions;
use crate::snapshot;

/// Resolve the kernel config for one run.
///
/// `registry_mem_kb` is the limit derived from a registry entry; an explicit
/// `--mem-kb` still wins over it.
pub fn kernel_config(options: &RunOptions, registry_mem_kb: Option<u64>) -> Result<KernelConfig> {
    let mut config = match &options.config {
        Some(path) => KernelConfig::load(path)
            .with_context(|| format!("failed to load kernel config {}", path.display()))?,
        None => KernelConfig::default(),
    };

    if let Some(kb) = options.mem_kb.or(registry_mem_kb) {
        config = config.with_memory_limit_kb(kb);
    }
    if let Some(secs) = options.cpu_secs {
        config = config.with_cpu_time_secs(secs);
    }
    if let Some(seed) = options.seed {
        config = config.with_rng_seed(seed);
    }
    if options.no_display {
        config = config.without_display();
    } else if options.width.is_some() || options.height.is_some() {
        let width = options.width.unwrap_or(config.display.width);
        let height = options.height.unwrap_or(config.display.height);
        config = config.with_display(width, height);
    }

    config.validate().context("invalid kernel settings")?;
    Ok(config)
}

pub fn sandbox_config(options: &RunOptions) -> SandboxConfig {
    match options.deadline_ms {
        Some(ms) => SandboxConfig::new().with_hard_deadline_ms(ms),
        None => SandboxConfig::new(),
    }
}

/// Read and parse an input script.
pub fn load_input(path: &Path) -> Result<ScriptedInput> {
    let script = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input script {}", path.display()))?;
    let input = ScriptedInput::parse(&script)
        .with_context(|| format!("invalid input script {}", path.display()))?;
    info!(path = %path.display(), batches = input.remaining(), "input script loaded");
    Ok(input)
}

/// Build a fresh kernel instance. The CPU clock starts here.
pub fn build_api(config: &KernelConfig, input: Option<ScriptedInput>) -> MediatedApi {
    let api = MediatedApi::from_config(config);
    match (config.display_size(), input) {
        (Some((width, height)), Some(input)) => {
            api.with_display(DisplayServer::new(width, height).with_input(input))
        }
        (None, Some(_)) => {
            warn!("input script ignored: no display");
            api
        }
        (_, None) => api,
    }
}

/// Run the guest at `guest` to completion and report on it.
pub async fn run_guest(guest: &Path, options: &RunOptions, registry_mem_kb: Option<u64>) -> Result<()> {
    let config = kernel_config(options, registry_mem_kb)?;
    let source = std::fs::read(guest)
        .with_context(|| format!("failed to read guest {}", guest.display()))?;
    let input = options.input.as_deref().map(load_input).transpose()?;

    let loader = SandboxLoader::new(sandbox_config(options)).context("failed to start sandbox")?;
    let interrupt = loader.interrupt_handle();

    info!(
        guest = %guest.display(),
        cpu_secs = config.cpu_time_secs,
        memory_limit_kb = config.memory_limit_kb,
        "starting guest"
    );
    let api = build_api(&config, input);
    let mut task = tokio::task::spawn_blocking(move || loader.run(source, api));

    let outcome = tokio::select! {
        joined = &mut task => joined.context("guest thread panicked")?,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Ctrl-C received, interrupting guest");
            interrupt.interrupt();
            task.await.context("guest thread panicked")?
        }
    };

    report(&outcome);
    if let Some(path) = &options.snapshot {
        match outcome.api.framebuffer() {
            Some(fb) => snapshot::save_png(fb, path)?,
            None => warn!("snapshot skipped: no display"),
        }
    }

    if let Err(err) = outcome.result {
        bail!("guest {} failed: {err}", guest.display());
    }
    Ok(())
}

fn report(outcome: &RunOutcome) {
    let governor = outcome.api.governor();
    let ledger = governor.ledger();
    println!();
    match &outcome.result {
        Ok(()) => println!("  Guest finished in {:.3}s", outcome.elapsed.as_secs_f64()),
        Err(err) => println!(
            "  Guest stopped after {:.3}s: {err}",
            outcome.elapsed.as_secs_f64()
        ),
    }
    println!("  Memory: {} / {} KB", ledger.used(), ledger.limit());
    if let Some(display) = outcome.api.display() {
        let fb = display.framebuffer();
        println!(
            "  Display: {}x{}, {} window(s)",
            fb.width(),
            fb.height(),
            display.window_manager().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let config = kernel_config(&RunOptions::default(), None).unwrap();
        assert_eq!(config, KernelConfig::default());
    }

    #[test]
    fn mem_flag_beats_registry_limit() {
        let options = RunOptions {
            mem_kb: Some(256),
            ..RunOptions::default()
        };
        assert_eq!(kernel_config(&options, Some(65536)).unwrap().memory_limit_kb, 256);
        let config = kernel_config(&RunOptions::default(), Some(65536)).unwrap();
        assert_eq!(config.memory_limit_kb, 65536);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.toml");
        std::fs::write(
            &path,
            "cpu_time_secs = 5.0\nmemory_limit_kb = 10\n[display]\nwidth = 320\nheight = 200\n",
        )
        .unwrap();

        let options = RunOptions {
            config: Some(path),
            cpu_secs: Some(0.5),
            height: Some(100),
            ..RunOptions::default()
        };
        let config = kernel_config(&options, None).unwrap();
        assert_eq!(config.cpu_time_secs, 0.5);
        assert_eq!(config.memory_limit_kb, 10);
        assert_eq!(config.display_size(), Some((320, 100)));
    }

    #[test]
    fn no_display_wins_over_size() {
        let options = RunOptions {
            no_display: true,
            width: Some(64),
            ..RunOptions::default()
        };
        assert_eq!(kernel_config(&options, None).unwrap().display_size(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let options = RunOptions {
            cpu_secs: Some(-1.0),
            ..RunOptions::default()
        };
        assert!(kernel_config(&options, None).is_err());

        let options = RunOptions {
            width: Some(0),
            ..RunOptions::default()
        };
        assert!(kernel_config(&options, None).is_err());
    }

    #[test]
    fn deadline_flag_reaches_sandbox() {
        assert_eq!(sandbox_config(&RunOptions::default()).hard_deadline_ms, None);
        let options = RunOptions {
            deadline_ms: Some(250),
            ..RunOptions::default()
        };
        assert_eq!(sandbox_config(&options).hard_deadline_ms, Some(250));
    }

    #[test]
    fn input_script_feeds_the_display() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "click 1 2\n---\nkey a\n").unwrap();

        let input = load_input(&path).unwrap();
        assert_eq!(input.remaining(), 2);

        let mut api = build_api(&KernelConfig::new(), Some(input));
        assert_eq!(api.get_events().unwrap().len(), 1);
        assert_eq!(api.get_events().unwrap().len(), 1);
        assert!(api.get_events().unwrap().is_empty());
    }

    #[test]
    fn bad_input_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "teleport 1 2\n").unwrap();
        assert!(load_input(&path).is_err());
    }

    #[tokio::test]
    async fn run_guest_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let guest = dir.path().join("guest.wat");
        std::fs::write(&guest, r#"(module (func (export "main") unreachable))"#).unwrap();
        let options = RunOptions {
            no_display: true,
            ..RunOptions::default()
        };
        assert!(run_guest(&guest, &options, None).await.is_err());
    }

    #[tokio::test]
    async fn run_guest_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let guest = dir.path().join("guest.wat");
        std::fs::write(
            &guest,
            r#"(module
                 (import "api" "clear_screen" (func $clear (param i32 i32 i32)))
                 (func (export "main") (call $clear (i32.const 255) (i32.const 0) (i32.const 0))))"#,
        )
        .unwrap();
        let snap = dir.path().join("out.png");
        let options = RunOptions {
            width: Some(8),
            height: Some(4),
            snapshot: Some(snap.clone()),
            ..RunOptions::default()
        };
        run_guest(&guest, &options, None).await.unwrap();

        let img = image::open(&snap).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(3, 2).0, [255, 0, 0]);
    }
}
