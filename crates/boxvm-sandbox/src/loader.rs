//! Guest loader.
//!
//! [`SandboxLoader`] compiles guest source (WebAssembly text or binary),
//! instantiates it against a linker that defines only the `api` module, and
//! calls the guest's `main` export with a [`MediatedApi`] installed as store
//! data. The API always comes back to the host in the [`RunOutcome`], even
//! when the run fails.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use boxvm_kernel::{KernelError, MediatedApi};
use wasmtime::{Engine, Extern, Linker, Module, Store, StoreLimitsBuilder, Trap};

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::host::{self, HostState};

/// Result of one guest run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The kernel instance the guest ran against, with its final state.
    pub api: MediatedApi,
    /// How the run ended.
    pub result: Result<()>,
    /// Wall-clock time spent instantiating and running the guest.
    pub elapsed: Duration,
}

/// Cancels guest runs in progress on the loader it came from.
#[derive(Clone)]
pub struct InterruptHandle {
    engine: Engine,
}

impl InterruptHandle {
    /// Interrupt every run currently executing guest code on this loader.
    ///
    /// The guest traps at its next loop back-edge or function entry. Runs
    /// that start afterwards are unaffected.
    pub fn interrupt(&self) {
        tracing::info!("guest interrupt requested");
        self.engine.increment_epoch();
    }
}

impl std::fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InterruptHandle(..)")
    }
}

/// Compiles and runs guest programs.
pub struct SandboxLoader {
    engine: Engine,
    linker: Linker<HostState>,
    config: SandboxConfig,
}

impl SandboxLoader {
    /// Create a loader with the given engine limits.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let mut wasm_config = wasmtime::Config::new();
        wasm_config.epoch_interruption(true);
        wasm_config.wasm_memory64(false);

        let engine = Engine::new(&wasm_config)
            .map_err(|e| SandboxError::Compilation(format!("failed to create wasm engine: {e}")))?;

        let mut linker = Linker::new(&engine);
        host::define(&mut linker)?;

        tracing::info!(
            max_linear_memory = config.max_linear_memory,
            hard_deadline_ms = ?config.hard_deadline_ms,
            "sandbox loader initialized"
        );

        Ok(Self {
            engine,
            linker,
            config,
        })
    }

    /// Create a loader with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SandboxConfig::default())
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            engine: self.engine.clone(),
        }
    }

    /// Parse and validate guest source.
    pub fn compile(&self, source: &[u8]) -> Result<Module> {
        Module::new(&self.engine, source).map_err(|e| SandboxError::Compilation(format!("{e:#}")))
    }

    /// Compile `source` and run it.
    pub fn run(&self, source: impl AsRef<[u8]>, api: MediatedApi) -> RunOutcome {
        let started = Instant::now();
        match self.compile(source.as_ref()) {
            Ok(module) => self.run_module(&module, api),
            Err(err) => RunOutcome {
                api,
                result: Err(err),
                elapsed: started.elapsed(),
            },
        }
    }

    /// Read a guest from disk and run it.
    pub fn run_file(&self, path: impl AsRef<Path>, api: MediatedApi) -> RunOutcome {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(source) => {
                tracing::debug!(path = %path.display(), bytes = source.len(), "guest source read");
                self.run(source, api)
            }
            Err(err) => RunOutcome {
                api,
                result: Err(SandboxError::Io(err)),
                elapsed: Duration::ZERO,
            },
        }
    }

    /// Run an already compiled guest.
    pub fn run_module(&self, module: &Module, api: MediatedApi) -> RunOutcome {
        let started = Instant::now();

        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_linear_memory)
            .build();
        let mut store = Store::new(&self.engine, HostState::new(api, limits));
        store.limiter(|state| &mut state.limits);
        store.set_epoch_deadline(1);

        let watchdog = match self.config.hard_deadline() {
            Some(limit) => match Watchdog::spawn(self.engine.clone(), limit) {
                Ok(watchdog) => Some(watchdog),
                Err(err) => {
                    return RunOutcome {
                        api: store.into_data().api,
                        result: Err(SandboxError::Io(err)),
                        elapsed: started.elapsed(),
                    };
                }
            },
            None => None,
        };

        let result = self.invoke_main(&mut store, module, watchdog.as_ref());
        if let Some(watchdog) = watchdog {
            watchdog.stop();
        }

        let elapsed = started.elapsed();
        match &result {
            Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "guest finished"),
            Err(err) => tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                error = %err,
                "guest terminated"
            ),
        }

        RunOutcome {
            api: store.into_data().api,
            result,
            elapsed,
        }
    }

    fn invoke_main(
        &self,
        store: &mut Store<HostState>,
        module: &Module,
        watchdog: Option<&Watchdog>,
    ) -> Result<()> {
        let instance = self
            .linker
            .instantiate(&mut *store, module)
            .map_err(|e| classify(e, watchdog, SandboxError::Instantiation))?;

        let main = match instance.get_export(&mut *store, "main") {
            Some(Extern::Func(func)) => func,
            Some(_) => {
                return Err(SandboxError::MissingEntryPoint {
                    reason: "`main` export is not a function".into(),
                });
            }
            None => {
                return Err(SandboxError::MissingEntryPoint {
                    reason: "no `main` export".into(),
                });
            }
        };
        let main = main.typed::<(), ()>(&*store).map_err(|e| SandboxError::MissingEntryPoint {
            reason: format!("`main` must take no parameters and return nothing: {e}"),
        })?;

        tracing::debug!("calling guest main");
        main.call(&mut *store, ())
            .map_err(|e| classify(e, watchdog, SandboxError::Trap))
    }
}

impl std::fmt::Debug for SandboxLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Sort an engine error into the sandbox taxonomy.
fn classify(
    err: wasmtime::Error,
    watchdog: Option<&Watchdog>,
    fallback: fn(String) -> SandboxError,
) -> SandboxError {
    if let Some(Trap::Interrupt) = err.downcast_ref::<Trap>() {
        return match watchdog {
            Some(watchdog) if watchdog.fired() => SandboxError::DeadlineExceeded {
                limit_ms: watchdog.limit.as_millis() as u64,
            },
            _ => SandboxError::Interrupted,
        };
    }
    match err.downcast::<KernelError>() {
        Ok(kernel) => SandboxError::Kernel(kernel),
        Err(err) => fallback(format!("{err:#}")),
    }
}

/// Background thread that interrupts the engine once the deadline passes.
struct Watchdog {
    limit: Duration,
    fired: Arc<AtomicBool>,
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn spawn(engine: Engine, limit: Duration) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = thread::Builder::new()
            .name("boxvm-watchdog".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(limit) {
                    tracing::warn!(limit_ms = limit.as_millis() as u64, "hard deadline reached");
                    flag.store(true, Ordering::SeqCst);
                    engine.increment_epoch();
                }
            })?;

        Ok(Self {
            limit,
            fired,
            stop,
            handle,
        })
    }

    fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            tracing::error!("watchdog thread panicked");
        }
    }
}
