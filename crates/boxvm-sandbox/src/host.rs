//! Host side of the guest ABI.
//!
//! Guests import everything from a single module named `api`; nothing else
//! is defined in the linker, so any other import fails instantiation.
//! Strings travel as `(ptr, len)` pairs into the guest's exported `memory`.
//!
//! Functions that return an `i32` report recoverable failures as the
//! negative status codes below. Quota violations and invalid arguments are
//! never recoverable: they trap and end the run with the originating
//! [`KernelError`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use boxvm_kernel::{Callback, Event, FsError, KernelError, MediatedApi, Rgb, WindowId};
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits};

use crate::error::{Result, SandboxError};

/// Import module every host function lives in.
pub const MODULE: &str = "api";

pub const OK: i32 = 0;
pub const PATH_NOT_FOUND: i32 = -1;
pub const NOT_A_DIRECTORY: i32 = -2;
pub const IS_A_DIRECTORY: i32 = -3;
pub const ALREADY_EXISTS: i32 = -4;
pub const INVALID_PATH: i32 = -5;
pub const BUFFER_TOO_SMALL: i32 = -6;
pub const BAD_MEMORY: i32 = -7;
pub const NO_DISPLAY: i32 = -8;
pub const INVALID_UTF8: i32 = -9;
pub const NO_WINDOW: i32 = -10;

/// Size of one `get_events` record: `{kind: i32, a: i32, b: i32}`.
pub const EVENT_RECORD_SIZE: usize = 12;
pub const EVENT_CLICK: i32 = 1;
pub const EVENT_KEY: i32 = 2;

/// Data carried by the wasmtime store for one run.
pub(crate) struct HostState {
    pub(crate) api: MediatedApi,
    /// Events drained from the kernel but not yet copied to the guest.
    pub(crate) inbox: VecDeque<Event>,
    /// Table indices of buttons clicked since the guest last looked.
    pub(crate) fired: Arc<Mutex<VecDeque<u32>>>,
    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub(crate) fn new(api: MediatedApi, limits: StoreLimits) -> Self {
        Self {
            api,
            inbox: VecDeque::new(),
            fired: Arc::new(Mutex::new(VecDeque::new())),
            limits,
        }
    }
}

/// Status code a filesystem failure is reported as.
pub fn fs_status(err: &FsError) -> i32 {
    match err {
        FsError::PathNotFound { .. } => PATH_NOT_FOUND,
        FsError::NotADirectory { .. } => NOT_A_DIRECTORY,
        FsError::IsADirectory { .. } => IS_A_DIRECTORY,
        FsError::AlreadyExists { .. } => ALREADY_EXISTS,
        FsError::InvalidPath { .. } => INVALID_PATH,
    }
}

fn describe(code: i32) -> &'static str {
    match code {
        BAD_MEMORY => "pointer outside guest memory",
        INVALID_UTF8 => "string is not valid UTF-8",
        BUFFER_TOO_SMALL => "output buffer too small",
        _ => "unexpected status",
    }
}

/// Return early with a status code.
macro_rules! try_status {
    ($e:expr) => {
        match $e {
            Ok(value) => value,
            Err(code) => return Ok(code),
        }
    };
}

/// Register every `api` host function on `linker`.
pub(crate) fn define(linker: &mut Linker<HostState>) -> Result<()> {
    define_all(linker).map_err(|e| SandboxError::Instantiation(format!("{e:#}")))
}

fn define_all(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(MODULE, "print", print)?;
    linker.func_wrap(MODULE, "input", input)?;
    linker.func_wrap(MODULE, "check_cpu", check_cpu)?;
    linker.func_wrap(MODULE, "check_memory", check_memory)?;
    linker.func_wrap(MODULE, "sleep", sleep)?;
    linker.func_wrap(MODULE, "rand", rand)?;
    linker.func_wrap(MODULE, "memory_used", memory_used)?;
    linker.func_wrap(MODULE, "memory_limit", memory_limit)?;
    linker.func_wrap(MODULE, "allocate", allocate)?;
    linker.func_wrap(MODULE, "free", free)?;
    linker.func_wrap(MODULE, "list_dir", list_dir)?;
    linker.func_wrap(MODULE, "read_file", read_file)?;
    linker.func_wrap(MODULE, "write_file", write_file)?;
    linker.func_wrap(MODULE, "make_dir", make_dir)?;
    linker.func_wrap(MODULE, "delete", delete)?;
    linker.func_wrap(MODULE, "file_exists", file_exists)?;
    linker.func_wrap(MODULE, "set_pixel", set_pixel)?;
    linker.func_wrap(MODULE, "clear_screen", clear_screen)?;
    linker.func_wrap(MODULE, "draw_rect", draw_rect)?;
    linker.func_wrap(MODULE, "get_events", get_events)?;
    linker.func_wrap(MODULE, "create_window", create_window)?;
    linker.func_wrap(MODULE, "window_set_pixel", window_set_pixel)?;
    linker.func_wrap(MODULE, "window_clear", window_clear)?;
    linker.func_wrap(MODULE, "add_button", add_button)?;
    linker.func_wrap(MODULE, "draw_all", draw_all)?;
    linker.func_wrap(MODULE, "next_callback", next_callback)?;
    Ok(())
}

// -- guest memory ---------------------------------------------------------

fn guest_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Some(memory),
        _ => None,
    }
}

fn read_bytes(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> std::result::Result<Vec<u8>, i32> {
    let memory = guest_memory(caller).ok_or(BAD_MEMORY)?;
    let offset = usize::try_from(ptr).map_err(|_| BAD_MEMORY)?;
    let len = usize::try_from(len).map_err(|_| BAD_MEMORY)?;
    let end = offset.checked_add(len).ok_or(BAD_MEMORY)?;
    if end > memory.data_size(&*caller) {
        return Err(BAD_MEMORY);
    }
    let mut buf = vec![0; len];
    memory
        .read(&*caller, offset, &mut buf)
        .map_err(|_| BAD_MEMORY)?;
    Ok(buf)
}

fn read_str(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> std::result::Result<String, i32> {
    String::from_utf8(read_bytes(caller, ptr, len)?).map_err(|_| INVALID_UTF8)
}

/// Copy `bytes` to guest memory. Returns the byte count or a status code.
fn write_bytes(caller: &mut Caller<'_, HostState>, out: i32, cap: i32, bytes: &[u8]) -> i32 {
    let Ok(cap) = usize::try_from(cap) else {
        return BAD_MEMORY;
    };
    if bytes.len() > cap {
        return BUFFER_TOO_SMALL;
    }
    let Ok(written) = i32::try_from(bytes.len()) else {
        return BUFFER_TOO_SMALL;
    };
    let (Some(memory), Ok(offset)) = (guest_memory(caller), usize::try_from(out)) else {
        return BAD_MEMORY;
    };
    match memory.write(&mut *caller, offset, bytes) {
        Ok(()) => written,
        Err(_) => BAD_MEMORY,
    }
}

// -- helpers --------------------------------------------------------------

/// Governor checkpoint taken on entry to every host function.
///
/// Runs before any guest memory is read, so an expired budget is reported
/// ahead of a bad pointer. `MediatedApi` checks again for direct callers.
fn enter(caller: &Caller<'_, HostState>, operation: &'static str) -> wasmtime::Result<()> {
    tracing::trace!(operation, "guest call");
    caller.data().api.check_cpu()?;
    Ok(())
}

fn invalid_argument(operation: &str, reason: impl Into<String>) -> KernelError {
    KernelError::InvalidArgument {
        operation: operation.into(),
        reason: reason.into(),
    }
}

/// Filesystem errors become status codes; everything else traps.
fn fs_result<T>(result: boxvm_kernel::Result<T>) -> wasmtime::Result<std::result::Result<T, i32>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(KernelError::Fs(err)) => Ok(Err(fs_status(&err))),
        Err(err) => Err(err.into()),
    }
}

fn channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn rgb(r: i32, g: i32, b: i32) -> Rgb {
    Rgb(channel(r), channel(g), channel(b))
}

fn window_id(id: i32) -> Option<WindowId> {
    u32::try_from(id).ok().map(WindowId)
}

fn encode_event(event: &Event, out: &mut Vec<u8>) {
    let (kind, a, b) = match *event {
        Event::Click { x, y } => (EVENT_CLICK, x, y),
        Event::Key { ch } => (EVENT_KEY, ch as u32 as i32, 0),
    };
    for field in [kind, a, b] {
        out.extend_from_slice(&field.to_le_bytes());
    }
}

// -- console --------------------------------------------------------------

fn print(mut caller: Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<()> {
    enter(&caller, "print")?;
    let text = read_str(&mut caller, ptr, len).map_err(|code| invalid_argument("print", describe(code)))?;
    caller.data_mut().api.print(&text)?;
    Ok(())
}

fn input(
    mut caller: Caller<'_, HostState>,
    prompt_ptr: i32,
    prompt_len: i32,
    out: i32,
    cap: i32,
) -> wasmtime::Result<i32> {
    enter(&caller, "input")?;
    let prompt = try_status!(read_str(&mut caller, prompt_ptr, prompt_len));
    let line = caller.data_mut().api.input(&prompt)?;
    Ok(write_bytes(&mut caller, out, cap, line.as_bytes()))
}

// -- governor -------------------------------------------------------------

fn check_cpu(caller: Caller<'_, HostState>) -> wasmtime::Result<()> {
    enter(&caller, "check_cpu")
}

fn check_memory(caller: Caller<'_, HostState>) -> wasmtime::Result<()> {
    enter(&caller, "check_memory")?;
    caller.data().api.check_memory()?;
    Ok(())
}

fn sleep(caller: Caller<'_, HostState>, seconds: f64) -> wasmtime::Result<()> {
    enter(&caller, "sleep")?;
    caller.data().api.sleep(seconds)?;
    Ok(())
}

fn rand(mut caller: Caller<'_, HostState>, lo: i32, hi: i32) -> wasmtime::Result<i32> {
    enter(&caller, "rand")?;
    let value = caller.data_mut().api.rand(lo.into(), hi.into())?;
    // Drawn from lo..=hi, so it fits.
    Ok(value as i32)
}

fn memory_used(caller: Caller<'_, HostState>) -> wasmtime::Result<i64> {
    enter(&caller, "memory_used")?;
    Ok(i64::try_from(caller.data().api.memory_used()?).unwrap_or(i64::MAX))
}

fn memory_limit(caller: Caller<'_, HostState>) -> wasmtime::Result<i64> {
    enter(&caller, "memory_limit")?;
    Ok(i64::try_from(caller.data().api.memory_limit()?).unwrap_or(i64::MAX))
}

fn allocate(mut caller: Caller<'_, HostState>, kb: i64) -> wasmtime::Result<()> {
    enter(&caller, "allocate")?;
    let kb = u64::try_from(kb).map_err(|_| invalid_argument("allocate", format!("negative size {kb}")))?;
    caller.data_mut().api.allocate(kb)?;
    Ok(())
}

fn free(mut caller: Caller<'_, HostState>, kb: i64) -> wasmtime::Result<()> {
    enter(&caller, "free")?;
    let kb = u64::try_from(kb).map_err(|_| invalid_argument("free", format!("negative size {kb}")))?;
    caller.data_mut().api.free(kb)?;
    Ok(())
}

// -- filesystem -----------------------------------------------------------

fn list_dir(mut caller: Caller<'_, HostState>, ptr: i32, len: i32, out: i32, cap: i32) -> wasmtime::Result<i32> {
    enter(&caller, "list_dir")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    let names = try_status!(fs_result(caller.data().api.list_dir(&path))?);
    Ok(write_bytes(&mut caller, out, cap, names.join("\n").as_bytes()))
}

fn read_file(mut caller: Caller<'_, HostState>, ptr: i32, len: i32, out: i32, cap: i32) -> wasmtime::Result<i32> {
    enter(&caller, "read_file")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    let content = try_status!(fs_result(caller.data().api.read_file(&path))?);
    Ok(write_bytes(&mut caller, out, cap, content.as_bytes()))
}

fn write_file(
    mut caller: Caller<'_, HostState>,
    ptr: i32,
    len: i32,
    data_ptr: i32,
    data_len: i32,
) -> wasmtime::Result<i32> {
    enter(&caller, "write_file")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    let content = try_status!(read_str(&mut caller, data_ptr, data_len));
    try_status!(fs_result(caller.data_mut().api.write_file(&path, content))?);
    Ok(OK)
}

fn make_dir(mut caller: Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<i32> {
    enter(&caller, "make_dir")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    try_status!(fs_result(caller.data_mut().api.make_dir(&path))?);
    Ok(OK)
}

fn delete(mut caller: Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<i32> {
    enter(&caller, "delete")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    try_status!(fs_result(caller.data_mut().api.delete(&path))?);
    Ok(OK)
}

fn file_exists(mut caller: Caller<'_, HostState>, ptr: i32, len: i32) -> wasmtime::Result<i32> {
    enter(&caller, "file_exists")?;
    let path = try_status!(read_str(&mut caller, ptr, len));
    Ok(i32::from(caller.data().api.file_exists(&path)?))
}

// -- graphics -------------------------------------------------------------

fn set_pixel(mut caller: Caller<'_, HostState>, x: i32, y: i32, r: i32, g: i32, b: i32) -> wasmtime::Result<()> {
    enter(&caller, "set_pixel")?;
    caller.data_mut().api.set_pixel(x, y, rgb(r, g, b))?;
    Ok(())
}

fn clear_screen(mut caller: Caller<'_, HostState>, r: i32, g: i32, b: i32) -> wasmtime::Result<()> {
    enter(&caller, "clear_screen")?;
    caller.data_mut().api.clear_screen(rgb(r, g, b))?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn draw_rect(
    mut caller: Caller<'_, HostState>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    r: i32,
    g: i32,
    b: i32,
) -> wasmtime::Result<()> {
    enter(&caller, "draw_rect")?;
    caller
        .data_mut()
        .api
        .draw_rect(x, y, width, height, rgb(r, g, b))?;
    Ok(())
}

/// Copy as many whole event records as fit in `cap` bytes.
///
/// Events that do not fit stay queued for the next call. Returns the number
/// of records written.
fn get_events(mut caller: Caller<'_, HostState>, out: i32, cap: i32) -> wasmtime::Result<i32> {
    enter(&caller, "get_events")?;
    let fresh = caller.data_mut().api.get_events()?;
    caller.data_mut().inbox.extend(fresh);

    let slots = usize::try_from(cap).unwrap_or(0) / EVENT_RECORD_SIZE;
    let count = slots.min(caller.data().inbox.len());
    let mut bytes = Vec::with_capacity(count * EVENT_RECORD_SIZE);
    for event in caller.data().inbox.iter().take(count) {
        encode_event(event, &mut bytes);
    }

    let written = write_bytes(&mut caller, out, cap, &bytes);
    if written < 0 {
        return Ok(written);
    }
    caller.data_mut().inbox.drain(..count);
    Ok(count as i32)
}

// -- windowing ------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn create_window(
    mut caller: Caller<'_, HostState>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    title_ptr: i32,
    title_len: i32,
) -> wasmtime::Result<i32> {
    enter(&caller, "create_window")?;
    let title = try_status!(read_str(&mut caller, title_ptr, title_len));
    match caller
        .data_mut()
        .api
        .create_window(x, y, width, height, &title)?
    {
        Some(id) => Ok(id.0 as i32),
        None => Ok(NO_DISPLAY),
    }
}

#[allow(clippy::too_many_arguments)]
fn window_set_pixel(
    mut caller: Caller<'_, HostState>,
    id: i32,
    x: i32,
    y: i32,
    r: i32,
    g: i32,
    b: i32,
) -> wasmtime::Result<()> {
    enter(&caller, "window_set_pixel")?;
    if let Some(id) = window_id(id) {
        caller
            .data_mut()
            .api
            .window_set_pixel(id, x, y, rgb(r, g, b))?;
    }
    Ok(())
}

fn window_clear(mut caller: Caller<'_, HostState>, id: i32, r: i32, g: i32, b: i32) -> wasmtime::Result<()> {
    enter(&caller, "window_clear")?;
    if let Some(id) = window_id(id) {
        caller.data_mut().api.window_clear(id, rgb(r, g, b))?;
    }
    Ok(())
}

/// Attach a button whose click records table index `callback`.
#[allow(clippy::too_many_arguments)]
fn add_button(
    mut caller: Caller<'_, HostState>,
    id: i32,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    label_ptr: i32,
    label_len: i32,
    callback: i32,
) -> wasmtime::Result<i32> {
    enter(&caller, "add_button")?;
    let label = try_status!(read_str(&mut caller, label_ptr, label_len));
    let index = u32::try_from(callback)
        .map_err(|_| invalid_argument("add_button", format!("negative callback index {callback}")))?;

    if caller.data().api.display().is_none() {
        return Ok(NO_DISPLAY);
    }
    let Some(id) = window_id(id) else {
        return Ok(NO_WINDOW);
    };

    let fired = Arc::clone(&caller.data().fired);
    let on_click = Callback::new(move || {
        if let Ok(mut queue) = fired.lock() {
            queue.push_back(index);
        }
    });
    let added = caller
        .data_mut()
        .api
        .add_button(id, x, y, width, height, &label, on_click)?;
    Ok(if added { OK } else { NO_WINDOW })
}

fn draw_all(mut caller: Caller<'_, HostState>) -> wasmtime::Result<()> {
    enter(&caller, "draw_all")?;
    caller.data_mut().api.draw_all()?;
    Ok(())
}

/// Pop the oldest fired callback index, or -1.
fn next_callback(caller: Caller<'_, HostState>) -> wasmtime::Result<i32> {
    enter(&caller, "next_callback")?;
    let next = caller
        .data()
        .fired
        .lock()
        .map_err(|_| wasmtime::Error::msg("callback queue poisoned"))?
        .pop_front();
    Ok(next.map_or(-1, |index| index as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_errors_map_to_distinct_codes() {
        let codes = [
            fs_status(&FsError::PathNotFound { path: "/a".into() }),
            fs_status(&FsError::NotADirectory { path: "/a".into() }),
            fs_status(&FsError::IsADirectory { path: "/a".into() }),
            fs_status(&FsError::AlreadyExists { path: "/a".into() }),
            fs_status(&FsError::InvalidPath {
                path: "a".into(),
                reason: "relative".into(),
            }),
        ];
        assert_eq!(codes, [-1, -2, -3, -4, -5]);
    }

    #[test]
    fn events_encode_little_endian() {
        let mut out = Vec::new();
        encode_event(&Event::Click { x: 3, y: -1 }, &mut out);
        encode_event(&Event::Key { ch: 'a' }, &mut out);
        assert_eq!(out.len(), 2 * EVENT_RECORD_SIZE);
        assert_eq!(&out[0..4], &1i32.to_le_bytes());
        assert_eq!(&out[4..8], &3i32.to_le_bytes());
        assert_eq!(&out[8..12], &(-1i32).to_le_bytes());
        assert_eq!(&out[12..16], &2i32.to_le_bytes());
        assert_eq!(&out[16..20], &97i32.to_le_bytes());
    }

    #[test]
    fn channels_clamp() {
        assert_eq!(rgb(-5, 128, 999), Rgb(0, 128, 255));
    }

    #[test]
    fn negative_window_ids_are_rejected() {
        assert_eq!(window_id(-1), None);
        assert_eq!(window_id(4), Some(WindowId(4)));
    }
}
