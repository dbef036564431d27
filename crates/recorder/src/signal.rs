use crate::dump;
use crate::recorder::{self, emit, Recorder};
use crate::tweak;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::OnceLock;

/// Dedicated recorder the signal handler logs into before dumping, kept
/// separate from application recorders so a signal is always visible even
/// if the matching recorder's own trace level is off.
fn signal_recorder() -> &'static Recorder {
    static REC: OnceLock<&'static Recorder> = OnceLock::new();
    REC.get_or_init(|| recorder::register_recorder(Recorder::new("recorder_signal", "signals observed by dump_on_signal", 64)))
}

const MAX_SIGNALS: usize = 64;
static PREVIOUS: [AtomicI32; MAX_SIGNALS] = {
    const INIT: AtomicI32 = AtomicI32::new(i32::MIN);
    [INIT; MAX_SIGNALS]
};
static ARMED: [AtomicBool; MAX_SIGNALS] = {
    const INIT: AtomicBool = AtomicBool::new(false);
    [INIT; MAX_SIGNALS]
};

/// Disposition recorded for a signal before we installed our own handler,
/// tracked separately from the raw `sigaction` so the handler function
/// (which must stay async-signal-safe) can branch on it without re-reading
/// kernel state.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PriorDisposition {
    Default,
    Ignore,
    Handler(usize),
}

fn encode(d: PriorDisposition) -> i32 {
    match d {
        PriorDisposition::Default => -1,
        PriorDisposition::Ignore => -2,
        PriorDisposition::Handler(addr) => addr as i32,
    }
}

extern "C" fn trampoline(sig: libc::c_int) {
    emit(signal_recorder(), "signal.rs", "caught signal %d", &[sig as u64]);

    let idx = sig as usize;
    if idx >= MAX_SIGNALS {
        return;
    }
    let prior_raw = PREVIOUS[idx].load(Ordering::Relaxed);

    // Step (b): restore whatever was previously installed before dumping,
    // so a fault inside dump() falls through to that disposition (typically
    // the platform default, i.e. terminate) instead of looping back here.
    unsafe {
        let mut restore: libc::sigaction = std::mem::zeroed();
        if prior_raw == -1 {
            restore.sa_sigaction = libc::SIG_DFL;
        } else if prior_raw == -2 {
            restore.sa_sigaction = libc::SIG_IGN;
        } else {
            restore.sa_sigaction = prior_raw as libc::sighandler_t;
        }
        libc::sigemptyset(&mut restore.sa_mask);
        libc::sigaction(sig, &restore, std::ptr::null_mut());
    }

    // Step (c).
    dump::dump();

    // Steps (d) and (e): only if a real handler (not default/ignore) was
    // previously installed, re-arm ourselves and chain to it.
    if prior_raw >= 0 {
        install_raw(sig, idx);
        let prev_handler: extern "C" fn(libc::c_int) = unsafe { std::mem::transmute(prior_raw as libc::sighandler_t) };
        prev_handler(sig);
    }
}

fn install_raw(sig: libc::c_int, idx: usize) {
    unsafe {
        let mut prior: libc::sigaction = std::mem::zeroed();
        libc::sigaction(sig, std::ptr::null(), &mut prior);

        if !ARMED[idx].load(Ordering::Relaxed) {
            let disposition = if prior.sa_sigaction == libc::SIG_DFL {
                PriorDisposition::Default
            } else if prior.sa_sigaction == libc::SIG_IGN {
                PriorDisposition::Ignore
            } else {
                PriorDisposition::Handler(prior.sa_sigaction)
            };
            PREVIOUS[idx].store(encode(disposition), Ordering::Relaxed);
        }

        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = trampoline as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;
        libc::sigaction(sig, &action, std::ptr::null_mut());
        ARMED[idx].store(true, Ordering::Relaxed);
    }
}

/// Installs a handler for `sig` implementing the restore/dump/re-arm/chain
/// sequence described above. Calling this twice for the same signal is
/// idempotent: the second call's "previous handler" snapshot is taken once,
/// on first install, and not overwritten by our own trampoline.
pub fn dump_on_signal(sig: i32) {
    let idx = sig as usize;
    assert!(idx < MAX_SIGNALS, "signal number out of supported range");
    install_raw(sig, idx);
}

/// Portably-guarded set of "interesting crash and user signals". Several of
/// these do not exist on every platform `libc` supports; each is included
/// only when the constant is defined for the build target. `SIGINFO` is
/// BSD/macOS-only and Linux has no equivalent, so it is left out entirely
/// rather than faked.
fn common_signals() -> Vec<i32> {
    let mut signals = vec![
        libc::SIGQUIT,
        libc::SIGILL,
        libc::SIGABRT,
        libc::SIGBUS,
        libc::SIGSEGV,
        libc::SIGSYS,
        libc::SIGXCPU,
        libc::SIGXFSZ,
        libc::SIGUSR1,
        libc::SIGUSR2,
    ];
    #[cfg(target_os = "linux")]
    {
        signals.push(libc::SIGPWR);
        signals.push(libc::SIGSTKFLT);
    }
    #[cfg(any(target_os = "macos", target_os = "freebsd"))]
    {
        signals.push(libc::SIGINFO);
    }
    signals
}

/// Installs handlers for the common crash/user signal set, OR-ed with the
/// `recorder_signals` tweak bitmask and minus `remove`, then reads the
/// `RECORDER_TRACES`/`RECORDER_TWEAKS`/`RECORDER_DUMP` environment
/// variables and starts the background dumper if the last is set.
pub fn dump_on_common_signals(add: &[i32], remove: &[i32]) {
    let extra_mask = tweak::RECORDER_SIGNALS.get();
    let mut signals: Vec<i32> = common_signals();
    signals.extend_from_slice(add);
    for bit in 0..63 {
        if extra_mask & (1i64 << bit) != 0 {
            signals.push(bit as i32 + 1);
        }
    }
    signals.retain(|s| !remove.contains(s));
    signals.sort_unstable();
    signals.dedup();

    for sig in signals {
        dump_on_signal(sig);
    }

    if let Ok(traces) = std::env::var("RECORDER_TRACES") {
        let _ = crate::config_lang::trace_set(&traces);
    }
    if let Ok(tweaks) = std::env::var("RECORDER_TWEAKS") {
        let _ = crate::config_lang::trace_set(&tweaks);
    }
    if let Ok(pattern) = std::env::var("RECORDER_DUMP") {
        let leaked: &'static str = Box::leak(pattern.into_boxed_str());
        dump::background_dump(leaked);
    }
}
