//! Captured-backtrace crash diagnostics (spec §7: "unrecoverable programming
//! errors ... should crash with a captured backtrace for diagnostics").
//!
//! Grounded in `original_source/src/main.cpp`'s `SIGSEGV` handler built on
//! `backtrace`/`backtrace_symbols_fd`; reimplemented as a Rust panic hook
//! using the `backtrace` crate, since a Rust panic already unwinds/aborts
//! the process without help, but logging the trace before doing so is not
//! automatic.

/// Installs a panic hook that logs a captured backtrace before the default
/// hook runs. Call once at startup, before the primary loop is constructed.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let trace = backtrace::Backtrace::new();
        log::error!("fatal error: {info}\n{trace:?}");
        default_hook(info);
    }));
}
