use nix::sys::signal::{sigaction, signal, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_: libc::c_int) {
    // Handler only sets a flag; the REPL redraws the prompt after the
    // blocking read returns EINTR.
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Installs the shell's dispositions: SIGINT sets the interrupt flag,
/// SIGQUIT is ignored. Installed without SA_RESTART so the line read is
/// actually interrupted. Failure here is fatal to startup.
pub fn install() -> nix::Result<()> {
    let interrupt = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGINT, &interrupt)? };

    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(Signal::SIGQUIT, &ignore)? };
    Ok(())
}

/// Returns true once per delivered interrupt.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Restores default dispositions in a forked child so the program it
/// execs responds to Ctrl-C and Ctrl-\ normally.
pub fn reset_for_child() {
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
        let _ = signal(Signal::SIGQUIT, SigHandler::SigDfl);
    }
}
