use crate::builtins::{self, Builtin};
use crate::parse::Stage;
use crate::redirect;
use crate::signals;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, fork, pipe, ForkResult, Pid};
use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd};
use std::process;

/// Outstanding background children, reaped best-effort each time the
/// prompt comes back. Without this, finished background processes would
/// accumulate unreaped for the life of the shell.
pub struct Jobs {
    pids: Vec<Pid>,
}

impl Jobs {
    pub fn new() -> Self {
        Jobs { pids: Vec::new() }
    }

    fn push(&mut self, pid: Pid) {
        self.pids.push(pid);
    }

    /// Non-blocking sweep over the background table.
    pub fn reap(&mut self) {
        self.pids.retain(|&pid| {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => true,
                Ok(_) => {
                    println!("[{pid}] done");
                    false
                }
                // ECHILD etc: nothing left to reap for this entry
                Err(_) => false,
            }
        });
    }
}

fn exit_code(status: WaitStatus) -> i32 {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
        _ => 0,
    }
}

/// Blocks until `pid` terminates. EINTR is retried: an interactive
/// interrupt reaches the foreground child through the terminal process
/// group, so the shell keeps waiting for it to actually die.
fn wait_foreground(pid: Pid) -> i32 {
    loop {
        match waitpid(pid, None) {
            Ok(status) => return exit_code(status),
            Err(Errno::EINTR) => continue,
            Err(e) => {
                eprintln!("mysh: wait: {e}");
                return 1;
            }
        }
    }
}

/// Child-side tail of every launch: restore default signals, apply the
/// stage's redirection, then run a builtin text utility in place or
/// replace the image with the external program. Never returns.
fn exec_stage(stage: &Stage) -> ! {
    signals::reset_for_child();

    let resolved = match redirect::resolve(stage) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("mysh: {e}");
            process::exit(1);
        }
    };

    if let Some(file) = &resolved.stdin {
        if let Err(e) = dup2(file.as_raw_fd(), libc::STDIN_FILENO) {
            eprintln!("mysh: dup2: {e}");
            process::exit(1);
        }
    }
    if let Some(file) = &resolved.stdout {
        if let Err(e) = dup2(file.as_raw_fd(), libc::STDOUT_FILENO) {
            eprintln!("mysh: dup2: {e}");
            process::exit(1);
        }
    }

    if resolved.argv.is_empty() {
        eprintln!("mysh: missing command");
        process::exit(1);
    }

    if let Some(builtin) = builtins::pipeline_builtin(&resolved.argv[0]) {
        let code = match builtin {
            Builtin::Cat => builtins::run_cat(&resolved.argv[1..]),
            Builtin::Grep => builtins::run_grep(&resolved.argv[1..]),
            _ => unreachable!(),
        };
        process::exit(code);
    }

    let argv: Vec<CString> = match resolved
        .argv
        .iter()
        .map(|s| CString::new(s.as_str()))
        .collect()
    {
        Ok(v) => v,
        Err(_) => {
            eprintln!("mysh: argument contains NUL byte");
            process::exit(126);
        }
    };
    match nix::unistd::execvp(&argv[0], &argv) {
        Err(Errno::ENOENT) => {
            eprintln!("{}: command not found", resolved.argv[0]);
            process::exit(127);
        }
        Err(e) => {
            eprintln!("mysh: {}: {e}", resolved.argv[0]);
            process::exit(126);
        }
        Ok(_) => unreachable!(),
    }
}

/// Launches one external command (or a piped text-utility builtin) as a
/// child. Foreground: returns the child's exit code. Background: records
/// the pid for the reaper and returns immediately.
pub fn run_single(stage: &Stage, background: bool, jobs: &mut Jobs) -> Result<i32> {
    match unsafe { fork() }.context("fork failed")? {
        ForkResult::Child => exec_stage(stage),
        ForkResult::Parent { child } => {
            if background {
                println!("[{child}] {} started in background", stage[0]);
                jobs.push(child);
                Ok(0)
            } else {
                Ok(wait_foreground(child))
            }
        }
    }
}

/// Connects two stages with a pipe and launches both. The parent drops
/// its copies of both pipe ends right after the forks; holding the write
/// end open would keep the reader from ever seeing EOF.
pub fn run_pipeline(left: &Stage, right: &Stage, background: bool, jobs: &mut Jobs) -> Result<i32> {
    let (read_end, write_end): (OwnedFd, OwnedFd) = pipe().context("pipe failed")?;

    let first = match unsafe { fork() }.context("fork failed")? {
        ForkResult::Child => {
            if let Err(e) = dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO) {
                eprintln!("mysh: dup2: {e}");
                process::exit(1);
            }
            drop(read_end);
            drop(write_end);
            exec_stage(left);
        }
        ForkResult::Parent { child } => child,
    };

    let second = match unsafe { fork() }.context("fork failed")? {
        ForkResult::Child => {
            if let Err(e) = dup2(read_end.as_raw_fd(), libc::STDIN_FILENO) {
                eprintln!("mysh: dup2: {e}");
                process::exit(1);
            }
            drop(read_end);
            drop(write_end);
            exec_stage(right);
        }
        ForkResult::Parent { child } => child,
    };

    drop(read_end);
    drop(write_end);

    if background {
        println!("[{first}] pipeline started in background");
        jobs.push(first);
        jobs.push(second);
        Ok(0)
    } else {
        wait_foreground(first);
        Ok(wait_foreground(second))
    }
}
