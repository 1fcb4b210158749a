mod builtins;
mod exec;
mod parse;
mod redirect;
mod signals;

use anyhow::{anyhow, Context, Result};
use builtins::Builtin;
use exec::Jobs;
use nix::errno::Errno;
use nix::unistd;
use std::env;
use std::io::{self, Write};
use std::process;

/// Lines longer than this are discarded and reported, never executed.
const MAX_LINE: usize = 1024;

fn print_welcome() {
    println!("========================================================");
    println!("       Welcome to mysh");
    println!("       Type 'help' to see supported commands.");
    println!("========================================================");
}

fn print_prompt() {
    let cwd = env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "mysh".to_string());
    print!("\x1b[36m{cwd}\x1b[0m$ ");
    let _ = io::stdout().flush();
}

enum ReadOutcome {
    Line(String),
    Eof,
}

/// Buffered line reader over raw read(2), so an interrupt while blocked
/// is observable as EINTR instead of being retried behind our back.
struct LineReader {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineReader {
    fn new() -> Self {
        LineReader {
            pending: Vec::new(),
            discarding: false,
        }
    }

    fn next_line(&mut self, interactive: bool) -> ReadOutcome {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let rest = self.pending.split_off(pos + 1);
                let mut raw = std::mem::replace(&mut self.pending, rest);
                raw.pop();
                if self.discarding || raw.len() > MAX_LINE {
                    self.discarding = false;
                    eprintln!("mysh: line too long (limit {MAX_LINE} bytes)");
                    if interactive {
                        print_prompt();
                    }
                    continue;
                }
                return ReadOutcome::Line(String::from_utf8_lossy(&raw).into_owned());
            }
            if self.pending.len() > MAX_LINE {
                // Drop input until the terminating newline shows up.
                self.pending.clear();
                self.discarding = true;
            }

            let mut chunk = [0u8; 1024];
            match unistd::read(libc::STDIN_FILENO, &mut chunk) {
                Ok(0) => {
                    if self.pending.is_empty() || self.discarding {
                        return ReadOutcome::Eof;
                    }
                    let raw = std::mem::take(&mut self.pending);
                    return ReadOutcome::Line(String::from_utf8_lossy(&raw).into_owned());
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(Errno::EINTR) => {
                    if signals::take_interrupt() {
                        // Ctrl-C abandons whatever was typed so far.
                        self.pending.clear();
                        self.discarding = false;
                        println!();
                        if interactive {
                            print_prompt();
                        }
                    }
                }
                Err(e) => {
                    eprintln!("mysh: read: {e}");
                    return ReadOutcome::Eof;
                }
            }
        }
    }
}

fn dispatch(line: &str, jobs: &mut Jobs) -> i32 {
    let pipeline = match parse::parse_line(line) {
        Ok(Some(p)) => p,
        Ok(None) => return 0,
        Err(e) => {
            eprintln!("mysh: {e}");
            return 2;
        }
    };

    if pipeline.stages.len() == 2 {
        return exec::run_pipeline(
            &pipeline.stages[0],
            &pipeline.stages[1],
            pipeline.background,
            jobs,
        )
        .unwrap_or_else(|e| {
            eprintln!("mysh: {e:#}");
            1
        });
    }

    let stage = &pipeline.stages[0];
    if let Some(builtin) = builtins::lookup(&stage[0]) {
        // Builtins run in the shell's own process: no fork, no redirection
        // resolution, and the background flag is ignored.
        return match builtin {
            Builtin::Exit => {
                println!("Goodbye!");
                process::exit(0);
            }
            Builtin::Help => {
                builtins::print_help();
                0
            }
            Builtin::Cd => builtins::run_cd(&stage[1..]),
            Builtin::Cat => builtins::run_cat(&stage[1..]),
            Builtin::Grep => builtins::run_grep(&stage[1..]),
        };
    }

    exec::run_single(stage, pipeline.background, jobs).unwrap_or_else(|e| {
        eprintln!("mysh: {e:#}");
        1
    })
}

fn main() -> Result<()> {
    let mut script: Option<String> = None;
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "-c" => {
                script = Some(args.next().ok_or_else(|| anyhow!("missing script after -c"))?)
            }
            other => eprintln!("unknown arg: {other}"),
        }
    }

    signals::install()
        .context("installing signal handlers failed")?;

    let mut jobs = Jobs::new();

    if let Some(line) = script {
        let code = dispatch(&line, &mut jobs);
        process::exit(code);
    }

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        print_welcome();
    }

    let mut reader = LineReader::new();
    loop {
        jobs.reap();
        if interactive {
            print_prompt();
        }
        match reader.next_line(interactive) {
            ReadOutcome::Eof => break,
            ReadOutcome::Line(line) => {
                dispatch(&line, &mut jobs);
            }
        }
    }

    if interactive {
        println!("\nlogout");
    }
    Ok(())
}
