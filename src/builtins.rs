use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

/// Fixed builtin table; never extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Help,
    Cd,
    Cat,
    Grep,
}

pub fn lookup(name: &str) -> Option<Builtin> {
    match name {
        "exit" => Some(Builtin::Exit),
        "help" => Some(Builtin::Help),
        "cd" => Some(Builtin::Cd),
        "cat" => Some(Builtin::Cat),
        "grep" => Some(Builtin::Grep),
        _ => None,
    }
}

/// Only the text utilities make sense inside a pipeline child; `exit`,
/// `help` and `cd` are recognized as simple commands only.
pub fn pipeline_builtin(name: &str) -> Option<Builtin> {
    lookup(name).filter(|b| matches!(b, Builtin::Cat | Builtin::Grep))
}

pub fn print_help() {
    println!();
    println!("--- Shell Supported Features ---");
    println!("1. Internal Commands:");
    println!("   - cd [dir]: Change directory");
    println!("   - exit: Exit the shell");
    println!("   - help: Show this help message");
    println!("   - cat, grep: Built-in text utilities");
    println!("2. External Commands: Supports standard programs found on PATH");
    println!("3. Features:");
    println!("   - Pipe (|): cmd1 | cmd2");
    println!("   - Redirection (<, >): cmd > file, cmd < file");
    println!("   - Background (&): cmd &");
    println!("--------------------------------");
}

/// `cd [path]`; no argument means `$HOME`. Failure leaves the working
/// directory unchanged and is never fatal.
pub fn run_cd(args: &[String]) -> i32 {
    let path = match args.first() {
        Some(p) => p.clone(),
        None => match env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                eprintln!("cd: HOME not set");
                return 1;
            }
        },
    };
    if let Err(e) = env::set_current_dir(&path) {
        eprintln!("cd: {path}: {e}");
        return 1;
    }
    0
}

// ---- cat ----

#[derive(Default, Clone, Copy)]
struct CatOpts {
    number: bool,
    number_nonblank: bool,
    show_ends: bool,
    show_nonprinting: bool,
}

fn cat_stream<R: BufRead, W: Write>(opts: CatOpts, mut input: R, out: &mut W) -> io::Result<()> {
    let mut buf = String::new();
    let mut line_no = 1usize;
    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        if opts.number_nonblank {
            if buf.chars().any(|c| c != '\n') {
                write!(out, "{line_no:6}  ")?;
                line_no += 1;
            }
        } else if opts.number {
            write!(out, "{line_no:6}  ")?;
            line_no += 1;
        }
        for c in buf.chars() {
            if c == '\n' && opts.show_ends {
                out.write_all(b"$")?;
            }
            if opts.show_nonprinting && (c as u32) < 32 && c != '\n' && c != '\t' {
                write!(out, "^{}", char::from(c as u8 + 64))?;
            } else {
                write!(out, "{c}")?;
            }
        }
    }
    Ok(())
}

/// In-process `cat`. `args` excludes the command name.
pub fn run_cat(args: &[String]) -> i32 {
    let mut opts = CatOpts::default();
    let mut i = 0;
    while i < args.len() && args[i].starts_with('-') {
        for flag in args[i].chars().skip(1) {
            match flag {
                'n' => opts.number = true,
                'b' => opts.number_nonblank = true,
                'E' => opts.show_ends = true,
                'v' => opts.show_nonprinting = true,
                other => {
                    eprintln!("cat: invalid option -- '{other}'");
                    return 1;
                }
            }
        }
        i += 1;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if i == args.len() {
        let stdin = io::stdin();
        if let Err(e) = cat_stream(opts, stdin.lock(), &mut out) {
            eprintln!("cat: {e}");
            return 1;
        }
        let _ = out.flush();
        return 0;
    }

    for path in &args[i..] {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("cat: {path}: {e}");
                continue;
            }
        };
        if let Err(e) = cat_stream(opts, BufReader::new(file), &mut out) {
            eprintln!("cat: {path}: {e}");
            return 1;
        }
    }
    let _ = out.flush();
    0
}

// ---- grep ----

#[derive(Default, Clone, Copy)]
struct GrepOpts {
    ignore_case: bool,
    line_numbers: bool,
    invert: bool,
    count_only: bool,
    list_files: bool,
}

/// Fixed-substring match over one input; returns the match count.
fn grep_stream<R: BufRead, W: Write>(
    opts: GrepOpts,
    pattern: &str,
    mut input: R,
    out: &mut W,
) -> io::Result<usize> {
    let pattern = if opts.ignore_case {
        pattern.to_lowercase()
    } else {
        pattern.to_string()
    };
    let mut buf = String::new();
    let mut line_no = 0usize;
    let mut matches = 0usize;
    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let mut hit = if opts.ignore_case {
            buf.to_lowercase().contains(&pattern)
        } else {
            buf.contains(&pattern)
        };
        if opts.invert {
            hit = !hit;
        }
        if hit {
            matches += 1;
            if !opts.count_only && !opts.list_files {
                if opts.line_numbers {
                    write!(out, "{line_no:6}: ")?;
                }
                out.write_all(buf.as_bytes())?;
            }
        }
    }
    Ok(matches)
}

/// In-process `grep`. `args` excludes the command name.
pub fn run_grep(args: &[String]) -> i32 {
    let mut opts = GrepOpts::default();
    let mut i = 0;
    while i < args.len() && args[i].starts_with('-') {
        for flag in args[i].chars().skip(1) {
            match flag {
                'i' => opts.ignore_case = true,
                'n' => opts.line_numbers = true,
                'v' => opts.invert = true,
                'c' => opts.count_only = true,
                'l' => opts.list_files = true,
                other => {
                    eprintln!("grep: invalid option -- '{other}'");
                    return 1;
                }
            }
        }
        i += 1;
    }

    let pattern = match args.get(i) {
        Some(p) => p.clone(),
        None => {
            eprintln!("grep: missing search pattern");
            return 1;
        }
    };
    i += 1;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if i == args.len() {
        let stdin = io::stdin();
        match grep_stream(opts, &pattern, stdin.lock(), &mut out) {
            Ok(count) => {
                if opts.count_only {
                    let _ = writeln!(out, "{count}");
                }
                let _ = out.flush();
                return 0;
            }
            Err(e) => {
                eprintln!("grep: {e}");
                return 1;
            }
        }
    }

    for path in &args[i..] {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("grep: {path}: {e}");
                continue;
            }
        };
        match grep_stream(opts, &pattern, BufReader::new(file), &mut out) {
            Ok(count) => {
                if opts.count_only {
                    let _ = writeln!(out, "{count}");
                }
                if opts.list_files && count > 0 {
                    let _ = writeln!(out, "{path}");
                }
            }
            Err(e) => {
                eprintln!("grep: {path}: {e}");
                return 1;
            }
        }
    }
    let _ = out.flush();
    0
}
