use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use thiserror::Error;

/// A stage with its `<`/`>` operators stripped and the named files opened.
#[derive(Debug)]
pub struct Resolved {
    pub argv: Vec<String>,
    pub stdin: Option<File>,
    pub stdout: Option<File>,
}

#[derive(Debug, Error)]
pub enum RedirError {
    #[error("missing file name after `{0}`")]
    MissingOperand(&'static str),
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Scans left to right for `<` and `>`; the operator and its file name
/// never reach the launched program. Multiple redirections of the same
/// direction all open their files; the last one wins.
pub fn resolve(args: &[String]) -> Result<Resolved, RedirError> {
    let mut argv = Vec::with_capacity(args.len());
    let mut stdin = None;
    let mut stdout = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "<" => {
                let path = args.get(i + 1).ok_or(RedirError::MissingOperand("<"))?;
                let file = File::open(path).map_err(|e| RedirError::Open {
                    path: path.clone(),
                    source: e,
                })?;
                stdin = Some(file);
                i += 2;
            }
            ">" => {
                let path = args.get(i + 1).ok_or(RedirError::MissingOperand(">"))?;
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(0o644)
                    .open(path)
                    .map_err(|e| RedirError::Open {
                        path: path.clone(),
                        source: e,
                    })?;
                stdout = Some(file);
                i += 2;
            }
            _ => {
                argv.push(args[i].clone());
                i += 1;
            }
        }
    }

    Ok(Resolved {
        argv,
        stdin,
        stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn no_operators_is_identity() {
        let r = resolve(&args(&["ls", "-l", "/tmp"])).unwrap();
        assert_eq!(r.argv, args(&["ls", "-l", "/tmp"]));
        assert!(r.stdin.is_none());
        assert!(r.stdout.is_none());
    }

    #[test]
    fn input_redirection_is_stripped_and_opened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::write(&path, b"hello\n").unwrap();

        let r = resolve(&args(&["wc", "-l", "<", path.to_str().unwrap()])).unwrap();
        assert_eq!(r.argv, args(&["wc", "-l"]));
        assert!(r.stdout.is_none());

        let mut content = String::new();
        r.stdin.unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello\n");
    }

    #[test]
    fn output_redirection_creates_and_truncates() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"old contents").unwrap();

        let r = resolve(&args(&["ls", ">", path.to_str().unwrap()])).unwrap();
        assert_eq!(r.argv, args(&["ls"]));
        r.stdout.unwrap().write_all(b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        let fresh = dir.path().join("fresh.txt");
        let r = resolve(&args(&["ls", ">", fresh.to_str().unwrap()])).unwrap();
        drop(r);
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn both_directions_in_one_stage() {
        let dir = tempfile::tempdir().unwrap();
        let inp = dir.path().join("in.txt");
        let outp = dir.path().join("out.txt");
        std::fs::write(&inp, b"x").unwrap();

        let r = resolve(&args(&[
            "sort",
            "<",
            inp.to_str().unwrap(),
            ">",
            outp.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(r.argv, args(&["sort"]));
        assert!(r.stdin.is_some());
        assert!(r.stdout.is_some());
    }

    #[test]
    fn last_output_redirection_wins() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");

        let r = resolve(&args(&[
            "ls",
            ">",
            a.to_str().unwrap(),
            ">",
            b.to_str().unwrap(),
        ]))
        .unwrap();
        r.stdout.unwrap().write_all(b"winner").unwrap();

        // Both files were opened (and so created); only the last receives output.
        assert_eq!(std::fs::read(&a).unwrap(), b"");
        assert_eq!(std::fs::read(&b).unwrap(), b"winner");
    }

    #[test]
    fn missing_operand_is_an_error() {
        assert!(matches!(
            resolve(&args(&["ls", ">"])),
            Err(RedirError::MissingOperand(">"))
        ));
        assert!(matches!(
            resolve(&args(&["ls", "<"])),
            Err(RedirError::MissingOperand("<"))
        ));
    }

    #[test]
    fn unreadable_input_reports_os_error() {
        let err = resolve(&args(&["cat", "<", "/no/such/file"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/no/such/file"), "got: {msg}");
    }
}
