use thiserror::Error;

/// Argument lists are silently truncated beyond this many tokens.
pub const MAX_ARGS: usize = 64;

/// One command's argument vector; element 0 is the command name.
pub type Stage = Vec<String>;

/// One or two stages plus the trailing-`&` flag.
#[derive(Debug, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub background: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("at most one `|` per line")]
    TooManyPipes,
    #[error("missing command around `|`")]
    EmptyStage,
    #[error("missing command before `&`")]
    MissingCommand,
}

/// Splits on space/tab runs into owned tokens. Never produces empty tokens.
pub fn tokenize(text: &str) -> Stage {
    text.split_whitespace()
        .take(MAX_ARGS)
        .map(|t| t.to_string())
        .collect()
}

/// Splits a line into a [`Pipeline`]. Blank lines yield `None`.
///
/// The pipe split is textual: the first `|` divides the line, before
/// tokenization. There is no quoting grammar, so a literal `|` or `&`
/// inside an argument cannot be escaped. Lines with more than one `|`
/// are rejected.
pub fn parse_line(line: &str) -> Result<Option<Pipeline>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut stages: Vec<Stage> = match line.find('|') {
        Some(pos) => {
            let (left, right) = (&line[..pos], &line[pos + 1..]);
            if right.contains('|') {
                return Err(ParseError::TooManyPipes);
            }
            let left = tokenize(left);
            let right = tokenize(right);
            if left.is_empty() || right.is_empty() {
                return Err(ParseError::EmptyStage);
            }
            vec![left, right]
        }
        None => {
            let only = tokenize(line);
            if only.is_empty() {
                return Ok(None);
            }
            vec![only]
        }
    };

    // `&` counts only as the very last token of the final stage.
    let mut background = false;
    let last = stages.last_mut().unwrap();
    if last.last().map(String::as_str) == Some("&") {
        last.pop();
        background = true;
        if last.is_empty() {
            return Err(if stages.len() == 2 {
                ParseError::EmptyStage
            } else {
                ParseError::MissingCommand
            });
        }
    }

    Ok(Some(Pipeline { stages, background }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(words: &[&str]) -> Stage {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn tokenize_collapses_whitespace() {
        assert_eq!(tokenize("ls -l /tmp"), stage(&["ls", "-l", "/tmp"]));
        assert_eq!(tokenize("  a \t b  "), stage(&["a", "b"]));
        assert_eq!(tokenize(" \t "), Vec::<String>::new());
    }

    #[test]
    fn tokenize_truncates_overlong_argv() {
        let line = (0..MAX_ARGS + 10)
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(tokenize(&line).len(), MAX_ARGS);
    }

    #[test]
    fn blank_line_is_no_pipeline() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   \t "), Ok(None));
    }

    #[test]
    fn simple_command() {
        let p = parse_line("ls -l /tmp").unwrap().unwrap();
        assert_eq!(p.stages, vec![stage(&["ls", "-l", "/tmp"])]);
        assert!(!p.background);
    }

    #[test]
    fn two_stage_pipe() {
        let p = parse_line("echo hi | wc -l").unwrap().unwrap();
        assert_eq!(p.stages, vec![stage(&["echo", "hi"]), stage(&["wc", "-l"])]);
        assert!(!p.background);
    }

    #[test]
    fn trailing_ampersand_sets_background() {
        let p = parse_line("sleep 5 &").unwrap().unwrap();
        assert_eq!(p.stages, vec![stage(&["sleep", "5"])]);
        assert!(p.background);
    }

    #[test]
    fn background_pipe() {
        let p = parse_line("cat f | wc &").unwrap().unwrap();
        assert_eq!(p.stages.len(), 2);
        assert_eq!(p.stages[1], stage(&["wc"]));
        assert!(p.background);
    }

    #[test]
    fn ampersand_not_last_is_an_argument() {
        let p = parse_line("echo & hi").unwrap().unwrap();
        assert_eq!(p.stages, vec![stage(&["echo", "&", "hi"])]);
        assert!(!p.background);
    }

    #[test]
    fn rejects_multiple_pipes() {
        assert_eq!(parse_line("a | b | c"), Err(ParseError::TooManyPipes));
    }

    #[test]
    fn rejects_empty_pipe_stage() {
        assert_eq!(parse_line("| wc"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls |"), Err(ParseError::EmptyStage));
        assert_eq!(parse_line("ls | &"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn rejects_bare_ampersand() {
        assert_eq!(parse_line("&"), Err(ParseError::MissingCommand));
    }
}
