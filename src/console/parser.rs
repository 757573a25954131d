//! Command line tokenizer
//!
//! `verb` is the first token. The remainder splits into at most
//! [`MAX_ARGS`] positional arguments; the last one takes all remaining text
//! verbatim, spaces included.

/// Maximum positional arguments after the verb.
pub const MAX_ARGS: usize = 4;

/// Parsed command with up to [`MAX_ARGS`] arguments
#[derive(Debug, Clone)]
pub struct ParsedCommand<'a> {
    /// The command name (first token)
    pub command: &'a str,
    /// Positional arguments, last one absorbing the remainder
    pub args: [Option<&'a str>; MAX_ARGS],
    /// Everything after the verb, trimmed
    rest: &'a str,
}

impl<'a> ParsedCommand<'a> {
    /// Create empty command
    pub const fn empty() -> Self {
        Self {
            command: "",
            args: [None; MAX_ARGS],
            rest: "",
        }
    }

    /// Get argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }

    /// Verbatim text starting at argument `idx`, through end of line.
    ///
    /// `set ssid My Studio` → `tail(1) == Some("My Studio")`.
    pub fn tail(&self, idx: usize) -> Option<&'a str> {
        let mut rest = self.rest;
        for _ in 0..idx {
            let end = rest.find(char::is_whitespace)?;
            rest = rest[end..].trim_start();
        }
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// Split `input` into at most `N` arguments; the `N`th takes the remainder.
pub fn split_args<const N: usize>(input: &str) -> [Option<&str>; N] {
    let mut args = [None; N];
    let mut rest = input.trim();

    for (i, slot) in args.iter_mut().enumerate() {
        if rest.is_empty() {
            break;
        }
        if i + 1 == N {
            *slot = Some(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                *slot = Some(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                *slot = Some(rest);
                rest = "";
            }
        }
    }

    args
}

/// Parse a command line into command and arguments
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let line = line.trim();

    let (command, rest) = match line.find(char::is_whitespace) {
        Some(end) => (&line[..end], line[end..].trim_start()),
        None => (line, ""),
    };

    ParsedCommand {
        command,
        args: split_args::<MAX_ARGS>(rest),
        rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fixed_arity() {
        assert_eq!(split_args::<2>("a b c"), [Some("a"), Some("b c")]);
        assert_eq!(split_args::<3>("a"), [Some("a"), None, None]);
        assert_eq!(split_args::<1>("  one  two "), [Some("one  two")]);
        assert_eq!(split_args::<2>(""), [None, None]);
    }

    #[test]
    fn test_tail() {
        let cmd = parse_line("set ssid My  Studio Net");
        assert_eq!(cmd.tail(0), Some("ssid My  Studio Net"));
        assert_eq!(cmd.tail(1), Some("My  Studio Net"));
        assert_eq!(cmd.tail(4), None);
        assert_eq!(parse_line("save").tail(0), None);
    }
}
