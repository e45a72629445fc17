/// Splits raw command input into a flag blob followed by positional arguments.
///
/// Element 0 of the result is the flag blob, possibly empty. Empty input yields an
/// empty vector, which the argument view reads as no flags and no arguments.
pub trait ArgumentSplitter: Send + Sync {
    fn split(&self, raw: &str) -> Vec<String>;

    /// Like [`split`](Self::split), also marking which positional arguments were
    /// written in quotes.
    fn split_marked(&self, raw: &str) -> Split {
        Split::from_parts(self.split(raw))
    }

    /// Reads leading flags from arguments an earlier split already produced, as
    /// when a branch command hands its remaining arguments to a sub-command. The
    /// arguments are never split again and quoted ones stay positional.
    fn split_tokens(&self, tokens: Vec<String>, quoted: Vec<bool>) -> Split {
        Split::positional(tokens, quoted)
    }
}

impl<S: ArgumentSplitter + ?Sized> ArgumentSplitter for Box<S> {
    fn split(&self, raw: &str) -> Vec<String> {
        (**self).split(raw)
    }

    fn split_marked(&self, raw: &str) -> Split {
        (**self).split_marked(raw)
    }

    fn split_tokens(&self, tokens: Vec<String>, quoted: Vec<bool>) -> Split {
        (**self).split_tokens(tokens, quoted)
    }
}

/// A flag blob and the positional arguments, each marked with whether it was
/// quoted. `quoted` always has one entry per argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub flags: String,
    pub args: Vec<String>,
    pub quoted: Vec<bool>,
}

impl Split {
    /// Reads the `[flags, args...]` layout returned by [`ArgumentSplitter::split`].
    pub fn from_parts(mut parts: Vec<String>) -> Split {
        if parts.is_empty() {
            return Split::default();
        }
        let flags = parts.remove(0);
        let quoted = vec![false; parts.len()];
        Split {
            flags,
            args: parts,
            quoted,
        }
    }

    /// No flags, every token positional.
    pub fn positional(args: Vec<String>, mut quoted: Vec<bool>) -> Split {
        quoted.resize(args.len(), false);
        Split {
            flags: String::new(),
            args,
            quoted,
        }
    }

    pub fn into_parts(self) -> Vec<String> {
        if self.flags.is_empty() && self.args.is_empty() {
            return Vec::new();
        }
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.flags);
        parts.extend(self.args);
        parts
    }
}

/// Passes whitespace separated tokens through untouched. Never produces flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainSplitter;

impl ArgumentSplitter for PlainSplitter {
    fn split(&self, raw: &str) -> Vec<String> {
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let mut parts = vec![String::new()];
        parts.extend(raw.split_whitespace().map(str::to_string));
        parts
    }
}

/// Collects leading `-abc` tokens into the flag blob.
///
/// Flag parsing stops at the first positional token or at `--`. Tokens that parse
/// as numbers stay positional so `-5` can still be passed as an argument.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagSplitter;

impl ArgumentSplitter for FlagSplitter {
    fn split(&self, raw: &str) -> Vec<String> {
        let tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        collect_flags(tokens, Vec::new()).into_parts()
    }

    fn split_tokens(&self, tokens: Vec<String>, quoted: Vec<bool>) -> Split {
        collect_flags(tokens, quoted)
    }
}

/// Shell-like splitting: double and single quotes group words, backslash escapes the
/// next character. Leading flags are collected like [`FlagSplitter`] does, but quoted
/// tokens are always positional.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuotedSplitter;

impl ArgumentSplitter for QuotedSplitter {
    fn split(&self, raw: &str) -> Vec<String> {
        self.split_marked(raw).into_parts()
    }

    fn split_marked(&self, raw: &str) -> Split {
        let mut tokens = Vec::new();
        let mut quoted = Vec::new();
        let mut current = String::new();
        let mut in_token = false;
        let mut was_quoted = false;
        let mut quote: Option<char> = None;
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match (c, quote) {
                ('\\', _) => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                    in_token = true;
                }
                (c, Some(open)) if c == open => quote = None,
                (_, Some(_)) => current.push(c),
                ('"' | '\'', None) => {
                    quote = Some(c);
                    in_token = true;
                    was_quoted = true;
                }
                (c, None) if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        quoted.push(was_quoted);
                        in_token = false;
                        was_quoted = false;
                    }
                }
                (c, None) => {
                    current.push(c);
                    in_token = true;
                }
            }
        }
        if in_token {
            tokens.push(current);
            quoted.push(was_quoted);
        }

        collect_flags(tokens, quoted)
    }

    fn split_tokens(&self, tokens: Vec<String>, quoted: Vec<bool>) -> Split {
        collect_flags(tokens, quoted)
    }
}

fn is_flag_token(token: &str) -> bool {
    token.len() > 1
        && token.starts_with('-')
        && token != "--"
        && token.parse::<f64>().is_err()
}

fn leading_flag_tokens(tokens: &[String], quoted: &[bool]) -> usize {
    let mut count = 0;
    for (index, token) in tokens.iter().enumerate() {
        if quoted.get(index).copied().unwrap_or(false) {
            break;
        }
        if token == "--" {
            count += 1;
            break;
        }
        if !is_flag_token(token) {
            break;
        }
        count += 1;
    }
    count
}

fn collect_flags(tokens: Vec<String>, mut quoted: Vec<bool>) -> Split {
    quoted.resize(tokens.len(), false);
    let flag_count = leading_flag_tokens(&tokens, &quoted);
    let mut flags = String::new();
    for token in &tokens[..flag_count] {
        if token != "--" {
            flags.push_str(&token[1..]);
        }
    }
    Split {
        flags,
        args: tokens.into_iter().skip(flag_count).collect(),
        quoted: quoted.split_off(flag_count),
    }
}
