//! Inline tokenizer: a position cursor over one block's inline content.

use crate::markdown::{Env, Markdown};
use crate::ruler::{RuleOptions, Ruler};
use crate::token::{Nesting, Token};

pub type InlineRule = Box<dyn Fn(&mut InlineState<'_>, bool) -> bool + Send + Sync>;

/// Boxes a closure as an [`InlineRule`].
pub fn inline_rule<R>(rule: R) -> InlineRule
where
    R: Fn(&mut InlineState<'_>, bool) -> bool + Send + Sync + 'static,
{
    Box::new(rule)
}

pub struct InlineState<'a> {
    pub src: &'a str,
    pub md: &'a Markdown,
    pub env: &'a Env,
    pub tokens: Vec<Token>,
    pub pos: usize,
    /// Exclusive end of the inline source.
    pub pos_max: usize,
    pub level: usize,
    /// Literal text not yet flushed into a `text` token.
    pub pending: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineCheckpoint {
    pos: usize,
    tokens: usize,
    level: usize,
    pending: String,
}

impl<'a> InlineState<'a> {
    pub fn new(src: &'a str, md: &'a Markdown, env: &'a Env) -> Self {
        Self {
            src,
            md,
            env,
            tokens: Vec::new(),
            pos: 0,
            pos_max: src.len(),
            level: 0,
            pending: String::new(),
        }
    }

    /// Flushes pending text into a `text` token.
    pub fn push_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut token = Token::new("text", "", Nesting::SelfClosing);
        token.content = std::mem::take(&mut self.pending);
        token.level = self.level;
        self.tokens.push(token);
    }

    /// Appends a token, flushing pending text first.
    pub fn push(
        &mut self,
        kind: impl Into<String>,
        tag: impl Into<String>,
        nesting: Nesting,
    ) -> &mut Token {
        self.push_pending();
        let mut token = Token::new(kind, tag, nesting);
        if nesting == Nesting::Closing {
            self.level = self.level.saturating_sub(1);
        }
        token.level = self.level;
        if nesting == Nesting::Opening {
            self.level += 1;
        }
        self.tokens.push(token);
        let last = self.tokens.len() - 1;
        &mut self.tokens[last]
    }

    pub fn checkpoint(&self) -> InlineCheckpoint {
        InlineCheckpoint {
            pos: self.pos,
            tokens: self.tokens.len(),
            level: self.level,
            pending: self.pending.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: InlineCheckpoint) {
        self.pos = checkpoint.pos;
        self.tokens.truncate(checkpoint.tokens);
        self.level = checkpoint.level;
        self.pending = checkpoint.pending;
    }
}

pub struct InlineParser {
    pub ruler: Ruler<InlineRule>,
}

impl Default for InlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineParser {
    pub fn new() -> Self {
        let mut ruler: Ruler<InlineRule> = Ruler::new();
        let builtins: [(&str, InlineRule); 3] = [
            ("text", Box::new(text)),
            ("newline", Box::new(newline)),
            ("escape", Box::new(escape)),
        ];
        for (name, rule) in builtins {
            if let Err(err) = ruler.push(name, rule, RuleOptions::default()) {
                tracing::error!(rule = name, error = %err, "Failed to register built-in inline rule");
            }
        }
        Self { ruler }
    }

    /// Tokenizes `src` into a flat list of inline tokens.
    pub fn parse(&self, src: &str, md: &Markdown, env: &Env) -> Vec<Token> {
        let mut state = InlineState::new(src, md, env);
        self.tokenize(&mut state);
        state.tokens
    }

    pub fn tokenize(&self, state: &mut InlineState<'_>) {
        let rules = self.ruler.get_rules("");
        while state.pos < state.pos_max {
            let pos = state.pos;
            let matched = rules.iter().any(|rule| rule(state, false));
            if matched && state.pos > pos {
                continue;
            }
            if matched {
                tracing::warn!(pos, "inline rule matched without advancing");
                state.pos = pos;
            }
            let Some(ch) = state.src[pos..].chars().next() else {
                break;
            };
            state.pending.push(ch);
            state.pos = pos + ch.len_utf8();
        }
        state.push_pending();
    }
}

fn is_terminator(byte: u8) -> bool {
    matches!(
        byte,
        b'\n'
            | b'!'
            | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'*'
            | b'+'
            | b'-'
            | b':'
            | b'<'
            | b'='
            | b'>'
            | b'@'
            | b'['
            | b'\\'
            | b']'
            | b'^'
            | b'_'
            | b'`'
            | b'{'
            | b'}'
            | b'~'
    )
}

fn text(state: &mut InlineState<'_>, silent: bool) -> bool {
    let src = state.src;
    let bytes = src.as_bytes();
    let start = state.pos;
    let mut pos = start;
    while pos < state.pos_max && !is_terminator(bytes[pos]) {
        pos += 1;
    }
    if pos == start {
        return false;
    }
    if !silent {
        state.pending.push_str(&src[start..pos]);
    }
    state.pos = pos;
    true
}

fn newline(state: &mut InlineState<'_>, silent: bool) -> bool {
    let src = state.src;
    let bytes = src.as_bytes();
    if bytes.get(state.pos) != Some(&b'\n') {
        return false;
    }
    if !silent {
        let trimmed = state.pending.trim_end_matches(' ').len();
        let hard = state.pending.len() - trimmed >= 2;
        state.pending.truncate(trimmed);
        let kind = if hard { "hardbreak" } else { "softbreak" };
        state.push(kind, "br", Nesting::SelfClosing);
    }
    let mut pos = state.pos + 1;
    while pos < state.pos_max && bytes[pos] == b' ' {
        pos += 1;
    }
    state.pos = pos;
    true
}

fn escape(state: &mut InlineState<'_>, silent: bool) -> bool {
    let src = state.src;
    let bytes = src.as_bytes();
    let pos = state.pos;
    if bytes.get(pos) != Some(&b'\\') {
        return false;
    }
    match bytes.get(pos + 1) {
        Some(&next) if pos + 1 < state.pos_max && next.is_ascii_punctuation() => {
            if !silent {
                state.pending.push(char::from(next));
            }
            state.pos = pos + 2;
        }
        Some(&b'\n') if pos + 1 < state.pos_max => {
            if !silent {
                state.push("hardbreak", "br", Nesting::SelfClosing);
            }
            state.pos = pos + 2;
        }
        _ => {
            if !silent {
                state.pending.push('\\');
            }
            state.pos = pos + 1;
        }
    }
    true
}
