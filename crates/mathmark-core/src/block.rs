//! Line-based block tokenizer and its parse state.

use crate::markdown::{Env, Markdown};
use crate::ruler::{RuleOptions, Ruler};
use crate::token::{LineRange, Nesting, Token};

pub type BlockRule = Box<dyn Fn(&mut BlockState<'_>, usize, usize, bool) -> bool + Send + Sync>;

/// Boxes a closure as a [`BlockRule`].
pub fn block_rule<R>(rule: R) -> BlockRule
where
    R: Fn(&mut BlockState<'_>, usize, usize, bool) -> bool + Send + Sync + 'static,
{
    Box::new(rule)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParentType {
    Root,
    Paragraph,
}

/// Mutable state of one block-level parse.
///
/// The line tables hold one entry per source line plus a trailing sentinel
/// entry at `line_max` pointing at the end of the source.
pub struct BlockState<'a> {
    pub src: &'a str,
    pub md: &'a Markdown,
    pub env: &'a Env,
    pub tokens: Vec<Token>,
    /// Line begin offsets.
    pub b_marks: Vec<usize>,
    /// Line end offsets, excluding the line feed.
    pub e_marks: Vec<usize>,
    /// Bytes of leading spaces and tabs per line.
    pub t_shift: Vec<usize>,
    /// Leading indent per line with tabs expanded to multiples of four.
    pub s_count: Vec<usize>,
    /// Indent content must reach to belong to the current container.
    pub blk_indent: usize,
    pub line: usize,
    pub line_max: usize,
    pub parent_type: ParentType,
    pub level: usize,
}

/// Snapshot taken before a guarded rule runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockCheckpoint {
    line: usize,
    tokens: usize,
    level: usize,
    parent_type: ParentType,
}

impl<'a> BlockState<'a> {
    pub fn new(src: &'a str, md: &'a Markdown, env: &'a Env) -> Self {
        let mut state = Self {
            src,
            md,
            env,
            tokens: Vec::new(),
            b_marks: Vec::new(),
            e_marks: Vec::new(),
            t_shift: Vec::new(),
            s_count: Vec::new(),
            blk_indent: 0,
            line: 0,
            line_max: 0,
            parent_type: ParentType::Root,
            level: 0,
        };

        let bytes = src.as_bytes();
        let len = bytes.len();
        let mut start = 0;
        let mut indent = 0;
        let mut offset = 0;
        let mut indent_found = false;
        for (pos, &ch) in bytes.iter().enumerate() {
            if !indent_found {
                if is_space(ch) {
                    indent += 1;
                    offset += if ch == b'\t' { 4 - offset % 4 } else { 1 };
                    continue;
                }
                indent_found = true;
            }
            if ch == b'\n' || pos + 1 == len {
                let end = if ch == b'\n' { pos } else { pos + 1 };
                state.push_line(start, end, indent, offset);
                indent_found = false;
                indent = 0;
                offset = 0;
                start = pos + 1;
            }
        }
        if start < len {
            // whitespace-only last line without a line feed
            state.push_line(start, len, indent, offset);
        }
        state.push_line(len, len, 0, 0);
        state.line_max = state.b_marks.len() - 1;
        state
    }

    fn push_line(&mut self, begin: usize, end: usize, t_shift: usize, s_count: usize) {
        self.b_marks.push(begin);
        self.e_marks.push(end);
        self.t_shift.push(t_shift);
        self.s_count.push(s_count);
    }

    pub fn is_empty(&self, line: usize) -> bool {
        self.b_marks[line] + self.t_shift[line] >= self.e_marks[line]
    }

    pub fn skip_empty_lines(&self, mut from: usize) -> usize {
        while from < self.line_max && self.is_empty(from) {
            from += 1;
        }
        from
    }

    /// Source text of lines `begin..end`, with up to `indent` columns of
    /// leading whitespace removed from each line.
    pub fn get_lines(&self, begin: usize, end: usize, indent: usize, keep_last_lf: bool) -> String {
        if begin >= end {
            return String::new();
        }
        let bytes = self.src.as_bytes();
        let mut out = String::new();
        for line in begin..end {
            let mut first = self.b_marks[line];
            let last = if line + 1 < end || keep_last_lf {
                (self.e_marks[line] + 1).min(self.src.len())
            } else {
                self.e_marks[line]
            };
            let mut line_indent = 0;
            while first < last && line_indent < indent {
                match bytes[first] {
                    b'\t' => line_indent += 4 - line_indent % 4,
                    b' ' => line_indent += 1,
                    _ => break,
                }
                first += 1;
            }
            if line_indent > indent {
                // a tab overshot the indent; keep the remainder as spaces
                out.push_str(&" ".repeat(line_indent - indent));
            }
            out.push_str(&self.src[first..last]);
        }
        out
    }

    /// Appends a block-level token and tracks nesting.
    pub fn push(
        &mut self,
        kind: impl Into<String>,
        tag: impl Into<String>,
        nesting: Nesting,
    ) -> &mut Token {
        let mut token = Token::new(kind, tag, nesting);
        token.block = true;
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

    pub fn checkpoint(&self) -> BlockCheckpoint {
        BlockCheckpoint {
            line: self.line,
            tokens: self.tokens.len(),
            level: self.level,
            parent_type: self.parent_type,
        }
    }

    pub fn restore(&mut self, checkpoint: BlockCheckpoint) {
        self.line = checkpoint.line;
        self.tokens.truncate(checkpoint.tokens);
        self.level = checkpoint.level;
        self.parent_type = checkpoint.parent_type;
    }
}

pub struct BlockParser {
    pub ruler: Ruler<BlockRule>,
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockParser {
    pub fn new() -> Self {
        let mut ruler: Ruler<BlockRule> = Ruler::new();
        let builtins: [(&str, BlockRule, RuleOptions); 2] = [
            (
                "heading",
                Box::new(heading),
                RuleOptions::alt(["paragraph", "reference", "blockquote"]),
            ),
            ("paragraph", Box::new(paragraph), RuleOptions::default()),
        ];
        for (name, rule, options) in builtins {
            if let Err(err) = ruler.push(name, rule, options) {
                tracing::error!(rule = name, error = %err, "Failed to register built-in block rule");
            }
        }
        Self { ruler }
    }

    /// Runs the block rules over lines `start..end`.
    pub fn tokenize(&self, state: &mut BlockState<'_>, start: usize, end: usize) {
        let rules = self.ruler.get_rules("");
        let mut line = start;
        while line < end {
            line = state.skip_empty_lines(line);
            state.line = line;
            if line >= end || state.s_count[line] < state.blk_indent {
                break;
            }

            let matched = rules.iter().any(|rule| rule(state, line, end, false));
            if !matched || state.line <= line {
                tracing::warn!(line, matched, "no block rule consumed the line; skipping it");
                state.line = line + 1;
            }
            line = state.line;
        }
    }
}

fn is_space(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

fn heading(state: &mut BlockState<'_>, start: usize, _end: usize, silent: bool) -> bool {
    if state.s_count[start] >= state.blk_indent + 4 {
        return false;
    }
    let src = state.src;
    let bytes = src.as_bytes();
    let mut pos = state.b_marks[start] + state.t_shift[start];
    let max = state.e_marks[start];
    let level = bytes[pos..max].iter().take_while(|&&b| b == b'#').count();
    if level == 0 || level > 6 {
        return false;
    }
    pos += level;
    if pos < max && !is_space(bytes[pos]) {
        return false;
    }
    if silent {
        return true;
    }

    let mut text = src[pos..max].trim_end_matches([' ', '\t']);
    let without_closing = text.trim_end_matches('#');
    if without_closing.len() < text.len()
        && (without_closing.is_empty() || without_closing.ends_with([' ', '\t']))
    {
        text = without_closing;
    }
    let content = text.trim().to_string();
    let map = Some(LineRange::new(start, start + 1));
    let markup = "#".repeat(level);
    let tag = format!("h{level}");
    state.line = start + 1;

    let open = state.push("heading_open", tag.as_str(), Nesting::Opening);
    open.markup = markup.clone();
    open.map = map;
    let inline = state.push("inline", "", Nesting::SelfClosing);
    inline.content = content;
    inline.map = map;
    let close = state.push("heading_close", tag, Nesting::Closing);
    close.markup = markup;
    true
}

fn paragraph(state: &mut BlockState<'_>, start: usize, _end: usize, _silent: bool) -> bool {
    let md = state.md;
    let terminators = md.block.ruler.get_rules("paragraph");
    let end = state.line_max;
    let parent_type = state.parent_type;
    state.parent_type = ParentType::Paragraph;

    let mut next = start + 1;
    while next < end && !state.is_empty(next) {
        // indented continuation lines can never start another block
        if state.s_count[next] > state.blk_indent + 3 {
            next += 1;
            continue;
        }
        if terminators.iter().any(|rule| rule(state, next, end, true)) {
            break;
        }
        next += 1;
    }

    let content = state
        .get_lines(start, next, state.blk_indent, false)
        .trim()
        .to_string();
    let map = Some(LineRange::new(start, next));
    state.line = next;

    state.push("paragraph_open", "p", Nesting::Opening).map = map;
    let inline = state.push("inline", "", Nesting::SelfClosing);
    inline.content = content;
    inline.map = map;
    state.push("paragraph_close", "p", Nesting::Closing);
    state.parent_type = parent_type;
    true
}

#[cfg(test)]
mod tests {
    use super::BlockState;
    use crate::markdown::{Env, Markdown};
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_line_tables_with_sentinel() {
        let md = Markdown::new();
        let env = Env::new();
        let state = BlockState::new("ab\n  cd\n\n\tx", &md, &env);

        assert_eq!(state.line_max, 4);
        assert_eq!(state.b_marks, vec![0, 3, 8, 9, 11]);
        assert_eq!(state.e_marks, vec![2, 7, 8, 11, 11]);
        assert_eq!(state.t_shift, vec![0, 2, 0, 1, 0]);
        assert_eq!(state.s_count, vec![0, 2, 0, 4, 0]);
        assert!(state.is_empty(2));
        assert_eq!(state.skip_empty_lines(2), 3);
    }

    #[test]
    fn get_lines_strips_indent_and_keeps_deeper_indent() {
        let md = Markdown::new();
        let env = Env::new();
        let state = BlockState::new("  a\n    b\nc", &md, &env);

        assert_eq!(state.get_lines(0, 3, 2, false), "a\n  b\nc");
        assert_eq!(state.get_lines(0, 2, 0, true), "  a\n    b\n");
        assert_eq!(state.get_lines(2, 2, 0, true), "");
    }

    #[test]
    fn whitespace_only_last_line_is_kept() {
        let md = Markdown::new();
        let env = Env::new();
        let state = BlockState::new("a\n  ", &md, &env);
        assert_eq!(state.line_max, 2);
        assert!(state.is_empty(1));
        assert_eq!(state.s_count[1], 2);
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        let md = Markdown::new();
        let env = Env::new();
        let state = BlockState::new("a\n", &md, &env);
        assert_eq!(state.line_max, 1);
    }

    #[test]
    fn headings_interrupt_paragraphs() {
        let md = Markdown::new();
        let tokens = md.parse("text\n## Title ##\nmore", &Env::new());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.as_str()).collect();

        assert_eq!(
            kinds,
            vec![
                "paragraph_open",
                "inline",
                "paragraph_close",
                "heading_open",
                "inline",
                "heading_close",
                "paragraph_open",
                "inline",
                "paragraph_close",
            ]
        );
        assert_eq!(tokens[3].tag, "h2");
        assert_eq!(tokens[4].content, "Title");
    }
}
