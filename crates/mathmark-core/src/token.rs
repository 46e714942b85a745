use serde::Serialize;

pub const MATH_INLINE: &str = "math_inline";
pub const MATH_BLOCK: &str = "math_block";

/// Level change a token applies to the nesting depth.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    Opening,
    SelfClosing,
    Closing,
}

/// Source lines covered by a block token: `start` inclusive, `end` exclusive.
///
/// Serialized as `[start, end]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(into = "[usize; 2]")]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<LineRange> for [usize; 2] {
    fn from(range: LineRange) -> Self {
        [range.start, range.end]
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: String,
    pub tag: String,
    pub nesting: Nesting,
    pub content: String,
    pub markup: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<LineRange>,
    /// Block-level token; drives line feeds in the renderer.
    pub block: bool,
    /// Skipped by the renderer.
    pub hidden: bool,
    pub level: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
}

impl Token {
    pub fn new(kind: impl Into<String>, tag: impl Into<String>, nesting: Nesting) -> Self {
        Self {
            kind: kind.into(),
            tag: tag.into(),
            nesting,
            content: String::new(),
            markup: String::new(),
            map: None,
            block: false,
            hidden: false,
            level: 0,
            children: Vec::new(),
        }
    }

    pub fn is_math(&self) -> bool {
        self.kind == MATH_INLINE || self.kind == MATH_BLOCK
    }
}
