use std::collections::HashMap;

use crate::block::{BlockParser, BlockState};
use crate::inline::InlineParser;
use crate::renderer::{RenderOptions, Renderer, sanitize_html};
use crate::token::Token;

/// Per-document variables shared by rules and render functions.
pub type Env = HashMap<String, String>;

/// Parser facade: the block and inline rule chains plus the render table.
pub struct Markdown {
    pub block: BlockParser,
    pub inline: InlineParser,
    pub renderer: Renderer,
    pub options: RenderOptions,
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Markdown {
    pub fn new() -> Self {
        Self {
            block: BlockParser::new(),
            inline: InlineParser::new(),
            renderer: Renderer::new(),
            options: RenderOptions::default(),
        }
    }

    /// Applies a plugin, which may add rules and render functions.
    pub fn use_plugin<P>(mut self, plugin: P) -> Self
    where
        P: FnOnce(&mut Self),
    {
        plugin(&mut self);
        self
    }

    /// Parses `src` into a block token stream whose `inline` tokens carry
    /// their inline children.
    pub fn parse(&self, src: &str, env: &Env) -> Vec<Token> {
        let src = normalize(src);
        let mut state = BlockState::new(&src, self, env);
        let end = state.line_max;
        self.block.tokenize(&mut state, 0, end);

        let mut tokens = state.tokens;
        for token in tokens.iter_mut().filter(|token| token.kind == "inline") {
            token.children = self.inline.parse(&token.content, self, env);
        }
        tokens
    }

    pub fn render(&self, src: &str) -> String {
        let env = Env::new();
        let tokens = self.parse(src, &env);
        self.render_tokens(&tokens, &env)
    }

    pub fn render_tokens(&self, tokens: &[Token], env: &Env) -> String {
        self.renderer.render(tokens, &self.options, env)
    }

    /// Renders and then sanitizes the HTML against the allow-list.
    pub fn render_sanitized(&self, src: &str) -> String {
        sanitize_html(&self.render(src))
    }
}

fn normalize(src: &str) -> String {
    src.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "\u{FFFD}")
}
