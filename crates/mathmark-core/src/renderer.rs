//! Token stream to HTML, dispatched per token type.

use std::collections::{HashMap, HashSet};

use ammonia::Builder;

use crate::markdown::Env;
use crate::token::{Nesting, Token};

pub type RenderFn = Box<dyn Fn(&[Token], usize, &RenderOptions, &Env) -> String + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RenderOptions {
    /// Close void elements XHTML style (`<br />`).
    pub xhtml_out: bool,
    /// Render soft breaks as `<br>`.
    pub breaks: bool,
}

pub struct Renderer {
    rules: HashMap<String, RenderFn>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut renderer = Self {
            rules: HashMap::new(),
        };
        renderer.set_rule("text", |tokens, idx, _, _| escape_html(&tokens[idx].content));
        renderer.set_rule("softbreak", |_, _, options, _| {
            if options.breaks {
                line_break(options)
            } else {
                "\n".to_string()
            }
        });
        renderer.set_rule("hardbreak", |_, _, options, _| line_break(options));
        renderer
    }

    /// Installs the render function for a token type and returns the one it replaced.
    pub fn set_rule<F>(&mut self, kind: &str, rule: F) -> Option<RenderFn>
    where
        F: Fn(&[Token], usize, &RenderOptions, &Env) -> String + Send + Sync + 'static,
    {
        self.rules.insert(kind.to_string(), Box::new(rule))
    }

    pub fn has_rule(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }

    pub fn render(&self, tokens: &[Token], options: &RenderOptions, env: &Env) -> String {
        let mut out = String::new();
        for (idx, token) in tokens.iter().enumerate() {
            if token.kind == "inline" {
                out.push_str(&self.render_inline(&token.children, options, env));
            } else {
                out.push_str(&self.render_one(tokens, idx, options, env));
            }
        }
        out
    }

    pub fn render_inline(&self, tokens: &[Token], options: &RenderOptions, env: &Env) -> String {
        (0..tokens.len())
            .map(|idx| self.render_one(tokens, idx, options, env))
            .collect()
    }

    fn render_one(&self, tokens: &[Token], idx: usize, options: &RenderOptions, env: &Env) -> String {
        match self.rules.get(&tokens[idx].kind) {
            Some(rule) => rule(tokens, idx, options, env),
            None => Self::render_token(tokens, idx, options),
        }
    }

    /// Default rendering: an opening, closing or void tag for the token.
    pub fn render_token(tokens: &[Token], idx: usize, options: &RenderOptions) -> String {
        let token = &tokens[idx];
        if token.hidden {
            return String::new();
        }

        let mut out = String::new();
        if token.block && token.nesting != Nesting::Closing && idx > 0 && tokens[idx - 1].hidden {
            out.push('\n');
        }
        out.push_str(if token.nesting == Nesting::Closing {
            "</"
        } else {
            "<"
        });
        out.push_str(&token.tag);
        if token.nesting == Nesting::SelfClosing && options.xhtml_out {
            out.push_str(" /");
        }

        let mut need_lf = token.block;
        if token.block && token.nesting == Nesting::Opening {
            if let Some(next) = tokens.get(idx + 1) {
                if next.kind == "inline" || next.hidden {
                    need_lf = false;
                } else if next.nesting == Nesting::Closing && next.tag == token.tag {
                    need_lf = false;
                }
            }
        }
        out.push_str(if need_lf { ">\n" } else { ">" });
        out
    }
}

fn line_break(options: &RenderOptions) -> String {
    if options.xhtml_out {
        "<br />\n".to_string()
    } else {
        "<br>\n".to_string()
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Sanitizes rendered HTML according to a safe allow-list, keeping the SVG
/// produced by the math renderer.
pub fn sanitize_html(raw_html: &str) -> String {
    let tags: HashSet<&'static str> = [
        "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
        "i", "p", "pre", "span", "strong", "sub", "sup", // math output
        "svg", "g", "defs", "symbol", "path", "use", "clipPath",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");
    generic_attributes.insert("id");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert(
        "svg",
        ["xmlns", "viewBox", "width", "height", "class"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert(
        "g",
        ["transform", "fill", "stroke", "stroke-width", "clip-path"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert(
        "path",
        ["d", "fill", "fill-rule", "stroke", "stroke-width"]
            .iter()
            .copied()
            .collect(),
    );
    tag_attributes.insert("symbol", ["overflow"].iter().copied().collect());
    tag_attributes.insert(
        "use",
        ["href", "xlink:href", "x", "y", "fill"]
            .iter()
            .copied()
            .collect(),
    );

    Builder::new()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .clean(raw_html)
        .to_string()
}
