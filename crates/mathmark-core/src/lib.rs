mod block;
mod error;
mod extension;
mod inline;
mod markdown;
mod math;
mod renderer;
mod ruler;
mod token;

pub use block::{BlockCheckpoint, BlockParser, BlockRule, BlockState, ParentType, block_rule};
pub use error::{
    ConfigError, MathRenderError, RegistrationError, RenderError, RuleError, RulerError,
};
pub use extension::{Placement, define_block_token, define_inline_token};
pub use inline::{InlineCheckpoint, InlineParser, InlineRule, InlineState, inline_rule};
pub use markdown::{Env, Markdown};
pub use math::scan::{DelimFlags, delimiter_flags, find_unescaped, is_escaped};
pub use math::typeset::FONT_PATHS_ENV;
pub use math::{
    MathExtension, MathOptions, MathRenderer, RendererOptions, TypstRenderer, math_block,
    math_inline, math_plugin, render_block, render_inline,
};
pub use renderer::{RenderFn, RenderOptions, Renderer, escape_html, sanitize_html};
pub use ruler::{RuleOptions, Ruler};
pub use token::{LineRange, MATH_BLOCK, MATH_INLINE, Nesting, Token};

/// Markdown with `$` math typeset by Typst.
pub fn markdown_with_math(options: MathOptions) -> Result<Markdown, RegistrationError> {
    let mut md = Markdown::new();
    MathExtension::new(options).register(&mut md)?;
    Ok(md)
}
