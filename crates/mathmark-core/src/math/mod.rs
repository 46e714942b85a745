//! `$...$` and `$$...$$` math: the parse rules, their render adapter and the
//! extension that wires both into a [`Markdown`] instance.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MathRenderError, RegistrationError, RenderError};
use crate::extension::{Placement, define_block_token, define_inline_token};
use crate::markdown::Markdown;
use crate::ruler::RuleOptions;
use crate::token::{MATH_BLOCK, MATH_INLINE, Token};

pub mod block;
pub mod inline;
pub mod render;
pub mod scan;
pub mod typeset;

pub use block::math_block;
pub use inline::math_inline;
pub use render::{render_block, render_inline};
pub use typeset::TypstRenderer;

/// Options handed to the math renderer on every call.
///
/// Keys other than `displayMode` are kept as-is so renderer specific
/// settings pass through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererOptions {
    pub display_mode: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RendererOptions {
    /// A copy of these options with `display_mode` overridden.
    pub fn with_display(&self, display_mode: bool) -> Self {
        Self {
            display_mode,
            extra: self.extra.clone(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MathOptions {
    /// Log renderer failures before falling back to the raw source.
    pub throw_on_error: bool,
    #[serde(rename = "katexOptions")]
    pub renderer: RendererOptions,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            throw_on_error: true,
            renderer: RendererOptions::default(),
        }
    }
}

impl MathOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Typesets one math expression into markup.
pub trait MathRenderer: Send + Sync {
    fn render(&self, expr: &str, options: &RendererOptions) -> Result<String, MathRenderError>;
}

impl<F> MathRenderer for F
where
    F: Fn(&str, &RendererOptions) -> Result<String, MathRenderError> + Send + Sync,
{
    fn render(&self, expr: &str, options: &RendererOptions) -> Result<String, MathRenderError> {
        self(expr, options)
    }
}

/// The math rules and render functions, ready to be registered on a [`Markdown`].
#[derive(Clone)]
pub struct MathExtension {
    options: MathOptions,
    renderer: Arc<dyn MathRenderer>,
}

impl Default for MathExtension {
    fn default() -> Self {
        Self::new(MathOptions::default())
    }
}

impl MathExtension {
    /// Math typeset with [`TypstRenderer`].
    pub fn new(options: MathOptions) -> Self {
        Self::with_renderer(options, TypstRenderer::new())
    }

    pub fn with_renderer<R>(options: MathOptions, renderer: R) -> Self
    where
        R: MathRenderer + 'static,
    {
        Self {
            options,
            renderer: Arc::new(renderer),
        }
    }

    pub fn options(&self) -> &MathOptions {
        &self.options
    }

    /// Registers `math_inline` and `math_block`.
    ///
    /// Both registrations are always attempted; every failure is returned.
    pub fn register(&self, md: &mut Markdown) -> Result<(), RegistrationError> {
        let mut failures = Vec::new();

        let renderer = Arc::clone(&self.renderer);
        let options = self.options.clone();
        let inline = define_inline_token(
            md,
            Placement::Push,
            MATH_INLINE,
            math_inline,
            move |tokens, idx, _, _| {
                let token = token_at(tokens, idx)?;
                Ok(render_inline(&token.content, renderer.as_ref(), &options))
            },
            RuleOptions::default(),
        );
        failures.extend(inline.err());

        let renderer = Arc::clone(&self.renderer);
        let options = self.options.clone();
        let block = define_block_token(
            md,
            Placement::Before("paragraph".to_string()),
            MATH_BLOCK,
            math_block,
            move |tokens, idx, _, _| {
                let token = token_at(tokens, idx)?;
                Ok(render_block(&token.content, renderer.as_ref(), &options))
            },
            RuleOptions::alt(["paragraph", "reference", "blockquote", "list"]),
        );
        failures.extend(block.err());

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RegistrationError { failures })
        }
    }
}

/// Plugin form of [`MathExtension::default`] for [`Markdown::use_plugin`].
///
/// Registration failures are logged.
pub fn math_plugin(md: &mut Markdown) {
    if let Err(err) = MathExtension::default().register(md) {
        tracing::error!(error = %err, "Failed to register math rules");
    }
}

fn token_at(tokens: &[Token], idx: usize) -> Result<&Token, RenderError> {
    tokens.get(idx).ok_or(RenderError::IndexOutOfBounds {
        index: idx,
        len: tokens.len(),
    })
}
