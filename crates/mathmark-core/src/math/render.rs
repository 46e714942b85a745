//! Turns math token content into markup through a [`MathRenderer`].
//!
//! Rendering never fails: when the renderer rejects an expression the raw
//! content is emitted instead.

use super::{MathOptions, MathRenderer};

pub fn render_inline(content: &str, renderer: &dyn MathRenderer, options: &MathOptions) -> String {
    match renderer.render(content, &options.renderer) {
        Ok(markup) => markup,
        Err(err) => {
            if options.throw_on_error {
                tracing::error!(error = %err, expr = content, "Failed to render inline math");
            }
            content.to_string()
        }
    }
}

/// Renders display math, wrapped in a paragraph.
pub fn render_block(content: &str, renderer: &dyn MathRenderer, options: &MathOptions) -> String {
    let display = options.renderer.with_display(true);
    match renderer.render(content, &display) {
        Ok(markup) => format!("<p>{markup}</p>\n"),
        Err(err) => {
            if options.throw_on_error {
                tracing::error!(error = %err, expr = content, "Failed to render block math");
            }
            format!("{content}\n")
        }
    }
}
