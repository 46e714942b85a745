use mathmark_core::{Env, MathExtension, MathOptions, Markdown, Token};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RenderOptions {
    sanitized: bool,
    #[serde(flatten)]
    math: MathOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderResult {
    html: String,
    tokens: Vec<Token>,
}

#[wasm_bindgen]
pub fn render_html(source: &str) -> Result<JsValue, JsValue> {
    render_html_with_options(source, JsValue::UNDEFINED)
}

/// Renders `source`; `options` takes `sanitized`, `throwOnError` and `katexOptions`.
#[wasm_bindgen]
pub fn render_html_with_options(source: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let options = options_from_js(options)?;
    let mut md = Markdown::new();
    MathExtension::new(options.math)
        .register(&mut md)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let env = Env::new();
    let tokens = md.parse(source, &env);
    let mut html = md.render_tokens(&tokens, &env);
    if options.sanitized {
        html = mathmark_core::sanitize_html(&html);
    }

    let result = RenderResult { html, tokens };
    serde_wasm_bindgen::to_value(&result).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn options_from_js(value: JsValue) -> Result<RenderOptions, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(RenderOptions::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}
