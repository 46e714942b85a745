//! Registration of fallible rules and render functions.
//!
//! A rule that returns `Err` is logged and treated as a non-match, with the
//! parse state rolled back to where it was before the call. A render function
//! that returns `Err` is logged and renders nothing.

use crate::block::{BlockState, block_rule};
use crate::error::{RenderError, RuleError, RulerError};
use crate::inline::{InlineState, inline_rule};
use crate::markdown::{Env, Markdown};
use crate::renderer::{RenderOptions, Renderer};
use crate::ruler::{RuleOptions, Ruler};
use crate::token::Token;

/// Where a rule goes in its chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Placement {
    Push,
    Before(String),
    After(String),
}

pub fn define_inline_token<R, F>(
    md: &mut Markdown,
    placement: Placement,
    name: &str,
    rule: R,
    render: F,
    options: RuleOptions,
) -> Result<(), RulerError>
where
    R: Fn(&mut InlineState<'_>, bool) -> Result<bool, RuleError> + Send + Sync + 'static,
    F: Fn(&[Token], usize, &RenderOptions, &Env) -> Result<String, RenderError>
        + Send
        + Sync
        + 'static,
{
    let rule_name = name.to_string();
    let guarded = inline_rule(move |state, silent| {
        let checkpoint = state.checkpoint();
        match rule(state, silent) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::error!(rule = %rule_name, error = %err, pos = state.pos, "Inline rule failed");
                state.restore(checkpoint);
                false
            }
        }
    });
    place(&mut md.inline.ruler, placement, name, guarded, options)?;
    set_guarded_render(&mut md.renderer, name, render);
    Ok(())
}

pub fn define_block_token<R, F>(
    md: &mut Markdown,
    placement: Placement,
    name: &str,
    rule: R,
    render: F,
    options: RuleOptions,
) -> Result<(), RulerError>
where
    R: Fn(&mut BlockState<'_>, usize, usize, bool) -> Result<bool, RuleError>
        + Send
        + Sync
        + 'static,
    F: Fn(&[Token], usize, &RenderOptions, &Env) -> Result<String, RenderError>
        + Send
        + Sync
        + 'static,
{
    let rule_name = name.to_string();
    let guarded = block_rule(move |state, start, end, silent| {
        let checkpoint = state.checkpoint();
        match rule(state, start, end, silent) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::error!(rule = %rule_name, error = %err, line = start, "Block rule failed");
                state.restore(checkpoint);
                false
            }
        }
    });
    place(&mut md.block.ruler, placement, name, guarded, options)?;
    set_guarded_render(&mut md.renderer, name, render);
    Ok(())
}

fn place<F>(
    ruler: &mut Ruler<F>,
    placement: Placement,
    name: &str,
    rule: F,
    options: RuleOptions,
) -> Result<(), RulerError> {
    match placement {
        Placement::Push => ruler.push(name, rule, options),
        Placement::Before(anchor) => ruler.before(&anchor, name, rule, options),
        Placement::After(anchor) => ruler.after(&anchor, name, rule, options),
    }
}

fn set_guarded_render<F>(renderer: &mut Renderer, name: &str, render: F)
where
    F: Fn(&[Token], usize, &RenderOptions, &Env) -> Result<String, RenderError>
        + Send
        + Sync
        + 'static,
{
    let rule_name = name.to_string();
    let replaced = renderer.set_rule(name, move |tokens, idx, options, env| {
        if let Some(token) = tokens.get(idx) {
            tracing::trace!(rule = %rule_name, ?token, "Rendering token");
        }
        match render(tokens, idx, options, env) {
            Ok(html) => html,
            Err(err) => {
                tracing::error!(rule = %rule_name, error = %err, idx, "Render function failed");
                String::new()
            }
        }
    });
    if replaced.is_some() {
        tracing::warn!(rule = name, "Replaced an existing render function");
    }
}

#[cfg(test)]
mod tests {
    use super::{Placement, define_block_token, define_inline_token};
    use crate::error::{RenderError, RuleError, RulerError};
    use crate::inline::InlineState;
    use crate::markdown::{Env, Markdown};
    use crate::renderer::RenderOptions;
    use crate::ruler::RuleOptions;
    use crate::token::{Nesting, Token};
    use pretty_assertions::assert_eq;

    /// Writes into every part of the state, then fails.
    fn scribble_then_fail(state: &mut InlineState<'_>, _silent: bool) -> Result<bool, RuleError> {
        if state.src.as_bytes().get(state.pos) != Some(&b'@') {
            return Ok(false);
        }
        state.pending.push_str("junk");
        state.push("junk_open", "i", Nesting::Opening);
        state.pos = state.pos_max;
        Err(RuleError::Custom("boom".to_string()))
    }

    fn no_render(_: &[Token], _: usize, _: &RenderOptions, _: &Env) -> Result<String, RenderError> {
        Ok(String::new())
    }

    #[test]
    fn failing_rule_is_rolled_back_and_parsing_continues() {
        let mut md = Markdown::new();
        define_inline_token(
            &mut md,
            Placement::Before("text".to_string()),
            "faulty",
            scribble_then_fail,
            no_render,
            RuleOptions::default(),
        )
        .unwrap();

        let env = Env::new();
        let mut state = InlineState::new("a@b", &md, &env);
        state.pos = 1;
        state.pending.push('a');
        let rules = md.inline.ruler.get_rules("");
        assert!(!rules[0](&mut state, false));
        assert_eq!(state.pos, 1);
        assert_eq!(state.pending, "a");
        assert!(state.tokens.is_empty());
        assert_eq!(state.level, 0);

        assert_eq!(md.render("a@b"), "<p>a@b</p>\n");
    }

    #[test]
    fn failing_block_rule_falls_through_to_paragraph() {
        let mut md = Markdown::new();
        define_block_token(
            &mut md,
            Placement::Before("paragraph".to_string()),
            "faulty_block",
            |state, _, _, _| {
                state.line += 5;
                state.push("junk", "div", Nesting::SelfClosing);
                Err(RuleError::Custom("boom".to_string()))
            },
            no_render,
            RuleOptions::default(),
        )
        .unwrap();

        assert_eq!(md.render("one\n\ntwo"), "<p>one</p>\n<p>two</p>\n");
    }

    #[test]
    fn failing_render_yields_nothing_but_the_rest_renders() {
        let mut md = Markdown::new();
        define_inline_token(
            &mut md,
            Placement::Push,
            "bang",
            |state, silent| {
                if state.src.as_bytes().get(state.pos) != Some(&b'!') {
                    return Ok(false);
                }
                if !silent {
                    state.push("bang", "", Nesting::SelfClosing);
                }
                state.pos += 1;
                Ok(true)
            },
            |_, _, _, _| Err(RenderError::Custom("cannot render".to_string())),
            RuleOptions::default(),
        )
        .unwrap();

        assert_eq!(md.render("hi! there"), "<p>hi there</p>\n");
    }

    #[test]
    fn collisions_and_missing_anchors_are_reported() {
        let mut md = Markdown::new();
        let err = define_inline_token(
            &mut md,
            Placement::Push,
            "text",
            |_, _| Ok(false),
            no_render,
            RuleOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RulerError::DuplicateRule {
                name: "text".to_string()
            }
        );

        let err = define_block_token(
            &mut md,
            Placement::After("fence".to_string()),
            "mine",
            |_, _, _, _| Ok(false),
            no_render,
            RuleOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RulerError::UnknownRule {
                name: "fence".to_string()
            }
        );
        assert!(!md.renderer.has_rule("mine"));
    }
}
