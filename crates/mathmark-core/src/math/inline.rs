use crate::error::RuleError;
use crate::inline::InlineState;
use crate::token::{MATH_INLINE, Nesting};

use super::scan::{delimiter_flags, find_unescaped};

/// Inline rule for `$...$`.
///
/// Every `$` the cursor stops on is claimed: either as a math token or as
/// literal text, so later rules never see it again.
pub fn math_inline(state: &mut InlineState<'_>, silent: bool) -> Result<bool, RuleError> {
    if state.pos > state.pos_max {
        return Err(RuleError::CursorOutOfRange {
            pos: state.pos,
            pos_max: state.pos_max,
        });
    }
    let src = state.src;
    let pos = state.pos;
    if src.as_bytes().get(pos) != Some(&b'$') || pos >= state.pos_max {
        return Ok(false);
    }

    if !delimiter_flags(src, pos, state.pos_max).can_open {
        push_literal(state, "$", silent);
        state.pos = pos + 1;
        return Ok(true);
    }

    let start = pos + 1;
    let Some(close) = find_unescaped(src, start, state.pos_max, b'$') else {
        push_literal(state, "$", silent);
        state.pos = start;
        return Ok(true);
    };

    // `$$` with nothing inside is never math
    if close == start {
        push_literal(state, "$$", silent);
        state.pos = start + 1;
        return Ok(true);
    }

    if !delimiter_flags(src, close, state.pos_max).can_close {
        push_literal(state, "$", silent);
        state.pos = start;
        return Ok(true);
    }

    if !silent {
        let token = state.push(MATH_INLINE, "math", Nesting::SelfClosing);
        token.markup = "$".to_string();
        token.content = src[start..close].to_string();
    }
    state.pos = close + 1;
    Ok(true)
}

fn push_literal(state: &mut InlineState<'_>, text: &str, silent: bool) {
    if !silent {
        state.pending.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::math_inline;
    use crate::error::RuleError;
    use crate::inline::InlineState;
    use crate::markdown::{Env, Markdown};
    use crate::token::MATH_INLINE;
    use pretty_assertions::assert_eq;

    struct Outcome {
        matched: bool,
        pos: usize,
        pending: String,
        math: Vec<String>,
    }

    fn run_at(src: &str, pos: usize, silent: bool) -> Outcome {
        let md = Markdown::new();
        let env = Env::new();
        let mut state = InlineState::new(src, &md, &env);
        state.pos = pos;
        let matched = math_inline(&mut state, silent).unwrap();
        Outcome {
            matched,
            pos: state.pos,
            pending: state.pending.clone(),
            math: state
                .tokens
                .iter()
                .filter(|t| t.kind == MATH_INLINE)
                .map(|t| t.content.clone())
                .collect(),
        }
    }

    #[test]
    fn emits_token_for_valid_span() {
        let src = "The energy is $E=mc^2$ approx.";
        let out = run_at(src, 14, false);
        assert!(out.matched);
        assert_eq!(out.math, vec!["E=mc^2".to_string()]);
        assert_eq!(out.pos, 22);
        assert_eq!(out.pending, "");
    }

    #[test]
    fn does_not_match_other_characters() {
        let out = run_at("a$b$", 0, false);
        assert!(!out.matched);
        assert_eq!(out.pos, 0);
        assert_eq!(out.pending, "");
        assert!(out.math.is_empty());
    }

    #[test]
    fn opener_followed_by_space_is_literal() {
        let out = run_at("$ x$", 0, false);
        assert!(out.matched);
        assert_eq!(out.pos, 1);
        assert_eq!(out.pending, "$");
        assert!(out.math.is_empty());
    }

    #[test]
    fn unclosed_opener_is_literal() {
        let out = run_at("$x", 0, false);
        assert_eq!((out.pos, out.pending.as_str()), (1, "$"));
        assert!(out.math.is_empty());
    }

    #[test]
    fn empty_pair_is_consumed_as_literal() {
        let out = run_at("$$", 0, false);
        assert!(out.matched);
        assert_eq!(out.pos, 2);
        assert_eq!(out.pending, "$$");
        assert!(out.math.is_empty());
    }

    #[test]
    fn closer_before_digit_is_rejected() {
        let out = run_at("$n$5", 0, false);
        assert_eq!((out.pos, out.pending.as_str()), (1, "$"));
        assert!(out.math.is_empty());
    }

    #[test]
    fn escaped_closer_is_skipped() {
        let src = r"$a\$b$";
        let out = run_at(src, 0, false);
        assert_eq!(out.math, vec![r"a\$b".to_string()]);
        assert_eq!(out.pos, src.len());
    }

    #[test]
    fn silent_mode_advances_without_output() {
        let out = run_at("$x$", 0, true);
        assert!(out.matched);
        assert_eq!(out.pos, 3);
        assert!(out.math.is_empty());

        let out = run_at("$ x", 0, true);
        assert_eq!((out.pos, out.pending.as_str()), (1, ""));
    }

    #[test]
    fn respects_pos_max() {
        let md = Markdown::new();
        let env = Env::new();
        let mut state = InlineState::new("$a$b$", &md, &env);
        state.pos_max = 2;
        assert!(math_inline(&mut state, false).unwrap());
        assert_eq!(state.pending, "$");
        assert!(state.tokens.is_empty());
    }

    #[test]
    fn cursor_past_end_is_a_fault() {
        let md = Markdown::new();
        let env = Env::new();
        let mut state = InlineState::new("$", &md, &env);
        state.pos = 4;
        assert_eq!(
            math_inline(&mut state, false),
            Err(RuleError::CursorOutOfRange { pos: 4, pos_max: 1 })
        );
    }
}
