use crate::block::BlockState;
use crate::error::RuleError;
use crate::token::{LineRange, MATH_BLOCK, Nesting};

const FENCE: &str = "$$";

/// Block rule for `$$ ... $$` display math.
///
/// The scan is lenient: a block left open at `end`, or cut short by a line
/// indented below `blk_indent`, is still emitted with whatever content was
/// collected.
pub fn math_block(
    state: &mut BlockState<'_>,
    start: usize,
    end: usize,
    silent: bool,
) -> Result<bool, RuleError> {
    if start >= state.line_max {
        return Err(RuleError::LineOutOfRange {
            line: start,
            line_max: state.line_max,
        });
    }
    let end = end.min(state.line_max);
    let src = state.src;

    let pos = state.b_marks[start] + state.t_shift[start];
    let max = state.e_marks[start];
    if !src[pos..max].starts_with(FENCE) {
        return Ok(false);
    }
    if silent {
        return Ok(true);
    }

    let mut first = &src[pos + FENCE.len()..max];
    let mut last = "";
    // (exclusive end of the body lines, line to resume at)
    let (body_end, resume) = if let Some(inner) = first.trim().strip_suffix(FENCE) {
        first = inner;
        (start + 1, start + 1)
    } else {
        let mut bounds = (end, end);
        for next in start + 1..end {
            let line_start = state.b_marks[next] + state.t_shift[next];
            let line_end = state.e_marks[next];
            if line_start < line_end && state.s_count[next] < state.blk_indent {
                bounds = (next, next);
                break;
            }
            let text = &src[line_start..line_end];
            if text.trim().ends_with(FENCE) {
                if let Some(fence) = text.rfind(FENCE) {
                    last = &text[..fence];
                }
                bounds = (next, next + 1);
                break;
            }
        }
        bounds
    };

    let mut content = String::new();
    if !first.trim().is_empty() {
        content.push_str(first);
        content.push('\n');
    }
    content.push_str(&state.get_lines(start + 1, body_end, state.t_shift[start], true));
    if !last.trim().is_empty() {
        content.push_str(last);
    }

    state.line = resume;
    let token = state.push(MATH_BLOCK, "math", Nesting::SelfClosing);
    token.content = content;
    token.markup = FENCE.to_string();
    token.map = Some(LineRange::new(start, resume));
    Ok(true)
}
