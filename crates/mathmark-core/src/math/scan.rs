//! Escape-aware delimiter scanning.
//!
//! All characters involved (`$`, `\`, spaces, tabs, ASCII digits) are single
//! bytes, so the scan works on bytes and every offset it returns is a valid
//! character boundary.

/// Whether the byte at `pos` is preceded by an odd run of backslashes.
pub fn is_escaped(src: &str, pos: usize) -> bool {
    let run = src.as_bytes()[..pos]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

/// Offset of the first unescaped `target` in `from..end`.
pub fn find_unescaped(src: &str, from: usize, end: usize, target: u8) -> Option<usize> {
    let bytes = src.as_bytes();
    let end = end.min(bytes.len());
    let mut pos = from;
    while pos < end {
        let found = pos + bytes[pos..end].iter().position(|&b| b == target)?;
        if !is_escaped(src, found) {
            return Some(found);
        }
        pos = found + 1;
    }
    None
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DelimFlags {
    pub can_open: bool,
    pub can_close: bool,
}

/// Whether a `$` at `pos` may open or close a span.
///
/// A closer must not follow a space or tab nor precede a digit, so that
/// amounts like `$5 and $3` stay literal. An opener must not precede a space
/// or tab. Positions before the start or at `pos_max` and beyond have no
/// character and never veto.
pub fn delimiter_flags(src: &str, pos: usize, pos_max: usize) -> DelimFlags {
    let bytes = src.as_bytes();
    let prev = pos.checked_sub(1).and_then(|i| bytes.get(i).copied());
    let next = if pos + 1 < pos_max {
        bytes.get(pos + 1).copied()
    } else {
        None
    };

    let can_close = !matches!(prev, Some(b' ' | b'\t')) && !matches!(next, Some(b'0'..=b'9'));
    let can_open = !matches!(next, Some(b' ' | b'\t'));
    DelimFlags {
        can_open,
        can_close,
    }
}
