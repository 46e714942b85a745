//! Error types shared by the rule engine, the extension shim and the math renderer.

/// Rejected ruler mutation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RulerError {
    /// No rule with this name exists in the chain.
    #[error("rule not found: {name}")]
    UnknownRule { name: String },

    /// A rule with this name is already registered.
    #[error("rule already registered: {name}")]
    DuplicateRule { name: String },
}

/// Fault raised by a rule while matching.
///
/// The extension shim downgrades these to a non-match.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RuleError {
    /// The inline cursor points past the end of the inline source.
    #[error("cursor {pos} is outside the inline source (max {pos_max})")]
    CursorOutOfRange { pos: usize, pos_max: usize },

    /// A line index is outside the block line tables.
    #[error("line {line} is outside the document ({line_max} lines)")]
    LineOutOfRange { line: usize, line_max: usize },

    /// Fault reported by a third-party rule.
    #[error("{0}")]
    Custom(String),
}

/// Fault raised by a render function.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The token index does not exist in the stream.
    #[error("token index {index} is out of bounds ({len} tokens)")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Fault reported by a third-party render function.
    #[error("{0}")]
    Custom(String),
}

/// Failure of the math typesetting collaborator.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MathRenderError {
    /// The expression did not compile.
    #[error("math compile error: {message}")]
    Compile { message: String },

    /// Compilation produced no page to render.
    #[error("math rendered no output")]
    EmptyOutput,
}

/// Rules and render functions that could not be registered.
///
/// Registration carries on past each failure, so this lists every one of them.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{} registration(s) failed: {}", failures.len(), list(failures))]
pub struct RegistrationError {
    pub failures: Vec<RulerError>,
}

fn list(failures: &[RulerError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error loading math options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),
}
