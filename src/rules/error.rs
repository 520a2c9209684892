/// Errors raised while compiling a rule definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("Unknown filter type: {0:?}")]
    UnknownAttribute(String),

    #[error("Unknown operator: {0:?}")]
    UnknownOperator(String),

    #[error("Rule nesting exceeds maximum depth of {max_depth}")]
    TooDeep { max_depth: usize },
}

/// Errors raised while evaluating a single predicate
///
/// These never reach the caller of `matches`; the predicate is treated as a non-match.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredicateError {
    #[error("Invalid regex pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid timestamp format: {value:?}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Missing operand: {0}")]
    MissingOperand(&'static str),

    #[error("Message has no creation timestamp")]
    MissingTimestamp,
}
