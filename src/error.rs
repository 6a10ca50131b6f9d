//! Error types for search-space construction, sampling and value plumbing.

use thiserror::Error;

use crate::space::param::Uid;

/// Result type alias for hypertune operations.
pub type Result<T> = std::result::Result<T, SpaceError>;

/// Errors raised by the search-space engine.
///
/// Construction-time errors are fatal to the enclosing space build; no
/// partial space is usable. Sample-time and fill-time errors are fatal to
/// that single operation and leave the space untouched. The engine never
/// retries internally.
#[derive(Error, Debug)]
pub enum SpaceError {
    /// A parameter's declared bounds or choices are self-inconsistent.
    /// Raised at construction, never at sample time.
    #[error("invalid domain for parameter {uid}: {reason}")]
    InvalidDomain { uid: Uid, reason: String },

    /// A conditional parameter depends on itself, or wraps another
    /// conditional. Raised at construction.
    #[error("invalid condition on parameter {uid}: {reason}")]
    SelfReference { uid: Uid, reason: String },

    /// A conditional's governor is undeclared, conditional resolution did not
    /// terminate within the pass bound, or a reloaded persisted space
    /// disagrees with the code-declared one.
    #[error("inconsistent search space: {reason}")]
    InconsistentSpace { reason: String },

    /// A tagged document carries a `_class` the decoder does not know.
    #[error("unknown parameter kind `{tag}`")]
    UnknownParameterKind { tag: String },

    /// A tagged document is structurally broken (missing or mistyped fields).
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// The nested definition structure exceeds the collector's depth guard.
    #[error("structure nesting exceeds {limit} levels")]
    StructureTooDeep { limit: usize },

    /// A parameter discovered in the structure has no entry in the supplied
    /// value mapping. Indicates a mismatched space and config.
    #[error("no value supplied for parameter {uid}")]
    MissingValue { uid: Uid },

    /// A parameter's recorded path does not resolve against the supplied
    /// concrete configuration.
    #[error("path `{path}` not found in configuration")]
    PathNotFound { path: String },

    /// A run record's result is neither a bare number nor a mapping with a
    /// numeric `optimization_target` field.
    #[error("invalid run result: {reason}")]
    InvalidRunResult { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = SpaceError::InvalidDomain { uid: Uid(7), reason: "upper <= lower".into() };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("upper <= lower"));

        let err = SpaceError::PathNotFound { path: "foo.bar[2]".into() };
        assert!(err.to_string().contains("foo.bar[2]"));

        let err = SpaceError::UnknownParameterKind { tag: "Mystery".into() };
        assert!(err.to_string().contains("Mystery"));
    }
}
