//! Binding errors.
//!
//! Every failure in the binding subsystem is reported through [`BindError`]
//! with enough context for the caller to act: the descriptor identity, the
//! exact symbol text searched, or the raw compiler diagnostics. Nothing is
//! silently swallowed and nothing triggers an automatic retry.
//!
//! Error code range: J0xxx.

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// The kind of binding error.
#[derive(Debug, Clone)]
pub enum BindErrorKind {
    /// Disallowed compiler flag or a malformed declaring type
    Configuration { message: String },

    /// The compiler produced diagnostics; the text is passed through verbatim
    Compilation { diagnostics: String },

    /// An expected symbol is absent from the compiled symbol table
    Resolution {
        method: String,
        symbol: String,
        /// First symbol whose text contains the declared method name, if any.
        /// Diagnostic aid only, never used for resolution.
        similar: Option<String>,
    },

    /// An operation was requested on a descriptor that is not eligible for it
    Precondition { message: String },

    /// A dynamic-invocation argument could not be converted
    InvalidArgument {
        context: String,
        expected: String,
        found: String,
    },
}

/// Binding error with structured context.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct BindError {
    /// The kind of error.
    pub kind: BindErrorKind,
}

impl BindError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        BindErrorKind::Configuration {
            message: message.into(),
        }
        .into()
    }

    /// Create a compilation error carrying the raw diagnostics
    pub fn compilation(diagnostics: impl Into<String>) -> Self {
        BindErrorKind::Compilation {
            diagnostics: diagnostics.into(),
        }
        .into()
    }

    /// Create a resolution error for a missing symbol
    pub fn resolution(
        method: impl Into<String>,
        symbol: impl Into<String>,
        similar: Option<String>,
    ) -> Self {
        BindErrorKind::Resolution {
            method: method.into(),
            symbol: symbol.into(),
            similar,
        }
        .into()
    }

    /// Create a precondition violation
    pub fn precondition(message: impl Into<String>) -> Self {
        BindErrorKind::Precondition {
            message: message.into(),
        }
        .into()
    }

    /// Create an invalid argument error
    pub fn invalid_argument(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        BindErrorKind::InvalidArgument {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
        }
        .into()
    }
}

impl From<BindErrorKind> for BindError {
    fn from(kind: BindErrorKind) -> Self {
        BindError { kind }
    }
}

impl Diagnostic for BindError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code: &'static str = match &self.kind {
            BindErrorKind::Configuration { .. } => "J0001",
            BindErrorKind::Compilation { .. } => "J0002",
            BindErrorKind::Resolution { .. } => "J0003",
            BindErrorKind::Precondition { .. } => "J0004",
            BindErrorKind::InvalidArgument { .. } => "J0005",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match &self.kind {
            BindErrorKind::Resolution {
                similar: Some(similar),
                ..
            } => Some(Box::new(format!("maybe you meant: {}", similar))),
            _ => None,
        }
    }
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErrorKind::Configuration { message } => {
                write!(f, "configuration error: {}", message)
            }
            BindErrorKind::Compilation { diagnostics } => {
                write!(f, "compilation failed:\n{}", diagnostics)
            }
            BindErrorKind::Resolution {
                method,
                symbol,
                similar,
            } => {
                write!(
                    f,
                    "missing implementation for {} (searched for symbol `{}`)",
                    method, symbol
                )?;
                if let Some(similar) = similar {
                    write!(f, "; maybe you meant: {}", similar)?;
                }
                Ok(())
            }
            BindErrorKind::Precondition { message } => {
                write!(f, "precondition violated: {}", message)
            }
            BindErrorKind::InvalidArgument {
                context,
                expected,
                found,
            } => {
                write!(f, "{}: expected {}, found {}", context, expected, found)
            }
        }
    }
}

/// Result type alias for binding operations.
pub type BindResult<T> = Result<T, BindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration() {
        let err = BindError::configuration("unsupported compiler flag: -g");
        assert_eq!(
            err.to_string(),
            "configuration error: unsupported compiler flag: -g"
        );
    }

    #[test]
    fn test_compilation_passes_diagnostics_through() {
        let raw = "code.cpp:3:1: error: unknown type name 'jnt'\n";
        let err = BindError::compilation(raw);
        assert!(err.to_string().contains(raw.trim_end()));
    }

    #[test]
    fn test_resolution_without_similar() {
        let err = BindError::resolution("square(I)I", "_Z6squareP7JNIEnv_P8_jobjecti", None);
        assert_eq!(
            err.to_string(),
            "missing implementation for square(I)I (searched for symbol `_Z6squareP7JNIEnv_P8_jobjecti`)"
        );
    }

    #[test]
    fn test_resolution_with_similar() {
        let err = BindError::resolution(
            "square(I)I",
            "_Z6squareP7JNIEnv_P8_jobjecti",
            Some("_Z6squarePv".to_string()),
        );
        assert!(err.to_string().contains("maybe you meant: _Z6squarePv"));
    }

    #[test]
    fn test_precondition() {
        let err = BindError::precondition("method should be a native instance method");
        assert_eq!(
            err.to_string(),
            "precondition violated: method should be a native instance method"
        );
    }

    #[test]
    fn test_invalid_argument() {
        let err = BindError::invalid_argument("argument 2", "jstring", "Long");
        assert_eq!(err.to_string(), "argument 2: expected jstring, found Long");
    }

    #[test]
    fn test_error_codes() {
        use miette::Diagnostic;
        let cases: Vec<(BindError, &str)> = vec![
            (BindError::configuration("x"), "J0001"),
            (BindError::compilation("x"), "J0002"),
            (BindError::resolution("m", "s", None), "J0003"),
            (BindError::precondition("x"), "J0004"),
            (BindError::invalid_argument("c", "a", "b"), "J0005"),
        ];
        for (err, expected_code) in cases {
            let code = err.code().expect("should have error code");
            assert_eq!(code.to_string(), expected_code);
        }
    }

    #[test]
    fn test_help_only_for_similar_symbols() {
        use miette::Diagnostic;
        let err = BindError::resolution("m", "s", Some("sym".to_string()));
        assert!(err.help().is_some());
        let err = BindError::resolution("m", "s", None);
        assert!(err.help().is_none());
    }
}
