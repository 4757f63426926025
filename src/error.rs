use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of conditional-block imbalance found while expanding a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureErrorKind {
    /// `!!else!!` seen with no open `if`
    ElseWithoutIf,
    /// `!!elifempty: X!!` / `!!elifnotempty: X!!` seen with no open `if`
    ElifWithoutIf,
    /// `!!endif!!` seen with no open `if`
    EndIfWithoutIf,
    /// End of template reached while `open` scopes were still open; the
    /// error line is where the innermost of them was opened
    UnclosedIf { open: usize },
}

impl fmt::Display for StructureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElseWithoutIf => f.write_str("\"else\" outside of an if block"),
            Self::ElifWithoutIf => f.write_str("\"elif\" outside of an if block"),
            Self::EndIfWithoutIf => f.write_str("\"endif\" without a matching if"),
            Self::UnclosedIf { open } => {
                write!(f, "if block is never closed ({open} open at end of template)")
            }
        }
    }
}

/// Main error type for template expansion
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Unbalanced conditional blocks
    #[error("Structure error at line {line}: {kind}")]
    Structure {
        line: usize,
        kind: StructureErrorKind,
    },

    /// Malformed placeholder option, e.g. a non-numeric indent width
    #[error("Invalid option '{option}' at line {line}: {source}")]
    OptionSyntax {
        line: usize,
        option: String,
        #[source]
        source: ParseIntError,
    },

    /// Indent width above [`crate::substitute::MAX_INDENT_WIDTH`]
    #[error("Invalid option '{option}' at line {line}: indent width exceeds {max}")]
    IndentTooWide {
        line: usize,
        option: String,
        max: usize,
    },

    /// IO error when reading templates or writing output
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Template or tag file not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Tag name that can never be referenced by a placeholder
    #[error("Invalid tag name: '{name}'")]
    InvalidTagName { name: String },

    /// Tag file value that has no string form
    #[error("Invalid value for tag '{name}': expected string, bool, number, array of strings or null, found {found}")]
    InvalidTagValue { name: String, found: String },

    /// Command-line definition that is not `NAME` or `NAME=VALUE`
    #[error("Invalid tag definition: '{definition}'")]
    InvalidDefinition { definition: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TemplateError {
    /// 1-based template line the error refers to, if any
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Structure { line, .. }
            | Self::OptionSyntax { line, .. }
            | Self::IndentTooWide { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TemplateError::Structure {
            line: 7,
            kind: StructureErrorKind::ElseWithoutIf,
        };
        assert_eq!(
            format!("{err}"),
            "Structure error at line 7: \"else\" outside of an if block"
        );

        let err = TemplateError::Structure {
            line: 12,
            kind: StructureErrorKind::UnclosedIf { open: 2 },
        };
        assert_eq!(
            format!("{err}"),
            "Structure error at line 12: if block is never closed (2 open at end of template)"
        );

        let err = TemplateError::FileNotFound {
            path: PathBuf::from("/test/file.txt"),
        };
        assert_eq!(format!("{err}"), "File not found: /test/file.txt");

        let err = TemplateError::InvalidTagName {
            name: "bad-name".to_string(),
        };
        assert_eq!(format!("{err}"), "Invalid tag name: 'bad-name'");
    }

    #[test]
    fn test_option_syntax_display() {
        let source = "x".parse::<usize>().unwrap_err();
        let err = TemplateError::OptionSyntax {
            line: 3,
            option: "spaceindent=x".to_string(),
            source,
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("Invalid option 'spaceindent=x' at line 3"));
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_indent_too_wide_display() {
        let err = TemplateError::IndentTooWide {
            line: 4,
            option: "tabindent=5000".to_string(),
            max: 1024,
        };
        assert_eq!(
            format!("{err}"),
            "Invalid option 'tabindent=5000' at line 4: indent width exceeds 1024"
        );
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: TemplateError = io_err.into();
        assert!(matches!(err, TemplateError::Io(_)));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: TemplateError = json_err.into();
        assert!(matches!(err, TemplateError::Json(_)));
    }
}
