//! Inline `%%NAME%%` / `%%NAME:OPTIONS%%` placeholder substitution.
//!
//! Options are colon separated, later ones override earlier ones:
//!
//! - `spaceindent=N`: indent every inserted line with `N` spaces
//! - `tabindent=N`: indent every inserted line with `N` tabs
//! - `keepindent`: reuse the template line's own leading whitespace for the
//!   continuation lines of multi-line values
//! - `skipempty`: drop the whole line when the value is empty

use crate::error::{Result, TemplateError};
use crate::line_ending::split_lines;
use crate::patterns::{LEADING_WHITESPACE, PLACEHOLDER, PLACEHOLDER_MARKER};
use crate::tags::TagDictionary;
use serde::Serialize;
use tracing::warn;

/// Widest indent a `spaceindent`/`tabindent` option may request
pub const MAX_INDENT_WIDTH: usize = 1024;

/// Placeholder whose tag is not in the dictionary; it was replaced by nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndefinedTag {
    /// 1-based template line
    pub line: usize,
    pub tag: String,
}

/// Result of substituting one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Substitution {
    Line(String),
    /// A `skipempty` placeholder had an empty value; emit nothing for this line
    Skip,
}

/// Formatting options of a single placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub indent: String,
    /// The first inserted line already sits after the template's indentation
    pub keep_indent: bool,
    pub skip_empty: bool,
}

impl TagOptions {
    /// Parses the option list of a placeholder found on `source_line`.
    ///
    /// Unknown options are ignored.
    ///
    /// # Errors
    ///
    /// - `TemplateError::OptionSyntax` if an indent width is not a number.
    /// - `TemplateError::IndentTooWide` if it exceeds [`MAX_INDENT_WIDTH`].
    pub fn parse(options: &str, source_line: &str, line: usize) -> Result<Self> {
        let mut parsed = Self::default();
        for option in options.split(':').map(str::trim) {
            if let Some(width) = option.strip_prefix("spaceindent=") {
                parsed.indent = " ".repeat(parse_width(option, width, line)?);
                parsed.keep_indent = false;
            } else if let Some(width) = option.strip_prefix("tabindent=") {
                parsed.indent = "\t".repeat(parse_width(option, width, line)?);
                parsed.keep_indent = false;
            } else if option == "keepindent" {
                parsed.indent = LEADING_WHITESPACE
                    .find(source_line)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                parsed.keep_indent = true;
            } else if option == "skipempty" {
                parsed.skip_empty = true;
            }
        }
        Ok(parsed)
    }
}

fn parse_width(option: &str, width: &str, line: usize) -> Result<usize> {
    let width: usize = width
        .trim()
        .parse()
        .map_err(|source| TemplateError::OptionSyntax {
            line,
            option: option.to_string(),
            source,
        })?;
    if width > MAX_INDENT_WIDTH {
        return Err(TemplateError::IndentTooWide {
            line,
            option: option.to_string(),
            max: MAX_INDENT_WIDTH,
        });
    }
    Ok(width)
}

/// Replaces placeholders on single template lines
#[derive(Debug, Clone, Copy)]
pub struct Substitutor<'a> {
    tags: &'a TagDictionary,
    newline: &'a str,
}

impl<'a> Substitutor<'a> {
    #[must_use]
    pub fn new(tags: &'a TagDictionary, newline: &'a str) -> Self {
        Self { tags, newline }
    }

    /// Substitutes every placeholder on `text`, the template's `line`-th line.
    ///
    /// Undefined tags are dropped from the output, logged, and pushed onto
    /// `warnings`.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::OptionSyntax` or `TemplateError::IndentTooWide`
    /// for a malformed option.
    pub fn substitute(
        &self,
        text: &str,
        line: usize,
        warnings: &mut Vec<UndefinedTag>,
    ) -> Result<Substitution> {
        if !text.contains(PLACEHOLDER_MARKER) {
            return Ok(Substitution::Line(text.to_string()));
        }

        let mut out = String::with_capacity(text.len());
        let mut parsed = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[parsed..whole.start()]);
            parsed = whole.end();

            let tag = &caps[1];
            let Some(content) = self.tags.get(tag) else {
                warn!(line, tag, "tag is not defined");
                warnings.push(UndefinedTag {
                    line,
                    tag: tag.to_string(),
                });
                continue;
            };

            let options = match caps.get(2) {
                Some(options) => TagOptions::parse(options.as_str(), text, line)?,
                None => TagOptions::default(),
            };
            if options.skip_empty && content.is_empty() {
                return Ok(Substitution::Skip);
            }
            self.insert(&mut out, content, &options);
        }
        out.push_str(&text[parsed..]);

        Ok(Substitution::Line(out))
    }

    fn insert(&self, out: &mut String, content: &str, options: &TagOptions) {
        for (i, content_line) in split_lines(content).enumerate() {
            if i > 0 {
                out.push_str(self.newline);
                out.push_str(&options.indent);
            } else if !options.keep_indent {
                out.push_str(&options.indent);
            }
            out.push_str(content_line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> TagDictionary {
        pairs.iter().copied().collect()
    }

    fn line(sub: Substitution) -> String {
        match sub {
            Substitution::Line(line) => line,
            Substitution::Skip => panic!("line was skipped"),
        }
    }

    #[test]
    fn test_no_placeholder_is_unchanged() {
        let dict = tags(&[("A", "x")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        assert_eq!(
            line(sub.substitute("plain %% text", 1, &mut warnings).unwrap()),
            "plain %% text"
        );
        assert_eq!(
            line(sub.substitute("no marker", 1, &mut warnings).unwrap()),
            "no marker"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_simple_replacement() {
        let dict = tags(&[("Name", "Custom"), ("Ver", "1.2")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("Shader \"%%Name%%/v%%Ver%%\" {", 4, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "Shader \"Custom/v1.2\" {");
    }

    #[test]
    fn test_spaceindent_multiline() {
        let dict = tags(&[("Body", "a\nb")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("%%Body:spaceindent=2%%", 1, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "  a\n  b");
    }

    #[test]
    fn test_tabindent_uses_configured_newline() {
        let dict = tags(&[("Body", "a\r\nb\nc")]);
        let sub = Substitutor::new(&dict, "\r\n");
        let mut warnings = Vec::new();
        let out = line(sub.substitute("%%Body:tabindent=1%%;", 1, &mut warnings).unwrap());
        assert_eq!(out, "\ta\r\n\tb\r\n\tc;");
    }

    #[test]
    fn test_keepindent() {
        let dict = tags(&[("Body", "first\nsecond")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("    %%Body:keepindent%%", 1, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "    first\n    second");

        let out = line(sub.substitute("%%Body:keepindent%%", 1, &mut warnings).unwrap());
        assert_eq!(out, "first\nsecond");
    }

    #[test]
    fn test_later_option_overrides() {
        let dict = tags(&[("Body", "a\nb")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("  %%Body:keepindent:spaceindent=1%%", 1, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "   a\n b");

        let out = line(
            sub.substitute("  %%Body:tabindent=3:keepindent%%", 1, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "  a\n  b");
    }

    #[test]
    fn test_skipempty_drops_line() {
        let dict = tags(&[("Empty", ""), ("Full", "x")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        assert_eq!(
            sub.substitute("before %%Empty:skipempty%% after", 1, &mut warnings)
                .unwrap(),
            Substitution::Skip
        );
        assert_eq!(
            line(sub.substitute("v=%%Full:skipempty%%", 1, &mut warnings).unwrap()),
            "v=x"
        );
        assert_eq!(
            line(sub.substitute("v=%%Empty%%;", 1, &mut warnings).unwrap()),
            "v=;"
        );
    }

    #[test]
    fn test_undefined_tag_is_elided_with_warning() {
        let dict = tags(&[("A", "1")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("x=%%Missing%%, a=%%A%%", 9, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "x=, a=1");
        assert_eq!(
            warnings,
            vec![UndefinedTag {
                line: 9,
                tag: "Missing".to_string()
            }]
        );
    }

    #[test]
    fn test_replacement_is_not_rescanned() {
        let dict = tags(&[("A", "%%B%%"), ("B", "b")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let once = line(sub.substitute("[%%A%%]", 1, &mut warnings).unwrap());
        assert_eq!(once, "[%%B%%]");
        let twice = line(sub.substitute(&once, 1, &mut warnings).unwrap());
        assert_eq!(twice, "[b]");
        let thrice = line(sub.substitute(&twice, 1, &mut warnings).unwrap());
        assert_eq!(thrice, twice);
    }

    #[test]
    fn test_empty_content_emits_no_indent() {
        let dict = tags(&[("Empty", "")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let out = line(
            sub.substitute("[%%Empty:spaceindent=4%%]", 1, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_bad_indent_width_is_an_error() {
        let dict = tags(&[("A", "x")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();
        let err = sub
            .substitute("%%A:spaceindent=two%%", 5, &mut warnings)
            .unwrap_err();
        assert!(matches!(
            err,
            TemplateError::OptionSyntax { line: 5, ref option, .. } if option == "spaceindent=two"
        ));
    }

    #[test]
    fn test_huge_indent_width_is_an_error() {
        let dict = tags(&[("A", "x")]);
        let sub = Substitutor::new(&dict, "\n");
        let mut warnings = Vec::new();

        let err = sub
            .substitute("%%A:spaceindent=18446744073709551615%%", 2, &mut warnings)
            .unwrap_err();
        assert!(matches!(err, TemplateError::IndentTooWide { line: 2, .. }));

        let err = sub
            .substitute("%%A:tabindent=10000000000000%%", 3, &mut warnings)
            .unwrap_err();
        assert!(matches!(
            err,
            TemplateError::IndentTooWide { line: 3, max: MAX_INDENT_WIDTH, .. }
        ));

        let err = sub
            .substitute("%%A:spaceindent=99999999999999999999999%%", 4, &mut warnings)
            .unwrap_err();
        assert!(matches!(err, TemplateError::OptionSyntax { line: 4, .. }));

        let out = line(
            sub.substitute("%%A:spaceindent=1024%%", 5, &mut warnings)
                .unwrap(),
        );
        assert_eq!(out.len(), MAX_INDENT_WIDTH + 1);
    }

    #[test]
    fn test_options_unknown_ignored() {
        let opts = TagOptions::parse("frobnicate: spaceindent=2 ", "", 1).unwrap();
        assert_eq!(opts.indent, "  ");
        assert!(!opts.keep_indent);
        assert!(!opts.skip_empty);
    }
}
