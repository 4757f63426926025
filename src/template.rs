use crate::directive::{Directive, DirectiveProcessor};
use crate::error::Result;
use crate::fs_utils::read_file_contents;
use crate::line_ending::{LineEnding, split_lines};
use crate::patterns::{IF_DIRECTIVE, PLACEHOLDER};
use crate::substitute::{Substitution, Substitutor, UndefinedTag};
use crate::tags::TagDictionary;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Output of an in-memory expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub output: String,
    /// Placeholders whose tag was not defined, in template order
    pub warnings: Vec<UndefinedTag>,
}

/// How a tag is used by a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// `%%NAME%%` or `%%NAME:OPTIONS%%`
    Placeholder,
    /// Tested by an `if`/`elif` directive
    Condition,
}

/// Represents a tag reference found in a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagReference {
    pub tag: String,
    pub kind: ReferenceKind,
    /// 1-based line number
    pub line: usize,
    /// 1-based byte column where the reference starts
    pub column: usize,
    /// Raw option list of a placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

/// Finds every placeholder and conditional tag in the given template
#[must_use]
pub fn find_references(template: &str) -> Vec<TagReference> {
    let mut references = Vec::new();

    for (index, text) in split_lines(template).enumerate() {
        let line = index + 1;
        if Directive::parse(text).is_some() {
            if let Some(tag) = IF_DIRECTIVE.captures(text).and_then(|caps| caps.get(3)) {
                references.push(TagReference {
                    tag: tag.as_str().to_string(),
                    kind: ReferenceKind::Condition,
                    line,
                    column: tag.start() + 1,
                    options: None,
                });
            }
            continue;
        }

        for capture in PLACEHOLDER.captures_iter(text) {
            if let Some(full_match) = capture.get(0)
                && let Some(tag) = capture.get(1)
            {
                references.push(TagReference {
                    tag: tag.as_str().to_string(),
                    kind: ReferenceKind::Placeholder,
                    line,
                    column: full_match.start() + 1,
                    options: capture.get(2).map(|m| m.as_str().to_string()),
                });
            }
        }
    }

    references
}

/// Expands templates against one tag dictionary
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    tags: TagDictionary,
    line_ending: LineEnding,
}

impl TemplateEngine {
    #[must_use]
    pub fn new(tags: TagDictionary, line_ending: LineEnding) -> Self {
        Self { tags, line_ending }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagDictionary) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    #[must_use]
    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagDictionary {
        &mut self.tags
    }

    #[must_use]
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Expands `template`, writing each emitted line plus the configured line
    /// ending to `out`.
    ///
    /// # Errors
    ///
    /// - `TemplateError::Structure` for unbalanced conditional blocks.
    /// - `TemplateError::OptionSyntax` or `TemplateError::IndentTooWide` for
    ///   malformed placeholder options.
    /// - `TemplateError::Io` if writing to `out` fails.
    pub fn expand_to<W: Write>(&self, template: &str, out: &mut W) -> Result<Vec<UndefinedTag>> {
        let newline = self.line_ending.as_str();
        let substitutor = Substitutor::new(&self.tags, newline);
        let mut processor = DirectiveProcessor::new();
        let mut warnings = Vec::new();

        for (index, text) in split_lines(template).enumerate() {
            let line = index + 1;

            if let Some(directive) = Directive::parse(text) {
                processor.apply(directive, line, |tag| self.tags.has_value(tag))?;
                continue;
            }
            if !processor.should_emit() {
                continue;
            }

            if let Substitution::Line(expanded) = substitutor.substitute(text, line, &mut warnings)? {
                out.write_all(expanded.as_bytes())?;
                out.write_all(newline.as_bytes())?;
            }
        }
        processor.finish()?;

        Ok(warnings)
    }

    /// Expands `template` into a string
    ///
    /// # Errors
    ///
    /// See [`TemplateEngine::expand_to`].
    pub fn expand_str(&self, template: &str) -> Result<Expansion> {
        let mut buffer = Vec::with_capacity(template.len());
        let warnings = self.expand_to(template, &mut buffer)?;
        let output =
            String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Expansion { output, warnings })
    }

    /// Expands a template read from `reader` into `writer`
    ///
    /// # Errors
    ///
    /// - `TemplateError::Io` if reading or writing fails, or the input isn't UTF-8.
    /// - See [`TemplateEngine::expand_to`].
    pub fn expand_reader<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<Vec<UndefinedTag>> {
        let mut template = String::new();
        reader.read_to_string(&mut template)?;
        let warnings = self.expand_to(strip_bom(&template), &mut writer)?;
        writer.flush()?;
        Ok(warnings)
    }

    /// Expands the template file at `template_path` into `target_path`.
    ///
    /// The target is only written once the whole template expanded, so a
    /// failing template never leaves a truncated file behind.
    ///
    /// # Errors
    ///
    /// - `TemplateError::FileNotFound` if the template doesn't exist.
    /// - `TemplateError::Io` if writing the target fails.
    /// - See [`TemplateEngine::expand_to`].
    pub fn expand_file(&self, template_path: &Path, target_path: &Path) -> Result<Vec<UndefinedTag>> {
        debug!(template = %template_path.display(), "reading template");
        let template = read_file_contents(template_path)?;
        let expansion = self.expand_str(strip_bom(&template))?;

        if let Some(parent) = target_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(target_path, expansion.output)?;
        info!(
            template = %template_path.display(),
            target = %target_path.display(),
            warnings = expansion.warnings.len(),
            "expanded template"
        );
        Ok(expansion.warnings)
    }

    /// Validates `template` without keeping any output
    ///
    /// # Errors
    ///
    /// See [`TemplateEngine::expand_to`].
    pub fn check(&self, template: &str) -> Result<Vec<UndefinedTag>> {
        self.expand_to(template, &mut io::sink())
    }
}

/// Expands `template` with `tags` in one call
///
/// # Errors
///
/// See [`TemplateEngine::expand_to`].
pub fn expand(template: &str, tags: &TagDictionary, line_ending: LineEnding) -> Result<Expansion> {
    TemplateEngine::new(tags.clone(), line_ending).expand_str(template)
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
