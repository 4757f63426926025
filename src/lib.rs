//! # tplexpand
//!
//! A line-oriented template expander for code generators. Templates are plain
//! text files with two kinds of markup:
//!
//! - Directive lines that switch output on and off depending on whether a tag
//!   has a value: `!!ifempty: NAME!!`, `!!ifnotempty: NAME!!`, their `elif`
//!   forms, `!!else!!` and `!!endif!!`. Blocks nest.
//! - Inline placeholders `%%NAME%%` / `%%NAME:OPTIONS%%` replaced by tag values,
//!   with `spaceindent=N`, `tabindent=N`, `keepindent` and `skipempty` options.
//!
//! Output lines are terminated with a configured line ending regardless of the
//! template's own line endings.
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```
//! use tplexpand::{LineEnding, TagDictionary, TemplateEngine};
//!
//! let template = "!!ifnotempty: FOO!!\nvalue=%%FOO%%\n!!else!!\nvalue=default\n!!endif!!";
//! let tags: TagDictionary = [("FOO", "bar")].into_iter().collect();
//! let engine = TemplateEngine::new(tags, LineEnding::Lf);
//!
//! let expansion = engine.expand_str(template).unwrap();
//! assert_eq!(expansion.output, "value=bar\n");
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Expand a template with tags from a JSON file
//! tplexpand Custom.shader.template --tags tags.json -o Custom.shader
//!
//! # Define tags on the command line
//! tplexpand template.txt -D Name=Custom -D UseOutline
//!
//! # Validate a template and list the tags it uses
//! tplexpand template.txt --check
//! tplexpand template.txt --list=json
//! ```

pub mod directive;
pub mod error;
pub mod fs_utils;
pub mod line_ending;
pub mod patterns;
pub mod substitute;
pub mod tags;
pub mod template;

// Re-export main types and functions for convenience
pub use directive::{Directive, DirectiveProcessor, EmitState, Test};
pub use error::{Result, StructureErrorKind, TemplateError};
pub use line_ending::{LineEnding, split_lines};
pub use substitute::{Substitution, Substitutor, TagOptions, UndefinedTag};
pub use tags::TagDictionary;
pub use template::{
    Expansion, ReferenceKind, TagReference, TemplateEngine, expand, find_references,
};
