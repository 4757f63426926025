//! Precompiled patterns shared by the directive processor and the tag substitutor.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix every directive line starts with
pub const DIRECTIVE_MARKER: &str = "!!";

/// Delimiter surrounding a placeholder
pub const PLACEHOLDER_MARKER: &str = "%%";

/// `!!ifempty: X!!`, `!!ifnotempty: X!!`, `!!elifempty: X!!`, `!!elifnotempty: X!!`
///
/// Groups: 1 = `el` (alternate branch), 2 = `not`, 3 = tag name.
pub static IF_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!!\s*(el)?if(not)?empty:\s*(\w+)\s*!!\s*$").expect("valid if pattern")
});

pub static ELSE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!!\s*else!!\s*$").expect("valid else pattern"));

pub static ENDIF_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!!\s*endif\s*!!\s*$").expect("valid endif pattern"));

/// `%%NAME%%` or `%%NAME:OPTIONS%%`. Group 1 = name, group 2 = options.
///
/// Options stop at the first closing `%%` so several placeholders with
/// options can share a line.
pub static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%(\w+)\s*(?::\s*(.+?))?%%").expect("valid placeholder pattern")
});

pub static LEADING_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+").expect("valid indent pattern"));

/// Names a placeholder can refer to
pub static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("valid tag name pattern"));
