use crate::error::{Result, TemplateError};
use crate::tags::TagDictionary;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads the contents of a file at the given path
///
/// # Errors
///
/// - `TemplateError::FileNotFound` if the path doesn't exist or isn't a file.
/// - `TemplateError::Io` if there's an error reading the file.
pub fn read_file_contents(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(TemplateError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    fs::read_to_string(path).map_err(Into::into)
}

/// Loads a JSON tag file
///
/// # Errors
///
/// - `TemplateError::FileNotFound` if the file doesn't exist.
/// - Errors from [`TagDictionary::from_json_str`].
pub fn load_tag_file(path: &Path) -> Result<TagDictionary> {
    debug!(path = %path.display(), "loading tag file");
    let contents = read_file_contents(path)?;
    TagDictionary::from_json_str(&contents)
}

/// Loads several tag files into one dictionary; later files win on conflicts
///
/// # Errors
///
/// Returns the first error from [`load_tag_file`].
pub fn load_tag_files<P: AsRef<Path>>(paths: &[P]) -> Result<TagDictionary> {
    let mut tags = TagDictionary::new();
    for path in paths {
        tags.extend(load_tag_file(path.as_ref())?);
    }
    Ok(tags)
}
