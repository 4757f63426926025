use crate::error::{Result, TemplateError};
use crate::patterns::TAG_NAME;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map;

/// Values substituted for placeholders and tested by conditional directives.
///
/// Booleans follow the generator convention: a `true` flag is stored as the
/// string `"true"`, a `false` flag is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDictionary {
    entries: HashMap<String, String>,
}

impl TagDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tag value, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Stores a boolean flag: `true` as `"true"`, `false` by removing the tag
    pub fn set_flag(&mut self, name: impl Into<String>, flag: bool) {
        let name = name.into();
        if flag {
            self.entries.insert(name, "true".to_string());
        } else {
            self.entries.remove(&name);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `name` is defined and maps to a non-empty value
    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses a JSON object of tag values
    ///
    /// # Errors
    ///
    /// - `TemplateError::Json` if `json` is not valid JSON.
    /// - See [`TagDictionary::from_json_value`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Builds a dictionary from a JSON object.
    ///
    /// Strings are taken verbatim, numbers as their decimal text, `true` as
    /// `"true"`, arrays of strings as multi-line content; `false` and `null`
    /// leave the tag undefined.
    ///
    /// # Errors
    ///
    /// - `TemplateError::InvalidTagValue` if the root is not an object or a
    ///   value has no string form.
    /// - `TemplateError::InvalidTagName` if a key can't be used in a placeholder.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(TemplateError::InvalidTagValue {
                name: "<root>".to_string(),
                found: json_kind(value).to_string(),
            });
        };

        let mut tags = Self::new();
        for (name, value) in map {
            validate_tag_name(name)?;
            match value {
                Value::String(s) => {
                    tags.insert(name.clone(), s.clone());
                }
                Value::Bool(flag) => tags.set_flag(name.clone(), *flag),
                Value::Number(n) => {
                    tags.insert(name.clone(), n.to_string());
                }
                Value::Null => {}
                Value::Array(items) => {
                    let lines = items
                        .iter()
                        .map(|item| {
                            item.as_str().ok_or_else(|| TemplateError::InvalidTagValue {
                                name: name.clone(),
                                found: format!("array containing {}", json_kind(item)),
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    tags.insert(name.clone(), lines.join("\n"));
                }
                Value::Object(_) => {
                    return Err(TemplateError::InvalidTagValue {
                        name: name.clone(),
                        found: json_kind(value).to_string(),
                    });
                }
            }
        }
        Ok(tags)
    }

    /// Applies a `NAME=VALUE` definition; a bare `NAME` sets the flag.
    ///
    /// # Errors
    ///
    /// - `TemplateError::InvalidDefinition` if the name part is empty.
    /// - `TemplateError::InvalidTagName` if the name can't be used in a placeholder.
    pub fn define(&mut self, definition: &str) -> Result<()> {
        let (name, value) = parse_definition(definition)?;
        match value {
            Some(value) => {
                self.insert(name, value);
            }
            None => self.set_flag(name, true),
        }
        Ok(())
    }
}

impl Extend<(String, String)> for TagDictionary {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagDictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for TagDictionary {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<HashMap<String, String>> for TagDictionary {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

/// Splits `NAME=VALUE` (or bare `NAME`) and validates the name
///
/// # Errors
///
/// - `TemplateError::InvalidDefinition` if the name part is empty.
/// - `TemplateError::InvalidTagName` if the name can't be used in a placeholder.
pub fn parse_definition(definition: &str) -> Result<(&str, Option<&str>)> {
    let (name, value) = match definition.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value)),
        None => (definition.trim(), None),
    };
    if name.is_empty() {
        return Err(TemplateError::InvalidDefinition {
            definition: definition.to_string(),
        });
    }
    validate_tag_name(name)?;
    Ok((name, value))
}

/// Ensures `name` is something `%%NAME%%` can match
///
/// # Errors
///
/// Returns `TemplateError::InvalidTagName` otherwise.
pub fn validate_tag_name(name: &str) -> Result<()> {
    if TAG_NAME.is_match(name) {
        Ok(())
    } else {
        Err(TemplateError::InvalidTagName {
            name: name.to_string(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_value() {
        let tags: TagDictionary = [("A", "x"), ("B", "")].into_iter().collect();
        assert!(tags.has_value("A"));
        assert!(!tags.has_value("B"));
        assert!(tags.contains("B"));
        assert!(!tags.has_value("C"));
    }

    #[test]
    fn test_set_flag() {
        let mut tags = TagDictionary::new();
        tags.set_flag("UseOutline", true);
        assert_eq!(tags.get("UseOutline"), Some("true"));
        tags.set_flag("UseOutline", false);
        assert!(!tags.contains("UseOutline"));
    }

    #[test]
    fn test_insert_remove_iter() {
        let mut tags = TagDictionary::new();
        assert!(tags.is_empty());
        assert_eq!(tags.insert("A", "1"), None);
        assert_eq!(tags.insert("A", "2"), Some("1".to_string()));
        tags.insert("B", "");

        let mut pairs: Vec<_> = tags.iter().collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![("A", "2"), ("B", "")]);

        assert_eq!(tags.remove("A"), Some("2".to_string()));
        assert_eq!(tags.remove("A"), None);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let tags = TagDictionary::from_json_str(
            r#"{
                "Name": "Custom",
                "Enabled": true,
                "Disabled": false,
                "Count": 3,
                "Nothing": null,
                "Body": ["float a;", "float b;"]
            }"#,
        )
        .unwrap();
        assert_eq!(tags.get("Name"), Some("Custom"));
        assert_eq!(tags.get("Enabled"), Some("true"));
        assert!(!tags.contains("Disabled"));
        assert_eq!(tags.get("Count"), Some("3"));
        assert!(!tags.contains("Nothing"));
        assert_eq!(tags.get("Body"), Some("float a;\nfloat b;"));
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let err = TagDictionary::from_json_str(r#"{"A": {"nested": 1}}"#).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTagValue { ref name, .. } if name == "A"));

        let err = TagDictionary::from_json_str(r#"{"A": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTagValue { .. }));

        let err = TagDictionary::from_json_str(r#"["A"]"#).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTagValue { .. }));

        let err = TagDictionary::from_json_str(r#"{"bad-name": "x"}"#).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidTagName { .. }));

        let err = TagDictionary::from_json_str("{").unwrap_err();
        assert!(matches!(err, TemplateError::Json(_)));
    }

    #[test]
    fn test_define() {
        let mut tags = TagDictionary::new();
        tags.define("Name=Foo=Bar").unwrap();
        tags.define("Flag").unwrap();
        tags.define("Empty=").unwrap();
        assert_eq!(tags.get("Name"), Some("Foo=Bar"));
        assert_eq!(tags.get("Flag"), Some("true"));
        assert_eq!(tags.get("Empty"), Some(""));

        assert!(matches!(
            tags.define("=x"),
            Err(TemplateError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            tags.define("a b=x"),
            Err(TemplateError::InvalidTagName { .. })
        ));
    }
}
