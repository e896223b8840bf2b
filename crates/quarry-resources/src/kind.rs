//! Resource kinds and their metadata schemas

use crate::pattern::SegmentPattern;
use crate::{ResourceError, Result};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Whether a kind names directories or files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Directory,
    File,
}

/// Expected type of a metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Any,
    String,
    Integer,
    StringList,
    /// Coerced to a comparable version on load
    Version,
    /// List coerced element-wise to comparable versions on load
    VersionList,
}

impl FieldType {
    /// Human readable form used in error messages
    pub fn describe(self) -> &'static str {
        match self {
            FieldType::Any => "any value",
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::StringList => "a list of strings",
            FieldType::Version => "a version",
            FieldType::VersionList => "a list of versions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub ty: FieldType,
    pub required: bool,
}

/// Metadata schema of a loadable kind: which fields may appear, which must,
/// and which must agree with variables taken from the resource path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: BTreeMap<String, FieldRule>,
    path_checked: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, ty: FieldType) -> Self {
        self.fields
            .insert(name.to_string(), FieldRule { ty, required: true });
        self
    }

    pub fn optional(mut self, name: &str, ty: FieldType) -> Self {
        self.fields
            .insert(name.to_string(), FieldRule { ty, required: false });
        self
    }

    /// Require the field to agree with the path variable of the same name
    pub fn check_path(mut self, name: &str) -> Self {
        if !self.path_checked.iter().any(|n| n == name) {
            self.path_checked.push(name.to_string());
        }
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn path_checked(&self) -> &[String] {
        &self.path_checked
    }
}

/// A registered category of discoverable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKind {
    config_version: u32,
    key: String,
    pattern: SegmentPattern,
    entry: EntryType,
    parent: Option<String>,
    schema: Option<Schema>,
}

impl ResourceKind {
    /// The kind standing for a search root itself
    pub fn root(config_version: u32, key: &str) -> Result<Self> {
        Ok(Self {
            config_version,
            key: validate_key(key)?,
            pattern: SegmentPattern::parse("")?,
            entry: EntryType::Directory,
            parent: None,
            schema: None,
        })
    }

    /// A directory kind below `parent`
    pub fn directory(config_version: u32, key: &str, parent: &str, pattern: &str) -> Result<Self> {
        Self::child(config_version, key, parent, pattern, EntryType::Directory, None)
    }

    /// A loadable file kind below `parent`
    pub fn file(
        config_version: u32,
        key: &str,
        parent: &str,
        pattern: &str,
        schema: Schema,
    ) -> Result<Self> {
        Self::child(config_version, key, parent, pattern, EntryType::File, Some(schema))
    }

    fn child(
        config_version: u32,
        key: &str,
        parent: &str,
        pattern: &str,
        entry: EntryType,
        schema: Option<Schema>,
    ) -> Result<Self> {
        let pattern = SegmentPattern::parse(pattern)?;
        if pattern.is_empty() {
            return Err(ResourceError::InvalidPattern {
                pattern: String::new(),
                reason: format!("'{}' needs a non-empty segment pattern", key),
            });
        }
        Ok(Self {
            config_version,
            key: validate_key(key)?,
            pattern,
            entry,
            parent: Some(validate_key(parent)?),
            schema,
        })
    }

    pub fn config_version(&self) -> u32 {
        self.config_version
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// This kind's own path segment pattern
    pub fn pattern(&self) -> &SegmentPattern {
        &self.pattern
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry
    }

    pub fn is_directory(&self) -> bool {
        self.entry == EntryType::Directory
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Metadata schema; `None` for kinds that cannot be loaded
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }
}

// Kinds are identified by (config version, key); the registry guarantees
// uniqueness of that pair.
impl Hash for ResourceKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.config_version.hash(state);
        self.key.hash(state);
    }
}

fn validate_key(key: &str) -> Result<String> {
    let valid = !key.is_empty()
        && key.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(key.to_string())
    } else {
        Err(ResourceError::InvalidKeyPattern(key.to_string()))
    }
}
