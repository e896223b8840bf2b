//! File format capabilities
//!
//! Each supported file extension maps to one parsing function turning raw
//! file content into a [`PackageData`] mapping. The table is fixed when the
//! loader is built; unknown extensions are rejected by the loader.

mod script;

use crate::value::PackageData;
use std::collections::HashMap;
use std::fmt;

pub use script::parse as parse_script;

/// Parses file content into a field mapping, or describes why it cannot
pub type ParseFn = fn(&str) -> Result<PackageData, String>;

/// Extension → parser table
#[derive(Clone, Default)]
pub struct FormatRegistry {
    parsers: HashMap<String, ParseFn>,
}

impl FormatRegistry {
    /// A table with no formats
    pub fn empty() -> Self {
        Self::default()
    }

    /// YAML, TOML, JSON and literal-assignment `.py` scripts
    pub fn with_builtin() -> Self {
        let mut formats = Self::empty();
        formats
            .register("yaml", parse_yaml)
            .register("yml", parse_yaml)
            .register("toml", parse_toml)
            .register("json", parse_json)
            .register("py", parse_script);
        formats
    }

    /// Register (or replace) the parser for an extension
    pub fn register(&mut self, ext: &str, parse: ParseFn) -> &mut Self {
        self.parsers.insert(ext.to_ascii_lowercase(), parse);
        self
    }

    pub fn get(&self, ext: &str) -> Option<ParseFn> {
        self.parsers.get(&ext.to_ascii_lowercase()).copied()
    }

    /// Supported extensions, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

pub fn parse_yaml(content: &str) -> Result<PackageData, String> {
    serde_yaml::from_str(content).map_err(|e| e.to_string())
}

pub fn parse_toml(content: &str) -> Result<PackageData, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

pub fn parse_json(content: &str) -> Result<PackageData, String> {
    serde_json::from_str(content).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_extensions() {
        let formats = FormatRegistry::with_builtin();
        assert_eq!(formats.extensions(), vec!["json", "py", "toml", "yaml", "yml"]);
        assert!(formats.get("YAML").is_some());
        assert!(formats.get("txt").is_none());
    }

    #[test]
    fn test_formats_agree() {
        let yaml = "name: foo\nversion: '1.0'\nrequires:\n  - bar\n";
        let toml = "name = 'foo'\nversion = '1.0'\nrequires = ['bar']\n";
        let json = r#"{"name": "foo", "version": "1.0", "requires": ["bar"]}"#;
        let py = "name = 'foo'\nversion = '1.0'\nrequires = ['bar']\n";

        let expected: PackageData = [
            ("name".to_string(), FieldValue::from("foo")),
            ("version".to_string(), FieldValue::from("1.0")),
            ("requires".to_string(), FieldValue::from(vec!["bar"])),
        ]
        .into_iter()
        .collect();

        assert_eq!(parse_yaml(yaml).unwrap(), expected);
        assert_eq!(parse_toml(toml).unwrap(), expected);
        assert_eq!(parse_json(json).unwrap(), expected);
        assert_eq!(parse_script(py).unwrap(), expected);
    }

    #[test]
    fn test_yaml_folded_description() {
        let yaml = "description: >-\n  this description spans\n  multiple lines.\n";
        let data = parse_yaml(yaml).unwrap();
        assert_eq!(
            data["description"],
            FieldValue::from("this description spans multiple lines.")
        );
    }

    #[test]
    fn test_non_mapping_documents_rejected() {
        assert!(parse_yaml("- a\n- b\n").is_err());
        assert!(parse_json("[1, 2]").is_err());
    }
}
