//! Resource loading and metadata validation
//!
//! Loading a handle parses its file with the format registered for the
//! path's extension, then checks the result against the kind's schema and
//! against the variables taken from the resource's location. A package in
//! folder `2.0` whose file says `version: 1.0` is rejected even though both
//! values are well-formed on their own.

use crate::formats::FormatRegistry;
use crate::handle::ResourceHandle;
use crate::kind::{FieldType, Schema};
use crate::value::{FieldValue, PackageData};
use crate::version::Version;
use crate::{MetadataError, MetadataErrorKind, ResourceError, Result};
use std::sync::OnceLock;

/// Field holding the schema generation a descriptor was written for
pub const CONFIG_VERSION_FIELD: &str = "config_version";

/// Parses and validates resource files
#[derive(Debug, Clone)]
pub struct Loader {
    formats: FormatRegistry,
}

static DEFAULT_LOADER: OnceLock<Loader> = OnceLock::new();

impl Loader {
    /// A loader with the built-in formats
    pub fn new() -> Self {
        Self::with_formats(FormatRegistry::with_builtin())
    }

    pub fn with_formats(formats: FormatRegistry) -> Self {
        Self { formats }
    }

    /// The process-wide loader with the built-in formats
    pub fn global() -> &'static Loader {
        DEFAULT_LOADER.get_or_init(Loader::new)
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Parse and validate the file behind a handle
    pub fn load(&self, handle: &ResourceHandle) -> Result<PackageData> {
        let schema = handle
            .kind()
            .schema()
            .ok_or_else(|| ResourceError::NotLoadable(handle.key().to_string()))?;
        let path = handle.path();
        let fail = |kind: MetadataErrorKind| -> ResourceError {
            MetadataError {
                path: path.to_path_buf(),
                kind,
            }
            .into()
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let parse = self
            .formats
            .get(ext)
            .ok_or_else(|| fail(MetadataErrorKind::UnsupportedFormat(ext.to_string())))?;

        tracing::debug!(kind = handle.key(), path = %path.display(), "loading resource");
        let content = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = parse(&content).map_err(|message| fail(MetadataErrorKind::Parse(message)))?;

        validate(handle, schema, data).map_err(fail)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Check parsed data against the schema and the handle's variables,
/// returning the data with version fields coerced.
fn validate(
    handle: &ResourceHandle,
    schema: &Schema,
    data: PackageData,
) -> std::result::Result<PackageData, MetadataErrorKind> {
    if let Some(field) = data.keys().find(|k| schema.rule(k).is_none()) {
        return Err(MetadataErrorKind::UnexpectedField(field.clone()));
    }
    if let Some((field, _)) = schema
        .fields()
        .find(|(name, rule)| rule.required && !data.contains_key(*name))
    {
        return Err(MetadataErrorKind::MissingField(field.to_string()));
    }

    let mut loaded = PackageData::new();
    for (field, value) in data {
        let ty = schema.rule(&field).map_or(FieldType::Any, |r| r.ty);
        let value = coerce(&field, ty, value)?;
        loaded.insert(field, value);
    }

    let config_version = handle.kind().config_version();
    if let Some(declared) = loaded.get(CONFIG_VERSION_FIELD) {
        if *declared != FieldValue::Integer(i64::from(config_version)) {
            return Err(MetadataErrorKind::Mismatch {
                field: CONFIG_VERSION_FIELD.to_string(),
                expected: config_version.to_string(),
                found: declared.to_string(),
            });
        }
    }

    for field in schema.path_checked() {
        let (Some(expected), Some(found)) = (handle.variable(field), loaded.get(field)) else {
            continue;
        };
        let agrees = match found {
            FieldValue::Version(found) => {
                let expected = Version::parse(expected).map_err(|source| {
                    MetadataErrorKind::InvalidVersion {
                        field: field.clone(),
                        source,
                    }
                })?;
                expected == *found
            }
            other => other.scalar_text().as_deref() == Some(expected),
        };
        if !agrees {
            return Err(MetadataErrorKind::Mismatch {
                field: field.clone(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }

    Ok(loaded)
}

fn coerce(
    field: &str,
    ty: FieldType,
    value: FieldValue,
) -> std::result::Result<FieldValue, MetadataErrorKind> {
    let invalid = || MetadataErrorKind::InvalidField {
        field: field.to_string(),
        expected: ty.describe(),
    };

    // Explicit nulls mean "unset"; required fields were checked for presence already
    if value == FieldValue::Null {
        return Ok(value);
    }

    match ty {
        FieldType::Any => Ok(value),
        FieldType::String => match value {
            FieldValue::String(_) => Ok(value),
            _ => Err(invalid()),
        },
        FieldType::Integer => match value {
            FieldValue::Integer(_) => Ok(value),
            _ => Err(invalid()),
        },
        FieldType::StringList => match &value {
            FieldValue::List(items) if items.iter().all(|i| i.as_str().is_some()) => Ok(value),
            _ => Err(invalid()),
        },
        FieldType::Version => coerce_version(field, &value).map(FieldValue::Version),
        FieldType::VersionList => match value {
            FieldValue::List(items) => items
                .iter()
                .map(|item| coerce_version(field, item).map(FieldValue::Version))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(FieldValue::List),
            _ => Err(invalid()),
        },
    }
}

fn coerce_version(
    field: &str,
    value: &FieldValue,
) -> std::result::Result<Version, MetadataErrorKind> {
    let text = match value {
        FieldValue::Version(v) => return Ok(v.clone()),
        FieldValue::String(_) | FieldValue::Integer(_) | FieldValue::Float(_) => {
            value.scalar_text().unwrap_or_default()
        }
        _ => {
            return Err(MetadataErrorKind::InvalidField {
                field: field.to_string(),
                expected: FieldType::Version.describe(),
            })
        }
    };
    Version::parse(&text).map_err(|source| MetadataErrorKind::InvalidVersion {
        field: field.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::VERSIONED_PACKAGE;
    use crate::handle::Variables;
    use crate::registry::registry;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn versioned_handle(path: &Path, name: &str, version: &str, ext: &str) -> ResourceHandle {
        let kind = Arc::clone(registry().lookup(0, VERSIONED_PACKAGE).unwrap());
        let variables: Variables = [
            ("name", name),
            ("version", version),
            ("ext", ext),
            ("search_path", "/unused"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        ResourceHandle::new(kind, path.to_path_buf(), variables)
    }

    fn write(dir: &TempDir, file: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_coerces_version() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.yaml", "name: foo\nversion: '1.0'\n");

        let data = Loader::new().load(&versioned_handle(&path, "foo", "1.0", "yaml")).unwrap();
        assert_eq!(data["version"], FieldValue::Version(Version::parse("1.0").unwrap()));
    }

    #[test]
    fn test_unquoted_yaml_version_keeps_fraction() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.yaml", "name: foo\nversion: 2.0\n");

        let data = Loader::new().load(&versioned_handle(&path, "foo", "2.0", "yaml")).unwrap();
        assert_eq!(data["version"].to_string(), "2.0");
    }

    #[test]
    fn test_config_version_must_match_kind() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.yaml", "config_version: 1\nname: foo\nversion: '1.0'\n");

        let err = Loader::new()
            .load(&versioned_handle(&path, "foo", "1.0", "yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Metadata(MetadataError {
                kind: MetadataErrorKind::Mismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_field_types_checked() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.yaml", "name: foo\nversion: '1.0'\nrequires: amaze\n");

        let err = Loader::new()
            .load(&versioned_handle(&path, "foo", "1.0", "yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Metadata(MetadataError {
                kind: MetadataErrorKind::InvalidField { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.yaml", "name: foo\n");

        let err = Loader::new()
            .load(&versioned_handle(&path, "foo", "1.0", "yaml"))
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Metadata(MetadataError {
                kind: MetadataErrorKind::MissingField(ref f),
                ..
            }) if f == "version"
        ));
    }

    #[test]
    fn test_unknown_extension_is_metadata_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.txt", "name: foo\n");

        let err = Loader::new()
            .load(&versioned_handle(&path, "foo", "1.0", "txt"))
            .unwrap_err();
        assert!(err.is_metadata());
    }

    #[test]
    fn test_custom_format_registry() {
        fn parse_fixed(_: &str) -> std::result::Result<PackageData, String> {
            Ok([
                ("name".to_string(), FieldValue::from("foo")),
                ("version".to_string(), FieldValue::from("3")),
            ]
            .into_iter()
            .collect())
        }

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "package.fixed", "");
        let mut formats = FormatRegistry::empty();
        formats.register("fixed", parse_fixed);

        let data = Loader::with_formats(formats)
            .load(&versioned_handle(&path, "foo", "3", "fixed"))
            .unwrap();
        assert_eq!(data["version"].to_string(), "3");
    }
}
