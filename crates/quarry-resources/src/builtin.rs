//! Built-in resource kinds
//!
//! Config version 0 describes the classic package repository layout:
//!
//! ```text
//! <root>/<name>/package.<ext>              package.versionless
//! <root>/<name>/<version>/package.<ext>    package.versioned
//! <root>/<name>.<ext>                      package.combined
//! <root>/multi.<ext>                       package.multi
//! ```

use crate::kind::{FieldType, ResourceKind, Schema};
use crate::registry::RegistryBuilder;
use crate::Result;

pub const PACKAGES_ROOT: &str = "folder.packages_root";
pub const NAME_FOLDER: &str = "folder.name";
pub const VERSION_FOLDER: &str = "folder.version";
pub const VERSIONLESS_PACKAGE: &str = "package.versionless";
pub const VERSIONED_PACKAGE: &str = "package.versioned";
pub const COMBINED_PACKAGE: &str = "package.combined";
pub const MULTI_PACKAGE: &str = "package.multi";

/// Fields shared by every package descriptor
fn package_fields(schema: Schema) -> Schema {
    schema
        .optional("config_version", FieldType::Integer)
        .required("name", FieldType::String)
        .optional("description", FieldType::String)
        .optional("authors", FieldType::StringList)
        .optional("help", FieldType::Any)
        .optional("uuid", FieldType::String)
        .optional("timestamp", FieldType::Integer)
        .optional("requires", FieldType::StringList)
        .optional("build_requires", FieldType::StringList)
        .optional("private_build_requires", FieldType::StringList)
        .optional("variants", FieldType::Any)
        .optional("tools", FieldType::StringList)
        .optional("commands", FieldType::Any)
}

fn versionless_schema() -> Schema {
    package_fields(Schema::new()).check_path("name")
}

fn versioned_schema() -> Schema {
    package_fields(Schema::new())
        .required("version", FieldType::Version)
        .check_path("name")
        .check_path("version")
}

/// Several versions of one package described in a single file
fn multi_schema() -> Schema {
    package_fields(Schema::new())
        .required("versions", FieldType::VersionList)
        .optional("version_overrides", FieldType::Any)
}

/// Register the config version 0 kinds
pub fn register_builtin(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register(ResourceKind::root(0, PACKAGES_ROOT)?)?
        .register(ResourceKind::directory(0, NAME_FOLDER, PACKAGES_ROOT, "{name}")?)?
        .register(ResourceKind::directory(0, VERSION_FOLDER, NAME_FOLDER, "{version}")?)?
        .register(ResourceKind::file(
            0,
            VERSIONLESS_PACKAGE,
            NAME_FOLDER,
            "package.{ext}",
            versionless_schema(),
        )?)?
        .register(ResourceKind::file(
            0,
            VERSIONED_PACKAGE,
            VERSION_FOLDER,
            "package.{ext}",
            versioned_schema(),
        )?)?
        .register(ResourceKind::file(
            0,
            COMBINED_PACKAGE,
            PACKAGES_ROOT,
            "{name}.{ext}",
            multi_schema().check_path("name"),
        )?)?
        .register(ResourceKind::file(
            0,
            MULTI_PACKAGE,
            PACKAGES_ROOT,
            "multi.{ext}",
            multi_schema(),
        )?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn keys<'a>(kinds: impl IntoIterator<Item = &'a ResourceKind>) -> Vec<&'a str> {
        kinds.into_iter().map(|k| k.key()).collect()
    }

    #[test]
    fn test_parents_are_root_to_parent_chains() {
        let registry = registry();

        assert_eq!(
            keys(registry.parents(0, VERSIONLESS_PACKAGE).unwrap()),
            vec![PACKAGES_ROOT, NAME_FOLDER]
        );
        assert_eq!(
            keys(registry.parents(0, VERSIONED_PACKAGE).unwrap()),
            vec![PACKAGES_ROOT, NAME_FOLDER, VERSION_FOLDER]
        );
        assert!(registry.parents(0, PACKAGES_ROOT).unwrap().is_empty());
    }

    #[test]
    fn test_children_compare_as_sets() {
        let registry = registry();
        let children: HashSet<&str> = registry
            .children(0, NAME_FOLDER)
            .unwrap()
            .into_iter()
            .map(|k| k.key())
            .collect();

        assert_eq!(children, HashSet::from([VERSION_FOLDER, VERSIONLESS_PACKAGE]));
    }

    #[test]
    fn test_path_templates() {
        let registry = registry();

        assert_eq!(
            registry.path_template(0, VERSIONED_PACKAGE).unwrap(),
            "{name}/{version}/package.{ext}"
        );
        assert_eq!(
            registry.path_template(0, VERSIONLESS_PACKAGE).unwrap(),
            "{name}/package.{ext}"
        );
        assert_eq!(registry.path_template(0, COMBINED_PACKAGE).unwrap(), "{name}.{ext}");
        assert_eq!(registry.path_template(0, MULTI_PACKAGE).unwrap(), "multi.{ext}");
    }

    #[test]
    fn test_builtin_registration_is_not_repeatable() {
        let mut builder = RegistryBuilder::new();
        register_builtin(&mut builder).unwrap();
        assert!(register_builtin(&mut builder).is_err());
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(std::ptr::eq(registry(), registry()));
    }
}
