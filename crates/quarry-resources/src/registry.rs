//! Resource type registry
//!
//! Kinds are registered once, per config version, into a [`RegistryBuilder`];
//! the resulting [`Registry`] is immutable. Parent links are explicit edges
//! keyed by dotted kind keys, so traversal never depends on anything but the
//! registered data.

use crate::builtin;
use crate::kind::ResourceKind;
use crate::{ResourceError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
struct KindTable {
    /// Registration order
    kinds: Vec<Arc<ResourceKind>>,
    index: HashMap<String, usize>,
    children: HashMap<String, Vec<Arc<ResourceKind>>>,
    root: Option<Arc<ResourceKind>>,
}

/// Collects kind registrations before freezing them into a [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    versions: BTreeMap<u32, KindTable>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind. Parents must be registered before their children.
    pub fn register(&mut self, kind: ResourceKind) -> Result<&mut Self> {
        let config_version = kind.config_version();
        let table = self.versions.entry(config_version).or_default();

        if table.index.contains_key(kind.key()) {
            return Err(ResourceError::DuplicateKind {
                config_version,
                key: kind.key().to_string(),
            });
        }

        let kind = Arc::new(kind);
        match kind.parent_key() {
            None => {
                if table.root.is_some() {
                    return Err(ResourceError::DuplicateRoot(config_version));
                }
                table.root = Some(Arc::clone(&kind));
            }
            Some(parent) => {
                if !table.index.contains_key(parent) {
                    return Err(ResourceError::UnknownParent {
                        key: kind.key().to_string(),
                        parent: parent.to_string(),
                    });
                }
                table
                    .children
                    .entry(parent.to_string())
                    .or_default()
                    .push(Arc::clone(&kind));
            }
        }

        table.index.insert(kind.key().to_string(), table.kinds.len());
        table.kinds.push(kind);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry {
            versions: self.versions,
        }
    }
}

/// Immutable set of resource kinds, namespaced by config version
#[derive(Debug)]
pub struct Registry {
    versions: BTreeMap<u32, KindTable>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry holding the built-in kinds.
///
/// Built on first use; every later call returns the same instance.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let mut builder = RegistryBuilder::new();
        builtin::register_builtin(&mut builder).expect("built-in resource kinds are well-formed");
        let registry = builder.build();
        tracing::debug!(
            config_versions = registry.versions.len(),
            "built resource registry"
        );
        registry
    })
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn table(&self, config_version: u32) -> Result<&KindTable> {
        self.versions
            .get(&config_version)
            .ok_or(ResourceError::UnknownConfigVersion(config_version))
    }

    /// Registered config versions, ascending
    pub fn config_versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.versions.keys().copied()
    }

    /// All kinds of a config version, in registration order
    pub fn kinds(&self, config_version: u32) -> Result<&[Arc<ResourceKind>]> {
        Ok(&self.table(config_version)?.kinds)
    }

    pub fn lookup(&self, config_version: u32, key: &str) -> Result<&Arc<ResourceKind>> {
        let table = self.table(config_version)?;
        table
            .index
            .get(key)
            .map(|&i| &table.kinds[i])
            .ok_or_else(|| ResourceError::UnknownKind {
                config_version,
                key: key.to_string(),
            })
    }

    /// The kind standing for a search root
    pub fn root(&self, config_version: u32) -> Result<&Arc<ResourceKind>> {
        self.table(config_version)?
            .root
            .as_ref()
            .ok_or(ResourceError::UnknownConfigVersion(config_version))
    }

    /// Ancestors of a kind, from the search root down to its immediate parent
    pub fn parents(&self, config_version: u32, key: &str) -> Result<Vec<&ResourceKind>> {
        let mut chain = self.chain(config_version, key)?;
        chain.pop();
        Ok(chain.into_iter().map(Arc::as_ref).collect())
    }

    /// Kinds declaring this kind as their parent
    pub fn children(&self, config_version: u32, key: &str) -> Result<HashSet<&ResourceKind>> {
        let kind = self.lookup(config_version, key)?;
        Ok(self.child_kinds(kind).iter().map(Arc::as_ref).collect())
    }

    /// Children in registration order, for traversal
    pub(crate) fn child_kinds(&self, kind: &ResourceKind) -> &[Arc<ResourceKind>] {
        self.versions
            .get(&kind.config_version())
            .and_then(|t| t.children.get(kind.key()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Root-to-kind chain, the kind itself included
    pub(crate) fn chain(&self, config_version: u32, key: &str) -> Result<Vec<&Arc<ResourceKind>>> {
        let mut current = self.lookup(config_version, key)?;
        let mut chain = vec![current];
        while let Some(parent) = current.parent_key() {
            current = self.lookup(config_version, parent)?;
            chain.push(current);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Full path template relative to a search root, e.g. `{name}/{version}/package.{ext}`
    pub fn path_template(&self, config_version: u32, key: &str) -> Result<String> {
        let segments: Vec<&str> = self
            .chain(config_version, key)?
            .into_iter()
            .filter(|k| !k.is_root())
            .map(|k| k.pattern().as_str())
            .collect();
        Ok(segments.join("/"))
    }

    /// Resolve key patterns to the concrete keys they select.
    ///
    /// A trailing `*` segment matches exactly one namespace level. An empty
    /// pattern list selects every non-root kind.
    pub fn select<S: AsRef<str>>(
        &self,
        config_version: u32,
        patterns: &[S],
    ) -> Result<BTreeSet<String>> {
        let table = self.table(config_version)?;
        let candidates = || table.kinds.iter().filter(|k| !k.is_root());

        if patterns.is_empty() {
            return Ok(candidates().map(|k| k.key().to_string()).collect());
        }

        let mut selected = BTreeSet::new();
        for pattern in patterns {
            let pattern = KeyPattern::parse(pattern.as_ref())?;
            let mut matched = false;
            for kind in table.kinds.iter().filter(|k| pattern.matches(k.key())) {
                matched = true;
                selected.insert(kind.key().to_string());
            }
            if !matched {
                return Err(ResourceError::UnknownKind {
                    config_version,
                    key: pattern.source.to_string(),
                });
            }
        }
        Ok(selected)
    }

    /// Whether any strict descendant of `kind` is in `selected`
    pub(crate) fn reaches(&self, kind: &ResourceKind, selected: &BTreeSet<String>) -> bool {
        self.child_kinds(kind)
            .iter()
            .any(|child| selected.contains(child.key()) || self.reaches(child, selected))
    }
}

/// A dotted key pattern with an optional trailing `*` segment
struct KeyPattern<'a> {
    source: &'a str,
    segments: Vec<&'a str>,
    wildcard: bool,
}

impl<'a> KeyPattern<'a> {
    fn parse(source: &'a str) -> Result<Self> {
        let segments: Vec<&str> = source.split('.').collect();
        let last = segments.len() - 1;
        let well_formed = segments.iter().enumerate().all(|(i, seg)| {
            !seg.is_empty() && (!seg.contains('*') || (i == last && *seg == "*"))
        });
        if !well_formed {
            return Err(ResourceError::InvalidKeyPattern(source.to_string()));
        }
        let wildcard = segments[last] == "*";
        Ok(Self {
            source,
            segments,
            wildcard,
        })
    }

    fn matches(&self, key: &str) -> bool {
        if !self.wildcard {
            return key == self.source;
        }
        let parts: Vec<&str> = key.split('.').collect();
        let prefix = &self.segments[..self.segments.len() - 1];
        parts.len() == self.segments.len() && parts[..prefix.len()] == *prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{FieldType, Schema};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn small_registry() -> Registry {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ResourceKind::root(0, "folder.root").unwrap())
            .unwrap()
            .register(ResourceKind::directory(0, "folder.name", "folder.root", "{name}").unwrap())
            .unwrap()
            .register(
                ResourceKind::file(
                    0,
                    "package.leaf",
                    "folder.name",
                    "package.{ext}",
                    Schema::new().required("name", FieldType::String),
                )
                .unwrap(),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ResourceKind::root(0, "folder.root").unwrap())
            .unwrap();
        let result = builder
            .register(ResourceKind::directory(0, "folder.root", "folder.root", "{name}").unwrap());

        assert!(matches!(result, Err(ResourceError::DuplicateKind { .. })));
    }

    #[test]
    fn test_same_key_in_other_config_version() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ResourceKind::root(0, "folder.root").unwrap())
            .unwrap()
            .register(ResourceKind::root(1, "folder.root").unwrap())
            .unwrap();
        let registry = builder.build();

        assert_eq!(registry.config_versions().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_parent_must_exist() {
        let mut builder = RegistryBuilder::new();
        let result =
            builder.register(ResourceKind::directory(0, "folder.name", "folder.root", "{name}").unwrap());

        assert!(matches!(result, Err(ResourceError::UnknownParent { .. })));
    }

    #[test]
    fn test_second_root_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(ResourceKind::root(0, "folder.root").unwrap())
            .unwrap();
        let result = builder.register(ResourceKind::root(0, "folder.other_root").unwrap());

        assert!(matches!(result, Err(ResourceError::DuplicateRoot(0))));
    }

    #[test]
    fn test_path_template() {
        let registry = small_registry();
        assert_eq!(
            registry.path_template(0, "package.leaf").unwrap(),
            "{name}/package.{ext}"
        );
        assert_eq!(registry.path_template(0, "folder.root").unwrap(), "");
    }

    #[test]
    fn test_unknown_config_version() {
        let registry = small_registry();
        assert!(matches!(
            registry.lookup(7, "folder.root"),
            Err(ResourceError::UnknownConfigVersion(7))
        ));
    }

    #[rstest]
    #[case(&["package.leaf"], &["package.leaf"])]
    #[case(&["package.*"], &["package.leaf"])]
    #[case(&["folder.*"], &["folder.name", "folder.root"])]
    #[case(&[], &["folder.name", "package.leaf"])]
    fn test_select(#[case] patterns: &[&str], #[case] expected: &[&str]) {
        let registry = small_registry();
        let selected = registry.select(0, patterns).unwrap();
        let expected: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
        assert_eq!(selected, expected);
    }

    #[rstest]
    #[case("*.leaf")]
    #[case("package.le*")]
    #[case("package.")]
    fn test_select_rejects_malformed(#[case] pattern: &str) {
        let registry = small_registry();
        assert!(matches!(
            registry.select(0, &[pattern]),
            Err(ResourceError::InvalidKeyPattern(_))
        ));
    }

    #[test]
    fn test_select_unknown_key() {
        let registry = small_registry();
        assert!(matches!(
            registry.select(0, &["non_existent"]),
            Err(ResourceError::UnknownKind { .. })
        ));
        assert!(matches!(
            registry.select(0, &["package.leaf.*"]),
            Err(ResourceError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_reaches() {
        let registry = small_registry();
        let root = registry.root(0).unwrap();
        let leaf = registry.lookup(0, "package.leaf").unwrap();
        let selected: BTreeSet<String> = ["package.leaf".to_string()].into();

        assert!(registry.reaches(root, &selected));
        assert!(!registry.reaches(leaf, &selected));
    }
}
