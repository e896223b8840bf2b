//! Resolved resource handles

use crate::kind::ResourceKind;
use crate::loader::Loader;
use crate::value::PackageData;
use crate::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Variable name to value
pub type Variables = BTreeMap<String, String>;

/// Name of the variable recording which search root a resource was found under
pub const SEARCH_PATH_VAR: &str = "search_path";

/// One concrete match of a resource kind against a real path
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceHandle {
    kind: Arc<ResourceKind>,
    path: PathBuf,
    variables: Variables,
}

impl ResourceHandle {
    pub(crate) fn new(kind: Arc<ResourceKind>, path: PathBuf, variables: Variables) -> Self {
        Self {
            kind,
            path,
            variables,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Dotted key of the matched kind
    pub fn key(&self) -> &str {
        self.kind.key()
    }

    /// Absolute path of the resource
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path-derived variables, including `search_path`
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// The search root this resource was found under
    pub fn search_path(&self) -> Option<&Path> {
        self.variable(SEARCH_PATH_VAR).map(Path::new)
    }

    /// Load and validate the backing file with the default loader
    pub fn load(&self) -> Result<PackageData> {
        Loader::global().load(self)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.key(), self.path.display())
    }
}
