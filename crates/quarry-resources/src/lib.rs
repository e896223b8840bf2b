//! Quarry package resource resolution
//!
//! Typed resource kinds (folders and package descriptor files) are arranged
//! in a parent/child hierarchy per config version. Each kind carries a
//! segment pattern such as `{name}` or `package.{ext}`; walking a search
//! root binds those patterns against real directory entries to produce
//! [`ResourceHandle`]s, which can then be loaded and validated.

pub mod builtin;
pub mod formats;
pub mod handle;
pub mod kind;
pub mod loader;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod value;
pub mod version;
pub mod walker;

pub use formats::FormatRegistry;
pub use handle::{ResourceHandle, Variables, SEARCH_PATH_VAR};
pub use kind::{EntryType, FieldRule, FieldType, ResourceKind, Schema};
pub use loader::Loader;
pub use pattern::SegmentPattern;
pub use registry::{registry, Registry, RegistryBuilder};
pub use resolver::{
    get_resource, get_resource_from_path, iter_resources, load_resource, Resolver,
};
pub use value::{FieldValue, PackageData};
pub use version::{Version, VersionError};
pub use walker::ResourceIter;

use std::path::PathBuf;

/// Resource resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Unknown config version: {0}")]
    UnknownConfigVersion(u32),

    #[error("Unknown resource kind '{key}' for config version {config_version}")]
    UnknownKind { config_version: u32, key: String },

    #[error("Invalid resource key pattern: '{0}'")]
    InvalidKeyPattern(String),

    #[error("Invalid segment pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Resource kind '{key}' already registered for config version {config_version}")]
    DuplicateKind { config_version: u32, key: String },

    #[error("Config version {0} already has a search root kind")]
    DuplicateRoot(u32),

    #[error("Resource kind '{key}' names unregistered parent '{parent}'")]
    UnknownParent { key: String, parent: String },

    #[error("No resource matches {0}")]
    NotFound(String),

    #[error("Ambiguous resource request {request}: {}", .candidates.join(", "))]
    Ambiguous {
        request: String,
        candidates: Vec<String>,
    },

    #[error("Path does not match any resource: {}", .0.display())]
    UnmatchedPath(PathBuf),

    #[error("Path does not exist: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("Resource kind '{0}' has no loadable content")]
    NotLoadable(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl ResourceError {
    /// Whether this is a metadata validation failure (the file was found but
    /// its content is wrong) rather than a resolution failure
    pub fn is_metadata(&self) -> bool {
        matches!(self, ResourceError::Metadata(_))
    }
}

/// A resource file whose content failed to parse or validate
#[derive(Debug, thiserror::Error)]
#[error("Invalid package metadata in {}: {kind}", .path.display())]
pub struct MetadataError {
    pub path: PathBuf,
    pub kind: MetadataErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataErrorKind {
    #[error("unsupported file format '{0}'")]
    UnsupportedFormat(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("field '{field}' is not a valid version: {source}")]
    InvalidVersion {
        field: String,
        #[source]
        source: VersionError,
    },

    #[error("field '{field}' is '{found}' but the resource location says '{expected}'")]
    Mismatch {
        field: String,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, ResourceError>;
