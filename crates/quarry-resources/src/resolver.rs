//! Request surface: iterate, get and load resources
//!
//! A [`Resolver`] binds a registry, a config version and an ordered list of
//! search roots. The free functions do the same over the process-wide
//! registry for one-off requests.

use crate::handle::{ResourceHandle, Variables, SEARCH_PATH_VAR};
use crate::kind::{EntryType, ResourceKind};
use crate::loader::Loader;
use crate::registry::{registry, Registry};
use crate::value::PackageData;
use crate::walker::{absolute_path, match_entry, ResourceIter};
use crate::{ResourceError, Result};
use quarry_config::Config;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Resolves resources under a fixed set of search roots
#[derive(Debug, Clone)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    loader: Loader,
    config_version: u32,
    search_paths: Vec<PathBuf>,
}

impl Resolver<'static> {
    /// A resolver over the process-wide registry
    pub fn new(config_version: u32, search_paths: Vec<PathBuf>) -> Self {
        Resolver::with_registry(registry(), config_version, search_paths)
    }

    /// A resolver using the configured search roots and config version
    pub fn from_config(config: &Config) -> Self {
        Resolver::new(config.config_version(), config.packages_path().to_vec())
    }
}

impl<'r> Resolver<'r> {
    pub fn with_registry(
        registry: &'r Registry,
        config_version: u32,
        search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            registry,
            loader: Loader::new(),
            config_version,
            search_paths,
        }
    }

    /// Replace the loader (e.g. to support more file formats)
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config_version(&self) -> u32 {
        self.config_version
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Lazily iterate resources whose kind matches `resource_keys` and whose
    /// path variables agree with `variables`
    pub fn iter<S: AsRef<str>>(
        &self,
        resource_keys: &[S],
        variables: &Variables,
    ) -> Result<ResourceIter<'r>> {
        ResourceIter::new(
            self.registry,
            self.config_version,
            resource_keys,
            variables,
            &self.search_paths,
        )
    }

    /// The single resource matching the request.
    ///
    /// Matches are counted across every search root, so the same package in
    /// two roots is `Ambiguous`; bind `search_path` to pick one root.
    pub fn get<S: AsRef<str>>(
        &self,
        resource_keys: &[S],
        variables: &Variables,
    ) -> Result<ResourceHandle> {
        let mut found = self.iter(resource_keys, variables)?;
        let request = || {
            let keys: Vec<&str> = resource_keys.iter().map(AsRef::as_ref).collect();
            format!("{:?} with variables {:?}", keys, variables)
        };

        let first = found
            .next()
            .ok_or_else(|| ResourceError::NotFound(request()))?;
        if let Some(second) = found.next() {
            let request = if first.search_path() != second.search_path() {
                format!("{} (bind `{}` to choose a root)", request(), SEARCH_PATH_VAR)
            } else {
                request()
            };
            return Err(ResourceError::Ambiguous {
                request,
                candidates: vec![
                    first.path().display().to_string(),
                    second.path().display().to_string(),
                ],
            });
        }
        Ok(first)
    }

    /// Resolve a file or directory path back to its resource.
    ///
    /// The path is matched against every kind's chain of patterns below each
    /// search root, in root order; the first root producing a match decides.
    /// A non-empty `resource_keys` restricts which kinds may match.
    pub fn get_from_path<S: AsRef<str>>(
        &self,
        filepath: &Path,
        resource_keys: &[S],
    ) -> Result<ResourceHandle> {
        let path = absolute_path(filepath)?;
        if !path.exists() {
            return Err(ResourceError::MissingPath(path));
        }
        let selected = if resource_keys.is_empty() {
            None
        } else {
            Some(self.registry.select(self.config_version, resource_keys)?)
        };
        let root_kind = self.registry.root(self.config_version)?;
        let entry_type = if path.is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };

        for root in &self.search_paths {
            let root = absolute_path(root)?;
            let Some(segments) = relative_segments(&path, &root) else {
                continue;
            };

            let mut variables = Variables::new();
            variables.insert(
                SEARCH_PATH_VAR.to_string(),
                root.to_string_lossy().into_owned(),
            );
            let mut states: Vec<(&Arc<ResourceKind>, Variables)> = vec![(root_kind, variables)];
            for (i, segment) in segments.iter().enumerate() {
                let ty = if i + 1 == segments.len() {
                    entry_type
                } else {
                    EntryType::Directory
                };
                states = states
                    .iter()
                    .flat_map(|(kind, vars)| match_entry(self.registry, kind, segment, ty, vars))
                    .collect();
            }
            states.retain(|(kind, _)| selected.as_ref().map_or(true, |s| s.contains(kind.key())));

            match states.len() {
                0 => continue,
                1 => {
                    let (kind, variables) = states.remove(0);
                    return Ok(ResourceHandle::new(Arc::clone(kind), path, variables));
                }
                _ => {
                    return Err(ResourceError::Ambiguous {
                        request: path.display().to_string(),
                        candidates: states.iter().map(|(k, _)| k.key().to_string()).collect(),
                    })
                }
            }
        }

        Err(ResourceError::UnmatchedPath(path))
    }

    /// Parse and validate a resolved resource
    pub fn load_handle(&self, handle: &ResourceHandle) -> Result<PackageData> {
        self.loader.load(handle)
    }

    /// `get` then load
    pub fn load<S: AsRef<str>>(
        &self,
        resource_keys: &[S],
        variables: &Variables,
    ) -> Result<PackageData> {
        self.load_handle(&self.get(resource_keys, variables)?)
    }

    /// `get_from_path` then load
    pub fn load_from_path(&self, filepath: &Path) -> Result<PackageData> {
        self.load_handle(&self.get_from_path::<&str>(filepath, &[])?)
    }
}

/// Normal, visible, UTF-8 segments of `path` below `root`
fn relative_segments(path: &Path, root: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    let segments = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str().filter(|s| !s.starts_with('.')).map(String::from),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    (!segments.is_empty()).then_some(segments)
}

/// Iterate resources over the process-wide registry
pub fn iter_resources<S: AsRef<str>>(
    config_version: u32,
    resource_keys: &[S],
    variables: &Variables,
    search_paths: &[PathBuf],
) -> Result<ResourceIter<'static>> {
    ResourceIter::new(registry(), config_version, resource_keys, variables, search_paths)
}

/// The single resource matching the request
pub fn get_resource<S: AsRef<str>>(
    config_version: u32,
    resource_keys: &[S],
    variables: &Variables,
    search_paths: &[PathBuf],
) -> Result<ResourceHandle> {
    Resolver::new(config_version, search_paths.to_vec()).get(resource_keys, variables)
}

/// Resolve a path back to its resource; an empty `resource_keys` allows any kind
pub fn get_resource_from_path<S: AsRef<str>>(
    config_version: u32,
    filepath: &Path,
    resource_keys: &[S],
    search_paths: &[PathBuf],
) -> Result<ResourceHandle> {
    Resolver::new(config_version, search_paths.to_vec()).get_from_path(filepath, resource_keys)
}

/// Get the single matching resource and load it
pub fn load_resource<S: AsRef<str>>(
    config_version: u32,
    resource_keys: &[S],
    variables: &Variables,
    search_paths: &[PathBuf],
) -> Result<PackageData> {
    Resolver::new(config_version, search_paths.to_vec()).load(resource_keys, variables)
}
