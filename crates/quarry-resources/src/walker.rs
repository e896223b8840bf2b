//! Lazy tree walker
//!
//! Walks each search root down the registry's parent→child edges. At every
//! level, each directory entry is bound against the patterns of the current
//! kind's children; matching directories are descended into and matching
//! selected kinds are yielded. Directories are only listed when the walk
//! reaches them, so stopping iteration early skips the rest of the tree.

use crate::handle::{ResourceHandle, Variables, SEARCH_PATH_VAR};
use crate::kind::{EntryType, ResourceKind};
use crate::registry::Registry;
use crate::{ResourceError, Result};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

struct Frame<'r> {
    kind: &'r Arc<ResourceKind>,
    variables: Variables,
    entries: walkdir::IntoIter,
}

/// Lazy sequence of resources matching a request
pub struct ResourceIter<'r> {
    registry: &'r Registry,
    root_kind: &'r Arc<ResourceKind>,
    selected: BTreeSet<String>,
    filter: Variables,
    roots: VecDeque<PathBuf>,
    stack: Vec<Frame<'r>>,
    pending: VecDeque<ResourceHandle>,
}

impl<'r> ResourceIter<'r> {
    pub(crate) fn new<S: AsRef<str>>(
        registry: &'r Registry,
        config_version: u32,
        resource_keys: &[S],
        variables: &Variables,
        search_paths: &[PathBuf],
    ) -> Result<Self> {
        let root_kind = registry.root(config_version)?;
        let selected = registry.select(config_version, resource_keys)?;
        let roots = search_paths
            .iter()
            .map(|p| absolute_path(p))
            .collect::<Result<VecDeque<_>>>()?;

        // Compared against root text, so spelled the same way as the roots
        let mut filter = variables.clone();
        if let Some(wanted) = filter.get_mut(SEARCH_PATH_VAR) {
            *wanted = absolute_path(Path::new(wanted.as_str()))?
                .to_string_lossy()
                .into_owned();
        }

        Ok(Self {
            registry,
            root_kind,
            selected,
            filter,
            roots,
            stack: Vec::new(),
            pending: VecDeque::new(),
        })
    }

    fn enter_root(&mut self, root: PathBuf) {
        let root_text = root.to_string_lossy().into_owned();
        if let Some(wanted) = self.filter.get(SEARCH_PATH_VAR) {
            if *wanted != root_text {
                return;
            }
        }
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "skipping missing search root");
            return;
        }
        if !self.registry.reaches(self.root_kind, &self.selected) {
            return;
        }

        tracing::debug!(root = %root.display(), "scanning search root");
        let mut variables = Variables::new();
        variables.insert(SEARCH_PATH_VAR.to_string(), root_text);
        self.stack.push(Frame {
            kind: self.root_kind,
            variables,
            entries: list_dir(&root),
        });
    }

    fn visit(&mut self, entry: &walkdir::DirEntry) {
        let registry = self.registry;
        let Some(frame) = self.stack.last() else {
            return;
        };
        let Some(name) = entry.file_name().to_str() else {
            tracing::trace!(path = %entry.path().display(), "skipping non UTF-8 entry");
            return;
        };
        if name.starts_with('.') {
            return;
        }

        let entry_type = if entry.file_type().is_dir() {
            EntryType::Directory
        } else {
            EntryType::File
        };
        let matches = match_entry(registry, frame.kind, name, entry_type, &frame.variables);

        let mut descend = Vec::new();
        for (kind, variables) in matches {
            if conflicts(&variables, &self.filter) {
                continue;
            }
            tracing::trace!(kind = kind.key(), path = %entry.path().display(), "matched");

            if self.selected.contains(kind.key())
                && self.filter.keys().all(|k| variables.contains_key(k))
            {
                self.pending.push_back(ResourceHandle::new(
                    Arc::clone(kind),
                    entry.path().to_path_buf(),
                    variables.clone(),
                ));
            }
            if kind.is_directory() && registry.reaches(kind, &self.selected) {
                descend.push(Frame {
                    kind,
                    variables,
                    entries: list_dir(entry.path()),
                });
            }
        }

        // First match on top of the stack so it is walked first
        self.stack.extend(descend.into_iter().rev());
    }
}

impl Iterator for ResourceIter<'_> {
    type Item = ResourceHandle;

    fn next(&mut self) -> Option<ResourceHandle> {
        loop {
            if let Some(handle) = self.pending.pop_front() {
                return Some(handle);
            }

            let Some(frame) = self.stack.last_mut() else {
                let root = self.roots.pop_front()?;
                self.enter_root(root);
                continue;
            };

            match frame.entries.next() {
                None => {
                    self.stack.pop();
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "skipping unreadable directory entry");
                }
                Some(Ok(entry)) => self.visit(&entry),
            }
        }
    }
}

/// Bind one directory entry against the children of `parent`.
///
/// Only the most specific matches survive: when `multi.yaml` matches both
/// `multi.{ext}` and `{name}.{ext}`, the pattern with more literal text wins.
/// Returned variables are `bound` merged with the new bindings.
pub(crate) fn match_entry<'r>(
    registry: &'r Registry,
    parent: &ResourceKind,
    name: &str,
    entry_type: EntryType,
    bound: &Variables,
) -> Vec<(&'r Arc<ResourceKind>, Variables)> {
    let mut matches: Vec<(&'r Arc<ResourceKind>, Variables)> = registry
        .child_kinds(parent)
        .iter()
        .filter(|kind| kind.entry_type() == entry_type)
        .filter_map(|kind| {
            let new = kind.pattern().bind(name, bound)?;
            let mut variables = bound.clone();
            variables.extend(new);
            Some((kind, variables))
        })
        .collect();

    if let Some(best) = matches.iter().map(|(k, _)| k.pattern().specificity()).max() {
        matches.retain(|(k, _)| k.pattern().specificity() == best);
    }
    matches
}

/// Whether any caller-supplied variable is bound to a different value
fn conflicts(variables: &Variables, filter: &Variables) -> bool {
    filter
        .iter()
        .any(|(k, v)| variables.get(k).is_some_and(|bound| bound != v))
}

fn list_dir(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
}

/// Make a path absolute against the current directory and drop `.` and `..`
/// components lexically, without touching symlinks
pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        cwd.join(path)
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `pop` is a no-op at the root, matching `/..` == `/`
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
