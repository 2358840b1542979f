//! Registry of spec roots served under URL mount paths.
//!
//! A mount path always starts and ends with `/`. The top-level root is mounted
//! at `/` and each child root under its parent's mount plus its directory
//! name, so `spec/v2/beta` is served at `/v2/beta/`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use specrepo_storage::SpecRoot;

use crate::error::SpecError;

/// Mount path of the top-level root.
pub const ROOT_MOUNT: &str = "/";

/// A registered mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// URL prefix, e.g. `/v2/`.
    pub path: String,
    /// Spec root served under the prefix.
    pub root: SpecRoot,
}

/// Process-wide mapping from mount path to spec root.
///
/// Shared by the serving layer and the sync orchestrator, which registers
/// child roots created by a sync. Registration is idempotent.
///
/// # Thread Safety
///
/// Uses an internal `RwLock`; every method panics if the lock is poisoned.
#[derive(Debug, Default)]
pub struct MountRegistry {
    mounts: RwLock<BTreeMap<String, SpecRoot>>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `root` under `path`. Returns `false` if it was already registered.
    pub fn register(&self, path: impl Into<String>, root: SpecRoot) -> bool {
        let path = path.into();
        let mut mounts = self.mounts.write().unwrap();
        if mounts.get(&path) == Some(&root) {
            return false;
        }
        tracing::info!(mount = %path, basedir = %root.basedir().display(), "Mounted spec root");
        mounts.insert(path, root);
        true
    }

    /// Register `root` at `/` and every nested child root below it.
    ///
    /// Child directories without a main file are not mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if a root directory can't be listed.
    pub fn mount_tree(&self, root: &SpecRoot) -> Result<(), SpecError> {
        self.register(ROOT_MOUNT, root.clone());
        self.mount_children(ROOT_MOUNT, root)
    }

    fn mount_children(&self, mount: &str, root: &SpecRoot) -> Result<(), SpecError> {
        for child in root.children()?.unwrap_or_default() {
            if !child.root.main_file().is_file() {
                continue;
            }
            let child_mount = format!("{mount}{}/", child.name);
            self.register(child_mount.clone(), child.root.clone());
            self.mount_children(&child_mount, &child.root)?;
        }
        Ok(())
    }

    /// Register a child root below the mount of `parent` and return its mount.
    ///
    /// The child's mount is the parent's mount followed by the child's
    /// directory path relative to the parent.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnmountedParent`] if `parent` is not registered.
    pub fn mount_child(&self, parent: &SpecRoot, child: &SpecRoot) -> Result<String, SpecError> {
        let relative = child
            .basedir()
            .strip_prefix(parent.basedir())
            .unwrap_or(child.basedir());
        let relative = url_segments(relative);

        let Some(parent_mount) = self.mount_of(parent) else {
            return Err(SpecError::UnmountedParent {
                mount: format!("{ROOT_MOUNT}{relative}/"),
            });
        };

        let mount = format!("{parent_mount}{relative}/");
        self.register(mount.clone(), child.clone());
        Ok(mount)
    }

    /// Mount path of a registered root.
    pub fn mount_of(&self, root: &SpecRoot) -> Option<String> {
        self.mounts
            .read()
            .unwrap()
            .iter()
            .find(|(_, r)| r.basedir() == root.basedir())
            .map(|(path, _)| path.clone())
    }

    /// Find the mount serving `request_path` (longest prefix wins).
    ///
    /// Returns the mount and the remainder of the path after the mount prefix.
    pub fn resolve(&self, request_path: &str) -> Option<(Mount, String)> {
        let mounts = self.mounts.read().unwrap();
        mounts
            .iter()
            .filter(|(path, _)| request_path.starts_with(path.as_str()))
            .max_by_key(|(path, _)| path.len())
            .map(|(path, root)| {
                let rest = request_path[path.len()..].to_owned();
                (
                    Mount {
                        path: path.clone(),
                        root: root.clone(),
                    },
                    rest,
                )
            })
    }

    /// All mounts in path order.
    pub fn mounts(&self) -> Vec<Mount> {
        self.mounts
            .read()
            .unwrap()
            .iter()
            .map(|(path, root)| Mount {
                path: path.clone(),
                root: root.clone(),
            })
            .collect()
    }
}

fn url_segments(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
