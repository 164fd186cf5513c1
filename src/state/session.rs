/// Folder-tree session state shown by the LUT panel
///
/// The UI reads the trees and the expanded-folder set while selection
/// events mutate them, so both are published as immutable `Arc` snapshots:
/// every mutation builds a new value and swaps it in, and `version` is
/// bumped so the view can tell that something changed.

use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::LutError;
use crate::lut::tree::lookup;
use crate::state::data::FolderNode;

/// What a click on a tree entry means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Click {
    /// A folder was opened or closed
    Toggled { path: String, expanded: bool },
    /// A LUT file was picked and should be applied
    Asset(String),
}

#[derive(Debug, Clone, Default)]
pub struct LutSession {
    /// One tree per selected folder, in selection order
    roots: Arc<Vec<Arc<FolderNode>>>,
    /// Folders currently shown expanded
    expanded: Arc<BTreeSet<String>>,
    version: u64,
}

impl LutSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn roots(&self) -> Arc<Vec<Arc<FolderNode>>> {
        Arc::clone(&self.roots)
    }

    pub fn expanded(&self) -> Arc<BTreeSet<String>> {
        Arc::clone(&self.expanded)
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains(path)
    }

    /// Add a scanned folder, replacing the old tree if it was already selected
    pub fn set_tree(&mut self, tree: FolderNode) {
        let mut roots: Vec<Arc<FolderNode>> = self.roots.as_ref().clone();
        let tree = Arc::new(tree);

        match roots.iter().position(|root| root.path == tree.path) {
            Some(index) => {
                debug!("🔄 Replacing tree for {}", tree.path);
                roots[index] = tree;
            }
            None => roots.push(tree),
        }

        self.roots = Arc::new(roots);
        self.bump();
    }

    /// Forget a selected folder; returns false if it was not selected
    pub fn remove_folder(&mut self, root_path: &str) -> bool {
        if !self.roots.iter().any(|root| root.path == root_path) {
            return false;
        }

        let roots: Vec<Arc<FolderNode>> = self
            .roots
            .iter()
            .filter(|root| root.path != root_path)
            .cloned()
            .collect();
        self.roots = Arc::new(roots);
        self.bump();
        true
    }

    /// Open a closed folder or close an open one; returns the new state
    pub fn toggle_folder(&mut self, path: &str) -> bool {
        let mut expanded = self.expanded.as_ref().clone();
        let now_expanded = if expanded.remove(path) {
            false
        } else {
            expanded.insert(path.to_string());
            true
        };

        self.expanded = Arc::new(expanded);
        self.bump();
        now_expanded
    }

    /// Find a node in any selected folder
    pub fn lookup(&self, path: &str) -> Result<&FolderNode, LutError> {
        self.roots
            .iter()
            .find_map(|root| lookup(root, path).ok())
            .ok_or_else(|| LutError::NotFound(path.to_string()))
    }

    /// Dispatch a click on a tree entry
    ///
    /// Folders are toggled; files are handed back for the apply pipeline.
    /// A path missing from the current trees (stale view) is logged and
    /// ignored.
    pub fn click(&mut self, path: &str) -> Option<Click> {
        let is_dir = match self.lookup(path) {
            Ok(node) => node.is_dir,
            Err(e) => {
                warn!("⚠️  Clicked path not found in tree: {}", e);
                return None;
            }
        };

        if is_dir {
            let expanded = self.toggle_folder(path);
            Some(Click::Toggled {
                path: path.to_string(),
                expanded,
            })
        } else {
            Some(Click::Asset(path.to_string()))
        }
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
