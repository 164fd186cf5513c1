/// LUT folder scanning and tree lookup
///
/// A scan turns one user-selected directory into an immutable
/// [`FolderNode`] snapshot: every sub-directory plus the files whose
/// extension is in the configured LUT list. Unreadable sub-paths are
/// skipped and reported as warnings, so a partial tree is still usable.
///
/// Both the scan and [`lookup`] use an explicit stack rather than
/// recursion, so very deep folder hierarchies cannot blow the call stack.

use log::{debug, info, warn};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio::task;
use walkdir::{DirEntry, WalkDir};

use crate::config::Settings;
use crate::error::LutError;
use crate::state::data::FolderNode;

/// Result of scanning one LUT folder
#[derive(Debug)]
pub struct TreeScan {
    pub root: FolderNode,
    /// Sub-paths that could not be read (the tree is partial when non-empty)
    pub warnings: Vec<LutError>,
}

impl TreeScan {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Find the node with `path` in `root` (depth-first, first match wins)
pub fn lookup<'a>(root: &'a FolderNode, path: &str) -> Result<&'a FolderNode, LutError> {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.path == path {
            return Ok(node);
        }
        // Reversed so children are visited in display order
        stack.extend(node.children.iter().rev());
    }

    Err(LutError::NotFound(path.to_string()))
}

/// Scan a LUT folder in a background thread
pub async fn scan_lut_tree_async(root: PathBuf, settings: Settings) -> Result<TreeScan, LutError> {
    let root_display = root.display().to_string();
    task::spawn_blocking(move || scan_lut_tree(&root, &settings))
        .await
        .map_err(|e| LutError::enumeration(root_display, format!("task join error: {}", e)))?
}

/// Blocking implementation of the folder scan
pub fn scan_lut_tree(root: &Path, settings: &Settings) -> Result<TreeScan, LutError> {
    let root_str = root.to_string_lossy().into_owned();

    // A missing root is a hard failure, anything below it only degrades the tree
    let metadata = std::fs::metadata(root).map_err(|e| LutError::enumeration(&root_str, e))?;
    if !metadata.is_dir() {
        return Err(LutError::enumeration(&root_str, "not a directory"));
    }

    info!("🔍 Scanning LUT folder: {}", root.display());

    let show_hidden = settings.show_hidden;
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by(dirs_first_by_name)
        .into_iter()
        .filter_entry(move |entry| entry.depth() == 0 || show_hidden || !is_hidden(entry));

    let mut warnings = Vec::new();
    // Open directories, innermost last: (depth, node being filled)
    let mut open: Vec<(usize, FolderNode)> = Vec::new();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|| root_str.clone());
                warn!("⚠️  Could not scan '{}': {}", path, e);
                warnings.push(LutError::enumeration(path, e));
                continue;
            }
        };

        let depth = entry.depth();
        if depth == 0 {
            open.push((0, FolderNode::dir(node_name(root), root_str.clone(), Vec::new())));
            continue;
        }

        // Close every directory that is not an ancestor of this entry
        close_until(&mut open, depth);

        let path = entry.path().to_string_lossy().into_owned();
        let name = entry.file_name().to_string_lossy().into_owned();

        if entry.file_type().is_dir() {
            open.push((depth, FolderNode::dir(name, path, Vec::new())));
        } else if is_lut_file(entry.path(), settings) {
            if let Some((_, parent)) = open.last_mut() {
                parent.children.push(FolderNode::file(name, path));
            }
        }
    }

    close_until(&mut open, 1);
    let root_node = match open.pop() {
        Some((_, node)) => node,
        // The root itself could not be read, return it empty
        None => FolderNode::dir(node_name(root), root_str.clone(), Vec::new()),
    };

    debug!(
        "🌲 Scanned {} nodes under {} ({} warnings)",
        root_node.node_count(),
        root_str,
        warnings.len()
    );

    Ok(TreeScan {
        root: root_node,
        warnings,
    })
}

/// Pop open directories deeper than or level with `depth`, attaching each
/// to its parent. Leaves the root in place.
fn close_until(open: &mut Vec<(usize, FolderNode)>, depth: usize) {
    while open.len() > 1 && open.last().map_or(false, |(d, _)| *d >= depth) {
        if let Some((_, finished)) = open.pop() {
            if let Some((_, parent)) = open.last_mut() {
                parent.children.push(finished);
            }
        }
    }
}

fn dirs_first_by_name(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    b_dir.cmp(&a_dir).then_with(|| {
        a.file_name()
            .to_string_lossy()
            .to_lowercase()
            .cmp(&b.file_name().to_string_lossy().to_lowercase())
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map_or(false, |s| s.starts_with('.'))
}

fn is_lut_file(path: &Path, settings: &Settings) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| settings.accepts_extension(ext))
}

fn node_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_lut_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Film/Kodak")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("Film/Kodak/2383.cube"), "LUT_3D_SIZE 2").unwrap();
        fs::write(root.join("Film/portra.3DL"), "").unwrap();
        fs::write(root.join("Film/notes.txt"), "not a lut").unwrap();
        fs::write(root.join("b_hald.png"), [0u8; 4]).unwrap();
        fs::write(root.join("A_teal.tiff"), [0u8; 4]).unwrap();
        fs::write(root.join(".hidden.cube"), "").unwrap();
        fs::write(root.join(".cache/c.cube"), "").unwrap();
        dir
    }

    fn names(node: &FolderNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn sample_tree() -> FolderNode {
        FolderNode::dir(
            "luts",
            "/luts",
            vec![
                FolderNode::dir(
                    "film",
                    "/luts/film",
                    vec![
                        FolderNode::file("a.cube", "/luts/film/a.cube"),
                        FolderNode::dir("deep", "/luts/film/deep", vec![FolderNode::file("b.png", "/luts/film/deep/b.png")]),
                    ],
                ),
                FolderNode::file("c.3dl", "/luts/c.3dl"),
            ],
        )
    }

    #[test]
    fn test_lookup_finds_every_node() {
        let tree = sample_tree();
        let mut stack = vec![&tree];
        while let Some(node) = stack.pop() {
            assert_eq!(lookup(&tree, &node.path).unwrap(), node);
            stack.extend(node.children.iter());
        }
    }

    #[test]
    fn test_lookup_unknown_path_is_not_found() {
        let tree = sample_tree();
        match lookup(&tree, "/luts/missing.cube") {
            Err(LutError::NotFound(path)) => assert_eq!(path, "/luts/missing.cube"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_survives_very_deep_nesting() {
        let depth = 100_000;
        let mut node = FolderNode::file("leaf.cube", "/leaf.cube");
        for i in 0..depth {
            node = FolderNode::dir(format!("d{i}"), format!("/d{i}"), vec![node]);
        }

        assert_eq!(lookup(&node, "/leaf.cube").unwrap().name, "leaf.cube");

        // Tear down iteratively as well, the derived Drop would recurse
        let mut stack = vec![node];
        while let Some(mut n) = stack.pop() {
            stack.append(&mut n.children);
        }
    }

    #[test]
    fn test_scan_filters_sorts_and_skips_hidden() {
        let dir = setup_lut_dir();
        let scan = scan_lut_tree(dir.path(), &Settings::default()).unwrap();

        assert!(!scan.is_partial());
        assert!(scan.root.is_dir);
        assert_eq!(scan.root.path, dir.path().to_string_lossy());
        assert_eq!(names(&scan.root), vec!["empty", "Film", "A_teal.tiff", "b_hald.png"]);

        let film = lookup(&scan.root, &dir.path().join("Film").to_string_lossy()).unwrap();
        assert_eq!(names(film), vec!["Kodak", "portra.3DL"]);

        let kodak = &film.children[0];
        assert!(kodak.is_dir);
        assert_eq!(names(kodak), vec!["2383.cube"]);
        assert!(!kodak.children[0].is_dir);
        assert!(kodak.children[0].children.is_empty());
    }

    #[test]
    fn test_scan_shows_hidden_when_configured() {
        let dir = setup_lut_dir();
        let settings = Settings {
            show_hidden: true,
            ..Settings::default()
        };
        let scan = scan_lut_tree(dir.path(), &settings).unwrap();
        let hidden = dir.path().join(".hidden.cube");
        assert!(lookup(&scan.root, &hidden.to_string_lossy()).is_ok());
    }

    #[test]
    fn test_scan_missing_root_is_enumeration_error() {
        let dir = TempDir::new().unwrap();
        let result = scan_lut_tree(&dir.path().join("nope"), &Settings::default());
        assert!(matches!(result, Err(LutError::Enumeration { .. })));
    }

    #[test]
    fn test_scan_paths_are_unique() {
        let dir = setup_lut_dir();
        let scan = scan_lut_tree(dir.path(), &Settings::default()).unwrap();

        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![&scan.root];
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node.path.clone()), "duplicate path {}", node.path);
            if !node.is_dir {
                assert!(node.children.is_empty());
            }
            stack.extend(node.children.iter());
        }
        assert_eq!(seen.len(), scan.root.node_count());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_broken_links_and_loops() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/x.cube"), "").unwrap();
        fs::write(root.join("z.cube"), "").unwrap();
        symlink(root.join("nowhere.cube"), root.join("broken.cube")).unwrap();
        symlink(root, root.join("a/loop")).unwrap();

        let scan = scan_lut_tree(root, &Settings::default()).unwrap();

        assert!(scan.is_partial());
        assert_eq!(scan.warnings.len(), 2, "{:?}", scan.warnings);
        assert!(scan
            .warnings
            .iter()
            .all(|w| matches!(w, LutError::Enumeration { .. })));

        assert!(lookup(&scan.root, &root.join("a/x.cube").to_string_lossy()).is_ok());
        assert!(lookup(&scan.root, &root.join("z.cube").to_string_lossy()).is_ok());
        assert!(lookup(&scan.root, &root.join("broken.cube").to_string_lossy()).is_err());
    }

    #[tokio::test]
    async fn test_scan_async() {
        let dir = setup_lut_dir();
        let scan = scan_lut_tree_async(dir.path().to_path_buf(), Settings::default())
            .await
            .unwrap();
        assert_eq!(scan.root.children.len(), 4);
    }
}
