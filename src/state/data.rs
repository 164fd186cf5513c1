/// Shared data structures for the LUT panel
///
/// These structs represent the data model that flows between
/// the folder scanner, the apply pipeline, and the UI layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry in a scanned LUT folder tree
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    /// Last path component (e.g., "Kodak 2383.cube")
    pub name: String,
    /// Full path, unique within one tree snapshot
    pub path: String,
    /// Child entries, always empty for files
    pub children: Vec<FolderNode>,
    pub is_dir: bool,
}

impl FolderNode {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            children: Vec::new(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>, path: impl Into<String>, children: Vec<FolderNode>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            children,
            is_dir: true,
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// How a LUT asset is decoded and sent to the compute service
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LutKind {
    /// `.cube` / `.3dl` text
    #[serde(rename = "cube")]
    CubeText,
    /// Image-encoded Hald CLUT (PNG, TIFF, ...)
    #[serde(rename = "hald")]
    HaldImage,
}

impl LutKind {
    /// Tag understood by the compute service
    pub fn as_str(&self) -> &'static str {
        match self {
            LutKind::CubeText => "cube",
            LutKind::HaldImage => "hald",
        }
    }
}

impl fmt::Display for LutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LUT payload, exactly one representation per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LutPayload {
    /// Verbatim cube/3dl text
    Text(String),
    /// `data:image/<subtype>;base64,...`
    DataUri(String),
}

impl LutPayload {
    pub fn kind(&self) -> LutKind {
        match self {
            LutPayload::Text(_) => LutKind::CubeText,
            LutPayload::DataUri(_) => LutKind::HaldImage,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LutPayload::Text(text) => text,
            LutPayload::DataUri(uri) => uri,
        }
    }
}

/// A LUT loaded for one application request (never cached across selections)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutAsset {
    pub path: String,
    pub payload: LutPayload,
}

impl LutAsset {
    /// Derived from the payload so the two can never disagree
    pub fn kind(&self) -> LutKind {
        self.payload.kind()
    }
}

/// Opaque reference to an image (a data URI in this app)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        ImageRef(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ImageRef {
    fn from(uri: String) -> Self {
        ImageRef(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_follows_payload() {
        let cube = LutAsset {
            path: "/luts/grade.cube".into(),
            payload: LutPayload::Text("LUT_3D_SIZE 2".into()),
        };
        assert_eq!(cube.kind(), LutKind::CubeText);

        let hald = LutAsset {
            path: "/luts/lut.png".into(),
            payload: LutPayload::DataUri("data:image/png;base64,AAAA".into()),
        };
        assert_eq!(hald.kind(), LutKind::HaldImage);
    }

    #[test]
    fn test_kind_wire_tags() {
        assert_eq!(serde_json::to_string(&LutKind::CubeText).unwrap(), "\"cube\"");
        assert_eq!(serde_json::to_string(&LutKind::HaldImage).unwrap(), "\"hald\"");
        assert_eq!(LutKind::HaldImage.to_string(), "hald");
    }

    #[test]
    fn test_node_count() {
        let tree = FolderNode::dir(
            "luts",
            "/luts",
            vec![
                FolderNode::dir("film", "/luts/film", vec![FolderNode::file("a.cube", "/luts/film/a.cube")]),
                FolderNode::file("b.png", "/luts/b.png"),
            ],
        );
        assert_eq!(tree.node_count(), 4);
    }
}
