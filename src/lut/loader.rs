/// LUT asset loading
///
/// Reads a selected LUT file in the mode chosen by [`classify`](super::kind::classify):
/// - cube text is passed through verbatim
/// - Hald images are base64-encoded into a `data:image/<ext>;base64,` URI
///
/// The bytes of a Hald image are not decoded here; a broken image is
/// reported by the compute service.

use base64::{engine::general_purpose, Engine as _};
use log::debug;
use std::future::Future;

use super::kind::image_subtype;
use crate::error::LutError;
use crate::state::data::{ImageRef, LutAsset, LutKind, LutPayload};

/// File access used by the loader
pub trait AssetReader: Send + Sync {
    /// Read a file as UTF-8 text
    fn read_text(&self, path: &str) -> impl Future<Output = Result<String, LutError>> + Send;

    /// Read a file as raw bytes
    fn read_bytes(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, LutError>> + Send;
}

/// Reads from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl AssetReader for FsReader {
    async fn read_text(&self, path: &str) -> Result<String, LutError> {
        // Invalid UTF-8 surfaces as io::ErrorKind::InvalidData
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LutError::read(path, e))
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, LutError> {
        tokio::fs::read(path).await.map_err(|e| LutError::read(path, e))
    }
}

/// Load the LUT at `path` as `kind`
pub async fn load<R: AssetReader>(reader: &R, path: &str, kind: LutKind) -> Result<LutAsset, LutError> {
    let payload = match kind {
        LutKind::CubeText => LutPayload::Text(reader.read_text(path).await?),
        LutKind::HaldImage => {
            let bytes = reader.read_bytes(path).await?;
            LutPayload::DataUri(to_data_uri(&bytes, &image_subtype(path)))
        }
    };

    debug!("📦 Loaded {} LUT {} ({} bytes payload)", kind, path, payload.as_str().len());

    Ok(LutAsset {
        path: path.to_string(),
        payload,
    })
}

/// Read a photo into an image reference for a new editing session
pub async fn load_image<R: AssetReader>(reader: &R, path: &str) -> Result<ImageRef, LutError> {
    let bytes = reader.read_bytes(path).await?;
    let subtype = match image_subtype(path).as_str() {
        "jpg" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        other => other.to_string(),
    };
    Ok(ImageRef::new(to_data_uri(&bytes, &subtype)))
}

/// Wrap encoded image bytes as a data URI
pub fn to_data_uri(bytes: &[u8], subtype: &str) -> String {
    format!("data:image/{};base64,{}", subtype, general_purpose::STANDARD.encode(bytes))
}

/// Bytes behind a `data:...;base64,<data>` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let (_, encoded) = uri.split_once(',').ok_or("image data is not a data URI")?;
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64 image data: {}", e))
}
