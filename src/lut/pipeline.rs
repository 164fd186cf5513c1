/// LUT apply pipeline
///
/// Turns a selected LUT path into a compute request and keeps the working
/// image non-destructive:
///
/// 1. classify the path (cube text or Hald image)
/// 2. load the asset
/// 3. take the base image from the cache (pristine image, never a previous result)
/// 4. call the compute service
/// 5. commit the result
///
/// The image state is staged on a copy and only swapped in once the
/// compute service succeeds, so a failed read or compute leaves it exactly
/// as it was. The state lock is held for the whole request: concurrent
/// calls queue up behind the one in flight and never interleave.

use log::{info, warn};
use tokio::sync::Mutex;

use super::compute::LutCompute;
use super::kind::classify;
use super::loader::{load, AssetReader};
use crate::error::PipelineError;
use crate::state::data::ImageRef;
use crate::state::image_cache::{ImageStateCache, LutState};

pub struct ApplyPipeline<R, C> {
    reader: R,
    compute: C,
    cache: Mutex<ImageStateCache>,
}

impl<R: AssetReader, C: LutCompute> ApplyPipeline<R, C> {
    /// Start an editing session on `image`
    pub fn new(reader: R, compute: C, image: ImageRef) -> Self {
        Self {
            reader,
            compute,
            cache: Mutex::new(ImageStateCache::new(image)),
        }
    }

    /// Apply the LUT at `selected_path` to the pristine image and return the new preview
    pub async fn apply(&self, selected_path: &str) -> Result<ImageRef, PipelineError> {
        let kind = classify(selected_path);

        // Held until commit so two requests never interleave
        let mut cache = self.cache.lock().await;

        let asset = load(&self.reader, selected_path, kind).await.map_err(|e| {
            warn!("⚠️  Skipping LUT {}: {}", selected_path, e);
            e
        })?;

        let mut staged = cache.clone();
        let was = staged.state();
        let base = staged.prepare_base();

        let preview = self
            .compute
            .apply_lut(&base, &asset.payload, asset.kind())
            .await
            .map_err(|e| {
                warn!("⚠️  LUT {} failed, image left unchanged: {}", selected_path, e);
                e
            })?;

        staged.commit(preview.clone());
        *cache = staged;

        info!("✅ Applied {} LUT {} ({:?} -> {:?})", kind, asset.path, was, LutState::Applied);
        Ok(preview)
    }

    /// Currently displayed image
    pub async fn preview(&self) -> ImageRef {
        self.cache.lock().await.working().clone()
    }

    /// Copy of the image state (waits for an in-flight apply)
    pub async fn snapshot(&self) -> ImageStateCache {
        self.cache.lock().await.clone()
    }

    /// Drop the pristine backup, keeping the current preview as the new baseline
    pub async fn reset(&self) {
        self.cache.lock().await.reset();
        info!("🧹 LUT state reset, current preview kept");
    }

    /// Remove the LUT: show the pristine image again and go back to Idle
    pub async fn revert(&self) -> ImageRef {
        let mut cache = self.cache.lock().await;
        cache.revert();
        info!("↩️  LUT removed, showing original image");
        cache.working().clone()
    }

    /// Start a new editing session on another image
    pub async fn set_image(&self, image: ImageRef) {
        *self.cache.lock().await = ImageStateCache::new(image);
    }
}

impl<R, C> std::fmt::Debug for ApplyPipeline<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplyPipeline").finish_non_exhaustive()
    }
}
