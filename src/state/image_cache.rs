/// Non-destructive LUT state for the working image
///
/// This struct holds the two generations of the displayed image:
/// the pristine image captured before the first LUT of the session, and
/// the LUT-applied image currently shown. Every new LUT is applied to the
/// pristine image, so successive selections never stack color shifts.

use log::debug;

use super::data::ImageRef;

/// Where the cache sits in the Idle/Applied cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutState {
    /// No LUT applied, `working` is the pristine image
    Idle,
    /// A LUT is applied, the pristine image is held as backup
    Applied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStateCache {
    /// Currently displayed image
    working: ImageRef,
    /// Image captured right before the first LUT application.
    /// `Some` exactly when a LUT is active.
    pristine_backup: Option<ImageRef>,
}

impl ImageStateCache {
    /// Start a session on `image` in the Idle state
    pub fn new(image: ImageRef) -> Self {
        Self {
            working: image,
            pristine_backup: None,
        }
    }

    pub fn working(&self) -> &ImageRef {
        &self.working
    }

    pub fn pristine_backup(&self) -> Option<&ImageRef> {
        self.pristine_backup.as_ref()
    }

    /// True once a LUT has been applied and not yet cleared
    pub fn lut_active(&self) -> bool {
        self.pristine_backup.is_some()
    }

    pub fn state(&self) -> LutState {
        if self.lut_active() {
            LutState::Applied
        } else {
            LutState::Idle
        }
    }

    /// Return the image the next LUT must be applied to
    ///
    /// Idle: capture `working` as the pristine backup and return it.
    /// Applied: revert `working` to the backup and return that.
    pub fn prepare_base(&mut self) -> ImageRef {
        match &self.pristine_backup {
            None => {
                debug!("🎨 Capturing pristine image before first LUT");
                self.pristine_backup = Some(self.working.clone());
            }
            Some(pristine) => {
                debug!("↩️  Reverting to pristine image before re-applying");
                self.working = pristine.clone();
            }
        }
        self.working.clone()
    }

    /// Show the compute result. Backup and active flag are untouched.
    pub fn commit(&mut self, image: ImageRef) {
        self.working = image;
    }

    /// Forget the backup and go back to Idle, keeping `working` as-is
    pub fn reset(&mut self) {
        self.pristine_backup = None;
    }

    /// Put the pristine image back on screen and go back to Idle
    pub fn revert(&mut self) {
        if let Some(pristine) = self.pristine_backup.take() {
            self.working = pristine;
        }
    }
}
