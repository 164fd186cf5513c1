/// Error types for the LUT panel
///
/// Every failure the panel can hit while scanning folders, reading LUT
/// assets, or calling the compute service ends up here. None of them are
/// fatal to the process: the GUI turns each one into a single status
/// notification via [`LutError::user_message`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LutError {
    /// Folder scan failed (fully or for some sub-path)
    #[error("could not scan '{path}': {detail}")]
    Enumeration { path: String, detail: String },

    /// LUT asset could not be read (or was not valid text for a cube LUT)
    #[error("could not read '{path}': {detail}")]
    Read { path: String, detail: String },

    /// The LUT compute service rejected the request
    #[error("LUT application failed: {0}")]
    Compute(String),

    /// Path is not part of the current folder tree snapshot
    #[error("'{0}' is not in the current folder tree")]
    NotFound(String),

    #[error("catalog error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("settings error: {0}")]
    Config(String),
}

/// Errors surfaced by the apply pipeline share the same taxonomy
pub type PipelineError = LutError;

impl LutError {
    pub fn read(path: impl Into<String>, detail: impl ToString) -> Self {
        LutError::Read {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn enumeration(path: impl Into<String>, detail: impl ToString) -> Self {
        LutError::Enumeration {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn compute(detail: impl ToString) -> Self {
        LutError::Compute(detail.to_string())
    }

    /// Text shown to the user in the status line
    pub fn user_message(&self) -> String {
        match self {
            LutError::Enumeration { .. } => {
                format!("⚠️  {}. Some sub-folders might be inaccessible.", self)
            }
            LutError::Read { .. } => format!("❌ Could not load LUT: {}", self),
            LutError::Compute(detail) => {
                format!("❌ An error occurred while applying the LUT: {}", detail)
            }
            LutError::NotFound(_) => format!("⚠️  {}", self),
            LutError::Database(_) | LutError::Config(_) => format!("⚠️  {}", self),
        }
    }

    /// Whether the error aborted the user's action (as opposed to a warning)
    pub fn is_user_fatal(&self) -> bool {
        !matches!(self, LutError::NotFound(_) | LutError::Enumeration { .. })
    }
}
