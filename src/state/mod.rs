/// State management module
///
/// This module handles all application state, including:
/// - Shared data structures (data.rs)
/// - Non-destructive LUT image state (image_cache.rs)
/// - Folder trees and expanded folders shown by the UI (session.rs)
/// - The LUT folder catalog database (library.rs)

pub mod data;
pub mod image_cache;
pub mod library;
pub mod session;
