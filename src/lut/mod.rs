/// LUT selection and application module
///
/// This module handles:
/// - Scanning LUT folders into trees and looking paths up (tree.rs)
/// - Deciding how a LUT file is decoded (kind.rs)
/// - Reading LUT files into payloads (loader.rs)
/// - The LUT compute service (compute.rs)
/// - Orchestrating a LUT application on the working image (pipeline.rs)

pub mod compute;
pub mod kind;
pub mod loader;
pub mod pipeline;
pub mod tree;

pub use pipeline::ApplyPipeline;
