/// HDR image pipeline
///
/// - Decoding Radiance / OpenEXR files (loader.rs)
/// - Gamma compression to 8-bit RGB (tonemap.rs)

pub mod loader;
pub mod tonemap;

pub use loader::{load, LoadError, LoadedImage};
