//! HDR image loader
//!
//! Decodes a file with the `image` crate, converts it to linear f32 RGB and
//! runs it through the display curve. Radiance and OpenEXR data come out of
//! the decoder as unnormalized scene values; they are not rescaled, the
//! curve clips anything above 1.0.

use std::path::{Path, PathBuf};

use image::{ImageError, ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

use super::tonemap::tonemap;

/// Why an image could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

impl LoadError {
    /// Path of the file that failed to load
    pub fn path(&self) -> &Path {
        match self {
            LoadError::NotFound(path) => path,
            LoadError::Io { path, .. } | LoadError::Decode { path, .. } => path,
        }
    }
}

/// A decoded, tone-mapped image ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    path: PathBuf,
    pixels: RgbImage,
}

impl LoadedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Native pixel dimensions
    pub fn size(&self) -> iced::Size<u32> {
        iced::Size::new(self.width(), self.height())
    }

    /// Raw RGB8 samples, row-major
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Expand to RGBA8 with opaque alpha, the layout iced textures expect
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.as_raw().len() / 3 * 4);
        for pixel in self.pixels.pixels() {
            rgba.extend_from_slice(&pixel.0);
            rgba.push(u8::MAX);
        }
        rgba
    }
}

/// Decode and tone-map the image at `path`
///
/// The format is sniffed from the file contents (falling back to the
/// extension), so the open dialog's filter is only advisory.
pub fn load(path: &Path) -> Result<LoadedImage, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| LoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        color = ?decoded.color(),
        width = decoded.width(),
        height = decoded.height(),
        "decoded image"
    );

    let pixels = tonemap(&decoded.to_rgb32f());

    Ok(LoadedImage {
        path: path.to_path_buf(),
        pixels,
    })
}
