/// Raster processing module
///
/// CPU-side raster work, kept off the UI thread:
/// - Async bitmap loading with decode on a blocking task (loader.rs)
/// - Offscreen compositing and PNG encoding for export (compositor.rs)
/// - Bitmap-glyph label drawing for the exported overlay (labels.rs)

pub mod compositor;
pub mod labels;
pub mod loader;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("crop selection is empty")]
    EmptySelection,
}
