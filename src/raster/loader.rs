/// Diagnostic bitmap loader
///
/// Loads and decodes an image off the UI thread. Decoding is CPU-bound, so
/// it runs on a blocking task; the file read itself goes through tokio. The
/// caller tags each request with the image UUID it was issued for and drops
/// results that resolve after the active image changed.

use image::RgbaImage;
use std::path::PathBuf;
use tokio::task;

use super::RasterError;

/// A decoded bitmap ready for display and compositing.
#[derive(Debug, Clone)]
pub struct LoadedBitmap {
    pub pixels: RgbaImage,
}

/// Load and decode the bitmap at `path`.
///
/// Errors are stringified here because the result crosses the message
/// boundary into the UI loop.
pub async fn load_bitmap(path: PathBuf) -> Result<LoadedBitmap, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    task::spawn_blocking(move || decode_bitmap(&bytes).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("task join error: {}", e))?
}

fn decode_bitmap(bytes: &[u8]) -> Result<LoadedBitmap, RasterError> {
    let pixels = image::load_from_memory(bytes)?.to_rgba8();
    Ok(LoadedBitmap { pixels })
}

/// Neutral stand-in raster for the placeholder load-failure policy: a dark
/// checker so a substituted surface is visibly not a real capture.
pub fn placeholder() -> LoadedBitmap {
    const SIZE: u32 = 16;
    let pixels = RgbaImage::from_fn(640, 480, |x, y| {
        if (x / SIZE + y / SIZE) % 2 == 0 {
            image::Rgba([38, 38, 38, 255])
        } else {
            image::Rgba([52, 52, 52, 255])
        }
    });
    LoadedBitmap { pixels }
}

/// Color-inverted copy of a bitmap for the invert-filter toggle. Alpha is
/// untouched.
pub fn inverted_copy(pixels: &RgbaImage) -> RgbaImage {
    let mut inverted = pixels.clone();
    image::imageops::invert(&mut inverted);
    inverted
}
