/// Offscreen compositing for crop export
///
/// Merges the displayed image layer and the native-resolution annotation
/// overlay into one raster, restricted to the crop selection, and encodes
/// it as a standalone PNG. The whole pipeline is CPU-bound and runs on a
/// blocking task; completion is reported back as a message.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::collections::HashSet;
use std::io::Cursor;
use tokio::task;

use crate::geometry::{self, CropSelection, DisplaySize, NativeSize};
use crate::state::data::Annotation;
use crate::state::viewer::Transform;
use super::{labels, RasterError};

/// Render the displayed image layer offscreen: the native window currently
/// on screen, resized to the displayed surface, inversion filter applied
/// when active. Matches what the image canvas presents.
pub fn render_view(
    native_pixels: &RgbaImage,
    display: DisplaySize,
    transform: &Transform,
    invert: bool,
) -> RgbaImage {
    let native = NativeSize::of_raster(native_pixels);
    let out_width = display.width.round() as u32;
    let out_height = display.height.round() as u32;
    if native.is_empty() || out_width == 0 || out_height == 0 {
        return RgbaImage::new(out_width, out_height);
    }

    let window =
        geometry::visible_source_rect(native, display, transform.pan, transform.zoom);
    let x = (window.x.round() as u32).min(native_pixels.width().saturating_sub(1));
    let y = (window.y.round() as u32).min(native_pixels.height().saturating_sub(1));
    let width = (window.width.round() as u32)
        .clamp(1, native_pixels.width() - x);
    let height = (window.height.round() as u32)
        .clamp(1, native_pixels.height() - y);

    let cropped = imageops::crop_imm(native_pixels, x, y, width, height).to_image();
    let mut view = imageops::resize(&cropped, out_width, out_height, FilterType::Lanczos3);
    if invert {
        imageops::invert(&mut view);
    }
    view
}

/// Render the annotation overlay at native resolution: labels whose identity
/// is visible, pan converted to native units per axis, positions projected
/// through the zoom transform, text burned in with a drop shadow.
pub fn render_overlay(
    native: NativeSize,
    annotations: &[Annotation],
    visible: &HashSet<String>,
    display: DisplaySize,
    transform: &Transform,
) -> RgbaImage {
    let mut overlay = RgbaImage::new(native.width as u32, native.height as u32);
    if native.is_empty() || display.is_empty() {
        return overlay;
    }

    let pan_native_x = transform.pan.x * native.width / display.width;
    let pan_native_y = transform.pan.y * native.height / display.height;
    let px_height = native.height * labels::LABEL_HEIGHT_RATIO;

    for annotation in annotations {
        if !visible.contains(&annotation.identity) {
            continue;
        }
        let (x, y) = annotation.position();
        let projected = geometry::project_annotation(
            native,
            x + pan_native_x,
            y + pan_native_y,
            transform.zoom,
        );
        labels::draw_label(&mut overlay, projected.x, projected.y, &annotation.label, px_height);
    }
    overlay
}

/// Merge the two layers inside the crop selection.
///
/// The image layer is copied 1:1; the overlay is copied from the
/// proportionally-scaled sub-rectangle (overlay size / displayed size per
/// axis) so labels land in registration with the image beneath them.
pub fn compose(
    image_layer: &RgbaImage,
    overlay: Option<&RgbaImage>,
    selection: &CropSelection,
) -> Result<RgbaImage, RasterError> {
    let (layer_width, layer_height) = image_layer.dimensions();
    if layer_width == 0 || layer_height == 0 {
        return Err(RasterError::EmptySelection);
    }

    let x = (selection.x.round().max(0.0) as u32).min(layer_width - 1);
    let y = (selection.y.round().max(0.0) as u32).min(layer_height - 1);
    let width = (selection.width.round() as u32).min(layer_width - x);
    let height = (selection.height.round() as u32).min(layer_height - y);
    if width == 0 || height == 0 {
        return Err(RasterError::EmptySelection);
    }

    let mut out = imageops::crop_imm(image_layer, x, y, width, height).to_image();

    if let Some(overlay) = overlay {
        let (overlay_width, overlay_height) = overlay.dimensions();
        if overlay_width > 0 && overlay_height > 0 {
            let ratio_x = overlay_width as f32 / layer_width as f32;
            let ratio_y = overlay_height as f32 / layer_height as f32;
            let src_x = ((x as f32 * ratio_x).round() as u32).min(overlay_width - 1);
            let src_y = ((y as f32 * ratio_y).round() as u32).min(overlay_height - 1);
            let src_width = ((width as f32 * ratio_x).round() as u32)
                .clamp(1, overlay_width - src_x);
            let src_height = ((height as f32 * ratio_y).round() as u32)
                .clamp(1, overlay_height - src_y);

            let cropped =
                imageops::crop_imm(overlay, src_x, src_y, src_width, src_height).to_image();
            // Nearest keeps the glyph edges crisp when the overlay scales.
            let scaled = imageops::resize(&cropped, width, height, FilterType::Nearest);
            imageops::overlay(&mut out, &scaled, 0, 0);
        }
    }

    Ok(out)
}

/// Encode a raster as an in-memory PNG byte buffer.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, RasterError> {
    let mut cursor = Cursor::new(Vec::new());
    raster.write_to(&mut cursor, image::ImageFormat::Png)?;
    Ok(cursor.into_inner())
}

/// Everything the export pipeline needs, cloned out of the UI state so the
/// blocking task owns its inputs.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub pixels: RgbaImage,
    pub annotations: Vec<Annotation>,
    pub visible_identities: HashSet<String>,
    pub display: DisplaySize,
    pub transform: Transform,
    pub invert: bool,
    pub labels_visible: bool,
    pub selection: CropSelection,
}

/// Composite the current view restricted to the crop selection and encode
/// it. Encoding failures resolve the future with an error instead of going
/// silent, so callers never need their own timeout.
pub async fn export_selection(job: ExportJob) -> Result<Vec<u8>, String> {
    task::spawn_blocking(move || run_export(job).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("task join error: {}", e))?
}

fn run_export(job: ExportJob) -> Result<Vec<u8>, RasterError> {
    let view = render_view(&job.pixels, job.display, &job.transform, job.invert);
    let overlay = if job.labels_visible {
        Some(render_overlay(
            NativeSize::of_raster(&job.pixels),
            &job.annotations,
            &job.visible_identities,
            job.display,
            &job.transform,
        ))
    } else {
        None
    };
    let merged = compose(&view, overlay.as_ref(), &job.selection)?;
    encode_png(&merged)
}
