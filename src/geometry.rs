/// Pure 2D geometry for the viewer transform
///
/// Everything in this module is stateless and unit-testable without a
/// rendering surface. Native and displayed sizes are distinct types on
/// purpose: annotation coordinates arrive in native image space while the
/// screen transform operates in displayed space, and mixing the two is the
/// classic bug in this kind of viewer.

use cgmath::Vector2;

/// Size of an image in its original, full-resolution pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeSize {
    pub width: f32,
    pub height: f32,
}

impl NativeSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Dimensions of a decoded raster.
    pub fn of_raster(raster: &image::RgbaImage) -> Self {
        Self::new(raster.width() as f32, raster.height() as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Size of the on-screen surface an image is rendered into (scaled space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Axis-aligned rectangle, units depend on context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The user's crop rectangle, in displayed coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSelection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit a native image into a container of fixed height, preserving aspect.
///
/// Degenerate inputs (zero or negative container or source dimensions)
/// short-circuit to an empty size instead of producing NaN.
pub fn fit_to_height(container_height: f32, native: NativeSize) -> DisplaySize {
    if container_height <= 0.0 || native.is_empty() {
        return DisplaySize::new(0.0, 0.0);
    }
    let width = native.width * container_height / native.height;
    DisplaySize::new(width, container_height)
}

/// Clamp a pan increment against the valid range for the given zoom.
///
/// A pan value is valid when the zoomed image still covers the whole
/// surface, which works out to the symmetric range
/// `[-(extent - extent/zoom)/2, +(extent - extent/zoom)/2]`. A candidate
/// outside the range snaps to the nearest bound (rubber-band to the edge).
/// At zoom 1 the range collapses to exactly `{0}`.
pub fn clamp_pan(increment: f32, current: f32, extent: f32, zoom: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    let zoom = zoom.max(1.0);
    let half_range = (extent - extent / zoom) / 2.0;
    (current + increment).clamp(-half_range, half_range)
}

/// Offset at which to draw the image onto a surface already scaled by `zoom`.
///
/// Per axis: `-(center - center/zoom) + clamp_pan(0, pan, extent, zoom)`.
/// The first term recenters the image as zoom changes; the second applies
/// the current (re-validated) pan.
pub fn zoom_draw_offset(display: DisplaySize, pan: Vector2<f32>, zoom: f32) -> Vector2<f32> {
    let axis = |extent: f32, pan: f32| -> f32 {
        if extent <= 0.0 {
            return 0.0;
        }
        let zoom = zoom.max(1.0);
        let center = extent / 2.0;
        -(center - center / zoom) + clamp_pan(0.0, pan, extent, zoom)
    };
    Vector2::new(axis(display.width, pan.x), axis(display.height, pan.y))
}

/// Project a point from native image space into the zoomed coordinate space
/// by scaling its offset from the image center. Pan is applied by the caller
/// beforehand, in native units.
pub fn project_annotation(native: NativeSize, x: f32, y: f32, zoom: f32) -> Vector2<f32> {
    let zoom = zoom.max(1.0);
    let cx = native.width / 2.0;
    let cy = native.height / 2.0;
    Vector2::new(cx + (x - cx) * zoom, cy + (y - cy) * zoom)
}

/// The native-space window currently visible on the displayed surface.
///
/// Inverts the draw transform: screen pixel `s` sits at `s/zoom - offset`
/// within the fitted image, which then scales by native/displayed. The
/// result is clamped into the native bounds; with a clamped pan the window
/// never actually leaves them.
pub fn visible_source_rect(
    native: NativeSize,
    display: DisplaySize,
    pan: Vector2<f32>,
    zoom: f32,
) -> RectF {
    if native.is_empty() || display.is_empty() {
        return RectF { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
    }
    let zoom = zoom.max(1.0);
    let offset = zoom_draw_offset(display, pan, zoom);
    let axis = |extent: f32, native_extent: f32, offset: f32| -> (f32, f32) {
        let scale = native_extent / extent;
        let start = (-offset * scale).clamp(0.0, native_extent);
        let span = (extent / zoom * scale).min(native_extent - start);
        (start, span)
    };
    let (x, width) = axis(display.width, native.width, offset.x);
    let (y, height) = axis(display.height, native.height, offset.y);
    RectF { x, y, width, height }
}

/// Height of the fixed-aspect crop bar for a given surface width.
pub fn crop_height(surface_width: f32, aspect: f32) -> f32 {
    surface_width * aspect
}

/// Maximum vertical offset of the crop bar from the surface center.
pub fn crop_offset_limit(surface_height: f32, crop_height: f32) -> f32 {
    ((surface_height - crop_height) / 2.0).max(0.0)
}

/// Whether the crop bar's bottom edge sits within `threshold` of the surface
/// bottom. The toolbar relocates to the top of the screen while this holds so
/// it does not overlap the active selection.
pub fn crop_near_bottom(
    surface_height: f32,
    crop_height: f32,
    offset: f32,
    threshold: f32,
) -> bool {
    let bottom = surface_height / 2.0 + offset + crop_height / 2.0;
    surface_height - bottom < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let native = NativeSize::new(1600.0, 1200.0);
        let fitted = fit_to_height(600.0, native);
        assert!(close(fitted.height, 600.0));
        assert!(close(
            fitted.width / fitted.height,
            native.width / native.height
        ));
    }

    #[test]
    fn fit_degenerate_inputs_are_empty() {
        assert_eq!(
            fit_to_height(0.0, NativeSize::new(100.0, 100.0)),
            DisplaySize::new(0.0, 0.0)
        );
        assert_eq!(
            fit_to_height(600.0, NativeSize::new(100.0, 0.0)),
            DisplaySize::new(0.0, 0.0)
        );
    }

    #[test]
    fn identity_zoom_has_zero_valid_pan_range() {
        for pan in [-500.0, -1.0, 0.0, 3.0, 1e6] {
            for increment in [-50.0, 0.0, 50.0] {
                assert_eq!(clamp_pan(increment, pan, 400.0, 1.0), 0.0);
            }
        }
    }

    #[test]
    fn clamp_pan_is_idempotent() {
        let extent = 400.0;
        for zoom in [1.0, 1.5, 2.0, 2.5] {
            let mut pan = 0.0;
            for increment in [30.0, 200.0, -15.0, -900.0, 77.0] {
                pan = clamp_pan(increment, pan, extent, zoom);
                // An already-clamped value is a fixed point.
                assert!(close(clamp_pan(0.0, pan, extent, zoom), pan));
            }
        }
    }

    #[test]
    fn clamp_pan_snaps_to_nearest_bound() {
        // At zoom 2 over a 400px extent the valid range is [-100, 100].
        assert!(close(clamp_pan(500.0, 0.0, 400.0, 2.0), 100.0));
        assert!(close(clamp_pan(-500.0, 0.0, 400.0, 2.0), -100.0));
        assert!(close(clamp_pan(30.0, 50.0, 400.0, 2.0), 80.0));
    }

    #[test]
    fn zoom_in_pan_zoom_out_forces_pan_home() {
        let display = DisplaySize::new(400.0, 300.0);
        let mut zoom = 1.0;
        let mut pan = Vector2::new(0.0, 0.0);

        // Zoom to 2: pan re-clamps and stays at the origin.
        zoom = 2.0;
        pan.x = clamp_pan(0.0, pan.x, display.width, zoom);
        pan.y = clamp_pan(0.0, pan.y, display.height, zoom);
        assert_eq!((pan.x, pan.y), (0.0, 0.0));

        // Pan right by 50px, well inside the valid range.
        pan.x = clamp_pan(50.0, pan.x, display.width, zoom);
        assert!(close(pan.x, 50.0));

        // Zoom back to 1: the only valid pan is (0, 0).
        zoom = 1.0;
        pan.x = clamp_pan(0.0, pan.x, display.width, zoom);
        pan.y = clamp_pan(0.0, pan.y, display.height, zoom);
        assert_eq!((pan.x, pan.y), (0.0, 0.0));
    }

    #[test]
    fn draw_offset_at_identity_is_origin() {
        let offset = zoom_draw_offset(
            DisplaySize::new(400.0, 300.0),
            Vector2::new(0.0, 0.0),
            1.0,
        );
        assert!(close(offset.x, 0.0));
        assert!(close(offset.y, 0.0));
    }

    #[test]
    fn draw_offset_recenters_under_zoom() {
        // Zoom 2 over 400px: center offset is -(200 - 100) = -100.
        let offset = zoom_draw_offset(
            DisplaySize::new(400.0, 300.0),
            Vector2::new(0.0, 0.0),
            2.0,
        );
        assert!(close(offset.x, -100.0));
        assert!(close(offset.y, -75.0));
    }

    #[test]
    fn projection_scales_offset_from_center() {
        let native = NativeSize::new(200.0, 100.0);
        let center = project_annotation(native, 100.0, 50.0, 2.0);
        assert!(close(center.x, 100.0) && close(center.y, 50.0));

        let p = project_annotation(native, 150.0, 75.0, 2.0);
        assert!(close(p.x, 200.0) && close(p.y, 100.0));
    }

    #[test]
    fn visible_rect_at_identity_is_full_image() {
        let native = NativeSize::new(800.0, 600.0);
        let display = DisplaySize::new(400.0, 300.0);
        let rect = visible_source_rect(native, display, Vector2::new(0.0, 0.0), 1.0);
        assert!(close(rect.x, 0.0) && close(rect.y, 0.0));
        assert!(close(rect.width, 800.0) && close(rect.height, 600.0));
    }

    #[test]
    fn visible_rect_halves_under_double_zoom() {
        let native = NativeSize::new(800.0, 600.0);
        let display = DisplaySize::new(400.0, 300.0);
        let rect = visible_source_rect(native, display, Vector2::new(0.0, 0.0), 2.0);
        // Centered window of half the native extent.
        assert!(close(rect.x, 200.0) && close(rect.y, 150.0));
        assert!(close(rect.width, 400.0) && close(rect.height, 300.0));
    }

    #[test]
    fn visible_rect_follows_pan() {
        let native = NativeSize::new(800.0, 600.0);
        let display = DisplaySize::new(400.0, 300.0);
        // Positive pan moves the image right, revealing content to the left.
        let rect = visible_source_rect(native, display, Vector2::new(100.0, 0.0), 2.0);
        assert!(close(rect.x, 0.0));
        assert!(close(rect.width, 400.0));
    }

    #[test]
    fn crop_bar_aspect_lock() {
        for width in [145.0, 430.0, 512.0, 977.5] {
            assert!(close(
                crop_height(width, 145.0 / 430.0),
                width * (145.0 / 430.0)
            ));
        }
    }

    #[test]
    fn crop_offset_limit_never_negative() {
        assert!(close(crop_offset_limit(600.0, 200.0), 200.0));
        assert_eq!(crop_offset_limit(100.0, 300.0), 0.0);
    }

    #[test]
    fn crop_near_bottom_threshold() {
        // Surface 600, bar 200: bottom edge is at 400 + offset.
        assert!(!crop_near_bottom(600.0, 200.0, 0.0, 75.0));
        assert!(crop_near_bottom(600.0, 200.0, 130.0, 75.0));
        assert!(!crop_near_bottom(600.0, 200.0, 125.0, 75.0));
    }
}
