/// Bitmap-glyph label drawing
///
/// The exported overlay needs label text burned into a raster, where the
/// canvas text renderer is unavailable. Glyphs come from the `font8x8`
/// const tables (8x8 monochrome), blitted with an integer scale factor so
/// the crate ships no font assets.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

/// Label height as a fraction of native image height. Keeping the size
/// relative means labels occupy the same visual share on every image,
/// regardless of capture resolution.
pub const LABEL_HEIGHT_RATIO: f32 = 0.03;

const GLYPH_SIZE: u32 = 8;

const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 200]);

/// Integer glyph scale for a requested pixel height.
pub fn glyph_scale(px_height: f32) -> u32 {
    ((px_height / GLYPH_SIZE as f32).round() as u32).max(1)
}

pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale
}

pub fn text_height(scale: u32) -> u32 {
    GLYPH_SIZE * scale
}

/// Blit `text` with its top-left corner at `(x, y)`, clipping at the raster
/// edges. Characters outside the basic table render as blanks.
pub fn draw_text(raster: &mut RgbaImage, x: i64, y: i64, text: &str, scale: u32, color: Rgba<u8>) {
    let mut pen_x = x;
    for ch in text.chars() {
        if let Some(glyph) = BASIC_FONTS.get(ch) {
            draw_glyph(raster, pen_x, y, &glyph, scale, color);
        }
        pen_x += (GLYPH_SIZE * scale) as i64;
    }
}

fn draw_glyph(raster: &mut RgbaImage, x: i64, y: i64, glyph: &[u8; 8], scale: u32, color: Rgba<u8>) {
    let (width, height) = raster.dimensions();
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..GLYPH_SIZE {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + (col * scale + dx) as i64;
                    let py = y + (row as u32 * scale + dy) as i64;
                    if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                        raster.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

/// Draw a label centered on `(cx, cy)` with a one-glyph-pixel drop shadow
/// for legibility against arbitrary image backgrounds.
pub fn draw_label(raster: &mut RgbaImage, cx: f32, cy: f32, text: &str, px_height: f32) {
    let scale = glyph_scale(px_height);
    let left = cx as i64 - text_width(text, scale) as i64 / 2;
    let top = cy as i64 - text_height(scale) as i64 / 2;
    draw_text(raster, left + scale as i64, top + scale as i64, text, scale, SHADOW_COLOR);
    draw_text(raster, left, top, text, scale, LABEL_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(raster: &RgbaImage) -> usize {
        raster.pixels().filter(|p| p.0[3] != 0).count()
    }

    #[test]
    fn glyph_scale_floors_at_one() {
        assert_eq!(glyph_scale(0.5), 1);
        assert_eq!(glyph_scale(8.0), 1);
        assert_eq!(glyph_scale(24.0), 3);
    }

    #[test]
    fn text_width_counts_characters() {
        assert_eq!(text_width("WBC", 2), 3 * 8 * 2);
    }

    #[test]
    fn draw_label_marks_pixels_around_anchor() {
        let mut raster = RgbaImage::new(64, 64);
        draw_label(&mut raster, 32.0, 32.0, "X", 8.0);
        assert!(lit_pixels(&raster) > 0);
        // Nothing lands in the far corner.
        assert_eq!(raster.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn drawing_clips_at_edges() {
        let mut raster = RgbaImage::new(8, 8);
        // Mostly off-surface; must not panic and may touch a few pixels.
        draw_label(&mut raster, 0.0, 0.0, "RBC", 16.0);
        draw_label(&mut raster, -100.0, -100.0, "RBC", 16.0);
    }
}
