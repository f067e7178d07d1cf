use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

/// Cell grid size derived from a source image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetGeometry {
    pub columns: u32,
    pub rows: u32,
    /// Glyph width / height ratio assumed when deriving `rows`.
    pub font_aspect: f32,
}

impl TargetGeometry {
    /// Fixes the column count and derives rows from the source aspect ratio, squashed by
    /// `font_aspect` since glyph cells are taller than wide.
    ///
    /// Returns `None` for zero-sized sources or zero columns.
    pub fn for_columns(
        source_width: u32,
        source_height: u32,
        columns: u32,
        font_aspect: f32,
    ) -> Option<Self> {
        if source_width == 0 || source_height == 0 || columns == 0 {
            return None;
        }

        let image_ratio = f64::from(source_height) / f64::from(source_width);
        let rows = (f64::from(columns) * image_ratio * f64::from(font_aspect)).round();
        let rows = (rows as u32).max(1);

        Some(Self { columns, rows, font_aspect })
    }
}

/// Anti-aliased resample of the frame to one pixel per cell.
///
/// Filtering runs on alpha-premultiplied color so transparent pixels do not bleed their
/// RGB into neighboring opaque cells.
pub fn resample(frame: &RgbaImage, geometry: TargetGeometry) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b, a] = frame.get_pixel(x, y).0.map(|channel| f32::from(channel) / 255.0);
        Rgba([r * a, g * a, b * a, a])
    });

    let resized =
        imageops::resize(&premultiplied, geometry.columns, geometry.rows, FilterType::Lanczos3);

    RgbaImage::from_fn(geometry.columns, geometry.rows, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([to_u8(r / a), to_u8(g / a), to_u8(b / a), to_u8(a)])
    })
}

fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
