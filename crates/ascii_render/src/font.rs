use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::AsciiError;

/// Pixel height used for TrueType glyphs when none is configured.
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

const BITMAP_SIZE: u32 = 8;

/// Font used to draw glyphs into cells.
#[derive(Clone, Default)]
pub enum GlyphFont {
    /// Built-in 8x8 bitmap font, scaled by whole pixels to fit the cell.
    #[default]
    Bitmap,
    TrueType { font: Arc<FontVec>, size: f32 },
}

impl GlyphFont {
    pub fn from_path(path: &Path, size: f32) -> Result<Self, AsciiError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes, size)
            .map_err(|_| AsciiError::InvalidFont(path.display().to_string()))
    }

    pub fn from_bytes(bytes: Vec<u8>, size: f32) -> Result<Self, AsciiError> {
        if !(size.is_finite() && size > 0.0) {
            return Err(AsciiError::InvalidFont(format!("font size {size}")));
        }

        let font = FontVec::try_from_vec(bytes)
            .map_err(|err| AsciiError::InvalidFont(err.to_string()))?;
        Ok(GlyphFont::TrueType { font: Arc::new(font), size })
    }

    /// Calls `plot(x, y, coverage)` for every covered pixel of `ch` inside a
    /// `cell_width`×`cell_height` cell. Pixels outside the cell are clipped.
    pub fn draw<F>(&self, ch: char, cell_width: u32, cell_height: u32, mut plot: F)
    where
        F: FnMut(u32, u32, f32),
    {
        let mut clipped = |x: i64, y: i64, coverage: f32| {
            if x >= 0 && y >= 0 && x < i64::from(cell_width) && y < i64::from(cell_height) {
                plot(x as u32, y as u32, coverage.clamp(0.0, 1.0));
            }
        };

        match self {
            GlyphFont::Bitmap => draw_bitmap(ch, cell_width, cell_height, &mut clipped),
            GlyphFont::TrueType { font, size } => draw_outline(font, *size, ch, &mut clipped),
        }
    }
}

impl fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlyphFont::Bitmap => f.write_str("Bitmap"),
            GlyphFont::TrueType { size, .. } => {
                f.debug_struct("TrueType").field("size", size).finish_non_exhaustive()
            },
        }
    }
}

fn draw_bitmap(ch: char, cell_width: u32, cell_height: u32, plot: &mut impl FnMut(i64, i64, f32)) {
    let Some(rows) = BASIC_FONTS.get(ch) else {
        return;
    };

    let scale_x = (cell_width / BITMAP_SIZE).max(1);
    let scale_y = (cell_height / BITMAP_SIZE).max(1);
    let origin_x = i64::from(cell_width.saturating_sub(BITMAP_SIZE * scale_x) / 2);
    let origin_y = i64::from(cell_height.saturating_sub(BITMAP_SIZE * scale_y) / 2);

    for (row, bits) in rows.iter().enumerate() {
        for column in (0..BITMAP_SIZE).filter(|column| bits & (1 << column) != 0) {
            for dy in 0..scale_y {
                for dx in 0..scale_x {
                    let x = origin_x + i64::from(column * scale_x + dx);
                    let y = origin_y + row as i64 * i64::from(scale_y) + i64::from(dy);
                    plot(x, y, 1.0);
                }
            }
        }
    }
}

fn draw_outline(font: &FontVec, size: f32, ch: char, plot: &mut impl FnMut(i64, i64, f32)) {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut glyph = scaled.scaled_glyph(ch);
    glyph.position = point(0.0, scaled.ascent());

    let Some(outlined) = font.outline_glyph(glyph) else {
        return;
    };

    let bounds = outlined.px_bounds();
    let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
    outlined.draw(|x, y, coverage| plot(left + i64::from(x), top + i64::from(y), coverage));
}
