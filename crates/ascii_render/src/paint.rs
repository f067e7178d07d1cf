use image::{Rgba, RgbaImage};

use crate::ascii::grid::GlyphGrid;
use crate::color::FillColor;
use crate::font::GlyphFont;
use crate::AsciiError;

pub const DEFAULT_CELL_WIDTH: u32 = 10;
pub const DEFAULT_CELL_HEIGHT: u32 = 20;

/// Paints glyph grids into RGBA bitmaps, one fixed-size cell per glyph.
#[derive(Clone, Debug)]
pub struct GlyphPainter {
    font: GlyphFont,
    fill: FillColor,
    cell_width: u32,
    cell_height: u32,
}

impl GlyphPainter {
    pub fn new(font: GlyphFont, fill: FillColor) -> Self {
        Self { font, fill, cell_width: DEFAULT_CELL_WIDTH, cell_height: DEFAULT_CELL_HEIGHT }
    }

    pub fn with_cell_size(mut self, cell_width: u32, cell_height: u32) -> Self {
        self.cell_width = cell_width;
        self.cell_height = cell_height;
        self
    }

    /// Transparent cells are never painted. Opaque cells get the fill rectangle, if any,
    /// then the glyph in the cell color.
    pub fn paint(&self, grid: &GlyphGrid) -> Result<RgbaImage, AsciiError> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(AsciiError::InvalidDimension);
        }

        let width = grid.width.checked_mul(self.cell_width).ok_or(AsciiError::InvalidDimension)?;
        let height =
            grid.height.checked_mul(self.cell_height).ok_or(AsciiError::InvalidDimension)?;
        let mut canvas = RgbaImage::new(width, height);

        for (column, row, cell) in grid.positioned().filter(|(_, _, cell)| cell.opaque) {
            let origin_x = column * self.cell_width;
            let origin_y = row * self.cell_height;

            if let Some([r, g, b]) = self.fill.rgb() {
                for y in origin_y..origin_y + self.cell_height {
                    for x in origin_x..origin_x + self.cell_width {
                        canvas.put_pixel(x, y, Rgba([r, g, b, 255]));
                    }
                }
            }

            self.font.draw(cell.ch, self.cell_width, self.cell_height, |x, y, coverage| {
                let pixel = canvas.get_pixel_mut(origin_x + x, origin_y + y);
                blend(pixel, cell.color, coverage);
            });
        }

        Ok(canvas)
    }
}

/// Source-over compositing of `color` at `coverage` onto `pixel`.
fn blend(pixel: &mut Rgba<u8>, color: [u8; 3], coverage: f32) {
    if coverage <= 0.0 {
        return;
    }

    let dst_alpha = f32::from(pixel.0[3]) / 255.0;
    let out_alpha = coverage + dst_alpha * (1.0 - coverage);
    for (channel, source) in pixel.0[..3].iter_mut().zip(color) {
        let mixed =
            f32::from(source) * coverage + f32::from(*channel) * dst_alpha * (1.0 - coverage);
        *channel = (mixed / out_alpha).round().clamp(0.0, 255.0) as u8;
    }
    pixel.0[3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
}
