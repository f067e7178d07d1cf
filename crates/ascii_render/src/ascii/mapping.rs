use image::RgbaImage;

use super::{
    alphabet::GlyphAlphabet,
    grid::{GlyphCell, GlyphGrid},
};
use crate::image_pipeline::adjust;
use crate::image_pipeline::resize::{self, TargetGeometry};
use crate::AsciiError;

/// Cells with alpha above this value are painted.
pub const DEFAULT_OPACITY_THRESHOLD: u8 = 128;

/// Glyph width / height ratio of a typical monospace cell.
pub const DEFAULT_FONT_ASPECT: f32 = 0.55;

/// Maps a color frame to a grid of glyph cells.
#[derive(Clone, Debug)]
pub struct GlyphRasterizer {
    alphabet: GlyphAlphabet,
    columns: u32,
    font_aspect: f32,
    opacity_threshold: u8,
}

impl GlyphRasterizer {
    pub fn new(alphabet: GlyphAlphabet, columns: u32) -> Self {
        Self {
            alphabet,
            columns,
            font_aspect: DEFAULT_FONT_ASPECT,
            opacity_threshold: DEFAULT_OPACITY_THRESHOLD,
        }
    }

    pub fn with_font_aspect(mut self, font_aspect: f32) -> Self {
        self.font_aspect = font_aspect;
        self
    }

    pub fn with_opacity_threshold(mut self, threshold: u8) -> Self {
        self.opacity_threshold = threshold;
        self
    }

    pub fn alphabet(&self) -> &GlyphAlphabet {
        &self.alphabet
    }

    pub fn geometry(&self, frame: &RgbaImage) -> Result<TargetGeometry, AsciiError> {
        if !(self.font_aspect.is_finite() && self.font_aspect > 0.0) {
            return Err(AsciiError::InvalidDimension);
        }

        let (width, height) = frame.dimensions();
        TargetGeometry::for_columns(width, height, self.columns, self.font_aspect)
            .ok_or(AsciiError::InvalidDimension)
    }

    pub fn rasterize(&self, frame: &RgbaImage) -> Result<GlyphGrid, AsciiError> {
        let geometry = self.geometry(frame)?;
        let resampled = resize::resample(frame, geometry);

        let cells = resampled
            .pixels()
            .map(|pixel| {
                let [r, g, b, a] = pixel.0;
                let ch = self.alphabet.glyph_for(adjust::luminance(pixel));
                GlyphCell::new(ch, [r, g, b], a > self.opacity_threshold)
            })
            .collect();

        Ok(GlyphGrid::new(geometry.columns, geometry.rows, cells))
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn opaque_red_square() {
        let frame = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let alphabet = GlyphAlphabet::new(".#").unwrap();
        let grid = GlyphRasterizer::new(alphabet, 5).rasterize(&frame).unwrap();

        assert_eq!((grid.width, grid.height), (5, 3));
        for cell in &grid.cells {
            assert!(cell.opaque);
            assert_eq!(cell.ch, '.');
            assert_eq!(cell.color, [255, 0, 0]);
        }
    }

    #[test]
    fn bright_pixels_pick_last_glyph() {
        let frame = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let grid = GlyphRasterizer::new(GlyphAlphabet::default(), 4).rasterize(&frame).unwrap();
        assert!(grid.cells.iter().all(|cell| cell.ch == '@'));
    }

    #[test]
    fn opacity_follows_threshold() {
        let rasterizer = GlyphRasterizer::new(GlyphAlphabet::default(), 2);

        let at_threshold = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]));
        let grid = rasterizer.rasterize(&at_threshold).unwrap();
        assert!(grid.cells.iter().all(|cell| !cell.opaque));
        assert!(grid.cells.iter().all(|cell| cell.color == [0, 0, 255]));

        let above = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 129]));
        let grid = rasterizer.rasterize(&above).unwrap();
        assert!(grid.cells.iter().all(|cell| cell.opaque));

        let grid = rasterizer.with_opacity_threshold(200).rasterize(&above).unwrap();
        assert!(grid.cells.iter().all(|cell| !cell.opaque));
    }

    #[test]
    fn transparent_edge_keeps_glyph_color() {
        let frame = RgbaImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 0, 0, 255])
            }
        });
        let grid = GlyphRasterizer::new(GlyphAlphabet::default(), 4).rasterize(&frame).unwrap();

        let opaque: Vec<_> = grid.cells.iter().filter(|cell| cell.opaque).collect();
        assert!(!opaque.is_empty());
        assert!(opaque.iter().all(|cell| cell.color == [255, 0, 0]));
        assert!(grid.cells.iter().filter(|cell| !cell.opaque).count() > 0);
    }

    #[test]
    fn invalid_dimensions() {
        let frame = RgbaImage::new(0, 4);
        let rasterizer = GlyphRasterizer::new(GlyphAlphabet::default(), 4);
        assert!(matches!(rasterizer.rasterize(&frame), Err(AsciiError::InvalidDimension)));

        let frame = RgbaImage::new(4, 4);
        let rasterizer = GlyphRasterizer::new(GlyphAlphabet::default(), 0);
        assert!(matches!(rasterizer.rasterize(&frame), Err(AsciiError::InvalidDimension)));
    }
}
