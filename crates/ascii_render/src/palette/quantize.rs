use color_quant::NeuQuant;
use image::RgbaImage;

use super::{IndexUsage, Palette, PALETTE_SIZE};

/// NeuQuant sampling factor; 1 is slowest and best, 30 fastest.
const SAMPLE_FACTOR: i32 = 10;

/// A palette and the pixel indices into it, moved through each remapping step by value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quantized {
    pub palette: Palette,
    pub indices: Vec<u8>,
}

impl Quantized {
    pub fn usage(&self) -> IndexUsage {
        IndexUsage::of(&self.indices)
    }

    /// Rewrites every pixel at `from` to `to`.
    pub fn remap(&mut self, from: u8, to: u8) {
        for index in self.indices.iter_mut().filter(|index| **index == from) {
            *index = to;
        }
    }
}

/// Adaptive 256-color quantization. Only palette slots referenced by a pixel are kept.
pub fn quantize(frame: &RgbaImage) -> Quantized {
    let pixels = frame.as_raw();
    if pixels.is_empty() {
        return Quantized { palette: Palette::new(), indices: Vec::new() };
    }

    let quant = NeuQuant::new(SAMPLE_FACTOR, PALETTE_SIZE, pixels);
    let indices: Vec<u8> =
        pixels.chunks_exact(4).map(|pixel| quant.index_of(pixel) as u8).collect();

    let mut palette = Palette::from_rgb(&quant.color_map_rgb());
    palette.retain(&IndexUsage::of(&indices));

    Quantized { palette, indices }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn every_pixel_references_a_populated_slot() {
        let frame = RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([250, 10, 10, 255])
            } else {
                Rgba([10, 10, 250, 255])
            }
        });
        let quantized = quantize(&frame);

        assert_eq!(quantized.indices.len(), 256);
        for &index in &quantized.indices {
            assert!(quantized.palette.get(index).is_some());
        }
        assert_eq!(quantized.palette.iter().count(), quantized.usage().count());
    }

    #[test]
    fn empty_frame_has_empty_palette() {
        let quantized = quantize(&RgbaImage::new(0, 0));
        assert!(quantized.indices.is_empty());
        assert_eq!(quantized.palette.iter().count(), 0);
    }

    #[test]
    fn remap_moves_only_matching_pixels() {
        let mut quantized = Quantized { palette: Palette::new(), indices: vec![0, 1, 0, 2] };
        quantized.remap(0, 5);
        assert_eq!(quantized.indices, vec![5, 1, 5, 2]);
    }
}
