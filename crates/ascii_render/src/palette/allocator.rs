use image::RgbaImage;
use rand::RngCore;

use super::{quantize, IndexUsage, IndexedFrame, Palette, Quantized, TRANSPARENT_INDEX};

/// Where the opaque pixels of slot 0 were moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotChoice {
    pub index: u8,
    /// The target slot already held another color, so the moved pixels lost their own.
    pub merged: bool,
}

/// Converts RGBA frames into palette-indexed frames with a collision-free transparent slot 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransparentIndexAllocator {
    alpha_threshold: u8,
}

impl TransparentIndexAllocator {
    /// Pixels with alpha at or below `alpha_threshold` become transparent.
    pub fn new(alpha_threshold: u8) -> Self {
        Self { alpha_threshold }
    }

    pub fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    pub fn allocate(&self, frame: &RgbaImage) -> IndexedFrame {
        self.allocate_with_rng(frame, &mut rand::thread_rng())
    }

    pub fn allocate_with_rng<R: RngCore + ?Sized>(
        &self,
        frame: &RgbaImage,
        rng: &mut R,
    ) -> IndexedFrame {
        let mask = self.transparency_mask(frame);
        let (quantized, _) = reserve_transparent_slot(quantize(frame), &mask, rng);
        IndexedFrame::new(frame.width(), frame.height(), quantized.indices, quantized.palette)
    }

    pub fn transparency_mask(&self, frame: &RgbaImage) -> Vec<bool> {
        frame.pixels().map(|pixel| pixel.0[3] <= self.alpha_threshold).collect()
    }
}

/// Empties slot 0, forces every masked pixel onto it and keys it with a color unused by any
/// other slot.
pub fn reserve_transparent_slot<R: RngCore + ?Sized>(
    quantized: Quantized,
    mask: &[bool],
    rng: &mut R,
) -> (Quantized, Option<SlotChoice>) {
    let (mut quantized, choice) = vacate_slot_zero(quantized);

    let key = unique_color(&quantized.palette, rng);
    quantized.palette.set(TRANSPARENT_INDEX, key);

    for (index, _) in quantized.indices.iter_mut().zip(mask).filter(|(_, masked)| **masked) {
        *index = TRANSPARENT_INDEX;
    }

    (quantized, choice)
}

/// Moves pixels off slot 0. Returns `None` when nothing referenced it.
pub fn vacate_slot_zero(mut quantized: Quantized) -> (Quantized, Option<SlotChoice>) {
    let usage = quantized.usage();
    if !usage.contains(TRANSPARENT_INDEX) {
        return (quantized, None);
    }

    let Some(choice) = choose_slot(&quantized.palette, &usage) else {
        return (quantized, None);
    };

    quantized.remap(TRANSPARENT_INDEX, choice.index);
    let color = quantized.palette.take(TRANSPARENT_INDEX);
    if !choice.merged {
        if let Some(color) = color {
            quantized.palette.set(choice.index, color);
        }
    }

    (quantized, Some(choice))
}

/// Lowest free non-zero slot, otherwise the used slot closest in color to slot 0.
pub fn choose_slot(palette: &Palette, usage: &IndexUsage) -> Option<SlotChoice> {
    if let Some(index) = (1..=u8::MAX).find(|&index| !usage.contains(index)) {
        return Some(SlotChoice { index, merged: false });
    }

    let target = palette.color(TRANSPARENT_INDEX);
    let candidates = usage.iter().filter(|&index| index != TRANSPARENT_INDEX);
    nearest_index(palette, candidates, target).map(|index| SlotChoice { index, merged: true })
}

/// Candidate with the smallest sum of absolute channel differences to `target`. Ties go to
/// the lowest index.
pub fn nearest_index(
    palette: &Palette,
    candidates: impl IntoIterator<Item = u8>,
    target: [u8; 3],
) -> Option<u8> {
    let mut candidates: Vec<u8> = candidates.into_iter().collect();
    candidates.sort_unstable();
    candidates.into_iter().min_by_key(|&index| color_distance(palette.color(index), target))
}

/// Random 24-bit color not present anywhere in `palette`.
pub fn unique_color<R: RngCore + ?Sized>(palette: &Palette, rng: &mut R) -> [u8; 3] {
    loop {
        let bits = rng.next_u32();
        let color = [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8];
        if !palette.contains_color(color) {
            return color;
        }
    }
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter().zip(b).map(|(&x, y)| u32::from(x.abs_diff(y))).sum()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::palette::PALETTE_SIZE;

    /// Replays a fixed sequence of words.
    struct ScriptedRng {
        words: VecDeque<u32>,
        drawn: usize,
    }

    impl ScriptedRng {
        fn new(words: &[u32]) -> Self {
            Self { words: words.iter().copied().collect(), drawn: 0 }
        }
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            self.drawn += 1;
            self.words.pop_front().expect("script exhausted")
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(4) {
                let word = self.next_u32().to_le_bytes();
                chunk.copy_from_slice(&word[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn gray_palette() -> Palette {
        let mut palette = Palette::new();
        for index in 0..=u8::MAX {
            palette.set(index, [index; 3]);
        }
        palette
    }

    fn full_frame() -> Vec<u8> {
        (0..=u8::MAX).chain([0, 0, 7]).collect()
    }

    #[test]
    fn free_slot_is_preferred() {
        let palette = gray_palette();
        let choice = choose_slot(&palette, &IndexUsage::of(&[0, 1, 2, 4]));
        assert_eq!(choice, Some(SlotChoice { index: 3, merged: false }));
    }

    #[test]
    fn vacating_moves_color_to_free_slot() {
        let mut palette = Palette::new();
        palette.set(0, [10, 20, 30]);
        palette.set(1, [40, 50, 60]);
        let quantized = Quantized { palette, indices: vec![0, 1, 0, 1] };

        let (quantized, choice) = vacate_slot_zero(quantized);

        assert_eq!(choice, Some(SlotChoice { index: 2, merged: false }));
        assert_eq!(quantized.indices, vec![2, 1, 2, 1]);
        assert_eq!(quantized.palette.get(0), None);
        assert_eq!(quantized.palette.get(2), Some([10, 20, 30]));
    }

    #[test]
    fn unused_slot_zero_is_left_alone() {
        let mut palette = Palette::new();
        palette.set(0, [1, 1, 1]);
        palette.set(3, [3, 3, 3]);
        let quantized = Quantized { palette, indices: vec![3, 3] };

        let (quantized, choice) = vacate_slot_zero(quantized.clone());
        assert_eq!(choice, None);
        assert_eq!(quantized.indices, vec![3, 3]);
    }

    #[test]
    fn full_palette_merges_into_nearest_color() {
        let mut palette = gray_palette();
        palette.set(0, [60, 61, 60]);
        let original = palette.color(0);
        let quantized = Quantized { palette, indices: full_frame() };

        let (quantized, choice) = vacate_slot_zero(quantized);
        let choice = choice.unwrap();

        assert_eq!(choice, SlotChoice { index: 60, merged: true });
        assert_eq!(quantized.indices[0], 60);
        assert_eq!(&quantized.indices[256..], &[60, 60, 7]);
        assert_eq!(quantized.palette.get(60), Some([60, 60, 60]));

        let chosen = color_distance(original, quantized.palette.color(choice.index));
        for index in 1..=u8::MAX {
            assert!(color_distance(original, gray_palette().color(index)) >= chosen);
        }
    }

    #[test]
    fn merge_ties_pick_lowest_index() {
        let mut palette = gray_palette();
        palette.set(0, [10, 10, 10]);
        palette.set(10, [200, 0, 0]);
        let quantized = Quantized { palette, indices: full_frame() };

        let (quantized, choice) = vacate_slot_zero(quantized);
        assert_eq!(choice, Some(SlotChoice { index: 9, merged: true }));
        assert_eq!(quantized.indices[0], 9);
    }

    #[test]
    fn full_palette_still_reserves_transparent_slot() {
        let mask: Vec<bool> = (0..259).map(|i| i == 5).collect();
        let quantized = Quantized { palette: gray_palette(), indices: full_frame() };

        let (quantized, choice) =
            reserve_transparent_slot(quantized, &mask, &mut StdRng::seed_from_u64(7));

        assert!(choice.unwrap().merged);
        assert_eq!(quantized.indices[5], TRANSPARENT_INDEX);
        let key = quantized.palette.color(TRANSPARENT_INDEX);
        for (position, &index) in quantized.indices.iter().enumerate() {
            if !mask[position] {
                assert_ne!(index, TRANSPARENT_INDEX);
                assert_ne!(quantized.palette.color(index), key);
            }
        }
    }

    #[test]
    fn unique_color_accepts_first_free_draw() {
        let mut rng = ScriptedRng::new(&[0x00ab_cdef]);
        assert_eq!(unique_color(&gray_palette(), &mut rng), [0xab, 0xcd, 0xef]);
        assert_eq!(rng.drawn, 1);
    }

    #[test]
    fn unique_color_redraws_on_collision() {
        let mut rng = ScriptedRng::new(&[0x0009_0909, 0xff80_8080, 0x0012_3456]);
        assert_eq!(unique_color(&gray_palette(), &mut rng), [0x12, 0x34, 0x56]);
        assert_eq!(rng.drawn, 3);
    }

    #[test]
    fn fully_transparent_frame_maps_to_slot_zero() {
        let frame = RgbaImage::new(4, 4);
        let mut rng = StdRng::seed_from_u64(1);
        let indexed = TransparentIndexAllocator::default().allocate_with_rng(&frame, &mut rng);

        assert!(indexed.indices().iter().all(|&index| index == TRANSPARENT_INDEX));
        assert!(indexed.palette().get(TRANSPARENT_INDEX).is_some());
        assert_eq!(indexed.palette().to_rgb_bytes().len(), PALETTE_SIZE * 3);
    }

    #[test]
    fn opaque_pixels_never_share_the_key_color() {
        let frame = RgbaImage::from_fn(16, 8, |x, y| match (x + y) % 4 {
            0 => Rgba([0, 0, 0, 0]),
            1 => Rgba([255, 0, 0, 255]),
            2 => Rgba([0, 0, 0, 255]),
            _ => Rgba([30, 200, 90, 200]),
        });
        let allocator = TransparentIndexAllocator::default();
        let mask = allocator.transparency_mask(&frame);
        let indexed = allocator.allocate_with_rng(&frame, &mut StdRng::seed_from_u64(42));

        let key = indexed.palette().color(TRANSPARENT_INDEX);
        for (position, &index) in indexed.indices().iter().enumerate() {
            if mask[position] {
                assert_eq!(index, TRANSPARENT_INDEX);
            } else {
                assert_ne!(index, TRANSPARENT_INDEX);
                assert_ne!(indexed.palette().color(index), key);
            }
        }
        assert_eq!(indexed.transparency_mask(), mask);
    }

    #[test]
    fn reallocating_a_reconstruction_recovers_the_mask() {
        let frame = RgbaImage::from_fn(12, 12, |x, y| {
            if x < 4 || y > 9 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([(x * 20) as u8, (y * 20) as u8, 128, 255])
            }
        });
        let allocator = TransparentIndexAllocator::default();
        let mut rng = StdRng::seed_from_u64(3);

        let first = allocator.allocate_with_rng(&frame, &mut rng);
        let second = allocator.allocate_with_rng(&first.to_rgba(), &mut rng);

        assert_eq!(first.transparency_mask(), second.transparency_mask());
    }

    #[test]
    fn alpha_threshold_widens_the_mask() {
        let frame = RgbaImage::from_pixel(2, 2, Rgba([5, 5, 5, 40]));
        assert!(TransparentIndexAllocator::new(0).transparency_mask(&frame).iter().all(|m| !m));
        assert!(TransparentIndexAllocator::new(40).transparency_mask(&frame).iter().all(|m| *m));
    }
}
