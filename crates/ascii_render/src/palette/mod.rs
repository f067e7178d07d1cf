//! Palette-indexed frames with a reserved transparent slot.

mod allocator;
mod quantize;

use image::{Rgba, RgbaImage};

pub use allocator::{
    choose_slot, nearest_index, reserve_transparent_slot, unique_color, vacate_slot_zero,
    SlotChoice, TransparentIndexAllocator,
};
pub use quantize::{quantize, Quantized};

pub const PALETTE_SIZE: usize = 256;

/// Index reserved for fully transparent pixels in every emitted frame.
pub const TRANSPARENT_INDEX: u8 = 0;

/// Sparse 256-slot color table. Slots without a color are emitted as black.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: [Option<[u8; 3]>; PALETTE_SIZE],
}

impl Palette {
    pub fn new() -> Self {
        Self { entries: [None; PALETTE_SIZE] }
    }

    /// Builds a palette from packed RGB triples, one slot per triple.
    pub fn from_rgb(bytes: &[u8]) -> Self {
        let mut palette = Self::new();
        for (slot, rgb) in palette.entries.iter_mut().zip(bytes.chunks_exact(3)) {
            *slot = Some([rgb[0], rgb[1], rgb[2]]);
        }
        palette
    }

    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries[usize::from(index)]
    }

    /// Color emitted for `index`.
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.get(index).unwrap_or([0, 0, 0])
    }

    pub fn set(&mut self, index: u8, color: [u8; 3]) {
        self.entries[usize::from(index)] = Some(color);
    }

    pub fn take(&mut self, index: u8) -> Option<[u8; 3]> {
        self.entries[usize::from(index)].take()
    }

    pub fn contains_color(&self, color: [u8; 3]) -> bool {
        self.entries.iter().flatten().any(|&entry| entry == color)
    }

    /// Populated slots in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, [u8; 3])> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.map(|color| (index as u8, color)))
    }

    /// Drops every slot not marked in `used`.
    pub fn retain(&mut self, used: &IndexUsage) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if !used.contains(index as u8) {
                *entry = None;
            }
        }
    }

    /// All 256 slots as packed RGB bytes.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.entries.iter().flat_map(|entry| entry.unwrap_or([0, 0, 0])).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

/// Set of palette indices referenced by a pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexUsage {
    used: [bool; PALETTE_SIZE],
}

impl IndexUsage {
    pub fn of(indices: &[u8]) -> Self {
        let mut used = [false; PALETTE_SIZE];
        for &index in indices {
            used[usize::from(index)] = true;
        }
        Self { used }
    }

    pub fn contains(&self, index: u8) -> bool {
        self.used[usize::from(index)]
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.used.iter().enumerate().filter(|(_, used)| **used).map(|(index, _)| index as u8)
    }

    pub fn count(&self) -> usize {
        self.used.iter().filter(|used| **used).count()
    }
}

/// An 8-bit palette-indexed frame whose index 0 is transparent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFrame {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Palette,
}

impl IndexedFrame {
    pub(crate) fn new(width: u32, height: u32, indices: Vec<u8>, palette: Palette) -> Self {
        debug_assert_eq!(width as usize * height as usize, indices.len());
        Self { width, height, indices, palette }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        self.indices[y as usize * self.width as usize + x as usize]
    }

    pub fn transparency_mask(&self) -> Vec<bool> {
        self.indices.iter().map(|&index| index == TRANSPARENT_INDEX).collect()
    }

    /// True-color reconstruction: transparent pixels carry the key color with zero alpha.
    pub fn to_rgba(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (pixel, &index) in image.pixels_mut().zip(&self.indices) {
            let [r, g, b] = self.palette.color(index);
            let alpha = if index == TRANSPARENT_INDEX { 0 } else { 255 };
            *pixel = Rgba([r, g, b, alpha]);
        }
        image
    }
}
