use std::fmt;
use std::str::FromStr;

use crate::AsciiError;

/// Glyphs used when no alphabet is configured, darkest luminance first.
pub const DEFAULT_GLYPHS: &str = ".:-=+*#%@";

/// Ordered glyph set indexed by luminance.
///
/// The first glyph is used for the darkest samples and the last one for the brightest. An
/// alphabet is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphAlphabet {
    chars: Vec<char>,
}

impl GlyphAlphabet {
    pub fn new(chars: impl AsRef<str>) -> Result<Self, AsciiError> {
        let chars: Vec<char> = chars.as_ref().chars().collect();
        if chars.is_empty() {
            return Err(AsciiError::EmptyAlphabet);
        }
        Ok(Self { chars })
    }

    fn from_static(chars: &'static str) -> Self {
        Self { chars: chars.chars().collect() }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Index of the glyph for an 8-bit luminance value: `⌊v · N / 256⌋`.
    pub fn index_for(&self, luminance: u8) -> usize {
        usize::from(luminance) * self.chars.len() / 256
    }

    pub fn glyph_for(&self, luminance: u8) -> char {
        self.chars[self.index_for(luminance)]
    }
}

impl Default for GlyphAlphabet {
    fn default() -> Self {
        Self::from_static(DEFAULT_GLYPHS)
    }
}

impl FromStr for GlyphAlphabet {
    type Err = AsciiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for GlyphAlphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.iter().try_for_each(|ch| write!(f, "{ch}"))
    }
}
