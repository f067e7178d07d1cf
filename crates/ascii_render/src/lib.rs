//! Renders images and animations as colored glyph art.
//!
//! Each frame is resampled to one pixel per character cell, every cell gets a glyph chosen by
//! luminance and is painted in the source color. Animations are re-encoded as palette-indexed
//! GIF frames whose index 0 is reserved for transparency.

mod ascii;
mod color;
mod font;
mod image_pipeline;
mod paint;
pub mod palette;

use std::path::{Path, PathBuf};

use image::RgbaImage;

pub use ascii::{
    alphabet::{GlyphAlphabet, DEFAULT_GLYPHS},
    grid::{GlyphCell, GlyphGrid},
    mapping::{GlyphRasterizer, DEFAULT_FONT_ASPECT, DEFAULT_OPACITY_THRESHOLD},
    series::{
        Assembled, Disposal, FrameSequenceAssembler, SequenceFrame, SourceFrames, SourceKind,
    },
};
pub use color::FillColor;
pub use font::{GlyphFont, DEFAULT_FONT_SIZE};
pub use image_pipeline::{
    loader::{is_animated, is_supported, load_source, SUPPORTED_EXTENSIONS},
    resize::TargetGeometry,
    writer::{write_gif, write_output, write_png},
};
pub use paint::{GlyphPainter, DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH};
pub use palette::{IndexedFrame, Palette, TransparentIndexAllocator, TRANSPARENT_INDEX};

/// Columns used when no width is configured.
pub const DEFAULT_WIDTH: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum AsciiError {
    #[error("target width and source dimensions must be non-zero")]
    InvalidDimension,
    #[error("glyph alphabet must not be empty")]
    EmptyAlphabet,
    #[error("source contains no frames")]
    NoFrames,
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid font: {0}")]
    InvalidFont(String),
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("failed to process image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to decode GIF: {0}")]
    GifDecode(#[from] gif::DecodingError),
    #[error("failed to encode GIF: {0}")]
    GifEncode(#[from] gif::EncodingError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct AsciiOptions {
    /// Number of glyph columns.
    pub width: u32,
    pub alphabet: GlyphAlphabet,
    pub fill: FillColor,
    pub font: GlyphFont,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Glyph width / height ratio assumed when deriving the row count.
    pub font_aspect: f32,
    /// Cells with alpha above this are drawn.
    pub opacity_threshold: u8,
    /// Rendered pixels with alpha at or below this become GIF-transparent.
    pub alpha_threshold: u8,
}

impl Default for AsciiOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            alphabet: GlyphAlphabet::default(),
            fill: FillColor::Transparent,
            font: GlyphFont::Bitmap,
            cell_width: DEFAULT_CELL_WIDTH,
            cell_height: DEFAULT_CELL_HEIGHT,
            font_aspect: DEFAULT_FONT_ASPECT,
            opacity_threshold: DEFAULT_OPACITY_THRESHOLD,
            alpha_threshold: 0,
        }
    }
}

pub struct AsciiRenderer {
    rasterizer: GlyphRasterizer,
    painter: GlyphPainter,
    allocator: TransparentIndexAllocator,
}

impl AsciiRenderer {
    pub fn new(options: AsciiOptions) -> Self {
        let rasterizer = GlyphRasterizer::new(options.alphabet, options.width)
            .with_font_aspect(options.font_aspect)
            .with_opacity_threshold(options.opacity_threshold);
        let painter = GlyphPainter::new(options.font, options.fill)
            .with_cell_size(options.cell_width, options.cell_height);
        let allocator = TransparentIndexAllocator::new(options.alpha_threshold);

        Self { rasterizer, painter, allocator }
    }

    pub fn rasterize(&self, frame: &RgbaImage) -> Result<GlyphGrid, AsciiError> {
        self.rasterizer.rasterize(frame)
    }

    /// Rasterizes and paints one frame.
    pub fn render_frame(&self, frame: &RgbaImage) -> Result<RgbaImage, AsciiError> {
        let grid = self.rasterizer.rasterize(frame)?;
        self.painter.paint(&grid)
    }

    pub fn assemble(&self, source: SourceFrames) -> Result<Assembled, AsciiError> {
        let render = |frame: &RgbaImage| self.render_frame(frame);
        FrameSequenceAssembler::new(render, self.allocator).assemble(source)
    }

    pub fn render_path<P: AsRef<Path>>(&self, path: P) -> Result<Assembled, AsciiError> {
        self.assemble(load_source(path.as_ref())?)
    }

    /// Converts `input` and writes it next to `output` as `<stem>_ascii.png` or
    /// `<stem>_ascii.gif`. Returns the written path.
    pub fn convert_path<P, Q>(&self, input: P, output: Q) -> Result<PathBuf, AsciiError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let assembled = self.render_path(input)?;
        let kind = match assembled {
            Assembled::Still(_) => SourceKind::Still,
            Assembled::Animation(_) => SourceKind::Animated,
        };

        let path = output_path(output.as_ref(), kind);
        write_output(&assembled, &path)?;
        Ok(path)
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new(AsciiOptions::default())
    }
}

/// `<dir>/<stem>_ascii.<ext>` for an output base path, `ext` following the source kind.
pub fn output_path(output: &Path, kind: SourceKind) -> PathBuf {
    let extension = match kind {
        SourceKind::Still => "png",
        SourceKind::Animated => "gif",
    };
    let stem = output.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
    output.with_file_name(format!("{stem}_ascii.{extension}"))
}
