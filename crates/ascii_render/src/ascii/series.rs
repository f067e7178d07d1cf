use std::time::Duration;

use image::RgbaImage;
use rayon::prelude::*;

use crate::palette::{IndexedFrame, TransparentIndexAllocator};
use crate::AsciiError;

/// How a frame is disposed of before the next one is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Disposal {
    #[default]
    Unspecified,
    Keep,
    Background,
    Previous,
}

impl Disposal {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Disposal::Keep,
            2 => Disposal::Background,
            3 => Disposal::Previous,
            _ => Disposal::Unspecified,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Disposal::Unspecified => 0,
            Disposal::Keep => 1,
            Disposal::Background => 2,
            Disposal::Previous => 3,
        }
    }

    /// `self`, or `fallback` when unspecified.
    pub fn or(self, fallback: Disposal) -> Disposal {
        match self {
            Disposal::Unspecified => fallback,
            disposal => disposal,
        }
    }
}

/// A frame and the timing metadata carried alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceFrame<T> {
    pub image: T,
    pub delay: Duration,
    pub disposal: Disposal,
}

impl<T> SequenceFrame<T> {
    pub fn new(image: T, delay: Duration, disposal: Disposal) -> Self {
        Self { image, delay, disposal }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SequenceFrame<U> {
        SequenceFrame { image: f(self.image), delay: self.delay, disposal: self.disposal }
    }
}

/// Whether a decoded source is a still image or an animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Still,
    Animated,
}

/// Decoded frames in presentation order.
#[derive(Clone, Debug)]
pub struct SourceFrames {
    pub kind: SourceKind,
    pub frames: Vec<SequenceFrame<RgbaImage>>,
}

impl SourceFrames {
    pub fn still(image: RgbaImage) -> Self {
        Self {
            kind: SourceKind::Still,
            frames: vec![SequenceFrame::new(image, Duration::ZERO, Disposal::Unspecified)],
        }
    }

    pub fn animated(frames: Vec<SequenceFrame<RgbaImage>>) -> Self {
        Self { kind: SourceKind::Animated, frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Rendered output ready for the encoder.
#[derive(Clone, Debug)]
pub enum Assembled {
    Still(RgbaImage),
    Animation(Vec<SequenceFrame<IndexedFrame>>),
}

impl Assembled {
    pub fn frame_count(&self) -> usize {
        match self {
            Assembled::Still(_) => 1,
            Assembled::Animation(frames) => frames.len(),
        }
    }

    /// Stream-wide disposal for encoders that need a single value: the first frame's.
    pub fn stream_disposal(&self) -> Disposal {
        match self {
            Assembled::Still(_) => Disposal::Unspecified,
            Assembled::Animation(frames) => {
                frames.first().map(|frame| frame.disposal).unwrap_or_default()
            },
        }
    }
}

/// Renders every frame of a source and, for animations, remaps each into a palette with a
/// transparent slot.
///
/// Frames are processed in parallel and collected back in source order. The first failing
/// frame aborts the whole sequence.
pub struct FrameSequenceAssembler<R> {
    render: R,
    allocator: TransparentIndexAllocator,
}

impl<R> FrameSequenceAssembler<R>
where
    R: Fn(&RgbaImage) -> Result<RgbaImage, AsciiError> + Sync,
{
    pub fn new(render: R, allocator: TransparentIndexAllocator) -> Self {
        Self { render, allocator }
    }

    pub fn assemble(&self, source: SourceFrames) -> Result<Assembled, AsciiError> {
        match source.kind {
            SourceKind::Still => {
                let frame = source.frames.into_iter().next().ok_or(AsciiError::NoFrames)?;
                Ok(Assembled::Still((self.render)(&frame.image)?))
            },
            SourceKind::Animated if source.frames.is_empty() => Err(AsciiError::NoFrames),
            SourceKind::Animated => self.assemble_frames(source.frames).map(Assembled::Animation),
        }
    }

    pub fn assemble_frames(
        &self,
        frames: Vec<SequenceFrame<RgbaImage>>,
    ) -> Result<Vec<SequenceFrame<IndexedFrame>>, AsciiError> {
        frames
            .into_par_iter()
            .map(|frame| -> Result<_, AsciiError> {
                let rendered = (self.render)(&frame.image)?;
                let indexed = self.allocator.allocate(&rendered);
                Ok(frame.map(|_| indexed))
            })
            .collect()
    }
}
