use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use image::{ImageFormat, RgbaImage};

use crate::ascii::series::{Assembled, SequenceFrame};
use crate::palette::{IndexedFrame, TRANSPARENT_INDEX};
use crate::AsciiError;

pub fn write_output(assembled: &Assembled, path: &Path) -> Result<(), AsciiError> {
    match assembled {
        Assembled::Still(image) => write_png(image, path),
        Assembled::Animation(frames) => write_gif(frames, path),
    }
}

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), AsciiError> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Looping GIF with a local palette per frame, index 0 as transparent and background
/// index. Frames without a disposal inherit the first frame's.
pub fn write_gif(frames: &[SequenceFrame<IndexedFrame>], path: &Path) -> Result<(), AsciiError> {
    let first = frames.first().ok_or(AsciiError::NoFrames)?;
    let (width, height) = gif_dimensions(&first.image)?;
    let stream_disposal = first.disposal;

    let mut encoder = gif::Encoder::new(BufWriter::new(File::create(path)?), width, height, &[])?;
    encoder.set_repeat(gif::Repeat::Infinite)?;

    for frame in frames {
        let (frame_width, frame_height) = gif_dimensions(&frame.image)?;
        let mut output = gif::Frame::default();
        output.width = frame_width;
        output.height = frame_height;
        output.buffer = Cow::Borrowed(frame.image.indices());
        output.palette = Some(frame.image.palette().to_rgb_bytes());
        output.transparent = Some(TRANSPARENT_INDEX);
        output.delay = delay_centis(frame.delay);
        output.dispose = frame.disposal.or(stream_disposal).into();
        encoder.write_frame(&output)?;
    }

    encoder.into_inner()?.flush()?;
    Ok(())
}

fn gif_dimensions(frame: &IndexedFrame) -> Result<(u16, u16), AsciiError> {
    let width = u16::try_from(frame.width()).map_err(|_| AsciiError::InvalidDimension)?;
    let height = u16::try_from(frame.height()).map_err(|_| AsciiError::InvalidDimension)?;
    Ok((width, height))
}

/// GIF delays are stored in hundredths of a second.
fn delay_centis(delay: Duration) -> u16 {
    (delay.as_millis() / 10).min(u128::from(u16::MAX)) as u16
}
