use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use log::debug;

use crate::ascii::series::{Disposal, SequenceFrame, SourceFrames};
use crate::AsciiError;

/// Extensions the converter accepts, lowercase.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

pub fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| ext.to_ascii_lowercase())
}

pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_animated(path: &Path) -> bool {
    extension(path).as_deref() == Some("gif")
}

/// Decodes `path` into full-canvas RGBA frames. GIFs are animations; everything else is a
/// single still.
pub fn load_source(path: &Path) -> Result<SourceFrames, AsciiError> {
    if !is_supported(path) {
        return Err(AsciiError::UnsupportedFormat(path.display().to_string()));
    }

    if is_animated(path) {
        load_gif(path)
    } else {
        load_still(path)
    }
}

fn load_still(path: &Path) -> Result<SourceFrames, AsciiError> {
    let image = image::open(path)?.into_rgba8();
    let (w, h) = image.dimensions();
    debug!("loaded image {}x{} from {}", w, h, path.display());
    Ok(SourceFrames::still(image))
}

fn load_gif(path: &Path) -> Result<SourceFrames, AsciiError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(BufReader::new(File::open(path)?))?;

    let mut canvas = RgbaImage::new(u32::from(decoder.width()), u32::from(decoder.height()));
    let mut frames = Vec::new();

    while let Some(frame) = decoder.read_next_frame()? {
        let disposal = Disposal::from(frame.dispose);
        let area = FrameArea::of(frame);
        let restore = (disposal == Disposal::Previous).then(|| canvas.clone());

        composite(&mut canvas, area, &frame.buffer);
        let delay = Duration::from_millis(u64::from(frame.delay) * 10);
        frames.push(SequenceFrame::new(canvas.clone(), delay, disposal));

        match (disposal, restore) {
            (Disposal::Background, _) => clear(&mut canvas, area),
            (Disposal::Previous, Some(previous)) => canvas = previous,
            _ => (),
        }
    }

    debug!(
        "loaded {} frames {}x{} from {}",
        frames.len(),
        canvas.width(),
        canvas.height(),
        path.display()
    );
    Ok(SourceFrames::animated(frames))
}

#[derive(Clone, Copy, Debug)]
struct FrameArea {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl FrameArea {
    fn of(frame: &gif::Frame<'_>) -> Self {
        Self {
            left: u32::from(frame.left),
            top: u32::from(frame.top),
            width: u32::from(frame.width),
            height: u32::from(frame.height),
        }
    }

    /// Canvas coordinates paired with the offset into the frame buffer, clipped to the canvas.
    fn pixels(self, canvas: &RgbaImage) -> impl Iterator<Item = (u32, u32, usize)> {
        let (canvas_width, canvas_height) = canvas.dimensions();
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let (cx, cy) = (self.left + x, self.top + y);
                (cx < canvas_width && cy < canvas_height)
                    .then(|| (cx, cy, (y as usize * self.width as usize + x as usize) * 4))
            })
        })
    }
}

/// Draws the frame's visible pixels; transparent ones leave the canvas untouched.
fn composite(canvas: &mut RgbaImage, area: FrameArea, buffer: &[u8]) {
    let pixels: Vec<_> = area.pixels(canvas).collect();
    for (x, y, offset) in pixels {
        let Some(rgba) = buffer.get(offset..offset + 4) else {
            continue;
        };
        if rgba[3] != 0 {
            canvas.put_pixel(x, y, Rgba([rgba[0], rgba[1], rgba[2], rgba[3]]));
        }
    }
}

fn clear(canvas: &mut RgbaImage, area: FrameArea) {
    let pixels: Vec<_> = area.pixels(canvas).collect();
    for (x, y, _) in pixels {
        canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
    }
}

impl From<gif::DisposalMethod> for Disposal {
    fn from(method: gif::DisposalMethod) -> Self {
        match method {
            gif::DisposalMethod::Any => Disposal::Unspecified,
            gif::DisposalMethod::Keep => Disposal::Keep,
            gif::DisposalMethod::Background => Disposal::Background,
            gif::DisposalMethod::Previous => Disposal::Previous,
        }
    }
}

impl From<Disposal> for gif::DisposalMethod {
    fn from(disposal: Disposal) -> Self {
        match disposal {
            Disposal::Unspecified => gif::DisposalMethod::Any,
            Disposal::Keep => gif::DisposalMethod::Keep,
            Disposal::Background => gif::DisposalMethod::Background,
            Disposal::Previous => gif::DisposalMethod::Previous,
        }
    }
}
