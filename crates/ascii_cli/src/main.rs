use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ascii_render::{
    is_supported, AsciiOptions, AsciiRenderer, FillColor, GlyphAlphabet, GlyphFont,
    DEFAULT_FONT_SIZE, DEFAULT_GLYPHS,
};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert images and GIFs to colored ASCII art")]
struct Cli {
    /// Input image, GIF, or directory of images
    input_path: Option<PathBuf>,
    /// Output file, or directory when converting a directory
    output_path: Option<PathBuf>,
    #[command(flatten)]
    settings: RenderSettings,
}

#[derive(Parser, Debug, Clone)]
struct RenderSettings {
    /// Target column width
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,
    /// Glyphs ordered from darkest to brightest
    #[arg(long, default_value = DEFAULT_GLYPHS)]
    chars: GlyphAlphabet,
    /// TrueType font for drawing glyphs; the built-in bitmap font is used otherwise
    #[arg(long)]
    font: Option<PathBuf>,
    /// Pixel size used with --font
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    font_size: f32,
    /// Background painted under each glyph: a color name, #rrggbb, or "none"
    #[arg(long, default_value = "none")]
    fill: FillColor,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let (Some(input), Some(output)) = (&cli.input_path, &cli.output_path) else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let renderer = AsciiRenderer::new(cli.settings.to_options()?);
    let started = Instant::now();

    if input.is_dir() {
        convert_directory(&renderer, input, output)?;
    } else {
        convert_file(&renderer, input, output)?;
    }

    println!("Elapsed time: {:.2} seconds", started.elapsed().as_secs_f64());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn convert_file(renderer: &AsciiRenderer, input: &Path, output: &Path) -> Result<()> {
    let output = if output.is_dir() {
        output.join(input.file_name().unwrap_or_default())
    } else {
        output.to_path_buf()
    };

    let written = renderer
        .convert_path(input, &output)
        .with_context(|| format!("failed to convert {:?}", input))?;
    println!("ASCII art saved to {}", written.display());
    Ok(())
}

fn convert_directory(renderer: &AsciiRenderer, input: &Path, output: &Path) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {:?}", output))?;

    let entries = collect_images(input);
    if entries.is_empty() {
        warn!("no supported images found in {:?}", input);
        return Ok(());
    }

    let progress = ProgressBar::new(entries.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images",
        )
        .context("invalid progress template")?
        .progress_chars("=> "),
    );

    for entry in entries {
        let base = output.join(entry.file_stem().unwrap_or_default());
        let written = renderer
            .convert_path(&entry, &base)
            .with_context(|| format!("failed to convert {:?}", entry))?;
        debug!("wrote {}", written.display());
        progress.inc(1);
    }

    progress.finish_with_message(format!("Images written to {:?}", output));
    Ok(())
}

/// Supported images directly inside `dir`, sorted by path.
fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let supported = is_supported(path);
            if !supported {
                warn!("skipping unsupported file {:?}", path);
            }
            supported
        })
        .collect();
    entries.sort();
    entries
}

impl RenderSettings {
    fn to_options(&self) -> Result<AsciiOptions> {
        let font = match &self.font {
            Some(path) => GlyphFont::from_path(path, self.font_size)
                .with_context(|| format!("failed to load font {:?}", path))?,
            None => GlyphFont::Bitmap,
        };

        Ok(AsciiOptions {
            width: self.width,
            alphabet: self.chars.clone(),
            fill: self.fill,
            font,
            ..AsciiOptions::default()
        })
    }
}
