use std::path::{Path, PathBuf};

use ascii_render::{
    AsciiOptions, AsciiRenderer, FillColor, GlyphAlphabet, GlyphFont, DEFAULT_FONT_SIZE,
    DEFAULT_GLYPHS, DEFAULT_WIDTH,
};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, info};

use crate::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub output_path: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct FontEntry {
    pub name: String,
    pub path: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Form fields of an upload; everything but the file is optional.
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    width: Option<String>,
    chars: Option<String>,
    font: Option<String>,
    fill: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::BadRequest(format!("malformed form data: {err}")))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(format!("failed to read file: {err}")))?;
                form.file = Some((file_name, bytes.to_vec()));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(format!("failed to read {name}: {err}")))?;
            match name.as_str() {
                "width" => form.width = Some(value),
                "chars" => form.chars = Some(value),
                "font" => form.font = Some(value),
                "fill" => form.fill = Some(value),
                _ => (),
            }
        }
        Ok(form)
    }

    fn options(&self, font_dir: &Path) -> Result<AsciiOptions, ApiError> {
        let width = match self.width.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_WIDTH,
            Some(width) => width
                .parse::<u32>()
                .ok()
                .filter(|width| *width > 0)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid width {width:?}")))?,
        };

        let alphabet = GlyphAlphabet::new(self.chars.as_deref().unwrap_or(DEFAULT_GLYPHS))
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;

        let fill = self
            .fill
            .as_deref()
            .unwrap_or_default()
            .parse::<FillColor>()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;

        let font = match self.font.as_deref().map(str::trim).filter(|font| !font.is_empty()) {
            Some(font) => {
                let path = font_path(font_dir, font)
                    .ok_or_else(|| ApiError::BadRequest(format!("invalid font {font:?}")))?;
                GlyphFont::from_path(&path, DEFAULT_FONT_SIZE)
                    .map_err(|err| ApiError::BadRequest(err.to_string()))?
            },
            None => GlyphFont::Bitmap,
        };

        Ok(AsciiOptions { width, alphabet, fill, font, ..AsciiOptions::default() })
    }
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    let Some((file_name, bytes)) = &form.file else {
        return Err(ApiError::BadRequest("No file part".into()));
    };
    let Some(file_name) = sanitize(file_name) else {
        return Err(ApiError::BadRequest("No selected file".into()));
    };

    let options = form.options(&state.font_dir)?;

    let input = state.upload_dir.join(&file_name);
    tokio::fs::write(&input, bytes)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to store upload: {err}")))?;

    let stem = Path::new(&file_name).file_stem().unwrap_or_default().to_owned();
    let output = state.output_dir.join(stem);
    let converted = tokio::task::spawn_blocking(move || {
        AsciiRenderer::new(options).convert_path(&input, &output)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("conversion task failed: {err}")))?;

    let written = match converted {
        Ok(path) if path.exists() => path,
        Ok(path) => {
            error!("conversion reported {} but it does not exist", path.display());
            return Err(ApiError::Internal("File processing error".into()));
        },
        Err(err) => {
            error!("failed to convert {}: {err}", file_name);
            return Err(ApiError::Internal("File processing error".into()));
        },
    };

    let output_path = written.file_name().unwrap_or_default().to_string_lossy().into_owned();
    info!("converted {} to {}", file_name, output_path);
    Ok(Json(UploadResponse { output_path }))
}

pub async fn fonts(State(state): State<AppState>) -> Result<Json<Vec<FontEntry>>, ApiError> {
    let mut entries = tokio::fs::read_dir(&state.font_dir)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to list fonts: {err}")))?;

    let mut fonts = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ApiError::Internal(format!("failed to list fonts: {err}")))?
    {
        let path = entry.path();
        let is_ttf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"));
        if !is_ttf {
            continue;
        }

        let name = path.file_stem().unwrap_or_default().to_string_lossy().into_owned();
        fonts.push(FontEntry { name, path: path.display().to_string() });
    }

    fonts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(fonts))
}

/// Final path component only, so uploads cannot escape their directory.
fn sanitize(file_name: &str) -> Option<String> {
    let name = Path::new(file_name).file_name()?.to_str()?;
    (!name.is_empty()).then(|| name.to_owned())
}

/// Fonts are always looked up inside `font_dir`, whatever directory the client names.
fn font_path(font_dir: &Path, requested: &str) -> Option<PathBuf> {
    let name = Path::new(requested).file_name()?;
    Some(font_dir.join(name))
}
