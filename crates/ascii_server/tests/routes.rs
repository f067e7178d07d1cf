use std::fs;
use std::io::Cursor;

use ascii_server::{router, ServerConfig};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "ascii-test-boundary";

fn app(root: &TempDir) -> (Router, ServerConfig) {
    let config = ServerConfig {
        upload_dir: root.path().join("uploads"),
        output_dir: root.path().join("output"),
        font_dir: root.path().join("fonts"),
    };
    config.create_dirs().unwrap();
    (router(config.clone()), config)
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

fn multipart(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            },
            Part::File(file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; \
                         filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            },
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn png_bytes() -> Vec<u8> {
    let image = RgbaImage::from_pixel(12, 12, Rgba([20, 200, 90, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image).write_to(&mut bytes, ImageOutputFormat::Png).unwrap();
    bytes.into_inner()
}

#[tokio::test]
async fn upload_without_file_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (app, _) = app(&root);

    let response = app.oneshot(multipart(&[Part::Text("width", "50")])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "No file part");
}

#[tokio::test]
async fn upload_with_empty_file_name_is_bad_request() {
    let root = tempfile::tempdir().unwrap();
    let (app, _) = app(&root);

    let response = app.oneshot(multipart(&[Part::File("", b"data")])).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "No selected file");
}

#[tokio::test]
async fn upload_converts_and_serves_output() {
    let root = tempfile::tempdir().unwrap();
    let (app, config) = app(&root);
    let png = png_bytes();

    let request = multipart(&[
        Part::File("leaf.png", &png),
        Part::Text("width", "6"),
        Part::Text("chars", " .#"),
        Part::Text("fill", "transparent"),
    ]);
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["output_path"], "leaf_ascii.png");
    assert!(config.upload_dir.join("leaf.png").exists());
    assert!(config.output_dir.join("leaf_ascii.png").exists());

    let download = Request::builder().uri("/output/leaf_ascii.png").body(Body::empty()).unwrap();
    let response = app.oneshot(download).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn undecodable_upload_is_server_error() {
    let root = tempfile::tempdir().unwrap();
    let (app, _) = app(&root);

    let response = app.oneshot(multipart(&[Part::File("broken.png", b"not a png")])).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(response).await["error"], "File processing error");
}

#[tokio::test]
async fn fonts_lists_only_truetype_files() {
    let root = tempfile::tempdir().unwrap();
    let (app, config) = app(&root);
    for name in ["Mono.ttf", "Sans.TTF", "readme.txt"] {
        fs::write(config.font_dir.join(name), b"").unwrap();
    }

    let request = Request::builder().uri("/fonts").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fonts = json(response).await;
    let names: Vec<_> = fonts.as_array().unwrap().iter().map(|font| font["name"].clone()).collect();
    assert_eq!(names, vec!["Mono", "Sans"]);
    assert!(fonts[0]["path"].as_str().unwrap().ends_with("Mono.ttf"));
}
