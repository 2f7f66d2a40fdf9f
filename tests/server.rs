// 该文件是 Haiyan （海眼） 项目的一部分。
// tests/server.rs - HTTP 服务测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Cursor;
use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tower::ServiceExt;

use haiyan::{
  model::{DetectItem, DetectResult, LabelTable, Model},
  output::Draw,
  server::{self, AppState},
};

const BOUNDARY: &str = "haiyan-test-boundary";

#[derive(Debug, Error)]
#[error("stub inference failure")]
struct StubError;

struct StubModel {
  items: Vec<DetectItem>,
  fail: bool,
}

impl Model for StubModel {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = StubError;

  fn infer(&self, _input: &RgbImage) -> Result<DetectResult, StubError> {
    if self.fail {
      return Err(StubError);
    }
    Ok(DetectResult {
      items: self.items.clone().into_boxed_slice(),
    })
  }
}

fn app_with(items: Vec<DetectItem>, fail: bool) -> Router {
  let state = Arc::new(AppState {
    model: StubModel { items, fail },
    labels: LabelTable::default(),
    draw: Draw::default(),
  });
  server::router(state)
}

fn item(class_id: u32, score: f32) -> DetectItem {
  DetectItem {
    class_id,
    score,
    bbox: [8.0, 8.0, 40.0, 40.0],
  }
}

fn png_bytes() -> Vec<u8> {
  let image = RgbImage::from_pixel(64, 48, Rgb([0, 80, 160]));
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, ImageFormat::Png).unwrap();
  buffer.into_inner()
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
  let mut body = Vec::new();
  body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
  body.extend_from_slice(
    format!(
      "Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\n\
       Content-Type: image/png\r\n\r\n"
    )
    .as_bytes(),
  );
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  body
}

async fn post_upload(app: Router, field: &str, bytes: &[u8]) -> (StatusCode, String) {
  let response = app
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
          "content-type",
          format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, bytes)))
        .unwrap(),
    )
    .await
    .unwrap();

  let status = response.status();
  let body = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn index_page_shows_upload_form() {
  let app = app_with(vec![], false);

  let response = app
    .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::OK);

  let body = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = String::from_utf8(body.to_vec()).unwrap();

  assert!(body.contains("Marine Life Detector"));
  assert!(body.contains("📤 Upload an underwater image"));
  assert!(body.contains("accept=\".jpg,.jpeg,.png\""));
}

#[tokio::test]
async fn detection_results_render_summary() {
  let app = app_with(vec![item(0, 0.95)], false);

  let (status, body) = post_upload(app, "image", &png_bytes()).await;

  assert_eq!(status, StatusCode::OK);
  assert!(body.contains("✅ Detection complete!"));
  assert!(body.contains("<strong>fish</strong> — <code>0.95</code> confidence"));
  assert!(body.contains("🔍 Detected Marine Life"));
  // 原图与标注图各内嵌一次
  assert_eq!(body.matches("data:image/png;base64,").count(), 2);
}

#[tokio::test]
async fn no_detection_shows_notice() {
  let app = app_with(vec![], false);

  let (status, body) = post_upload(app, "image", &png_bytes()).await;

  assert_eq!(status, StatusCode::OK);
  assert!(body.contains("No marine animals were detected in this image."));
  assert!(!body.contains("Detection Summary"));
  // 只有原图
  assert_eq!(body.matches("data:image/png;base64,").count(), 1);
}

#[tokio::test]
async fn summary_preserves_result_order() {
  let app = app_with(vec![item(4, 0.9), item(0, 0.5)], false);

  let (status, body) = post_upload(app, "image", &png_bytes()).await;

  assert_eq!(status, StatusCode::OK);
  let shark = body.find("<strong>shark</strong>").unwrap();
  let fish = body.find("<strong>fish</strong>").unwrap();
  assert!(shark < fish);
  assert!(body.contains("<code>0.50</code>"));
}

#[tokio::test]
async fn garbage_upload_is_rejected() {
  let app = app_with(vec![], false);

  let (status, body) = post_upload(app, "image", b"definitely not an image").await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body.contains("could not be read as a JPEG or PNG"));
  assert!(!body.contains("No marine animals were detected"));
}

#[tokio::test]
async fn missing_image_field_is_rejected() {
  let app = app_with(vec![], false);

  let (status, body) = post_upload(app, "file", &png_bytes()).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body.contains("missing field"));
}

#[tokio::test]
async fn inference_failure_returns_server_error() {
  let app = app_with(vec![], true);

  let (status, body) = post_upload(app, "image", &png_bytes()).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(body.contains("Detection failed while analyzing the image."));
  assert!(body.contains("stub inference failure"));
}

#[tokio::test]
async fn inference_failure_keeps_uploaded_image() {
  let app = app_with(vec![], true);

  let (status, body) = post_upload(app, "image", &png_bytes()).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  // 解码已经成功，失败页仍内嵌原图
  assert!(body.contains("📸 Uploaded Image"));
  assert_eq!(body.matches("data:image/png;base64,").count(), 1);
}
