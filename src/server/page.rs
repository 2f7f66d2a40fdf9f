// 该文件是 Haiyan （海眼） 项目的一部分。
// src/server/page.rs - 页面渲染
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

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, RgbImage};
use tracing::error;

use crate::model::LabelTable;
use crate::task::PassOutcome;

pub const PAGE_TITLE: &str = "Marine Life Detector";

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
p.caption { color: #666; }
figure { margin: 1.5rem 0; }
figure img { max-width: 100%; border-radius: 4px; }
figcaption { color: #666; font-size: 0.9rem; margin-top: 0.3rem; }
p.success { color: #1a7f37; }
p.notice { background: #fff4e5; border: 1px solid #f0c36d; padding: 0.6rem; border-radius: 4px; }
p.error { background: #fdecea; border: 1px solid #e08585; padding: 0.6rem; border-radius: 4px; }
form { margin: 1.5rem 0; padding: 1rem; border: 1px dashed #aaa; border-radius: 4px; }
form label { display: block; margin-bottom: 0.5rem; }
button { margin-left: 0.5rem; }
";

const UPLOAD_FORM: &str = r#"<form id="upload-form" action="/detect" method="post" enctype="multipart/form-data">
<label for="image">📤 Upload an underwater image</label>
<input type="file" id="image" name="image" accept=".jpg,.jpeg,.png" required>
<button type="submit">Detect</button>
</form>
<p id="spinner" hidden>Detecting marine life... 🐋</p>
<script>
document.getElementById("upload-form").addEventListener("submit", function () {
  document.getElementById("spinner").hidden = false;
});
</script>
"#;

fn shell(body: &str) -> String {
  format!(
    "<!DOCTYPE html>\n\
     <html lang=\"en\">\n\
     <head>\n\
     <meta charset=\"utf-8\">\n\
     <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
     <title>{PAGE_TITLE} 🌊</title>\n\
     <style>\n{STYLE}</style>\n\
     </head>\n\
     <body>\n\
     <h1>🐠 {PAGE_TITLE}</h1>\n\
     <p class=\"caption\">Powered by YOLOv8m — Detects underwater animals from uploaded images</p>\n\
     {body}\
     </body>\n\
     </html>\n"
  )
}

/// 首页: 仅上传表单
pub fn index() -> String {
  shell(UPLOAD_FORM)
}

/// 检测结果页: 原图、标注图与摘要，之后附上传表单
pub fn results(outcome: &PassOutcome, labels: &LabelTable) -> String {
  let mut body = String::new();

  body.push_str(&figure(&outcome.original, "📸 Uploaded Image"));

  if outcome.result.is_empty() {
    body.push_str("<p class=\"notice\">No marine animals were detected in this image.</p>\n");
  } else {
    body.push_str("<p class=\"success\">✅ Detection complete!</p>\n");
    body.push_str(&figure(&outcome.annotated, "🔍 Detected Marine Life"));

    body.push_str("<h2>📋 Detection Summary</h2>\n<ul>\n");
    for item in outcome.result.items.iter() {
      body.push_str(&format!(
        "<li><strong>{}</strong> — <code>{:.2}</code> confidence</li>\n",
        escape(labels.name(item.class_id)),
        item.score
      ));
    }
    body.push_str("</ul>\n");
  }

  body.push_str(UPLOAD_FORM);
  shell(&body)
}

/// 上传被拒绝页，附错误详情
pub fn rejected(detail: &str) -> String {
  let body = format!(
    "<p class=\"error\">The uploaded file could not be read as a JPEG or PNG image.</p>\n\
     <p><code>{}</code></p>\n{UPLOAD_FORM}",
    escape(detail)
  );
  shell(&body)
}

/// 推理失败页: 原图（若已解码）与错误详情
pub fn failed(original: Option<&RgbImage>, detail: &str) -> String {
  let mut body = String::new();

  if let Some(image) = original {
    body.push_str(&figure(image, "📸 Uploaded Image"));
  }

  body.push_str(&format!(
    "<p class=\"error\">Detection failed while analyzing the image. Please try again.</p>\n\
     <p><code>{}</code></p>\n",
    escape(detail)
  ));
  body.push_str(UPLOAD_FORM);
  shell(&body)
}

fn figure(image: &RgbImage, caption: &str) -> String {
  format!(
    "<figure>\n<img src=\"{}\" alt=\"{caption}\">\n<figcaption>{caption}</figcaption>\n</figure>\n",
    data_url(image)
  )
}

fn data_url(image: &RgbImage) -> String {
  let mut buffer = Cursor::new(Vec::new());
  if let Err(e) = image.write_to(&mut buffer, ImageFormat::Png) {
    error!("无法编码结果图像: {}", e);
    return String::new();
  }

  format!(
    "data:image/png;base64,{}",
    general_purpose::STANDARD.encode(buffer.into_inner())
  )
}

fn escape(text: &str) -> String {
  text
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}
