// 该文件是 Haiyan （海眼） 项目的一部分。
// src/ingest.rs - 上传图像的解码与校验
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::debug;

/// 允许上传的图像格式
pub const ALLOWED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

#[derive(Error, Debug)]
pub enum IngestError {
  #[error("上传内容为空")]
  Empty,
  #[error("无法识别的图像格式")]
  UnknownFormat,
  #[error("不支持的图像格式: {0:?}，仅支持 JPEG 与 PNG")]
  UnsupportedFormat(ImageFormat),
  #[error("图像解码失败: {0}")]
  DecodeError(#[from] image::ImageError),
}

/// 把上传的字节流解码为 RGB 图像。
///
/// 仅接受 JPEG 与 PNG，其余格式在解码前即被拒绝。
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage, IngestError> {
  if bytes.is_empty() {
    return Err(IngestError::Empty);
  }

  let format = image::guess_format(bytes).map_err(|_| IngestError::UnknownFormat)?;
  if !ALLOWED_FORMATS.contains(&format) {
    return Err(IngestError::UnsupportedFormat(format));
  }
  debug!("上传图像格式: {:?}", format);

  let image = image::load_from_memory_with_format(bytes, format)?;
  Ok(image.to_rgb8())
}
