// 该文件是 Haiyan （海眼） 项目的一部分。
// src/task.rs - 检测流程定义
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

use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::info;

use crate::ingest::{self, IngestError};
use crate::model::{DetectResult, LabelTable, Model};
use crate::output::Draw;

#[derive(Error, Debug)]
pub enum PassError<E: std::error::Error> {
  #[error("上传图像被拒绝: {0}")]
  Rejected(#[from] IngestError),
  #[error("推理失败: {error}")]
  Inference { error: E, original: RgbImage },
}

/// 一次检测的全部产物
#[derive(Debug)]
pub struct PassOutcome {
  pub original: RgbImage,
  pub annotated: RgbImage,
  pub result: DetectResult,
}

/// 对一次上传执行完整检测流程: 解码、推理、标注。
///
/// 解码失败返回 [`PassError::Rejected`]，模型失败返回 [`PassError::Inference`]，
/// 调用方据此区分客户端错误与服务端错误。推理错误带回已解码的原图，
/// 失败页仍能展示上传的图像。
pub fn run_pass<M>(
  model: &M,
  draw: &Draw,
  labels: &LabelTable,
  bytes: &[u8],
) -> Result<PassOutcome, PassError<M::Error>>
where
  M: Model<Input = RgbImage, Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let original = ingest::decode_upload(bytes)?;
  info!("收到上传图像: {}x{}", original.width(), original.height());

  let now = Instant::now();
  let result = match model.infer(&original) {
    Ok(result) => result,
    Err(error) => return Err(PassError::Inference { error, original }),
  };
  info!(
    "推理完成，耗时: {:.2?}，检测到 {} 个目标",
    now.elapsed(),
    result.len()
  );

  let mut annotated = original.clone();
  draw.annotate(&mut annotated, &result, labels);

  Ok(PassOutcome {
    original,
    annotated,
    result,
  })
}
