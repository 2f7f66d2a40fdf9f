// 该文件是 Haiyan （海眼） 项目的一部分。
// src/bin/oneshot.rs - 单次检测工具
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use haiyan::{
  model::{LabelTable, Yolov8Builder},
  output::{Draw, RecordOutput, SaveImageFileOutput},
  task,
};

/// Haiyan 单次检测工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(
    long,
    default_value = "models/marine_detector.onnx",
    value_name = "FILE"
  )]
  pub model: String,
  /// 标签文件路径（每行一个类别名，省略时使用内置的海洋生物标签）
  #[arg(long, value_name = "FILE")]
  pub labels: Option<String>,
  /// 输入图像路径
  #[arg(long, value_name = "FILE")]
  pub input: String,
  /// 标注图像输出路径
  #[arg(long, value_name = "FILE")]
  pub output: String,
  /// 检测记录 JSON 输出路径
  #[arg(long, value_name = "FILE")]
  pub record: Option<String>,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.1", value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入图像: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = match &args.labels {
    Some(path) => LabelTable::from_file(path)?,
    None => LabelTable::default(),
  };
  let model = Yolov8Builder::new(&args.model)
    .labels(labels)
    .confidence(args.confidence)
    .nms_threshold(args.nms_threshold)
    .build()?;
  let labels = model.labels().clone();
  let draw = Draw::default();

  let bytes = std::fs::read(&args.input)?;
  let outcome = task::run_pass(&model, &draw, &labels, &bytes)?;

  if outcome.result.is_empty() {
    info!("未检测到海洋生物");
  } else {
    for item in outcome.result.items.iter() {
      info!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
        labels.name(item.class_id),
        item.score * 100.0,
        item.bbox[0],
        item.bbox[1],
        item.bbox[2] - item.bbox[0],
        item.bbox[3] - item.bbox[1]
      );
    }
  }

  SaveImageFileOutput::new(&args.output).save(&outcome.annotated)?;

  if let Some(record) = &args.record {
    RecordOutput::new(record).record(&outcome.result, &labels)?;
  }

  Ok(())
}
