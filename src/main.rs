// 该文件是 Haiyan （海眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use haiyan::model::{LabelTable, Yolov8Builder};
use haiyan::output::Draw;
use haiyan::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("Haiyan 海洋生物检测服务");
  info!("模型文件路径: {}", args.model);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);
  info!("监听地址: {}", args.bind);

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
  let state = Arc::new(AppState {
    model,
    labels,
    draw: Draw::default(),
  });

  server::serve(state, args.bind).await
}
