// 该文件是 Haiyan （海眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::net::SocketAddr;

use clap::Parser;

/// Haiyan 项目参数配置
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

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.1", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 服务监听地址
  #[arg(long, default_value = "127.0.0.1:8080", value_name = "ADDR")]
  pub bind: SocketAddr,
}
