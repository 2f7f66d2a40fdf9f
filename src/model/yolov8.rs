// 该文件是 Haiyan （海眼） 项目的一部分。
// src/model/yolov8.rs - 模型定义
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

use std::path::PathBuf;

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::model::{DetectItem, DetectResult, LabelTable, Model};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub const DEFAULT_CONFIDENCE: f32 = 0.1;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

const BOX_FIELDS: usize = 4; // cx, cy, w, h

pub struct Yolov8 {
  plan: RunnableModel,
  labels: LabelTable,
  input_width: u32,
  input_height: u32,
  class_count: usize,
  transposed: bool,
  confidence: f32,
  nms_threshold: f32,
}

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}; 错误: {1}")]
  ModelInvalid(String, TractError),
  #[error("模型形状错误: {0}")]
  ModelShape(String),
  #[error("类别数量不匹配: 模型 {classes} 类, 标签表 {labels} 项")]
  LabelMismatch { classes: usize, labels: usize },
  #[error("阈值必须在 0.0 到 1.0 之间: {0}")]
  ThresholdOutOfRange(f32),
  #[error("推理错误: {0}")]
  InferenceError(TractError),
}

impl Yolov8Error {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    Yolov8Error::ModelInvalid(msg.to_string(), e)
  }

  pub fn shape(msg: impl Into<String>) -> Self {
    Yolov8Error::ModelShape(msg.into())
  }
}

pub struct Yolov8Builder {
  model_path: PathBuf,
  labels: LabelTable,
  confidence: f32,
  nms_threshold: f32,
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Yolov8Builder {
      model_path: model_path.into(),
      labels: LabelTable::default(),
      confidence: DEFAULT_CONFIDENCE,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
    }
  }

  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold;
    self
  }

  pub fn build(self) -> Result<Yolov8, Yolov8Error> {
    if !(0.0..=1.0).contains(&self.confidence) {
      return Err(Yolov8Error::ThresholdOutOfRange(self.confidence));
    }
    if !(0.0..=1.0).contains(&self.nms_threshold) {
      return Err(Yolov8Error::ThresholdOutOfRange(self.nms_threshold));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let graph = tract_onnx::onnx()
      .model_for_read(&mut std::io::Cursor::new(&model_data))
      .map_err(|e| Yolov8Error::invalid("无法解析 ONNX 模型", e))?;

    info!("优化推理计算图");
    let typed = graph
      .into_optimized()
      .map_err(|e| Yolov8Error::invalid("无法优化计算图", e))?;

    let (input_height, input_width) = {
      let fact = typed
        .input_fact(0)
        .map_err(|e| Yolov8Error::invalid("无法获取输入张量信息", e))?;
      let shape = fact
        .shape
        .as_concrete()
        .ok_or_else(|| Yolov8Error::shape("输入张量尺寸不是常量"))?;
      if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
        return Err(Yolov8Error::shape(format!(
          "预期输入张量为 [1, 3, H, W], 实际为 {:?}",
          shape
        )));
      }
      (shape[2] as u32, shape[3] as u32)
    };
    debug!("模型输入尺寸: {}x{}", input_width, input_height);

    // 检测头输出可能为 [1, 4+类别数, N] 或转置后的 [1, N, 4+类别数]，特征维取较小者
    let (class_count, transposed) = {
      let fact = typed
        .output_fact(0)
        .map_err(|e| Yolov8Error::invalid("无法获取输出张量信息", e))?;
      let shape = fact
        .shape
        .as_concrete()
        .ok_or_else(|| Yolov8Error::shape("输出张量尺寸不是常量"))?;
      if shape.len() != 3 || shape[0] != 1 {
        return Err(Yolov8Error::shape(format!(
          "预期输出张量为 [1, 4+类别数, N], 实际为 {:?}",
          shape
        )));
      }
      let (features, transposed) = if shape[1] <= shape[2] {
        (shape[1], false)
      } else {
        (shape[2], true)
      };
      if features <= BOX_FIELDS {
        return Err(Yolov8Error::shape(format!("输出特征维过小: {}", features)));
      }
      (features - BOX_FIELDS, transposed)
    };
    debug!("模型类别数量: {}", class_count);

    if class_count != self.labels.len() {
      return Err(Yolov8Error::LabelMismatch {
        classes: class_count,
        labels: self.labels.len(),
      });
    }

    let plan = typed
      .into_runnable()
      .map_err(|e| Yolov8Error::invalid("无法构建推理计划", e))?;
    info!("模型加载完成");

    Ok(Yolov8 {
      plan,
      labels: self.labels,
      input_width,
      input_height,
      class_count,
      transposed,
      confidence: self.confidence,
      nms_threshold: self.nms_threshold,
    })
  }
}

impl Yolov8 {
  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  fn preprocess(&self, image: &RgbImage) -> Result<Tensor, Yolov8Error> {
    let resized = image::imageops::resize(
      image,
      self.input_width,
      self.input_height,
      FilterType::Triangle,
    );

    let (w, h) = (self.input_width as usize, self.input_height as usize);
    let mut data = vec![0f32; 3 * h * w];
    for (x, y, pixel) in resized.enumerate_pixels() {
      let (x, y) = (x as usize, y as usize);
      for c in 0..3 {
        data[c * h * w + y * w + x] = pixel[c] as f32 / 255.0;
      }
    }

    Tensor::from_shape(&[1, 3, h, w], &data)
      .map_err(|e| Yolov8Error::invalid("无法构建输入张量", e))
  }
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let scale_x = input.width() as f32 / self.input_width as f32;
    let scale_y = input.height() as f32 / self.input_height as f32;

    debug!("预处理输入图像: {}x{}", input.width(), input.height());
    let tensor = self.preprocess(input)?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec![tensor.into()])
      .map_err(Yolov8Error::InferenceError)?;
    let output = outputs
      .into_iter()
      .next()
      .ok_or_else(|| Yolov8Error::shape("模型没有输出张量"))?
      .into_tensor();
    let data = output
      .as_slice::<f32>()
      .map_err(|e| Yolov8Error::invalid("输出张量不是 f32", e))?;

    let features = BOX_FIELDS + self.class_count;
    if data.is_empty() || data.len() % features != 0 {
      return Err(Yolov8Error::shape(format!(
        "输出张量长度 {} 与特征维 {} 不匹配",
        data.len(),
        features
      )));
    }
    let anchors = data.len() / features;

    let candidates = decode_predictions(
      data,
      self.class_count,
      anchors,
      self.transposed,
      self.confidence,
      scale_x,
      scale_y,
    );
    debug!("候选框数量: {}", candidates.len());

    let items = nms(candidates, self.nms_threshold);
    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}

fn decode_predictions(
  data: &[f32],
  class_count: usize,
  anchors: usize,
  transposed: bool,
  confidence: f32,
  scale_x: f32,
  scale_y: f32,
) -> Vec<DetectItem> {
  let features = BOX_FIELDS + class_count;
  let mut items = Vec::new();

  for anchor in 0..anchors {
    let at = |feature: usize| {
      if transposed {
        data[anchor * features + feature]
      } else {
        data[feature * anchors + anchor]
      }
    };

    let (score, class_id) = {
      let mut best = f32::MIN;
      let mut best_idx = 0usize;
      for class in 0..class_count {
        let value = at(BOX_FIELDS + class);
        if value > best {
          best = value;
          best_idx = class;
        }
      }
      (best, best_idx as u32)
    };

    // 阈值为闭下界，等于阈值的候选保留
    if score < confidence {
      continue;
    }

    let cx = at(0);
    let cy = at(1);
    let w = at(2);
    let h = at(3);

    items.push(DetectItem {
      class_id,
      score,
      bbox: [
        (cx - w / 2.0) * scale_x,
        (cy - h / 2.0) * scale_y,
        (cx + w / 2.0) * scale_x,
        (cy + h / 2.0) * scale_y,
      ],
    });
  }

  items
}

/// 按类别做非极大值抑制，结果按置信度降序
fn nms(mut candidates: Vec<DetectItem>, threshold: f32) -> Vec<DetectItem> {
  candidates.sort_by(|a, b| {
    b.score
      .partial_cmp(&a.score)
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut result = Vec::new();

  while !candidates.is_empty() {
    let best = candidates.remove(0);

    candidates.retain(|det| {
      if det.class_id != best.class_id {
        return true;
      }
      iou(&best.bbox, &det.bbox) < threshold
    });

    result.push(best);
  }

  result
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
