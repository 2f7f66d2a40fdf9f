// 该文件是 Haiyan （海眼） 项目的一部分。
// src/output/record.rs - 检测记录输出
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

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::model::{DetectResult, LabelTable};

pub struct RecordOutput {
  path: PathBuf,
}

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

impl RecordOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    RecordOutput { path: path.into() }
  }

  /// 把检测结果以 JSON 形式写入文件
  pub fn record(&self, result: &DetectResult, labels: &LabelTable) -> Result<(), RecordError> {
    let detections: Vec<_> = result
      .items
      .iter()
      .map(|item| {
        json!({
          "label": labels.name(item.class_id),
          "class_id": item.class_id,
          "confidence": item.score,
          "bbox": item.bbox,
        })
      })
      .collect();

    let record = json!({
      "timestamp": Utc::now().to_rfc3339(),
      "count": result.len(),
      "detections": detections,
    });

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&self.path, serde_json::to_string_pretty(&record)?)?;

    info!("保存检测记录: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;

  #[test]
  fn record_lists_every_detection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("record.json");

    let result = DetectResult {
      items: Box::new([
        DetectItem {
          class_id: 0,
          score: 0.9,
          bbox: [10.0, 20.0, 30.0, 40.0],
        },
        DetectItem {
          class_id: 4,
          score: 0.5,
          bbox: [1.0, 2.0, 3.0, 4.0],
        },
      ]),
    };
    let labels = LabelTable::default();

    RecordOutput::new(&path).record(&result, &labels).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(value["count"], 2);
    assert_eq!(value["detections"][0]["label"], "fish");
    assert_eq!(value["detections"][1]["label"], "shark");
    assert_eq!(value["detections"][1]["class_id"], 4);
    assert!(value["timestamp"].is_string());
  }

  #[test]
  fn record_of_empty_result_has_zero_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");

    let result = DetectResult { items: Box::new([]) };
    RecordOutput::new(&path)
      .record(&result, &LabelTable::default())
      .unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["count"], 0);
    assert_eq!(value["detections"].as_array().unwrap().len(), 0);
  }
}
