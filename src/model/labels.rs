// 该文件是 Haiyan （海眼） 项目的一部分。
// src/model/labels.rs - 类别标签表
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

use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// 内置海洋生物类别名称
pub const MARINE_CLASSES: [&str; 7] = [
  "fish",
  "jellyfish",
  "penguin",
  "puffin",
  "shark",
  "starfish",
  "stingray",
];

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件为空: {0}")]
  EmptyFile(String),
}

/// 类别编号到名称的映射，在模型加载后保持不变。
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl Default for LabelTable {
  fn default() -> Self {
    LabelTable {
      names: MARINE_CLASSES.iter().map(|name| name.to_string()).collect(),
    }
  }
}

impl LabelTable {
  /// 从文本文件加载标签，每行一个，忽略空行。
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelTableError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let names: Box<[String]> = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();

    if names.is_empty() {
      return Err(LabelTableError::EmptyFile(path.display().to_string()));
    }

    debug!("从 {} 加载了 {} 个标签", path.display(), names.len());
    Ok(LabelTable { names })
  }

  pub fn name(&self, class_id: u32) -> &str {
    self
      .names
      .get(class_id as usize)
      .map(String::as_str)
      .unwrap_or("unknown")
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
