// 该文件是 Haiyan （海眼） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::model::{DetectItem, DetectResult, LabelTable};

// 渲染常量
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色边框
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色文本
const BOX_THICKNESS: i32 = 3;
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_OFFSET: i32 = 12; // 标签在边框上方的偏移

pub struct Draw {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
  /// 边框颜色
  box_color: Rgb<u8>,
  /// 文本颜色
  text_color: Rgb<u8>,
  /// 边框粗细
  thickness: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new()
  }
}

impl Draw {
  pub fn new() -> Self {
    // 使用内置的默认字体数据
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");

    Self {
      font,
      font_scale: PxScale::from(LABEL_FONT_SIZE),
      box_color: Rgb(BOX_COLOR),
      text_color: Rgb(TEXT_COLOR),
      thickness: BOX_THICKNESS,
    }
  }

  /// 在图像上绘制全部检测框与标签
  pub fn annotate(&self, image: &mut RgbImage, result: &DetectResult, labels: &LabelTable) {
    for item in result.items.iter() {
      self.draw_item(image, item, labels);
    }
  }

  // bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_item(&self, image: &mut RgbImage, item: &DetectItem, labels: &LabelTable) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let mut x_min = item.bbox[0].floor() as i32;
    let mut y_min = item.bbox[1].floor() as i32;
    let mut x_max = item.bbox[2].ceil() as i32;
    let mut y_max = item.bbox[3].ceil() as i32;

    // Clamp to image bounds
    x_min = x_min.clamp(0, w - 1);
    y_min = y_min.clamp(0, h - 1);
    x_max = x_max.clamp(0, w - 1);
    y_max = y_max.clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 向内收缩绘制多圈边框以加粗，边框含两端像素
    for t in 0..self.thickness {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width < 1 || height < 1 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, self.box_color);
    }

    let label = format!("{} ({:.2})", labels.name(item.class_id), item.score);
    let text_y = (y_min - LABEL_OFFSET).max(0);
    draw_text_mut(
      image,
      self.text_color,
      x_min,
      text_y,
      self.font_scale,
      &self.font,
      &label,
    );
  }
}
