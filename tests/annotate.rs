// 该文件是 Haiyan （海眼） 项目的一部分。
// tests/annotate.rs - 标注绘制测试
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

use image::{Rgb, RgbImage};

use haiyan::model::{DetectItem, DetectResult, LabelTable};
use haiyan::output::Draw;

const BACKGROUND: Rgb<u8> = Rgb([10, 20, 30]);
const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

fn blank(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, BACKGROUND)
}

fn single(bbox: [f32; 4]) -> DetectResult {
  DetectResult {
    items: Box::new([DetectItem {
      class_id: 0,
      score: 0.9,
      bbox,
    }]),
  }
}

#[test]
fn boxes_are_painted_red_with_three_rings() {
  let mut image = blank(200, 160);
  Draw::default().annotate(
    &mut image,
    &single([40.0, 50.0, 120.0, 140.0]),
    &LabelTable::default(),
  );

  // 外圈: 下边两角与下边、右边中点（标签画在框上方，不影响这些像素）
  assert_eq!(image.get_pixel(40, 140), &BOX_COLOR);
  assert_eq!(image.get_pixel(120, 140), &BOX_COLOR);
  assert_eq!(image.get_pixel(80, 140), &BOX_COLOR);
  assert_eq!(image.get_pixel(120, 95), &BOX_COLOR);

  // 第二、三圈向内收缩一像素
  assert_eq!(image.get_pixel(41, 139), &BOX_COLOR);
  assert_eq!(image.get_pixel(42, 138), &BOX_COLOR);

  // 框内与框外保持原样
  assert_eq!(image.get_pixel(80, 100), &BACKGROUND);
  assert_eq!(image.get_pixel(10, 140), &BACKGROUND);
  assert_eq!(image.dimensions(), (200, 160));
}

#[test]
fn label_text_is_painted_above_the_box() {
  let mut image = blank(200, 160);
  Draw::default().annotate(
    &mut image,
    &single([40.0, 50.0, 120.0, 140.0]),
    &LabelTable::default(),
  );

  // 标签 "fish (0.90)" 画在框上沿上方 12 像素处，条带内必有着色像素
  let band_painted =
    (38..50).any(|y| (40..110).any(|x| image.get_pixel(x, y) != &BACKGROUND));
  assert!(band_painted);

  // 同一条带内远离标签文字处保持原样
  assert_eq!(image.get_pixel(180, 44), &BACKGROUND);
}

#[test]
fn empty_result_leaves_image_untouched() {
  let mut image = blank(64, 64);
  let before = image.clone();

  Draw::default().annotate(
    &mut image,
    &DetectResult { items: Box::new([]) },
    &LabelTable::default(),
  );

  assert_eq!(image.as_raw(), before.as_raw());
}

#[test]
fn out_of_bounds_boxes_are_clamped() {
  let mut image = blank(100, 80);
  Draw::default().annotate(
    &mut image,
    &single([-20.0, -30.0, 60.5, 70.0]),
    &LabelTable::default(),
  );

  // 框被收进图像内: x 上界取 ceil(60.5) = 61
  assert_eq!(image.get_pixel(61, 70), &BOX_COLOR);
  assert_eq!(image.get_pixel(0, 70), &BOX_COLOR);
  assert_eq!(image.get_pixel(0, 35), &BOX_COLOR);
}

#[test]
fn tiny_boxes_do_not_panic() {
  let mut image = blank(32, 32);
  Draw::default().annotate(
    &mut image,
    &single([10.0, 10.0, 11.0, 11.0]),
    &LabelTable::default(),
  );

  assert_eq!(image.dimensions(), (32, 32));
}

#[test]
fn fully_outside_boxes_are_skipped() {
  let mut image = blank(40, 40);
  let before = image.clone();

  Draw::default().annotate(
    &mut image,
    &single([-30.0, -30.0, -10.0, -10.0]),
    &LabelTable::default(),
  );

  // 完全在图像外的框收缩为退化矩形，直接跳过，连标签也不画
  assert_eq!(image.as_raw(), before.as_raw());
}
