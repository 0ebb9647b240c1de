// 该文件是 Jianying （鉴影） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, warn};

use crate::{
  frame::PixelBuffer,
  model::DetectionRecord,
  output::{OutputError, try_encode},
};

const LABEL_FONT_SIZE: f32 = 40.0;
const LABEL_TEXT_OFFSET: i32 = 5;
const BOX_THICKNESS: i32 = 4;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const MARGIN_RATIO: f64 = 0.01;

/// 检测框绘制器，未提供字体时只绘制边框
pub struct Draw {
  thickness: i32,
  color: [u8; 3],
  font_size: f32,
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
      color: BOX_COLOR,
      font_size: LABEL_FONT_SIZE,
      font: None,
    }
  }
}

impl Draw {
  pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, OutputError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data).map_err(|e| OutputError::FontError(e.to_string()))?;
    Ok(self.with_font(font))
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn color(mut self, color: [u8; 3]) -> Self {
    self.color = color;
    self
  }

  /// 绘制一条记录，框的四边收缩到距图像边缘 `round(0.01·宽)` 像素以内
  fn draw_record(&self, image: &mut RgbImage, record: &DetectionRecord) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let margin = (MARGIN_RATIO * w as f64).round() as i32;

    let left = record.pos_x.max(margin);
    let top = record.pos_y.max(margin);
    let right = record.pos_x.saturating_add(record.width).min(w - margin);
    let bottom = record.pos_y.saturating_add(record.height).min(h - margin);

    // 图像外的边不可见，收缩到图像附近即可
    let (lo, hi) = (-self.thickness, w.max(h) + self.thickness);
    let (x0, x1) = (left.min(right).clamp(lo, hi), left.max(right).clamp(lo, hi));
    let (y0, y1) = (top.min(bottom).clamp(lo, hi), top.max(bottom).clamp(lo, hi));

    // 线宽以框线为中心向两侧展开
    let inner = self.thickness / 2;
    for t in -inner..(self.thickness - inner) {
      let width = x1 - x0 + 1 + 2 * t;
      let height = y1 - y0 + 1 + 2 * t;
      if width <= 0 || height <= 0 {
        continue;
      }
      let rect = Rect::at(x0 - t, y0 - t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }

    if let Some(font) = &self.font {
      let text_y = (y0 - LABEL_TEXT_OFFSET - self.font_size as i32).max(0);
      draw_text_mut(
        image,
        Rgb(self.color),
        x0,
        text_y,
        PxScale::from(self.font_size),
        font,
        &record.label,
      );
    }
  }

  pub fn draw_records(&self, image: &mut RgbImage, records: &[DetectionRecord]) {
    for record in records {
      self.draw_record(image, record);
    }
    debug!("绘制 {} 个检测框", records.len());
  }

  /// 在压缩图像上绘制检测结果并重新编码为 JPEG；失败时原样返回输入
  pub fn label_image(&self, data: &[u8], records: &[DetectionRecord]) -> Vec<u8> {
    let mut image = match image::load_from_memory(data) {
      Ok(image) => image.to_rgb8(),
      Err(e) => {
        warn!("无法解码待标注图像: {}", e);
        return data.to_vec();
      }
    };

    self.draw_records(&mut image, records);
    match try_encode(&PixelBuffer::from(&image), ImageFormat::Jpeg) {
      Ok(encoded) => encoded,
      Err(e) => {
        warn!("标注图像编码失败: {}", e);
        data.to_vec()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::output::encode_png;

  fn record(pos_x: i32, pos_y: i32, width: i32, height: i32) -> DetectionRecord {
    DetectionRecord {
      label: "cat".to_string(),
      confidence: 0.9,
      width,
      height,
      pos_x,
      pos_y,
    }
  }

  #[test]
  fn draws_red_box() {
    let mut image = RgbImage::new(100, 100);
    Draw::default().draw_records(&mut image, &[record(20, 20, 30, 30)]);

    assert_eq!(image.get_pixel(20, 35), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(50, 35), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(35, 35), &Rgb([0, 0, 0]));
  }

  #[test]
  fn box_is_clamped_to_margin() {
    let mut image = RgbImage::new(100, 100);
    Draw::default().draw_records(&mut image, &[record(-10, -10, 30, 30)]);

    // 边距为 round(0.01·100) = 1
    assert_eq!(image.get_pixel(1, 10), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(10, 1), &Rgb(BOX_COLOR));
  }

  #[test]
  fn extreme_records_do_not_overflow() {
    let mut image = RgbImage::new(50, 50);
    let draw = Draw::default().color([0, 255, 0]);
    draw.draw_records(
      &mut image,
      &[
        record(i32::MAX, i32::MAX, i32::MAX, i32::MAX),
        record(i32::MIN, i32::MIN, i32::MIN, i32::MIN),
        record(10, 10, i32::MAX, i32::MAX),
      ],
    );
    // 第三条记录被收缩到边距内，左上角为绿色
    assert_eq!(image.get_pixel(10, 10), &Rgb([0, 255, 0]));
  }

  #[test]
  fn undecodable_input_is_returned_unchanged() {
    let data = b"not an image".to_vec();
    assert_eq!(Draw::default().label_image(&data, &[record(0, 0, 1, 1)]), data);
  }

  #[test]
  fn labelled_output_is_jpeg() {
    let data = encode_png(&PixelBuffer::new(40, 30, 3));
    let labelled = Draw::default().label_image(&data, &[record(5, 5, 10, 10)]);
    assert_eq!(&labelled[..2], &[0xFF, 0xD8]);
  }

  #[test]
  fn bad_font_file_is_rejected() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"not a font").unwrap();
    assert!(matches!(
      Draw::default().with_font_file(file.path()),
      Err(OutputError::FontError(_))
    ));
  }
}
