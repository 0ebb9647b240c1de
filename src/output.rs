// 该文件是 Jianying （鉴影） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::PixelBuffer;

#[cfg(feature = "label_image")]
pub mod draw;

mod json_record;
pub use self::json_record::JsonRecordOutput;

mod save_image_file;
pub use self::save_image_file::SaveImageFileOutput;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("字体加载失败: {0}")]
  FontError(String),
  #[error("帧为空, 无法编码")]
  EmptyFrame,
}

/// 将帧量化为 8 位 RGB 并编码
pub fn try_encode(frame: &PixelBuffer, format: ImageFormat) -> Result<Vec<u8>, OutputError> {
  if frame.is_empty() {
    return Err(OutputError::EmptyFrame);
  }

  let image = DynamicImage::ImageRgb8(frame.to_rgb_image());
  let mut data = Vec::new();
  image.write_to(&mut Cursor::new(&mut data), format)?;
  debug!(
    "编码图像: {}x{} -> {:?}, {} 字节",
    frame.width(),
    frame.height(),
    format,
    data.len()
  );
  Ok(data)
}

fn encode_or_empty(frame: &PixelBuffer, format: ImageFormat) -> Vec<u8> {
  try_encode(frame, format).unwrap_or_else(|e| {
    warn!("图像编码失败: {}", e);
    Vec::new()
  })
}

/// 编码为 JPEG；失败时返回空字节
pub fn encode_jpeg(frame: &PixelBuffer) -> Vec<u8> {
  encode_or_empty(frame, ImageFormat::Jpeg)
}

/// 编码为 PNG；失败时返回空字节
pub fn encode_png(frame: &PixelBuffer) -> Vec<u8> {
  encode_or_empty(frame, ImageFormat::Png)
}
