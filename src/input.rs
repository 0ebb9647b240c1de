// 该文件是 Jianying （鉴影） 项目的一部分。
// src/input.rs - 图像输入与解码
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

use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::PixelBuffer;

mod read_image_file;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("输入数据为空")]
  Empty,
}

/// 解码压缩图像字节（JPEG/PNG）
pub fn try_decode(data: &[u8]) -> Result<PixelBuffer, InputError> {
  if data.is_empty() {
    return Err(InputError::Empty);
  }

  let image = image::load_from_memory(data)?;
  debug!(
    "解码图像: {}x{}, 颜色类型 {:?}",
    image.width(),
    image.height(),
    image.color()
  );
  Ok(PixelBuffer::from(&image))
}

/// 解码压缩图像字节；失败时返回零尺寸帧
pub fn decode_bytes(data: &[u8]) -> PixelBuffer {
  match try_decode(data) {
    Ok(frame) => frame,
    Err(InputError::Empty) => PixelBuffer::empty(),
    Err(e) => {
      warn!("图像解码失败: {}", e);
      PixelBuffer::empty()
    }
  }
}

/// 读取图像尺寸 (宽, 高)；无法解码时为 (0, 0)
pub fn image_size(data: &[u8]) -> (u32, u32) {
  if data.is_empty() {
    return (0, 0);
  }
  image::ImageReader::new(std::io::Cursor::new(data))
    .with_guessed_format()
    .ok()
    .and_then(|reader| reader.into_dimensions().ok())
    .unwrap_or((0, 0))
}
