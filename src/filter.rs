// 该文件是 Jianying （鉴影） 项目的一部分。
// src/filter.rs - 像素滤镜
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

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  frame::PixelBuffer,
  input::decode_bytes,
  output::encode_jpeg,
};

mod convolution;
mod histogram_render;
mod pixel;

pub use self::convolution::{Kernel, convolve, mean_filter, sobel};
pub use self::histogram_render::{
  HUE_HISTOGRAM_HEIGHT, hue_histogram_image, hue_saturation_histogram_image,
};
pub use self::pixel::{grayscale, hue_filter};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
  #[error("卷积核无效: 边长 {size}, 权重数量 {len}")]
  InvalidKernel { size: usize, len: usize },
  #[error("未知滤镜: {0}")]
  UnknownFilter(String),
  #[error("滤镜 {0} 需要参数")]
  MissingParameter(String),
  #[error("滤镜 {name} 参数无效: {value}")]
  InvalidParameter { name: String, value: i32 },
}

/// 按名称选择的滤镜
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
  Gray,
  Sobel,
  Histogram,
  Histogram2D,
  Mean(usize),
  Color(i32),
}

impl Filter {
  /// `Gray`、`Sobel`、`Histogram`、`Histogram2D` 不带参数；`Mean`、`Color` 需要整数参数
  pub fn from_name(name: &str, param: Option<i32>) -> Result<Self, FilterError> {
    let require = || param.ok_or_else(|| FilterError::MissingParameter(name.to_string()));
    match name {
      "Gray" => Ok(Filter::Gray),
      "Sobel" => Ok(Filter::Sobel),
      "Histogram" => Ok(Filter::Histogram),
      "Histogram2D" => Ok(Filter::Histogram2D),
      "Mean" => {
        let size = require()?;
        usize::try_from(size)
          .map(Filter::Mean)
          .map_err(|_| FilterError::InvalidParameter {
            name: name.to_string(),
            value: size,
          })
      }
      "Color" => Ok(Filter::Color(require()?)),
      _ => Err(FilterError::UnknownFilter(name.to_string())),
    }
  }

  pub fn apply(&self, frame: &PixelBuffer) -> PixelBuffer {
    if frame.is_empty() {
      return PixelBuffer::empty();
    }
    let frame = frame.flatten();
    match *self {
      Filter::Gray => grayscale(&frame),
      Filter::Sobel => sobel(&frame),
      Filter::Histogram => hue_histogram_image(&frame),
      Filter::Histogram2D => hue_saturation_histogram_image(&frame),
      Filter::Mean(size) => mean_filter(&frame, size),
      Filter::Color(hue) => hue_filter(&frame, hue),
    }
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Filter::Gray => write!(f, "Gray"),
      Filter::Sobel => write!(f, "Sobel"),
      Filter::Histogram => write!(f, "Histogram"),
      Filter::Histogram2D => write!(f, "Histogram2D"),
      Filter::Mean(size) => write!(f, "Mean({})", size),
      Filter::Color(hue) => write!(f, "Color({})", hue),
    }
  }
}

/// 解码、应用滤镜、编码为 JPEG；任一步失败时返回空字节
pub fn apply_filter(data: &[u8], filter: &Filter) -> Vec<u8> {
  let frame = decode_bytes(data);
  if frame.is_empty() {
    warn!("滤镜 {} 的输入无法解码", filter);
    return Vec::new();
  }

  debug!("应用滤镜 {} 到 {}x{}", filter, frame.width(), frame.height());
  encode_jpeg(&filter.apply(&frame))
}
