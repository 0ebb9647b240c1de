// 该文件是 Jianying （鉴影） 项目的一部分。
// src/frame.rs - 平面（逐通道）浮点帧定义
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

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use thiserror::Error;

pub const RGB_CHANNELS: usize = 3;
pub const RGBA_CHANNELS: usize = 4;
pub const ALPHA_BAND: usize = 3;
pub const OPAQUE: f32 = 255.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 多通道浮点图像，每个通道一个 `W×H` 平面（与 NCHW 布局一致）。
///
/// 同一帧内所有通道的宽高相同。
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
  width: usize,
  height: usize,
  bands: Vec<Box<[f32]>>,
}

impl Default for PixelBuffer {
  fn default() -> Self {
    Self::empty()
  }
}

impl PixelBuffer {
  /// 分配一个全零的帧
  pub fn new(width: usize, height: usize, num_bands: usize) -> Self {
    let bands = (0..num_bands)
      .map(|_| vec![0.0f32; width * height].into_boxed_slice())
      .collect();
    Self {
      width,
      height,
      bands,
    }
  }

  /// 零尺寸帧，解码失败时的哨兵值
  pub fn empty() -> Self {
    Self {
      width: 0,
      height: 0,
      bands: Vec::new(),
    }
  }

  pub fn from_bands(
    width: usize,
    height: usize,
    bands: Vec<Vec<f32>>,
  ) -> Result<Self, FrameError> {
    let expected = width * height;
    if let Some(bad) = bands.iter().find(|band| band.len() != expected) {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: bad.len(),
      });
    }

    Ok(Self {
      width,
      height,
      bands: bands.into_iter().map(Vec::into_boxed_slice).collect(),
    })
  }

  /// 按新的尺寸重新分配，保留通道数量，内容清零
  pub fn reshape(&mut self, width: usize, height: usize) {
    *self = Self::new(width, height, self.bands.len());
  }

  pub fn create_same_shape(&self) -> Self {
    Self::new(self.width, self.height, self.bands.len())
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn num_bands(&self) -> usize {
    self.bands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn band(&self, band: usize) -> &[f32] {
    &self.bands[band]
  }

  pub fn band_mut(&mut self, band: usize) -> &mut [f32] {
    &mut self.bands[band]
  }

  #[inline]
  pub fn index(&self, x: usize, y: usize) -> usize {
    y * self.width + x
  }

  #[inline]
  pub fn get(&self, band: usize, x: usize, y: usize) -> f32 {
    self.bands[band][y * self.width + x]
  }

  #[inline]
  pub fn set(&mut self, band: usize, x: usize, y: usize, value: f32) {
    let idx = y * self.width + x;
    self.bands[band][idx] = value;
  }

  /// 像素的 alpha 值；没有 alpha 通道时视为完全不透明
  #[inline]
  pub fn alpha(&self, x: usize, y: usize) -> f32 {
    if self.bands.len() > ALPHA_BAND {
      self.get(ALPHA_BAND, x, y)
    } else {
      OPAQUE
    }
  }

  /// 读取 RGB 三个通道；单通道帧视为灰度
  #[inline]
  pub fn rgb(&self, x: usize, y: usize) -> [f32; 3] {
    let idx = y * self.width + x;
    if self.bands.len() >= RGB_CHANNELS {
      [self.bands[0][idx], self.bands[1][idx], self.bands[2][idx]]
    } else {
      let v = self.bands[0][idx];
      [v, v, v]
    }
  }

  /// 叠加到黑色背景后的 RGB：各通道乘以 `alpha / 255`
  #[inline]
  pub fn composite_rgb(&self, x: usize, y: usize) -> [f32; 3] {
    let rgb = self.rgb(x, y);
    if self.bands.len() <= ALPHA_BAND {
      return rgb;
    }
    let alpha = self.alpha(x, y);
    rgb.map(|v| v * alpha / OPAQUE)
  }

  /// 去掉 alpha 的三通道 RGB 帧，半透明像素叠加到黑色背景
  pub fn flatten(&self) -> PixelBuffer {
    if self.bands.len() == RGB_CHANNELS {
      return self.clone();
    }

    let mut out = PixelBuffer::new(self.width, self.height, RGB_CHANNELS);
    if self.bands.is_empty() {
      return out;
    }
    for y in 0..self.height {
      for x in 0..self.width {
        let idx = self.index(x, y);
        for (c, v) in self.composite_rgb(x, y).into_iter().enumerate() {
          out.bands[c][idx] = v;
        }
      }
    }
    out
  }

  /// 量化为 8 位 RGB 图像（四舍五入并截断到 [0, 255]），alpha 叠加到黑色背景
  pub fn to_rgb_image(&self) -> RgbImage {
    let (width, height) = (self.width as u32, self.height as u32);
    if self.bands.is_empty() {
      return RgbImage::new(width, height);
    }

    RgbImage::from_fn(width, height, |x, y| {
      let [r, g, b] = self.composite_rgb(x as usize, y as usize);
      Rgb([quantize(r), quantize(g), quantize(b)])
    })
  }
}

#[inline]
pub fn quantize(value: f32) -> u8 {
  value.round().clamp(0.0, 255.0) as u8
}

impl From<&RgbImage> for PixelBuffer {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut frame = PixelBuffer::new(width, height, RGB_CHANNELS);

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = frame.index(x as usize, y as usize);
      for c in 0..RGB_CHANNELS {
        frame.bands[c][idx] = pixel[c] as f32;
      }
    }
    frame
  }
}

impl From<&RgbaImage> for PixelBuffer {
  fn from(image: &RgbaImage) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut frame = PixelBuffer::new(width, height, RGBA_CHANNELS);

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = frame.index(x as usize, y as usize);
      for c in 0..RGBA_CHANNELS {
        frame.bands[c][idx] = pixel[c] as f32;
      }
    }
    frame
  }
}

impl From<&DynamicImage> for PixelBuffer {
  /// 有 alpha 的图像保留四个通道，其余转为 RGB 三通道
  fn from(image: &DynamicImage) -> Self {
    if image.color().has_alpha() {
      PixelBuffer::from(&image.to_rgba8())
    } else {
      PixelBuffer::from(&image.to_rgb8())
    }
  }
}
