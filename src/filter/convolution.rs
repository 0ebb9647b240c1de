// 该文件是 Jianying （鉴影） 项目的一部分。
// src/filter/convolution.rs - 均值滤波、卷积与 Sobel 梯度
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

use crate::{color::luma, filter::FilterError, frame::PixelBuffer};

const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// 奇数边长的方形卷积核，按行存储
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
  size: usize,
  weights: Vec<f32>,
}

impl Kernel {
  pub fn new(size: usize, weights: Vec<f32>) -> Result<Self, FilterError> {
    if size % 2 == 0 || weights.len() != size * size {
      return Err(FilterError::InvalidKernel {
        size,
        len: weights.len(),
      });
    }
    Ok(Self { size, weights })
  }

  pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, FilterError> {
    let size = rows.len();
    if let Some(bad) = rows.iter().find(|row| row.len() != size) {
      return Err(FilterError::InvalidKernel {
        size,
        len: bad.len(),
      });
    }
    Self::new(size, rows.concat())
  }

  pub fn sobel_x() -> Self {
    Self {
      size: 3,
      weights: SOBEL_X.to_vec(),
    }
  }

  pub fn sobel_y() -> Self {
    Self {
      size: 3,
      weights: SOBEL_Y.to_vec(),
    }
  }

  pub fn size(&self) -> usize {
    self.size
  }

  pub fn radius(&self) -> usize {
    (self.size - 1) / 2
  }

  #[inline]
  pub fn get(&self, row: usize, col: usize) -> f32 {
    self.weights[row * self.size + col]
  }
}

/// 均值滤波，窗口半径 `size / 2`
///
/// 越界的邻域像素既不计入总和也不计入个数，因此边缘像素的样本更少。
pub fn mean_filter(frame: &PixelBuffer, size: usize) -> PixelBuffer {
  let radius = (size / 2) as isize;
  let (w, h) = (frame.width() as isize, frame.height() as isize);
  let mut out = frame.create_same_shape();

  for band in 0..frame.num_bands() {
    let input = frame.band(band);
    let output = out.band_mut(band);
    for y in 0..h {
      for x in 0..w {
        let mut total = 0.0f32;
        let mut weight = 0.0f32;
        for i in (y - radius).max(0)..=(y + radius).min(h - 1) {
          for j in (x - radius).max(0)..=(x + radius).min(w - 1) {
            weight += 1.0;
            total += input[(i * w + j) as usize];
          }
        }
        output[(y * w + x) as usize] = total / weight;
      }
    }
  }
  out
}

/// 逐通道卷积：`out(x, y) = Σ in(x+i, y+j)·K[j+r][i+r]`
///
/// 累加器为整数，每累加一项即向零取整。
/// 只计算卷积核完全落在图像内的位置，宽 `r` 的边框保持为 0。
pub fn convolve(frame: &PixelBuffer, kernel: &Kernel) -> PixelBuffer {
  let r = kernel.radius() as isize;
  let (w, h) = (frame.width() as isize, frame.height() as isize);
  let mut out = frame.create_same_shape();

  for band in 0..frame.num_bands() {
    let input = frame.band(band);
    let output = out.band_mut(band);
    for y in r..(h - r) {
      for x in r..(w - r) {
        let mut acc = 0i32;
        for i in -r..=r {
          for j in -r..=r {
            let k = kernel.get((j + r) as usize, (i + r) as usize);
            acc = (acc as f32 + input[((y + j) * w + (x + i)) as usize] * k) as i32;
          }
        }
        output[(y * w + x) as usize] = acc as f32;
      }
    }
  }
  out
}

/// 灰度化后计算 Sobel 梯度幅值，取整并截断到 [0, 255]，输出单通道
pub fn sobel(frame: &PixelBuffer) -> PixelBuffer {
  let (w, h) = (frame.width(), frame.height());
  let mut gray = PixelBuffer::new(w, h, 1);
  for y in 0..h {
    for x in 0..w {
      let [r, g, b] = frame.rgb(x, y);
      gray.set(0, x, y, luma(r, g, b));
    }
  }

  let gx = convolve(&gray, &Kernel::sobel_x());
  let gy = convolve(&gray, &Kernel::sobel_y());

  let mut out = PixelBuffer::new(w, h, 1);
  for (m, (&dx, &dy)) in out
    .band_mut(0)
    .iter_mut()
    .zip(gx.band(0).iter().zip(gy.band(0)))
  {
    let (dx, dy) = (dx as f64, dy as f64);
    let magnitude = (dx * dx + dy * dy).sqrt() as i32;
    *m = magnitude.clamp(0, 255) as f32;
  }
  out
}
