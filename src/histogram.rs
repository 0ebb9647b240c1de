// 该文件是 Jianying （鉴影） 项目的一部分。
// src/histogram.rs - 颜色直方图描述子
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

//! 颜色直方图描述子。
//!
//! 两种描述子：RGB 三维直方图（每通道 10 个分箱）与色相/饱和度二维直方图
//! （各 12 个分箱）。每个像素按 `alpha / 255` 加权累加，结果做 L2 归一化。
//! 空输入得到长度为 0 的向量，下游以此判断“没有描述子”。

use std::f64::consts::TAU;

use tracing::{debug, warn};

use crate::color::rgb_to_hsv;
use crate::frame::{OPAQUE, PixelBuffer};
use crate::input::decode_bytes;

pub const RGB_BINS: usize = 10;
pub const HUE_BINS: usize = 12;
pub const SATURATION_BINS: usize = 12;

/// 固定形状的稠密直方图，按行主序展开（第一维权重最高）
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
  shape: Vec<usize>,
  ranges: Vec<(f64, f64)>,
  strides: Vec<usize>,
  data: Vec<f64>,
}

impl Histogram {
  /// 创建全零直方图，各维范围默认 [0, 1]
  pub fn new(shape: &[usize]) -> Self {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
      strides[i] = strides[i + 1] * shape[i + 1];
    }

    Self {
      shape: shape.to_vec(),
      ranges: vec![(0.0, 1.0); shape.len()],
      strides,
      data: vec![0.0; shape.iter().product()],
    }
  }

  pub fn with_range(mut self, dimension: usize, min: f64, max: f64) -> Self {
    self.ranges[dimension] = (min, max);
    self
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  /// 将某一维的原始值映射为分箱序号
  ///
  /// 等于上界的值落入最后一个分箱，NaN 落入第 0 个。
  pub fn dimension_index(&self, dimension: usize, value: f64) -> usize {
    let (min, max) = self.ranges[dimension];
    let bins = self.shape[dimension];
    let fraction = (value - min) / (max - min);
    ((fraction * bins as f64) as usize).min(bins - 1)
  }

  pub fn index(&self, coordinate: &[usize]) -> usize {
    coordinate
      .iter()
      .zip(&self.strides)
      .map(|(c, s)| c * s)
      .sum()
  }

  /// 对一组原始值定位分箱并累加权重
  pub fn accumulate(&mut self, values: &[f64], weight: f64) {
    let mut index = 0;
    for (dimension, &value) in values.iter().enumerate() {
      index += self.dimension_index(dimension, value) * self.strides[dimension];
    }
    self.data[index] += weight;
  }

  pub fn get(&self, coordinate: &[usize]) -> f64 {
    self.data[self.index(coordinate)]
  }

  pub fn norm(&self) -> f64 {
    self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
  }

  /// L2 归一化；范数为 0 时保持原样
  pub fn normalize_l2(&mut self) {
    let norm = self.norm();
    if norm == 0.0 {
      return;
    }
    for v in self.data.iter_mut() {
      *v /= norm;
    }
  }

  pub fn as_slice(&self) -> &[f64] {
    &self.data
  }

  pub fn into_vec(self) -> Vec<f64> {
    self.data
  }
}

/// RGB 三维直方图，10×10×10，范围 [0, 255]
pub fn rgb_histogram(frame: &PixelBuffer) -> Histogram {
  let mut histogram = Histogram::new(&[RGB_BINS, RGB_BINS, RGB_BINS])
    .with_range(0, 0.0, 255.0)
    .with_range(1, 0.0, 255.0)
    .with_range(2, 0.0, 255.0);

  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      let weight = (frame.alpha(x, y) / OPAQUE) as f64;
      histogram.accumulate(&[r as f64, g as f64, b as f64], weight);
    }
  }

  histogram.normalize_l2();
  histogram
}

/// 色相/饱和度二维直方图，12×12，色相 [0, 2π)，饱和度 [0, 1]
pub fn hsv_histogram(frame: &PixelBuffer) -> Histogram {
  let mut histogram = Histogram::new(&[HUE_BINS, SATURATION_BINS])
    .with_range(0, 0.0, TAU)
    .with_range(1, 0.0, 1.0);

  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      let hsv = rgb_to_hsv(r, g, b);
      let weight = (frame.alpha(x, y) / OPAQUE) as f64;
      histogram.accumulate(&[hsv.h as f64, hsv.s as f64], weight);
    }
  }

  histogram.normalize_l2();
  histogram
}

fn compute_from_bytes(
  data: &[u8],
  name: &str,
  extract: impl Fn(&PixelBuffer) -> Histogram,
) -> Vec<f64> {
  if data.is_empty() {
    return Vec::new();
  }

  let frame = decode_bytes(data);
  if frame.is_empty() {
    warn!("无法计算 {} 直方图: 图像为空或无法解码", name);
    return Vec::new();
  }

  let histogram = extract(&frame);
  debug!(
    "{} 直方图: 形状 {:?}, 范数 {:.6}",
    name,
    histogram.shape(),
    histogram.norm()
  );
  histogram.into_vec()
}

/// 从压缩图像字节计算 RGB 直方图；空输入或解码失败返回空向量
pub fn compute_rgb_histogram(data: &[u8]) -> Vec<f64> {
  compute_from_bytes(data, "RGB", rgb_histogram)
}

/// 从压缩图像字节计算色相/饱和度直方图；空输入或解码失败返回空向量
pub fn compute_hsv_histogram(data: &[u8]) -> Vec<f64> {
  compute_from_bytes(data, "HSV", hsv_histogram)
}
