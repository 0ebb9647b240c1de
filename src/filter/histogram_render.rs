// 该文件是 Jianying （鉴影） 项目的一部分。
// src/filter/histogram_render.rs - 色相直方图可视化
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

use crate::{
  color::{HUE_DEGREES, SATURATION_PERCENTS, hue_degrees, rgb_to_hsv, saturation_percent},
  frame::PixelBuffer,
};

pub const HUE_HISTOGRAM_HEIGHT: usize = 200;

const FOREGROUND: f32 = 255.0;

/// 一维色相直方图，360×200 单通道画布
///
/// 每个角度一列，柱高按最大计数缩放到画布高度，最底行恒为 255。
pub fn hue_histogram_image(frame: &PixelBuffer) -> PixelBuffer {
  let mut buckets = [0.0f32; HUE_DEGREES];
  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      buckets[hue_degrees(rgb_to_hsv(r, g, b).h)] += 1.0;
    }
  }

  let height = HUE_HISTOGRAM_HEIGHT;
  let mut canvas = PixelBuffer::new(HUE_DEGREES, height, 1);
  for x in 0..HUE_DEGREES {
    canvas.set(0, x, height - 1, FOREGROUND);
  }

  let max = buckets.iter().copied().fold(0.0f32, f32::max);
  if max == 0.0 {
    return canvas;
  }

  let factor = height as f32 / max;
  for (x, &count) in buckets.iter().enumerate() {
    let bar = ((count * factor) as usize).min(height);
    for y in (height - bar)..height {
      canvas.set(0, x, y, FOREGROUND);
    }
  }
  canvas
}

/// 二维色相/饱和度直方图，360×101 单通道画布
///
/// 像素 (色相角度, 饱和度百分比) 的值为计数，截断到 255，不做缩放。
pub fn hue_saturation_histogram_image(frame: &PixelBuffer) -> PixelBuffer {
  let mut counts = vec![0u32; HUE_DEGREES * SATURATION_PERCENTS];
  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      let hsv = rgb_to_hsv(r, g, b);
      let (hue, sat) = (hue_degrees(hsv.h), saturation_percent(hsv.s));
      counts[sat * HUE_DEGREES + hue] += 1;
    }
  }

  let mut canvas = PixelBuffer::new(HUE_DEGREES, SATURATION_PERCENTS, 1);
  for (cell, &count) in canvas.band_mut(0).iter_mut().zip(&counts) {
    *cell = count.min(255) as f32;
  }
  canvas
}
