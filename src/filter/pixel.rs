// 该文件是 Jianying （鉴影） 项目的一部分。
// src/filter/pixel.rs - 逐像素滤镜
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
  color::{hsv_to_rgb, luma, rgb_to_hsv},
  frame::{PixelBuffer, RGB_CHANNELS},
};

/// 灰度化，三个颜色通道均替换为亮度
pub fn grayscale(frame: &PixelBuffer) -> PixelBuffer {
  let mut out = PixelBuffer::new(frame.width(), frame.height(), RGB_CHANNELS);
  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      let v = luma(r, g, b);
      for c in 0..RGB_CHANNELS {
        out.set(c, x, y, v);
      }
    }
  }
  out
}

/// 将所有像素的色相替换为 `hue` 度，保留饱和度与明度，各通道向零取整
pub fn hue_filter(frame: &PixelBuffer, hue: i32) -> PixelBuffer {
  let target = (hue as f64).to_radians() as f32;
  let mut out = PixelBuffer::new(frame.width(), frame.height(), RGB_CHANNELS);

  for y in 0..frame.height() {
    for x in 0..frame.width() {
      let [r, g, b] = frame.rgb(x, y);
      let mut hsv = rgb_to_hsv(r, g, b);
      hsv.h = target;
      for (c, v) in hsv_to_rgb(hsv).into_iter().enumerate() {
        out.set(c, x, y, v.trunc());
      }
    }
  }
  out
}
