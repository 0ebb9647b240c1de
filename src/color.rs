// 该文件是 Jianying （鉴影） 项目的一部分。
// src/color.rs - 颜色空间转换
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

use std::f32::consts::{FRAC_PI_3, TAU};

// 灰度权重
pub const LUMA_RED: f32 = 0.30;
pub const LUMA_GREEN: f32 = 0.59;
pub const LUMA_BLUE: f32 = 0.11;

pub const HUE_DEGREES: usize = 360;
pub const SATURATION_PERCENTS: usize = 101;

#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
  r * LUMA_RED + g * LUMA_GREEN + b * LUMA_BLUE
}

/// HSV 颜色
/// - h: 色相，弧度 [0, 2π)
/// - s: 饱和度 [0, 1]
/// - v: 明度，与输入 RGB 同量纲 [0, 255]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
  pub h: f32,
  pub s: f32,
  pub v: f32,
}

/// RGB 转 HSV，输入为 [0, 255]
///
/// 无彩色像素（灰或黑）色相为 0。
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> Hsv {
  let max = r.max(g).max(b);
  let min = r.min(g).min(b);
  let delta = max - min;

  if max == 0.0 {
    return Hsv {
      h: 0.0,
      s: 0.0,
      v: 0.0,
    };
  }

  let s = delta / max;
  if delta == 0.0 {
    return Hsv { h: 0.0, s, v: max };
  }

  let mut h = if r == max {
    (g - b) / delta
  } else if g == max {
    2.0 + (b - r) / delta
  } else {
    4.0 + (r - g) / delta
  };

  h *= FRAC_PI_3;
  if h < 0.0 {
    h += TAU;
  }

  Hsv { h, s, v: max }
}

/// HSV 转 RGB，输出与 `v` 同量纲
#[inline]
pub fn hsv_to_rgb(hsv: Hsv) -> [f32; 3] {
  let Hsv { h, s, v } = hsv;
  if s == 0.0 {
    return [v, v, v];
  }

  let h = h / FRAC_PI_3;
  let sector = h as i32;
  let remainder = h - sector as f32;

  let p = v * (1.0 - s);
  let q = v * (1.0 - s * remainder);
  let t = v * (1.0 - s * (1.0 - remainder));

  match sector {
    i32::MIN..=0 => [v, t, p],
    1 => [q, v, p],
    2 => [p, v, t],
    3 => [p, q, v],
    4 => [t, p, v],
    _ => [v, p, q],
  }
}

/// 色相取整到角度 [0, 360)
#[inline]
pub fn hue_degrees(h: f32) -> usize {
  ((h as f64).to_degrees() as usize).min(HUE_DEGREES - 1)
}

/// 饱和度取整到百分比 [0, 100]
#[inline]
pub fn saturation_percent(s: f32) -> usize {
  ((s * 100.0) as usize).min(SATURATION_PERCENTS - 1)
}
