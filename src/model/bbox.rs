// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model/bbox.rs - 规范化检测框
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinates {
  pub x: i32,
  pub y: i32,
}

impl Coordinates {
  pub fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }
}

/// 轴对齐检测框，构造时规范化为 (左上, 右下)
///
/// 与两个角点的输入顺序无关，相同的规范角点即相同的框。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionBox {
  min: Coordinates,
  max: Coordinates,
}

impl DetectionBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self {
      min: Coordinates::new(x1.min(x2), y1.min(y2)),
      max: Coordinates::new(x1.max(x2), y1.max(y2)),
    }
  }

  pub fn from_points(i: Coordinates, j: Coordinates) -> Self {
    Self::new(i.x, i.y, j.x, j.y)
  }

  pub fn min(&self) -> Coordinates {
    self.min
  }

  pub fn max(&self) -> Coordinates {
    self.max
  }

  pub fn width(&self) -> i32 {
    self.max.x.saturating_sub(self.min.x)
  }

  pub fn height(&self) -> i32 {
    self.max.y.saturating_sub(self.min.y)
  }

  pub fn area(&self) -> f64 {
    self.width() as f64 * self.height() as f64
  }

  /// 交并比；并集面积为 0 时为 0
  pub fn iou(&self, other: &DetectionBox) -> f64 {
    let x1 = self.min.x.max(other.min.x);
    let y1 = self.min.y.max(other.min.y);
    let x2 = self.max.x.min(other.max.x);
    let y2 = self.max.y.min(other.max.y);

    let intersection =
      (x2.saturating_sub(x1).max(0) as f64) * (y2.saturating_sub(y1).max(0) as f64);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}
