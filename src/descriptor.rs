// 该文件是 Jianying （鉴影） 项目的一部分。
// src/descriptor.rs - 图像描述子
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
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::PixelBuffer,
  histogram::{hsv_histogram, rgb_histogram},
  input::decode_bytes,
  model::{Backend, DetectionRecord, Detector},
  similarity::{SimilarityError, SimilarityResult, rank},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
  #[error("未知的描述子类型: {0}")]
  UnknownKind(String),
}

/// 单调递增的图像编号分配器
#[derive(Debug, Default)]
pub struct IdAllocator {
  next: AtomicU64,
}

impl IdAllocator {
  pub fn new() -> Self {
    Self::default()
  }

  /// 从已有的最大编号之后继续分配
  pub fn starting_at(first: u64) -> Self {
    Self {
      next: AtomicU64::new(first),
    }
  }

  pub fn allocate(&self) -> u64 {
    self.next.fetch_add(1, Ordering::Relaxed)
  }

  pub fn peek(&self) -> u64 {
    self.next.load(Ordering::Relaxed)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorKind {
  #[serde(rename = "hshist")]
  HueSaturation,
  #[serde(rename = "rgbhist")]
  Rgb,
}

impl FromStr for DescriptorKind {
  type Err = DescriptorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "hshist" => Ok(DescriptorKind::HueSaturation),
      "rgbhist" => Ok(DescriptorKind::Rgb),
      _ => Err(DescriptorError::UnknownKind(s.to_string())),
    }
  }
}

impl fmt::Display for DescriptorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DescriptorKind::HueSaturation => write!(f, "hshist"),
      DescriptorKind::Rgb => write!(f, "rgbhist"),
    }
  }
}

/// 一张图像的全部视觉描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
  pub id: u64,
  pub name: String,
  pub width: u32,
  pub height: u32,
  pub hue_saturation: Vec<f64>,
  pub rgb: Vec<f64>,
  pub objects: Vec<DetectionRecord>,
}

impl ImageDescriptor {
  /// 计算尺寸与两种直方图；无法解码的图像尺寸为 0×0，直方图为空
  pub fn describe(id: u64, name: impl Into<String>, data: &[u8]) -> Self {
    let frame = decode_bytes(data);
    Self::from_frame(id, name.into(), &frame)
  }

  /// 同 [`ImageDescriptor::describe`]，并附带目标检测结果
  pub fn describe_with<B: Backend>(
    id: u64,
    name: impl Into<String>,
    data: &[u8],
    detector: &Detector<B>,
  ) -> Self {
    let frame = decode_bytes(data);
    let mut descriptor = Self::from_frame(id, name.into(), &frame);
    descriptor.objects = detector.detect_records(&frame);
    info!(
      "图像 {} ({}) 检测到 {} 个目标",
      descriptor.id,
      descriptor.name,
      descriptor.objects.len()
    );
    descriptor
  }

  fn from_frame(id: u64, name: String, frame: &PixelBuffer) -> Self {
    let (hue_saturation, rgb) = if frame.is_empty() {
      (Vec::new(), Vec::new())
    } else {
      (
        hsv_histogram(frame).into_vec(),
        rgb_histogram(frame).into_vec(),
      )
    };
    debug!("描述图像 {} ({}): {}x{}", id, name, frame.width(), frame.height());

    Self {
      id,
      name,
      width: frame.width() as u32,
      height: frame.height() as u32,
      hue_saturation,
      rgb,
      objects: Vec::new(),
    }
  }

  pub fn histogram(&self, kind: DescriptorKind) -> &[f64] {
    match kind {
      DescriptorKind::HueSaturation => &self.hue_saturation,
      DescriptorKind::Rgb => &self.rgb,
    }
  }
}

/// 按指定描述子类型，对参考图像之外的图像按距离排序
pub fn rank_descriptors(
  query_id: u64,
  descriptors: &[ImageDescriptor],
  kind: DescriptorKind,
  max_results: usize,
) -> Result<Vec<SimilarityResult<u64>>, SimilarityError> {
  rank(
    &query_id,
    descriptors.iter().map(|d| (d.id, d.histogram(kind))),
    max_results,
  )
}

#[cfg(test)]
mod tests {
  use image::{Rgb, RgbImage};

  use super::*;
  use crate::output::encode_png;

  fn png(color: [u8; 3]) -> Vec<u8> {
    encode_png(&PixelBuffer::from(&RgbImage::from_pixel(6, 4, Rgb(color))))
  }

  #[test]
  fn ids_are_sequential() {
    let ids = IdAllocator::starting_at(5);
    assert_eq!(ids.allocate(), 5);
    assert_eq!(ids.allocate(), 6);
    assert_eq!(ids.peek(), 7);
    assert_eq!(IdAllocator::new().allocate(), 0);
  }

  #[test]
  fn kind_names() {
    assert_eq!("hshist".parse(), Ok(DescriptorKind::HueSaturation));
    assert_eq!("rgbhist".parse(), Ok(DescriptorKind::Rgb));
    assert_eq!(
      "labhist".parse::<DescriptorKind>(),
      Err(DescriptorError::UnknownKind("labhist".to_string()))
    );
    assert_eq!(DescriptorKind::Rgb.to_string(), "rgbhist");
  }

  #[test]
  fn describes_decodable_image() {
    let descriptor = ImageDescriptor::describe(3, "red.png", &png([255, 0, 0]));
    assert_eq!((descriptor.width, descriptor.height), (6, 4));
    assert_eq!(descriptor.rgb.len(), 1000);
    assert_eq!(descriptor.hue_saturation.len(), 144);
    let norm: f64 = descriptor.rgb.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-9);
  }

  #[test]
  fn undecodable_image_has_no_descriptor() {
    let descriptor = ImageDescriptor::describe(0, "broken.jpg", b"\x00\x01");
    assert_eq!((descriptor.width, descriptor.height), (0, 0));
    assert!(descriptor.rgb.is_empty());
    assert!(descriptor.hue_saturation.is_empty());
  }

  #[test]
  fn ranks_by_kind() {
    let ids = IdAllocator::new();
    let descriptors = vec![
      ImageDescriptor::describe(ids.allocate(), "red", &png([255, 0, 0])),
      ImageDescriptor::describe(ids.allocate(), "blue", &png([0, 0, 255])),
      ImageDescriptor::describe(ids.allocate(), "red2", &png([250, 5, 5])),
      ImageDescriptor::describe(ids.allocate(), "broken", b""),
    ];

    let results = rank_descriptors(0, &descriptors, DescriptorKind::Rgb, 5).unwrap();
    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(results[0].distance, 0.0);

    assert!(matches!(
      rank_descriptors(3, &descriptors, DescriptorKind::HueSaturation, 5),
      Err(SimilarityError::UnknownReference(_))
    ));
  }

  #[test]
  fn serializes_with_objects() {
    let descriptor = ImageDescriptor::describe(9, "red.png", &png([255, 0, 0]));
    let json = serde_json::to_value(&descriptor).unwrap();
    assert_eq!(json["id"], 9);
    assert_eq!(json["objects"].as_array().map(Vec::len), Some(0));
  }
}
