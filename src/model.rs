// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 推理后端：输入预处理后的张量，返回每个输出层的原始矩阵
///
/// 前向推理期间后端可能修改内部状态，因此接收 `&mut self`；
/// 由 [`Detector`] 以互斥锁独占持有。
pub trait Backend: Send {
  type Error: std::error::Error + Send + Sync + 'static;

  fn forward(&mut self, input: &Tensor) -> Result<Vec<OutputMatrix>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("标签文件加载错误: {0}")]
  LabelLoadError(#[from] std::io::Error),
  #[error("标签文件为空: {0}")]
  EmptyLabels(String),
  #[error("推理后端加载失败: {0}")]
  BackendLoadError(String),
  #[error("推理失败: {0}")]
  ForwardError(Box<dyn std::error::Error + Send + Sync>),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("推理后端锁已失效")]
  LockPoisoned,
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数 {name} 无效: {value}")]
  InvalidParameter { name: String, value: String },
}

/// NCHW 浮点张量
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  shape: [usize; 4],
  data: Vec<f32>,
}

impl Tensor {
  pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, DetectorError> {
    let expected = shape.iter().product();
    if data.len() != expected {
      return Err(DetectorError::ShapeMismatch {
        expected,
        actual: data.len(),
      });
    }
    Ok(Self { shape, data })
  }

  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  #[inline]
  pub fn get(&self, n: usize, c: usize, h: usize, w: usize) -> f32 {
    let [_, channels, height, width] = self.shape;
    self.data[((n * channels + c) * height + h) * width + w]
  }
}

/// 一个输出层的原始预测，每行一个候选
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMatrix {
  rows: usize,
  cols: usize,
  data: Vec<f32>,
}

impl OutputMatrix {
  pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, DetectorError> {
    if data.len() != rows * cols {
      return Err(DetectorError::ShapeMismatch {
        expected: rows * cols,
        actual: data.len(),
      });
    }
    Ok(Self { rows, cols, data })
  }

  /// 由逐行数据构造，各行长度必须一致
  pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, DetectorError> {
    let cols = rows.first().map(Vec::len).unwrap_or(0);
    let mut data = Vec::with_capacity(rows.len() * cols);
    for row in rows {
      if row.len() != cols {
        return Err(DetectorError::ShapeMismatch {
          expected: cols,
          actual: row.len(),
        });
      }
      data.extend_from_slice(row);
    }
    Ok(Self {
      rows: rows.len(),
      cols,
      data,
    })
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn row(&self, index: usize) -> &[f32] {
    &self.data[index * self.cols..(index + 1) * self.cols]
  }

  pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
    (0..self.rows).map(move |i| self.row(i))
  }
}

/// 一个类别候选
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
  pub class_id: usize,
  pub label: String,
  pub confidence: f32,
}

/// 一个检测框及其类别候选（按置信度升序，至多 `max_labels` 个）
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: DetectionBox,
  pub labels: Vec<LabelScore>,
}

impl Detection {
  /// 以第一个类别候选生成持久化记录
  pub fn to_record(&self) -> Option<DetectionRecord> {
    let first = self.labels.first()?;
    Some(DetectionRecord {
      label: first.label.clone(),
      confidence: first.confidence,
      width: self.bbox.width(),
      height: self.bbox.height(),
      pos_x: self.bbox.min().x,
      pos_y: self.bbox.min().y,
    })
  }
}

/// 检测结果的持久化形式，位置为规范化后的左上角
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
  pub label: String,
  pub confidence: f32,
  pub width: i32,
  pub height: i32,
  pub pos_x: i32,
  pub pos_y: i32,
}

pub fn to_records(detections: &[Detection]) -> Vec<DetectionRecord> {
  detections.iter().filter_map(Detection::to_record).collect()
}

mod bbox;
mod config;
mod labels;
mod nms;
mod yolo;

pub use self::bbox::{Coordinates, DetectionBox};
pub use self::config::{DetectorBuilder, DetectorConfig};
pub use self::labels::Labels;
pub use self::nms::{SuppressionMode, assemble, non_max_suppression};
pub use self::yolo::{Candidate, Detector, decode_outputs, preprocess};
