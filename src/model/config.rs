// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model/config.rs - 检测器配置与构建
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Backend, Detector, DetectorError, Labels, SuppressionMode},
};

const DEFAULT_INPUT_SIZE: u32 = 608;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.6;
const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_LABELS: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  pub input_size: u32,
  pub confidence_threshold: f32,
  pub score_threshold: f32,
  pub iou_threshold: f32,
  pub max_labels: usize,
  pub mode: SuppressionMode,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      max_labels: DEFAULT_MAX_LABELS,
      mode: SuppressionMode::default(),
    }
  }
}

impl DetectorConfig {
  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn score_threshold(mut self, threshold: f32) -> Self {
    self.score_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn max_labels(mut self, max_labels: usize) -> Self {
    self.max_labels = max_labels;
    self
  }

  pub fn mode(mut self, mode: SuppressionMode) -> Self {
    self.mode = mode;
    self
  }
}

fn parse_param<T: FromStr>(
  params: &HashMap<String, String>,
  name: &str,
) -> Result<Option<T>, DetectorError> {
  match params.get(name) {
    None => Ok(None),
    Some(value) => value
      .parse::<T>()
      .map(Some)
      .map_err(|_| DetectorError::InvalidParameter {
        name: name.to_string(),
        value: value.clone(),
      }),
  }
}

/// 检测器构建器，`yolo:///path/to/labels.txt?confidence=0.5&nms=0.5`
pub struct DetectorBuilder {
  labels_path: PathBuf,
  config: DetectorConfig,
}

impl FromUrlWithScheme for DetectorBuilder {
  const SCHEME: &'static str = "yolo";
}

impl FromUrl for DetectorBuilder {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectorError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let mut config = DetectorConfig::default();
    if let Some(v) = parse_param(&params, "input")? {
      config.input_size = v;
    }
    if let Some(v) = parse_param(&params, "confidence")? {
      config.confidence_threshold = v;
    }
    if let Some(v) = parse_param(&params, "score")? {
      config.score_threshold = v;
    }
    if let Some(v) = parse_param(&params, "nms")? {
      config.iou_threshold = v;
    }
    if let Some(v) = parse_param(&params, "labels")? {
      config.max_labels = v;
    }
    if let Some(v) = parse_param(&params, "mode")? {
      config.mode = v;
    }
    debug!("检测器配置: {:?}", config);

    Ok(Self {
      labels_path: PathBuf::from(url.path()),
      config,
    })
  }
}

impl DetectorBuilder {
  pub fn new(labels_path: impl Into<PathBuf>) -> Self {
    Self {
      labels_path: labels_path.into(),
      config: DetectorConfig::default(),
    }
  }

  pub fn config(mut self, config: DetectorConfig) -> Self {
    self.config = config;
    self
  }

  pub fn detector_config(&self) -> &DetectorConfig {
    &self.config
  }

  /// 加载标签与推理后端，任一失败即返回错误
  pub fn try_build<B, E, F>(self, load_backend: F) -> Result<Detector<B>, DetectorError>
  where
    B: Backend,
    E: std::fmt::Display,
    F: FnOnce(&DetectorConfig) -> Result<B, E>,
  {
    let labels = Labels::from_file(&self.labels_path)?;
    info!("创建推理后端");
    let backend =
      load_backend(&self.config).map_err(|e| DetectorError::BackendLoadError(e.to_string()))?;
    info!("检测器就绪, {} 个类别", labels.len());
    Ok(Detector::ready(self.config, labels, backend))
  }

  /// 与 [`DetectorBuilder::try_build`] 相同，但加载失败时返回未初始化的检测器
  pub fn build<B, E, F>(self, load_backend: F) -> Detector<B>
  where
    B: Backend,
    E: std::fmt::Display,
    F: FnOnce(&DetectorConfig) -> Result<B, E>,
  {
    let config = self.config.clone();
    match self.try_build(load_backend) {
      Ok(detector) => detector,
      Err(e) => {
        error!("检测器初始化失败: {}", e);
        Detector::uninitialized(config)
      }
    }
  }
}
