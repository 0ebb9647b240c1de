// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model/yolo.rs - YOLO 检测器：预处理、解码与后处理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::Mutex;

use image::imageops::{self, FilterType};
use tracing::{debug, error, warn};

use crate::{
  frame::{PixelBuffer, RGB_CHANNELS},
  model::{
    Backend, Detection, DetectionBox, DetectionRecord, DetectorConfig, DetectorError, Labels,
    Model, OutputMatrix, Tensor, assemble, non_max_suppression, to_records,
  },
};

/// 每行前 5 列为 cx, cy, w, h, objectness，其后为各类别得分
const YOLO_BOX_COLUMNS: usize = 5;

/// 解码后的单个候选
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub bbox: DetectionBox,
  pub class_id: usize,
  pub label: String,
  pub confidence: f32,
}

/// 缩放到 `size×size`（双线性），归一化到 [0, 1]，输出 NCHW RGB 张量
pub fn preprocess(frame: &PixelBuffer, size: u32) -> Result<Tensor, DetectorError> {
  let resized = imageops::resize(&frame.to_rgb_image(), size, size, FilterType::Triangle);
  let side = size as usize;
  let plane = side * side;

  let mut data = vec![0.0f32; RGB_CHANNELS * plane];
  for (x, y, pixel) in resized.enumerate_pixels() {
    let idx = y as usize * side + x as usize;
    for c in 0..RGB_CHANNELS {
      data[c * plane + idx] = pixel[c] as f32 / 255.0;
    }
  }

  Tensor::new([1, RGB_CHANNELS, side, side], data)
}

/// 第一个最大值的位置与取值，NaN 不参与比较
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;
  for (i, &score) in scores.iter().enumerate() {
    if score.is_nan() {
      continue;
    }
    match best {
      Some((_, value)) if score <= value => {}
      _ => best = Some((i, score)),
    }
  }
  best
}

/// 将原始输出解码为原图像素坐标下的候选
pub fn decode_outputs(
  outputs: &[OutputMatrix],
  labels: &Labels,
  width: usize,
  height: usize,
  confidence_threshold: f32,
) -> Vec<Candidate> {
  let (w_f, h_f) = (width as f32, height as f32);
  let mut candidates = Vec::new();

  for (layer, output) in outputs.iter().enumerate() {
    if output.cols() <= YOLO_BOX_COLUMNS {
      warn!("输出层 {} 列数不足: {}", layer, output.cols());
      continue;
    }

    for row in output.iter_rows() {
      let Some((class_id, confidence)) = argmax(&row[YOLO_BOX_COLUMNS..]) else {
        continue;
      };
      // 阈值为 NaN 时同样不通过
      if !(confidence >= confidence_threshold) {
        continue;
      }

      // 浮点转整数时饱和，后续加减同样饱和
      let cx = (row[0] * w_f) as i32;
      let cy = (row[1] * h_f) as i32;
      let w = (row[2] * w_f) as i32;
      let h = (row[3] * h_f) as i32;
      let x = cx.saturating_sub(w / 2);
      let y = cy.saturating_sub(h / 2);

      candidates.push(Candidate {
        bbox: DetectionBox::new(x, y, x.saturating_add(w), y.saturating_add(h)),
        class_id,
        label: labels.name_of(class_id).to_string(),
        confidence,
      });
    }
  }

  debug!("解码得到 {} 个候选", candidates.len());
  candidates
}

enum DetectorState<B> {
  Uninitialized,
  Ready { labels: Labels, backend: Mutex<B> },
}

/// 目标检测器
///
/// 标签或推理后端加载失败时处于未初始化状态，此时检测结果恒为空，且不会调用后端。
pub struct Detector<B> {
  config: DetectorConfig,
  state: DetectorState<B>,
}

impl<B: Backend> Detector<B> {
  pub fn uninitialized(config: DetectorConfig) -> Self {
    Self {
      config,
      state: DetectorState::Uninitialized,
    }
  }

  pub fn ready(config: DetectorConfig, labels: Labels, backend: B) -> Self {
    Self {
      config,
      state: DetectorState::Ready {
        labels,
        backend: Mutex::new(backend),
      },
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(self.state, DetectorState::Ready { .. })
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn labels(&self) -> Option<&Labels> {
    match &self.state {
      DetectorState::Ready { labels, .. } => Some(labels),
      DetectorState::Uninitialized => None,
    }
  }

  pub fn detect(&self, frame: &PixelBuffer) -> Result<Vec<Detection>, DetectorError> {
    let DetectorState::Ready { labels, backend } = &self.state else {
      warn!("检测器未初始化, 跳过检测");
      return Ok(Vec::new());
    };
    if frame.is_empty() {
      debug!("空帧, 跳过检测");
      return Ok(Vec::new());
    }

    let tensor = preprocess(frame, self.config.input_size)?;
    let outputs = {
      let mut backend = backend.lock().map_err(|_| DetectorError::LockPoisoned)?;
      debug!("执行模型推理");
      backend
        .forward(&tensor)
        .map_err(|e| DetectorError::ForwardError(Box::new(e)))?
    };

    let candidates = decode_outputs(
      &outputs,
      labels,
      frame.width(),
      frame.height(),
      self.config.confidence_threshold,
    );
    if candidates.is_empty() {
      return Ok(Vec::new());
    }

    let boxes: Vec<DetectionBox> = candidates.iter().map(|c| c.bbox).collect();
    let scores: Vec<f32> = candidates.iter().map(|c| c.confidence).collect();
    let keep = non_max_suppression(
      &boxes,
      &scores,
      self.config.score_threshold,
      self.config.iou_threshold,
      self.config.mode,
    );

    let detections = assemble(candidates, &keep, self.config.max_labels);
    debug!("检测结果: {} 个目标", detections.len());
    Ok(detections)
  }

  /// 检测并转为持久化记录；推理失败时记录错误并返回空列表
  pub fn detect_records(&self, frame: &PixelBuffer) -> Vec<DetectionRecord> {
    match self.detect(frame) {
      Ok(detections) => to_records(&detections),
      Err(e) => {
        error!("目标检测失败: {}", e);
        Vec::new()
      }
    }
  }
}

impl<B: Backend> Model for Detector<B> {
  type Input = PixelBuffer;
  type Output = Vec<Detection>;
  type Error = DetectorError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use image::{Rgb, RgbImage, Rgba, RgbaImage};

  use super::*;
  use crate::model::{DetectorBuilder, SuppressionMode};

  struct FakeBackend {
    calls: Arc<AtomicUsize>,
    rows: Vec<Vec<f32>>,
  }

  impl Backend for FakeBackend {
    type Error = std::io::Error;

    fn forward(&mut self, input: &Tensor) -> Result<Vec<OutputMatrix>, Self::Error> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      assert_eq!(input.shape(), [1, 3, 32, 32]);
      let matrix = OutputMatrix::from_rows(&self.rows)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
      Ok(vec![matrix])
    }
  }

  struct FailingBackend;

  impl Backend for FailingBackend {
    type Error = std::io::Error;

    fn forward(&mut self, _input: &Tensor) -> Result<Vec<OutputMatrix>, Self::Error> {
      Err(std::io::Error::other("设备不可用"))
    }
  }

  fn labels() -> Labels {
    ["person", "bicycle", "car"].into_iter().collect()
  }

  fn frame() -> PixelBuffer {
    PixelBuffer::from(&RgbImage::from_pixel(100, 50, Rgb([10, 20, 30])))
  }

  fn config() -> DetectorConfig {
    DetectorConfig::default().input_size(32)
  }

  #[test]
  fn preprocess_is_normalized_nchw() {
    let frame = PixelBuffer::from(&RgbImage::from_pixel(7, 5, Rgb([255, 0, 0])));
    let tensor = preprocess(&frame, 16).unwrap();
    assert_eq!(tensor.shape(), [1, 3, 16, 16]);
    assert!(tensor.get(0, 0, 8, 8) > 0.99);
    assert!(tensor.get(0, 1, 8, 8) < 0.01);
    assert!(tensor.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));
  }

  #[test]
  fn argmax_prefers_first_maximum() {
    assert_eq!(argmax(&[0.2, 0.7, 0.7]), Some((1, 0.7)));
    assert_eq!(argmax(&[]), None);
  }

  #[test]
  fn decode_uses_integer_geometry() {
    let output =
      OutputMatrix::from_rows(&[vec![0.5, 0.5, 0.2, 0.4, 0.9, 0.1, 0.8, 0.3]]).unwrap();
    let candidates = decode_outputs(&[output], &labels(), 100, 50, 0.5);

    assert_eq!(
      candidates,
      vec![Candidate {
        bbox: DetectionBox::new(40, 15, 60, 35),
        class_id: 1,
        label: "bicycle".to_string(),
        confidence: 0.8,
      }]
    );
  }

  #[test]
  fn decode_drops_low_confidence_and_maps_unknown_class() {
    let output = OutputMatrix::from_rows(&[
      vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1, 0.4, 0.3, 0.0],
      vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.1, 0.2, 0.3, 0.9],
    ])
    .unwrap();
    let candidates = decode_outputs(&[output], &labels(), 100, 100, 0.5);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].class_id, 3);
    assert_eq!(candidates[0].label, "unknown");
  }

  #[test]
  fn argmax_skips_nan() {
    assert_eq!(argmax(&[f32::NAN, 0.6, 0.2]), Some((1, 0.6)));
    assert_eq!(argmax(&[f32::NAN, f32::NAN]), None);
  }

  #[test]
  fn decode_drops_nan_scores() {
    let output = OutputMatrix::from_rows(&[
      vec![0.5, 0.5, 0.2, 0.2, 0.9, f32::NAN, f32::NAN],
      vec![0.5, 0.5, 0.2, 0.2, 0.9, 0.9, 0.1],
    ])
    .unwrap();
    let candidates = decode_outputs(&[output.clone()], &labels(), 100, 100, 0.5);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].confidence, 0.9);

    assert!(decode_outputs(&[output], &labels(), 100, 100, f32::NAN).is_empty());
  }

  #[test]
  fn decode_saturates_huge_geometry() {
    let output = OutputMatrix::from_rows(&[
      vec![1e9, 0.5, 1e9, 0.1, 1.0, 0.9],
      vec![-1e9, -1e9, 1e9, 1e9, 1.0, 0.9],
    ])
    .unwrap();
    let candidates = decode_outputs(&[output], &labels(), 100, 100, 0.5);
    assert_eq!(candidates.len(), 2);

    let bbox = candidates[0].bbox;
    assert_eq!(bbox.max().x, i32::MAX);
    assert_eq!((bbox.min().y, bbox.max().y), (45, 55));
    assert!(bbox.width() >= 0);

    let bbox = candidates[1].bbox;
    assert_eq!(bbox.min().x, i32::MIN);
    assert_eq!(bbox.width(), i32::MAX);
    let iou = bbox.iou(&candidates[0].bbox);
    assert!((0.0..=1.0).contains(&iou));
  }

  #[test]
  fn preprocess_composites_alpha_over_black() {
    let image = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 51]));
    let tensor = preprocess(&PixelBuffer::from(&image), 4).unwrap();
    assert!((tensor.get(0, 0, 2, 2) - 0.2).abs() < 0.005);
  }

  #[test]
  fn ready_detector_runs_pipeline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = FakeBackend {
      calls: calls.clone(),
      rows: vec![
        vec![0.5, 0.5, 0.4, 0.4, 1.0, 0.9, 0.0, 0.0],
        vec![0.52, 0.5, 0.4, 0.4, 1.0, 0.0, 0.55, 0.0],
        vec![0.1, 0.1, 0.1, 0.1, 1.0, 0.0, 0.0, 0.3],
      ],
    };
    let detector = Detector::ready(config(), labels(), backend);
    assert!(detector.is_ready());

    let detections = detector.infer(&frame()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].labels[0].label, "person");

    let records = detector.detect_records(&frame());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pos_x, 30);
    assert_eq!(records[0].width, 40);
  }

  #[test]
  fn uninitialized_detector_never_calls_backend() {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader_calls = calls.clone();
    let detector = DetectorBuilder::new("/definitely/not/here.names")
      .config(config())
      .build(move |_| {
        Ok::<_, std::io::Error>(FakeBackend {
          calls: loader_calls,
          rows: Vec::new(),
        })
      });

    assert!(!detector.is_ready());
    assert!(detector.labels().is_none());
    assert!(detector.detect(&frame()).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn backend_load_failure_is_uninitialized() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "person\n").unwrap();

    let result = DetectorBuilder::new(file.path())
      .try_build(|_| Err::<FailingBackend, _>("模型文件损坏"));
    assert!(matches!(result, Err(DetectorError::BackendLoadError(_))));

    let detector =
      DetectorBuilder::new(file.path()).build(|_| Err::<FailingBackend, _>("模型文件损坏"));
    assert!(!detector.is_ready());
  }

  #[test]
  fn empty_frame_skips_inference() {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = Detector::ready(
      config(),
      labels(),
      FakeBackend {
        calls: calls.clone(),
        rows: Vec::new(),
      },
    );
    assert!(detector.detect(&PixelBuffer::empty()).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn forward_failure_is_reported() {
    let detector = Detector::ready(config(), labels(), FailingBackend);
    assert!(matches!(
      detector.detect(&frame()),
      Err(DetectorError::ForwardError(_))
    ));
    assert!(detector.detect_records(&frame()).is_empty());
  }

  #[test]
  fn greedy_mode_is_configurable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = FakeBackend {
      calls,
      rows: vec![
        vec![0.2, 0.2, 0.1, 0.1, 1.0, 0.55, 0.0, 0.0],
        vec![0.8, 0.8, 0.1, 0.1, 1.0, 0.0, 0.9, 0.0],
      ],
    };
    let detector = Detector::ready(config().mode(SuppressionMode::Greedy), labels(), backend);
    let detections = detector.detect(&frame()).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].labels[0].label, "bicycle");
  }
}
