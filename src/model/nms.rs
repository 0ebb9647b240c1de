// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model/nms.rs - 非极大值抑制与检测结果归并
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use tracing::debug;

use crate::model::{Candidate, Detection, DetectionBox, DetectorError, LabelScore};

/// 抑制规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionMode {
  /// 得分达到阈值的框总是保留；低于阈值的框仅在与已保留的框重叠过大时丢弃
  #[default]
  Floor,
  /// 经典贪心 NMS：先丢弃得分不高于阈值的框，再丢弃与已保留框重叠过大的框
  Greedy,
}

impl FromStr for SuppressionMode {
  type Err = DetectorError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "floor" => Ok(SuppressionMode::Floor),
      "greedy" => Ok(SuppressionMode::Greedy),
      _ => Err(DetectorError::InvalidParameter {
        name: "mode".to_string(),
        value: s.to_string(),
      }),
    }
  }
}

/// 返回保留下来的候选序号，按得分降序
pub fn non_max_suppression(
  boxes: &[DetectionBox],
  scores: &[f32],
  score_threshold: f32,
  iou_threshold: f32,
  mode: SuppressionMode,
) -> Vec<usize> {
  let count = boxes.len().min(scores.len());
  let mut order: Vec<usize> = (0..count).collect();
  if mode == SuppressionMode::Greedy {
    order.retain(|&i| scores[i] > score_threshold);
  }
  // 稳定排序，得分相同时保持输入顺序
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut keep: Vec<usize> = Vec::with_capacity(order.len());
  for i in order {
    let overlaps = keep
      .iter()
      .any(|&k| boxes[i].iou(&boxes[k]) > iou_threshold as f64);
    let retained = match mode {
      SuppressionMode::Floor => !overlaps || scores[i] >= score_threshold,
      SuppressionMode::Greedy => !overlaps,
    };
    if retained {
      keep.push(i);
    }
  }

  debug!("NMS: {} 个候选, 保留 {} 个", count, keep.len());
  keep
}

/// 将保留下来的候选按相同的检测框归并
///
/// 分组按候选首次出现的顺序排列；组内按置信度升序并截取前 `max_labels` 个。
pub fn assemble(candidates: Vec<Candidate>, keep: &[usize], max_labels: usize) -> Vec<Detection> {
  let keep: HashSet<usize> = keep.iter().copied().collect();
  let mut groups: Vec<Detection> = Vec::new();
  let mut index: HashMap<DetectionBox, usize> = HashMap::new();

  for (i, candidate) in candidates.into_iter().enumerate() {
    if !keep.contains(&i) {
      continue;
    }
    let slot = *index.entry(candidate.bbox).or_insert_with(|| {
      groups.push(Detection {
        bbox: candidate.bbox,
        labels: Vec::new(),
      });
      groups.len() - 1
    });
    groups[slot].labels.push(LabelScore {
      class_id: candidate.class_id,
      label: candidate.label,
      confidence: candidate.confidence,
    });
  }

  for group in groups.iter_mut() {
    group
      .labels
      .sort_by(|a, b| a.confidence.total_cmp(&b.confidence));
    group.labels.truncate(max_labels);
  }
  groups.retain(|group| !group.labels.is_empty());
  groups
}
