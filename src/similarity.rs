// 该文件是 Jianying （鉴影） 项目的一部分。
// src/similarity.rs - 直方图近邻排序
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

use std::fmt::Display;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SimilarityError {
  #[error("参考图像不存在或没有描述子: {0}")]
  UnknownReference(String),
}

/// 候选及其与参考图像的距离
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult<K> {
  pub id: K,
  pub distance: f64,
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
  a.iter()
    .zip(b)
    .map(|(x, y)| (x - y) * (x - y))
    .sum::<f64>()
    .sqrt()
}

/// 按欧氏距离升序返回最近的 `max_results` 个候选
///
/// 参考图像本身不参与排序；距离相同时保持候选的输入顺序。
/// 描述子为空或长度与参考不一致的候选被跳过。
pub fn rank<K, H, I>(
  query: &K,
  candidates: I,
  max_results: usize,
) -> Result<Vec<SimilarityResult<K>>, SimilarityError>
where
  K: PartialEq + Display,
  H: AsRef<[f64]>,
  I: IntoIterator<Item = (K, H)>,
{
  let candidates: Vec<(K, H)> = candidates.into_iter().collect();

  let reference = candidates
    .iter()
    .find(|(id, _)| id == query)
    .map(|(_, histogram)| histogram.as_ref().to_vec())
    .filter(|histogram| !histogram.is_empty())
    .ok_or_else(|| {
      error!("参考图像 {} 不存在", query);
      SimilarityError::UnknownReference(query.to_string())
    })?;

  let mut results: Vec<SimilarityResult<K>> = Vec::new();
  let mut skipped = 0usize;
  for (id, histogram) in candidates {
    if id == *query {
      continue;
    }
    let histogram = histogram.as_ref();
    if histogram.is_empty() || histogram.len() != reference.len() {
      skipped += 1;
      continue;
    }
    let distance = euclidean_distance(&reference, histogram);
    results.push(SimilarityResult { id, distance });
  }

  results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
  results.truncate(max_results);
  debug!(
    "相似度排序: 参考 {}, 返回 {} 个, 跳过 {} 个",
    query,
    results.len(),
    skipped
  );
  Ok(results)
}
