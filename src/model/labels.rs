// 该文件是 Jianying （鉴影） 项目的一部分。
// src/model/labels.rs - 类别标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use tracing::{debug, info};

use crate::model::DetectorError;

pub const UNKNOWN_LABEL: &str = "unknown";

/// 逐行一个类别名，行号即类别序号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
  names: Vec<String>,
}

impl Labels {
  pub fn parse(text: &str) -> Self {
    let names = text
      .lines()
      .map(|line| line.trim_end_matches('\r').to_string())
      .collect();
    Self { names }
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let labels = Self::parse(&text);
    if labels.is_empty() {
      return Err(DetectorError::EmptyLabels(path.display().to_string()));
    }
    debug!("标签数量: {}", labels.len());
    Ok(labels)
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  /// 越界的类别序号映射为 "unknown"
  pub fn name_of(&self, class_id: usize) -> &str {
    self.get(class_id).unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl<S: AsRef<str>> FromIterator<S> for Labels {
  fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
    Self {
      names: iter.into_iter().map(|s| s.as_ref().to_string()).collect(),
    }
  }
}
