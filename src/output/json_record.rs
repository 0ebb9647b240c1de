// 该文件是 Jianying （鉴影） 项目的一部分。
// src/output/json_record.rs - 以 JSON 记录结果
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::OutputError};

/// 写入 `json:///path/to/result.json`
pub struct JsonRecordOutput {
  path: PathBuf,
  pretty: bool,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: uri.scheme().to_string(),
      });
    }

    let pretty = uri
      .query_pairs()
      .any(|(key, value)| key == "pretty" && value != "false");
    Ok(Self {
      path: PathBuf::from(uri.path()),
      pretty,
    })
  }
}

impl JsonRecordOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      pretty: false,
    }
  }

  pub fn pretty(mut self, pretty: bool) -> Self {
    self.pretty = pretty;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), OutputError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let data = if self.pretty {
      serde_json::to_vec_pretty(value)?
    } else {
      serde_json::to_vec(value)?
    };
    std::fs::write(&self.path, data)?;
    info!("写入记录: {}", self.path.display());
    Ok(())
  }
}
