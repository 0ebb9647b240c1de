// 该文件是 Jianying （鉴影） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::PixelBuffer, output::OutputError};

/// 写入 `image:///path/to/out.jpg`
pub struct SaveImageFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: uri.scheme().to_string(),
      });
    }

    Ok(Self::new(uri.path()))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn ensure_parent(&self) -> Result<(), OutputError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    Ok(())
  }

  /// 原样写入已编码的字节
  pub fn save_bytes(&self, data: &[u8]) -> Result<(), OutputError> {
    self.ensure_parent()?;
    std::fs::write(&self.path, data)?;
    info!("保存图像到文件: {} ({} 字节)", self.path.display(), data.len());
    Ok(())
  }

  /// 按扩展名推断格式编码并写入
  pub fn save_frame(&self, frame: &PixelBuffer) -> Result<(), OutputError> {
    if frame.is_empty() {
      return Err(OutputError::EmptyFrame);
    }
    self.ensure_parent()?;
    frame.to_rgb_image().save(&self.path)?;
    info!("保存图像到文件: {}", self.path.display());
    Ok(())
  }
}
