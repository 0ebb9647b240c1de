// 该文件是 Jianying （鉴影） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::{Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use url::Url;

use jianying::{
  FromUrl,
  descriptor::{IdAllocator, ImageDescriptor, rank_descriptors},
  filter::{Filter, apply_filter},
  input::ImageFileInput,
  output::{JsonRecordOutput, SaveImageFileOutput},
};

use args::{Args, Command};

#[derive(Serialize)]
struct SimilarEntry<'a> {
  name: &'a str,
  distance: f64,
}

fn emit<T: Serialize + ?Sized>(output: Option<&Url>, value: &T) -> Result<()> {
  match output {
    Some(url) => JsonRecordOutput::from_url(url)?.write(value)?,
    None => println!("{}", serde_json::to_string(value)?),
  }
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  match args.command {
    Command::Filter {
      input,
      output,
      name,
      param,
    } => {
      info!("输入来源: {}", input);
      info!("输出路径: {}", output);
      let filter = Filter::from_name(&name, param)?;
      let input = ImageFileInput::from_url(&input)?;

      let now = std::time::Instant::now();
      let data = apply_filter(input.bytes(), &filter);
      if data.is_empty() {
        bail!("滤镜 {} 处理失败: {}", filter, input.path().display());
      }
      info!("滤镜 {} 完成，耗时: {:.2?}", filter, now.elapsed());

      SaveImageFileOutput::from_url(&output)?.save_bytes(&data)?;
    }

    Command::Histogram {
      input,
      kind,
      output,
    } => {
      let input = ImageFileInput::from_url(&input)?;
      let descriptor = ImageDescriptor::describe(0, input.name(), input.bytes());
      let histogram = descriptor.histogram(kind);
      info!("{} 直方图长度: {}", kind, histogram.len());
      emit(output.as_ref(), histogram)?;
    }

    Command::Describe { input, output } => {
      let input = ImageFileInput::from_url(&input)?;
      let descriptor = ImageDescriptor::describe(0, input.name(), input.bytes());
      info!(
        "图像 {}: {}x{}",
        descriptor.name, descriptor.width, descriptor.height
      );
      emit(output.as_ref(), &descriptor)?;
    }

    Command::Similar {
      query,
      candidates,
      kind,
      max,
      output,
    } => {
      let ids = IdAllocator::new();
      let mut descriptors = Vec::with_capacity(candidates.len() + 1);
      for url in std::iter::once(&query).chain(&candidates) {
        let input = ImageFileInput::from_url(url)?;
        descriptors.push(ImageDescriptor::describe(
          ids.allocate(),
          input.name(),
          input.bytes(),
        ));
      }

      let query_id = descriptors[0].id;
      let results = rank_descriptors(query_id, &descriptors, kind, max)?;
      let entries: Vec<SimilarEntry> = results
        .iter()
        .filter_map(|r| {
          descriptors
            .iter()
            .find(|d| d.id == r.id)
            .map(|d| SimilarEntry {
              name: &d.name,
              distance: r.distance,
            })
        })
        .collect();
      for entry in &entries {
        info!("{}: 距离 {:.6}", entry.name, entry.distance);
      }
      emit(output.as_ref(), &entries)?;
    }

    #[cfg(feature = "label_image")]
    Command::Label {
      input,
      records,
      output,
      font,
      font_size,
    } => {
      use jianying::{model::DetectionRecord, output::draw::Draw};

      let input = ImageFileInput::from_url(&input)?;
      let records: Vec<DetectionRecord> = serde_json::from_slice(&std::fs::read(&records)?)?;
      info!("读取 {} 条检测记录", records.len());

      let draw = Draw::default().font_size(font_size);
      let draw = match font {
        Some(path) => draw.with_font_file(path)?,
        None => draw,
      };
      let data = draw.label_image(input.bytes(), &records);
      SaveImageFileOutput::from_url(&output)?.save_bytes(&data)?;
    }
  }

  Ok(())
}
