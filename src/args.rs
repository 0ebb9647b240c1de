// 该文件是 Jianying （鉴影） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

#[cfg(feature = "label_image")]
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use jianying::descriptor::DescriptorKind;

/// Jianying 图像指纹工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 应用滤镜并保存为 JPEG
  Filter {
    /// 输入图像，如 image:///path/to/in.png
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    /// 输出图像，如 image:///path/to/out.jpg
    #[arg(long, value_name = "OUTPUT")]
    output: Url,
    /// 滤镜名称: Gray, Sobel, Histogram, Histogram2D, Mean, Color
    #[arg(long)]
    name: String,
    /// 滤镜参数（Mean 为窗口大小，Color 为色相角度）
    #[arg(long, allow_negative_numbers = true)]
    param: Option<i32>,
  },

  /// 计算颜色直方图
  Histogram {
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    /// 直方图类型: hshist 或 rgbhist
    #[arg(long, default_value = "hshist")]
    kind: DescriptorKind,
    /// 结果输出，如 json:///path/to/hist.json；缺省时打印到标准输出
    #[arg(long, value_name = "OUTPUT")]
    output: Option<Url>,
  },

  /// 计算图像描述子（尺寸与两种直方图）
  Describe {
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    #[arg(long, value_name = "OUTPUT")]
    output: Option<Url>,
  },

  /// 按直方图距离查找相似图像
  Similar {
    /// 参考图像
    #[arg(long, value_name = "SOURCE")]
    query: Url,
    /// 候选图像，可多次指定
    #[arg(long = "candidate", value_name = "SOURCE")]
    candidates: Vec<Url>,
    #[arg(long, default_value = "hshist")]
    kind: DescriptorKind,
    /// 最多返回的结果数量
    #[arg(long, default_value = "5", value_name = "COUNT")]
    max: usize,
    #[arg(long, value_name = "OUTPUT")]
    output: Option<Url>,
  },

  /// 在图像上绘制检测记录
  #[cfg(feature = "label_image")]
  Label {
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    /// 检测记录 JSON 文件
    #[arg(long, value_name = "FILE")]
    records: PathBuf,
    #[arg(long, value_name = "OUTPUT")]
    output: Url,
    /// 标签字体文件，缺省时只绘制边框
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
    /// 标签字号（像素）
    #[arg(long, default_value = "40")]
    font_size: f32,
  },
}
