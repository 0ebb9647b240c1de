// 该文件是 Jianying （鉴影） 项目的一部分。
// tests/pipeline.rs - 端到端流程测试
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

use std::path::Path;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tempfile::TempDir;
use url::Url;

use jianying::{
  FromUrl,
  descriptor::{DescriptorKind, IdAllocator, ImageDescriptor, rank_descriptors},
  filter::{Filter, apply_filter},
  frame::PixelBuffer,
  histogram::{compute_hsv_histogram, compute_rgb_histogram},
  input::{ImageFileInput, image_size},
  model::{
    Backend, DetectionRecord, DetectorBuilder, DetectorConfig, OutputMatrix, Tensor, to_records,
  },
  output::{JsonRecordOutput, SaveImageFileOutput, encode_png},
  similarity::SimilarityError,
};

fn image_url(path: &Path) -> Url {
  Url::parse(&format!("image://{}", path.display())).expect("image url")
}

fn write_png(dir: &TempDir, name: &str, image: &RgbImage) -> Url {
  let path = dir.path().join(name);
  std::fs::write(&path, encode_png(&PixelBuffer::from(image))).expect("write png");
  image_url(&path)
}

fn norm(v: &[f64]) -> f64 {
  v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[test]
fn histograms_of_file_input_are_normalized() {
  let dir = tempfile::tempdir().expect("tempdir");
  let image = RgbImage::from_fn(16, 9, |x, y| Rgb([(x * 16) as u8, (y * 28) as u8, 200]));
  let input = ImageFileInput::from_url(&write_png(&dir, "gradient.png", &image)).expect("open");

  let rgb = compute_rgb_histogram(input.bytes());
  let hsv = compute_hsv_histogram(input.bytes());
  assert_eq!(rgb.len(), 1000);
  assert_eq!(hsv.len(), 144);
  assert!((norm(&rgb) - 1.0).abs() < 1e-9);
  assert!((norm(&hsv) - 1.0).abs() < 1e-9);

  assert!(compute_rgb_histogram(&[]).is_empty());
  assert!(compute_hsv_histogram(&[]).is_empty());
}

#[test]
fn translucent_pixels_contribute_fractionally() {
  let image = RgbaImage::from_fn(2, 1, |x, _| {
    if x == 0 {
      Rgba([255, 0, 0, 255])
    } else {
      Rgba([0, 0, 255, 51])
    }
  });
  let mut data = Vec::new();
  image::DynamicImage::ImageRgba8(image)
    .write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
    .expect("encode rgba");

  let rgb = compute_rgb_histogram(&data);
  let red = rgb[9 * 100];
  let blue = rgb[9];
  // 0.2 / 1.0 的权重比
  assert!((blue / red - 0.2).abs() < 1e-6);
}

#[test]
fn filters_write_jpeg_files() {
  let dir = tempfile::tempdir().expect("tempdir");
  let image = RgbImage::from_fn(20, 10, |x, _| Rgb([(x * 12) as u8, 40, 90]));
  let input = ImageFileInput::from_url(&write_png(&dir, "in.png", &image)).expect("open");

  for (name, param) in [
    ("Gray", None),
    ("Sobel", None),
    ("Mean", Some(3)),
    ("Color", Some(200)),
  ] {
    let filter = Filter::from_name(name, param).expect("filter");
    let data = apply_filter(input.bytes(), &filter);
    assert_eq!(image_size(&data), (20, 10), "filter {}", name);

    let out_path = dir.path().join("out").join(format!("{}.jpg", name));
    SaveImageFileOutput::from_url(&image_url(&out_path))
      .expect("output")
      .save_bytes(&data)
      .expect("save");
    assert!(out_path.exists());
  }
}

#[test]
fn similar_images_rank_first() {
  let ids = IdAllocator::new();
  let solid = |c: [u8; 3]| encode_png(&PixelBuffer::from(&RgbImage::from_pixel(8, 8, Rgb(c))));

  let descriptors = vec![
    ImageDescriptor::describe(ids.allocate(), "sky", &solid([40, 90, 220])),
    ImageDescriptor::describe(ids.allocate(), "grass", &solid([30, 200, 40])),
    ImageDescriptor::describe(ids.allocate(), "sea", &solid([45, 95, 230])),
  ];

  let results = rank_descriptors(0, &descriptors, DescriptorKind::HueSaturation, 1).expect("rank");
  assert_eq!(results.len(), 1);
  assert_eq!(results[0].id, 2);

  assert_eq!(
    rank_descriptors(42, &descriptors, DescriptorKind::Rgb, 1),
    Err(SimilarityError::UnknownReference("42".to_string()))
  );
}

struct ScriptedBackend {
  rows: Vec<Vec<f32>>,
}

impl Backend for ScriptedBackend {
  type Error = std::io::Error;

  fn forward(&mut self, _input: &Tensor) -> Result<Vec<OutputMatrix>, Self::Error> {
    OutputMatrix::from_rows(&self.rows)
      .map(|matrix| vec![matrix])
      .map_err(|e| std::io::Error::other(e.to_string()))
  }
}

#[test]
fn detections_are_persisted_as_json() {
  let dir = tempfile::tempdir().expect("tempdir");
  let labels = dir.path().join("coco.names");
  std::fs::write(&labels, "person\nbicycle\n").expect("labels");

  let url = Url::parse(&format!("yolo://{}?input=64", labels.display())).expect("yolo url");
  let detector = DetectorBuilder::from_url(&url)
    .expect("builder")
    .try_build(|config: &DetectorConfig| {
      assert_eq!(config.input_size, 64);
      Ok::<_, std::io::Error>(ScriptedBackend {
        rows: vec![
          // 两个重叠框：高分保留，低分被抑制
          vec![0.5, 0.5, 0.5, 0.5, 1.0, 0.0, 0.95],
          vec![0.51, 0.5, 0.5, 0.5, 1.0, 0.52, 0.0],
          // 互不重叠的低分框保留
          vec![0.1, 0.1, 0.1, 0.1, 1.0, 0.55, 0.0],
        ],
      })
    })
    .expect("detector");

  let frame = PixelBuffer::from(&RgbImage::new(200, 100));
  let detections = detector.detect(&frame).expect("detect");
  let records = to_records(&detections);
  assert_eq!(records.len(), 2);
  assert_eq!(records[0].label, "bicycle");
  assert_eq!((records[0].pos_x, records[0].pos_y), (50, 25));
  assert_eq!((records[0].width, records[0].height), (100, 50));
  assert_eq!(records[1].label, "person");

  let path = dir.path().join("records.json");
  JsonRecordOutput::new(&path).write(&records).expect("write json");
  let back: Vec<DetectionRecord> =
    serde_json::from_slice(&std::fs::read(&path).expect("read json")).expect("parse json");
  assert_eq!(back, records);

  let descriptor = ImageDescriptor::describe_with(
    0,
    "street.png",
    &encode_png(&frame),
    &detector,
  );
  assert_eq!(descriptor.objects, records);
}
