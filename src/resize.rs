use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::error::ScreensError;
use crate::render::save_png;

pub const README_FILE_NAME: &str = "README.txt";

#[derive(Debug, Clone)]
pub struct ResizeConfig {
    /// Exactly the files to convert; nothing else in `input_dir` is touched.
    pub names: Vec<String>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub readme: String,
}

#[derive(Debug, Clone)]
pub struct ResizeReport {
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
}

/// Resizes each named screenshot to the store's exact pixel size.
///
/// Inputs are expected to already match the target aspect ratio; they are
/// stretched, never padded or cropped.
pub fn resize_screens(config: &ResizeConfig) -> Result<ResizeReport> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output dir: {}",
            config.output_dir.display()
        )
    })?;

    let mut written = Vec::with_capacity(config.names.len());
    for name in &config.names {
        let src = config.input_dir.join(name);
        if !src.exists() {
            return Err(ScreensError::MissingInput(src).into());
        }
        let image = image::open(&src)
            .with_context(|| format!("failed to decode image: {}", src.display()))?
            .to_rgb8();
        let (src_w, src_h) = image.dimensions();
        let resized = imageops::resize(&image, config.width, config.height, FilterType::Lanczos3);
        let dst = config.output_dir.join(name);
        save_png(&resized, &dst)?;
        info!(
            "resized {} ({}x{}) -> {} ({}x{})",
            src.display(),
            src_w,
            src_h,
            dst.display(),
            config.width,
            config.height
        );
        written.push(dst);
    }

    let readme_path = config.output_dir.join(README_FILE_NAME);
    fs::write(&readme_path, &config.readme)
        .with_context(|| format!("failed to write readme: {}", readme_path.display()))?;

    Ok(ResizeReport {
        output_dir: config.output_dir.clone(),
        written,
    })
}
