use anyhow::{Context, Result};
use image::RgbImage;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::ScreensError;
use crate::font::{FontResolver, GlyphMetrics};
use crate::layout::{PanelGeometry, PanelMetrics, panel_geometry, title_lines, wrap_bullets};
use crate::manifest::Manifest;
use crate::render::{CaptionRenderer, CaptionScene, PanelStyle, caption_svg, flatten_over, save_png};

/// One screenshot and the caption to put on it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionJob {
    pub source: PathBuf,
    pub title: String,
    pub bullets: Vec<String>,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct ComposeConfig {
    pub jobs: Vec<CaptionJob>,
    pub out_dir: PathBuf,
    pub label: String,
    pub style: PanelStyle,
}

#[derive(Debug, Clone)]
pub struct ComposeReport {
    pub out_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// A flattened screenshot and the panel that was drawn on it.
#[derive(Debug, Clone)]
pub struct Captioned {
    pub image: RgbImage,
    pub geometry: PanelGeometry,
}

/// Draws the caption panel onto `image` and returns the flattened result.
pub fn draw_caption(
    image: &RgbImage,
    title: &str,
    bullets: &[String],
    font: &dyn GlyphMetrics,
    renderer: &CaptionRenderer,
    style: &PanelStyle,
) -> Result<Captioned> {
    let (width, height) = image.dimensions();
    let metrics = PanelMetrics::for_width(width);
    let lines = wrap_bullets(bullets, &style.bullet_marker, font, &metrics);
    let geometry = panel_geometry(
        font,
        &metrics,
        title,
        lines.len(),
        height,
        style.max_height_ratio,
    );
    debug!(
        "panel: {}x{} ({} lines, line height {}, clamped {})",
        metrics.panel_width,
        geometry.height,
        geometry.line_count,
        geometry.line_height,
        geometry.is_clamped()
    );

    let title_lines = title_lines(font, &metrics, title);
    let scene = CaptionScene {
        width,
        height,
        title_lines: &title_lines,
        lines: &lines,
        metrics: &metrics,
        geometry: &geometry,
        title_ascent: font.ascent(metrics.title_size),
        body_ascent: font.ascent(metrics.body_size),
        font_family: font.family(),
    };
    let svg = caption_svg(&scene, style);
    let overlay = renderer.render_rgba(&svg)?;
    Ok(Captioned {
        image: flatten_over(image, &overlay),
        geometry,
    })
}

/// Captions every job in order and writes `manifest.txt` next to the outputs.
///
/// The font is resolved before any file is touched. A missing source aborts the
/// run; outputs already written stay on disk.
pub fn compose_screens(config: &ComposeConfig, fonts: &dyn FontResolver) -> Result<ComposeReport> {
    let font = fonts.resolve()?;
    let renderer = CaptionRenderer::new(font.data());
    fs::create_dir_all(&config.out_dir).with_context(|| {
        format!(
            "failed to create output dir: {}",
            config.out_dir.display()
        )
    })?;

    let mut manifest = Manifest::new(config.label.clone());
    for job in &config.jobs {
        if !job.source.exists() {
            return Err(ScreensError::MissingInput(job.source.clone()).into());
        }
        let image = image::open(&job.source)
            .with_context(|| format!("failed to decode image: {}", job.source.display()))?
            .to_rgb8();
        let captioned = draw_caption(
            &image,
            &job.title,
            &job.bullets,
            font.as_ref(),
            &renderer,
            &config.style,
        )?;
        let out_path = config.out_dir.join(&job.output);
        save_png(&captioned.image, &out_path)?;
        let (width, height) = captioned.image.dimensions();
        info!(
            "captioned {} -> {} ({}x{}, {} wrapped lines)",
            job.source.display(),
            out_path.display(),
            width,
            height,
            captioned.geometry.line_count
        );
        manifest.record(&job.output, width, height);
    }

    let manifest_path = manifest.write_to(&config.out_dir)?;
    Ok(ComposeReport {
        out_dir: config.out_dir.clone(),
        manifest_path,
        manifest,
    })
}
