use anyhow::{Context, Result, anyhow};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbImage, RgbaImage};
use resvg::render;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::layout::{PanelGeometry, PanelMetrics, TitleLine};

#[derive(Debug, Clone)]
pub struct PanelStyle {
    pub fill_color: String,
    pub fill_opacity: f32,
    pub stroke_color: String,
    pub stroke_width: f32,
    pub title_color: String,
    pub body_color: String,
    pub bullet_marker: String,
    pub max_height_ratio: f32,
}

impl Default for PanelStyle {
    fn default() -> Self {
        Self {
            fill_color: "#fffef8".to_string(),
            fill_opacity: 235.0 / 255.0,
            stroke_color: "#e7e2d5".to_string(),
            stroke_width: 2.0,
            title_color: "#111827".to_string(),
            body_color: "#374151".to_string(),
            bullet_marker: "・".to_string(),
            max_height_ratio: 0.34,
        }
    }
}

/// Everything needed to draw one caption panel.
pub struct CaptionScene<'a> {
    pub width: u32,
    pub height: u32,
    pub title_lines: &'a [TitleLine],
    pub lines: &'a [String],
    pub metrics: &'a PanelMetrics,
    pub geometry: &'a PanelGeometry,
    pub title_ascent: f32,
    pub body_ascent: f32,
    pub font_family: Option<&'a str>,
}

/// Builds the transparent overlay SVG: rounded panel, title, body lines.
///
/// Text positions are top-anchored at the ascender line; SVG places text by
/// baseline, so each `y` adds the ascent.
pub fn caption_svg(scene: &CaptionScene<'_>, style: &PanelStyle) -> String {
    let metrics = scene.metrics;
    let geometry = scene.geometry;
    let x0 = metrics.pad;
    let y0 = metrics.pad;
    let panel_w = metrics.panel_width;
    let panel_h = geometry.height;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = scene.width,
        h = scene.height
    ));
    svg.push_str(&format!(
        r#"<clipPath id="panel-clip"><rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{r}" ry="{r}"/></clipPath>"#,
        x = x0,
        y = y0,
        w = panel_w,
        h = panel_h,
        r = metrics.radius
    ));
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="{r}" ry="{r}" fill="{fill}" fill-opacity="{opacity}" stroke="{stroke}" stroke-width="{stroke_w}"/>"#,
        x = x0,
        y = y0,
        w = panel_w,
        h = panel_h,
        r = metrics.radius,
        fill = escape_xml(&style.fill_color),
        opacity = style.fill_opacity.clamp(0.0, 1.0),
        stroke = escape_xml(&style.stroke_color),
        stroke_w = style.stroke_width
    ));

    let family_attr = scene
        .font_family
        .map(|family| format!(r#" font-family="{}""#, escape_xml(family)))
        .unwrap_or_default();
    let tx = x0 + metrics.text_inset;
    let title_top = (y0 + metrics.title_inset) as f32;

    svg.push_str(r#"<g clip-path="url(#panel-clip)">"#);
    let mut ty = title_top;
    for line in scene.title_lines {
        if !line.text.is_empty() {
            push_text(
                &mut svg,
                tx as f32,
                ty + scene.title_ascent,
                metrics.title_size,
                &style.title_color,
                &family_attr,
                &line.text,
            );
        }
        ty += (line.height + metrics.title_line_gap()) as f32;
    }

    ty = title_top + (geometry.title_height + metrics.title_advance()) as f32;
    for line in scene.lines {
        if line.is_empty() {
            ty += (geometry.line_height / 2) as f32;
            continue;
        }
        push_text(
            &mut svg,
            tx as f32,
            ty + scene.body_ascent,
            metrics.body_size,
            &style.body_color,
            &family_attr,
            line,
        );
        ty += geometry.line_height as f32;
    }
    svg.push_str("</g></svg>");
    svg
}

fn push_text(svg: &mut String, x: f32, y: f32, size: f32, color: &str, family_attr: &str, text: &str) {
    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}"{family} xml:space="preserve">{text}</text>"#,
        x = x,
        y = y,
        size = size,
        color = escape_xml(color),
        family = family_attr,
        text = escape_xml(text)
    ));
}

/// Rasterizes caption SVGs against one font database built per run.
pub struct CaptionRenderer {
    fontdb: Arc<fontdb::Database>,
}

impl CaptionRenderer {
    /// Loads the system fonts plus `font_data` (the resolved caption font).
    pub fn new(font_data: Option<&[u8]>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(data) = font_data {
            db.load_font_data(data.to_vec());
        }
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Rasterizes an SVG into straight-alpha RGBA.
    pub fn render_rgba(&self, svg: &str) -> Result<RgbaImage> {
        let options = Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Options::default()
        };
        let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse caption SVG")?;
        let size = tree.size().to_int_size();
        let mut pixmap =
            Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
        render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        let mut image = RgbaImage::new(size.width(), size.height());
        for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
            let color = src.demultiply();
            *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(image)
    }
}

/// Alpha-composites `overlay` onto `base` and drops the alpha channel.
pub fn flatten_over(base: &RgbImage, overlay: &RgbaImage) -> RgbImage {
    let mut canvas = image::DynamicImage::ImageRgb8(base.clone()).to_rgba8();
    image::imageops::overlay(&mut canvas, overlay, 0, 0);
    image::DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Writes an RGB PNG with the strongest compression the encoder offers.
pub fn save_png(image: &RgbImage, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create image: {}", path.display()))?;
    let encoder = PngEncoder::new_with_quality(
        BufWriter::new(file),
        CompressionType::Best,
        FilterType::Adaptive,
    );
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("failed to encode PNG: {}", path.display()))?;
    Ok(())
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_parts() -> (PanelMetrics, PanelGeometry) {
        let metrics = PanelMetrics::for_width(600);
        let geometry = PanelGeometry {
            top_padding: 16,
            title_height: 40,
            title_gap: 12,
            line_height: 33,
            line_count: 3,
            bottom_padding: 14,
            content_height: 181,
            height: 181,
        };
        (metrics, geometry)
    }

    fn title(text: &str) -> Vec<TitleLine> {
        vec![TitleLine {
            text: text.to_string(),
            height: 40,
        }]
    }

    #[test]
    fn svg_skips_blank_lines_and_escapes_text() {
        let (metrics, geometry) = scene_parts();
        let lines = vec!["・A&B".to_string(), String::new(), "・<C>".to_string()];
        let title_lines = title("Title \"1\"");
        let scene = CaptionScene {
            width: 600,
            height: 1300,
            title_lines: &title_lines,
            lines: &lines,
            metrics: &metrics,
            geometry: &geometry,
            title_ascent: 30.0,
            body_ascent: 20.0,
            font_family: Some("Noto Sans CJK JP"),
        };
        let svg = caption_svg(&scene, &PanelStyle::default());
        assert_eq!(svg.matches("<text ").count(), 3);
        assert!(svg.contains("・A&amp;B"));
        assert!(svg.contains("・&lt;C&gt;"));
        assert!(svg.contains("Title &quot;1&quot;"));
        assert!(svg.contains(r#"font-family="Noto Sans CJK JP""#));
        assert!(svg.contains(r#"height="181" rx="24""#));
    }

    #[test]
    fn blank_line_advances_half_a_line() {
        let (metrics, geometry) = scene_parts();
        let lines = vec!["・A".to_string(), String::new(), "・B".to_string()];
        let title_lines = title("T");
        let scene = CaptionScene {
            width: 600,
            height: 1300,
            title_lines: &title_lines,
            lines: &lines,
            metrics: &metrics,
            geometry: &geometry,
            title_ascent: 0.0,
            body_ascent: 0.0,
            font_family: None,
        };
        let svg = caption_svg(&scene, &PanelStyle::default());
        // pad 27, title inset 12, title height 40, title advance 9.
        let first = 27 + 12 + 40 + 9;
        let second = first + 33 + 16;
        assert!(svg.contains(&format!(r#"y="{first}" font-size="22""#)));
        assert!(svg.contains(&format!(r#"y="{second}" font-size="22""#)));
        assert!(!svg.contains("font-family"));
    }

    #[test]
    fn title_lines_stack_and_push_the_body_down() {
        let (metrics, mut geometry) = scene_parts();
        let title_lines = vec![
            TitleLine {
                text: "店舗を地図で".to_string(),
                height: 40,
            },
            TitleLine {
                text: "登録".to_string(),
                height: 40,
            },
        ];
        geometry.title_height = 40 + 6 + 40;
        let lines = vec!["・A".to_string()];
        let scene = CaptionScene {
            width: 600,
            height: 1300,
            title_lines: &title_lines,
            lines: &lines,
            metrics: &metrics,
            geometry: &geometry,
            title_ascent: 0.0,
            body_ascent: 0.0,
            font_family: None,
        };
        let svg = caption_svg(&scene, &PanelStyle::default());
        assert_eq!(svg.matches(r#"font-size="34""#).count(), 2);
        // pad 27 + title inset 12, then 40px of ink and a 6px line gap.
        assert!(svg.contains(r#"y="39" font-size="34""#));
        assert!(svg.contains(r#"y="85" font-size="34""#));
        let body = 39 + 86 + 9;
        assert!(svg.contains(&format!(r#"y="{body}" font-size="22""#)));
    }

    #[test]
    fn overlay_flattens_to_opaque_rgb() {
        let base = RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        let mut overlay = RgbaImage::new(4, 4);
        overlay.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        overlay.put_pixel(2, 2, Rgba([255, 255, 255, 128]));
        let flat = flatten_over(&base, &overlay);
        assert_eq!(flat.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(flat.get_pixel(1, 1).0, [255, 255, 255]);
        let half = flat.get_pixel(2, 2).0[0];
        assert!((120..=136).contains(&half), "blend was {half}");
    }

    #[test]
    fn rendered_panel_is_translucent_inside_and_clear_outside() {
        let (metrics, geometry) = scene_parts();
        let scene = CaptionScene {
            width: 600,
            height: 1300,
            title_lines: &[],
            lines: &[],
            metrics: &metrics,
            geometry: &geometry,
            title_ascent: 0.0,
            body_ascent: 0.0,
            font_family: None,
        };
        let svg = caption_svg(&scene, &PanelStyle::default());
        let renderer = CaptionRenderer::new(None);
        for _ in 0..2 {
            let overlay = renderer.render_rgba(&svg).expect("render");
            assert_eq!(overlay.dimensions(), (600, 1300));
            assert_eq!(overlay.get_pixel(5, 5).0[3], 0);
            let inside = overlay.get_pixel(300, 27 + 90).0;
            assert!((225..=245).contains(&inside[3]), "alpha was {}", inside[3]);
            assert!(inside[0] > 240);
        }
    }
}
