use crate::font::GlyphMetrics;

/// Sample glyph used to size one body line; a full-width kana carries the
/// tallest ink of the scripts the captions are written in.
const LINE_SAMPLE: &str = "あ";

/// Character-granularity wrap for scripts without word separators.
///
/// Explicit newlines always break. A segment that is blank after trimming
/// becomes one empty line. A line is only ever over `max_width` when it holds a
/// single character.
pub fn wrap_text(
    text: &str,
    font: &dyn GlyphMetrics,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let segment = raw.trim();
        if segment.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for ch in segment.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if current.is_empty() || font.text_width(&candidate, font_size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Sizes derived from the screenshot width, so captions scale with resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelMetrics {
    pub title_size: f32,
    pub body_size: f32,
    pub pad: u32,
    pub radius: u32,
    pub panel_width: u32,
    pub wrap_width: u32,
    pub text_inset: u32,
    pub title_inset: u32,
}

impl PanelMetrics {
    pub fn for_width(width: u32) -> Self {
        let w = width as f32;
        let title_size = ((w * 0.055) as u32).max(34) as f32;
        let body_size = ((w * 0.032) as u32).max(22) as f32;
        let pad = (w * 0.045) as u32;
        let panel_width = width.saturating_sub(pad * 2);
        let wrap_width = panel_width.saturating_sub((w * 0.04) as u32);
        Self {
            title_size,
            body_size,
            pad,
            radius: (w * 0.04) as u32,
            panel_width,
            wrap_width,
            text_inset: (pad as f32 * 0.6) as u32,
            title_inset: (pad as f32 * 0.45) as u32,
        }
    }

    /// Space between the title ink and the first body line when drawing.
    pub fn title_advance(&self) -> u32 {
        (self.body_size * 0.45) as u32
    }

    /// Space between consecutive lines of a multi-line title.
    pub fn title_line_gap(&self) -> u32 {
        (self.title_size * 0.2) as u32
    }
}

/// One line of the title, with its ink height at the title size.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleLine {
    pub text: String,
    pub height: u32,
}

/// Splits the title on explicit newlines; titles are never width-wrapped.
pub fn title_lines(font: &dyn GlyphMetrics, metrics: &PanelMetrics, title: &str) -> Vec<TitleLine> {
    title
        .split('\n')
        .map(|line| {
            let text = line.trim().to_string();
            let height = font.text_height(&text, metrics.title_size) as u32;
            TitleLine { text, height }
        })
        .collect()
}

/// Stacked height of the title lines, including the gaps between them.
pub fn title_block_height(lines: &[TitleLine], metrics: &PanelMetrics) -> u32 {
    let gaps = metrics
        .title_line_gap()
        .saturating_mul(lines.len().saturating_sub(1) as u32);
    lines
        .iter()
        .fold(gaps, |sum, line| sum.saturating_add(line.height))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelGeometry {
    pub top_padding: u32,
    pub title_height: u32,
    pub title_gap: u32,
    pub line_height: u32,
    pub line_count: usize,
    pub bottom_padding: u32,
    pub content_height: u32,
    pub height: u32,
}

impl PanelGeometry {
    pub fn is_clamped(&self) -> bool {
        self.height < self.content_height
    }
}

/// Body line pitch: sample glyph ink plus leading.
pub fn line_height(font: &dyn GlyphMetrics, metrics: &PanelMetrics) -> u32 {
    font.text_height(LINE_SAMPLE, metrics.body_size) as u32 + (metrics.body_size * 0.35) as u32
}

/// Panel height for a title and its wrapped body lines, clamped to
/// `max_height_ratio` of the image height.
pub fn panel_geometry(
    font: &dyn GlyphMetrics,
    metrics: &PanelMetrics,
    title: &str,
    line_count: usize,
    image_height: u32,
    max_height_ratio: f32,
) -> PanelGeometry {
    let top_padding = (metrics.pad as f32 * 0.6) as u32;
    let bottom_padding = (metrics.pad as f32 * 0.55) as u32;
    let title_height = title_block_height(&title_lines(font, metrics, title), metrics);
    let title_gap = (metrics.body_size * 0.55) as u32;
    let line_height = line_height(font, metrics);

    let body = if line_count == 0 {
        0
    } else {
        title_gap.saturating_add(line_height.saturating_mul(line_count as u32))
    };
    let content_height = top_padding
        .saturating_add(title_height)
        .saturating_add(body)
        .saturating_add(bottom_padding);
    let max_height = (image_height as f32 * max_height_ratio.clamp(0.0, 1.0)) as u32;

    PanelGeometry {
        top_padding,
        title_height,
        title_gap,
        line_height,
        line_count,
        bottom_padding,
        content_height,
        height: content_height.min(max_height),
    }
}

/// Wraps every bullet (prefixed with `marker`) to the panel's wrap width.
pub fn wrap_bullets(
    bullets: &[String],
    marker: &str,
    font: &dyn GlyphMetrics,
    metrics: &PanelMetrics,
) -> Vec<String> {
    bullets
        .iter()
        .flat_map(|bullet| {
            wrap_text(
                &format!("{marker}{bullet}"),
                font,
                metrics.body_size,
                metrics.wrap_width as f32,
            )
        })
        .collect()
}
