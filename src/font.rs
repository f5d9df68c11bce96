use anyhow::{Context, Result, anyhow};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use ttf_parser::Face;
use ttf_parser::name_id;

use crate::error::ScreensError;

/// Measurements the caption layout needs from a font.
///
/// Widths and heights are in pixels at the requested font size. Heights are
/// measured downwards from the ascender line, which is where captions anchor
/// their text.
pub trait GlyphMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    fn ascent(&self, font_size: f32) -> f32;

    /// Distance from the ascender line to the lowest ink of `text`.
    fn text_height(&self, text: &str, font_size: f32) -> f32;

    fn family(&self) -> Option<&str> {
        None
    }

    /// Raw font file bytes, handed to the SVG renderer's font database.
    fn data(&self) -> Option<&[u8]> {
        None
    }
}

/// Produces the font used for every caption in a run.
pub trait FontResolver {
    fn resolve(&self) -> Result<Arc<dyn GlyphMetrics>>;
}

impl<F> FontResolver for F
where
    F: Fn() -> Result<Arc<dyn GlyphMetrics>>,
{
    fn resolve(&self) -> Result<Arc<dyn GlyphMetrics>> {
        self()
    }
}

#[derive(Debug, Clone, Copy)]
struct GlyphInfo {
    advance: u16,
    y_min: Option<i16>,
}

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    family: Option<String>,
    face_index: u32,
    glyphs: RefCell<HashMap<char, GlyphInfo>>,
}

impl FontMetrics {
    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    /// Runs `read` over the glyph table after caching every char of `text`.
    /// The face is parsed only when `text` holds chars not measured before.
    fn with_glyphs<R>(&self, text: &str, read: impl FnOnce(&HashMap<char, GlyphInfo>) -> R) -> R {
        let missing: Vec<char> = {
            let cache = self.glyphs.borrow();
            text.chars().filter(|ch| !cache.contains_key(ch)).collect()
        };
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.face_index).ok();
            let mut cache = self.glyphs.borrow_mut();
            for ch in missing {
                let info = face
                    .as_ref()
                    .and_then(|face| {
                        let glyph = face.glyph_index(ch)?;
                        Some(GlyphInfo {
                            advance: face.glyph_hor_advance(glyph).unwrap_or(self.space_advance),
                            y_min: face.glyph_bounding_box(glyph).map(|rect| rect.y_min),
                        })
                    })
                    .unwrap_or(GlyphInfo {
                        advance: self.space_advance,
                        y_min: None,
                    });
                cache.insert(ch, info);
            }
        }
        read(&self.glyphs.borrow())
    }
}

impl GlyphMetrics for FontMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let advance = self.with_glyphs(text, |glyphs| {
            text.chars()
                .filter(|ch| *ch != '\n')
                .filter_map(|ch| glyphs.get(&ch))
                .fold(0u32, |sum, info| sum.saturating_add(info.advance as u32))
        });
        advance as f32 * self.scale(font_size)
    }

    fn ascent(&self, font_size: f32) -> f32 {
        self.ascender as f32 * self.scale(font_size)
    }

    fn text_height(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let lowest = self.with_glyphs(text, |glyphs| {
            text.chars()
                .filter(|ch| !ch.is_whitespace())
                .filter_map(|ch| glyphs.get(&ch).and_then(|info| info.y_min))
                .min()
        });
        match lowest {
            Some(y_min) => ((self.ascender as f32 - y_min as f32) * self.scale(font_size)).max(0.0),
            None => self.ascent(font_size).max(0.0),
        }
    }

    fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    fn data(&self) -> Option<&[u8]> {
        Some(self.data.as_ref())
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Loads the first parsable face; collections (`.ttc`) may hold broken ones.
pub fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    let data = Arc::new(data);
    for index in 0..count {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let ascender = face.ascender();
        let family = extract_family_name(&face);
        return Ok(FontMetrics {
            data: Arc::clone(&data),
            units_per_em,
            space_advance,
            ascender,
            family,
            face_index: index,
            glyphs: RefCell::new(HashMap::new()),
        });
    }
    Err(anyhow!("no parsable face in font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

/// Checks a fixed, ordered list of font files and loads the first one present.
#[derive(Debug, Clone)]
pub struct CandidateFonts {
    candidates: Vec<PathBuf>,
}

impl CandidateFonts {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Uses the platform's standard CJK font locations.
    pub fn platform_default() -> Self {
        Self::new(default_font_candidates().iter().map(PathBuf::from).collect())
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn first_existing(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .find(|path| path.exists())
            .map(PathBuf::as_path)
    }
}

impl FontResolver for CandidateFonts {
    fn resolve(&self) -> Result<Arc<dyn GlyphMetrics>> {
        let path = self.first_existing().ok_or_else(|| ScreensError::MissingFont {
            candidates: self.candidates.clone(),
        })?;
        let metrics = load_font_metrics(path)?;
        info!(
            "font: {} ({})",
            path.display(),
            metrics.family().unwrap_or("unnamed")
        );
        Ok(Arc::new(metrics))
    }
}

#[cfg(target_os = "windows")]
pub fn default_font_candidates() -> &'static [&'static str] {
    &[
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\meiryob.ttc",
        r"C:\Windows\Fonts\YuGothR.ttc",
        r"C:\Windows\Fonts\YuGothB.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
    ]
}

// Hiragino Sans W3/W6, then Hiragino Kaku Gothic ProN (shipped separately
// before macOS 10.11).
#[cfg(target_os = "macos")]
pub fn default_font_candidates() -> &'static [&'static str] {
    &[
        "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
        "/System/Library/Fonts/ヒラギノ角ゴシック W6.ttc",
        "/System/Library/Fonts/ヒラギノ角ゴ ProN W3.otf",
        "/Library/Fonts/ヒラギノ角ゴ ProN W3.otf",
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn default_font_candidates() -> &'static [&'static str] {
    &[
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/noto/NotoSansJP-Regular.ttf",
        "/usr/share/fonts/truetype/fonts-japanese-gothic.ttf",
    ]
}
