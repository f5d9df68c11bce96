use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compose::{CaptionJob, ComposeConfig};
use crate::font::CandidateFonts;
use crate::render::PanelStyle;
use crate::resize::ResizeConfig;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub output_root: PathBuf,
    pub captioned_dir: String,
    pub resized_dir: String,
    pub manifest_label: String,
    pub font_candidates: Vec<PathBuf>,
    pub panel: PanelStyle,
    pub resize_width: u32,
    pub resize_height: u32,
    pub resize_readme: String,
    pub screens: Vec<CaptionJob>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("store-assets/appstore"),
            captioned_dir: "ja".to_string(),
            resized_dir: "ja_iphone_65".to_string(),
            manifest_label: "JA".to_string(),
            font_candidates: Vec::new(),
            panel: PanelStyle::default(),
            resize_width: 1242,
            resize_height: 2688,
            resize_readme: String::new(),
            screens: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    output: Option<OutputSettings>,
    font: Option<FontSettings>,
    panel: Option<PanelSettings>,
    resize: Option<ResizeSettings>,
    screens: Option<Vec<ScreenSettings>>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    root: Option<String>,
    captioned: Option<String>,
    resized: Option<String>,
    label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    candidates: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PanelSettings {
    fill_color: Option<String>,
    fill_opacity: Option<f32>,
    stroke_color: Option<String>,
    title_color: Option<String>,
    body_color: Option<String>,
    bullet: Option<String>,
    max_height_ratio: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ResizeSettings {
    width: Option<u32>,
    height: Option<u32>,
    readme: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScreenSettings {
    source: String,
    title: String,
    #[serde(default)]
    bullets: Vec<String>,
    output: String,
}

/// Embedded defaults, then `extra_path` on top when given.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, "built-in settings")?);

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        let content = fs::read_to_string(extra)
            .with_context(|| format!("failed to read settings: {}", extra.display()))?;
        let label = extra.display().to_string();
        settings.merge(parse_settings(&content, &label)?);
    }

    Ok(settings)
}

fn parse_settings(content: &str, label: &str) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", label))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(output) = incoming.output {
            if let Some(root) = non_empty(output.root) {
                self.output_root = PathBuf::from(root);
            }
            if let Some(dir) = non_empty(output.captioned) {
                self.captioned_dir = dir;
            }
            if let Some(dir) = non_empty(output.resized) {
                self.resized_dir = dir;
            }
            if let Some(label) = non_empty(output.label) {
                self.manifest_label = label;
            }
        }
        if let Some(font) = incoming.font {
            if let Some(candidates) = font.candidates {
                let candidates: Vec<PathBuf> = candidates
                    .into_iter()
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from)
                    .collect();
                if !candidates.is_empty() {
                    self.font_candidates = candidates;
                }
            }
        }
        if let Some(panel) = incoming.panel {
            if let Some(color) = non_empty(panel.fill_color) {
                self.panel.fill_color = color;
            }
            if let Some(opacity) = panel.fill_opacity {
                if (0.0..=1.0).contains(&opacity) {
                    self.panel.fill_opacity = opacity;
                }
            }
            if let Some(color) = non_empty(panel.stroke_color) {
                self.panel.stroke_color = color;
            }
            if let Some(color) = non_empty(panel.title_color) {
                self.panel.title_color = color;
            }
            if let Some(color) = non_empty(panel.body_color) {
                self.panel.body_color = color;
            }
            if let Some(bullet) = panel.bullet {
                self.panel.bullet_marker = bullet;
            }
            if let Some(ratio) = panel.max_height_ratio {
                if ratio > 0.0 && ratio <= 1.0 {
                    self.panel.max_height_ratio = ratio;
                }
            }
        }
        if let Some(resize) = incoming.resize {
            if let Some(width) = resize.width.filter(|value| *value > 0) {
                self.resize_width = width;
            }
            if let Some(height) = resize.height.filter(|value| *value > 0) {
                self.resize_height = height;
            }
            if let Some(readme) = non_empty(resize.readme) {
                self.resize_readme = readme;
            }
        }
        if let Some(screens) = incoming.screens {
            self.screens = screens
                .into_iter()
                .map(|screen| CaptionJob {
                    source: PathBuf::from(screen.source),
                    title: screen.title,
                    bullets: screen.bullets,
                    output: screen.output,
                })
                .collect();
        }
    }

    pub fn captioned_path(&self) -> PathBuf {
        self.output_root.join(&self.captioned_dir)
    }

    pub fn resized_path(&self) -> PathBuf {
        self.output_root.join(&self.resized_dir)
    }

    /// Names the compositor writes and the resizer reads.
    pub fn screen_names(&self) -> Vec<String> {
        self.screens.iter().map(|job| job.output.clone()).collect()
    }

    pub fn font_resolver(&self) -> CandidateFonts {
        if self.font_candidates.is_empty() {
            CandidateFonts::platform_default()
        } else {
            CandidateFonts::new(self.font_candidates.clone())
        }
    }

    pub fn compose_config(&self) -> ComposeConfig {
        ComposeConfig {
            jobs: self.screens.clone(),
            out_dir: self.captioned_path(),
            label: self.manifest_label.clone(),
            style: self.panel.clone(),
        }
    }

    pub fn resize_config(&self) -> ResizeConfig {
        let readme = self
            .resize_readme
            .replace("{width}", &self.resize_width.to_string())
            .replace("{height}", &self.resize_height.to_string());
        ResizeConfig {
            names: self.screen_names(),
            input_dir: self.captioned_path(),
            output_dir: self.resized_path(),
            width: self.resize_width,
            height: self.resize_height,
            readme,
        }
    }
}
