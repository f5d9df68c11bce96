//! Offline tooling for App Store screenshot assets: caption panels with
//! localized text composited onto screenshots, and an exact-size resize pass
//! for the store's upload slot.

pub mod compose;
pub mod error;
pub mod font;
pub mod layout;
pub mod logging;
pub mod manifest;
pub mod render;
pub mod resize;
pub mod settings;

pub use compose::{CaptionJob, Captioned, ComposeConfig, ComposeReport, compose_screens, draw_caption};
pub use error::ScreensError;
pub use font::{CandidateFonts, FontMetrics, FontResolver, GlyphMetrics, load_font_metrics};
pub use layout::{PanelGeometry, PanelMetrics, TitleLine, panel_geometry, title_lines, wrap_text};
pub use manifest::{Manifest, ManifestEntry};
pub use render::{CaptionRenderer, PanelStyle};
pub use resize::{ResizeConfig, ResizeReport, resize_screens};
pub use settings::{Settings, load_settings};
