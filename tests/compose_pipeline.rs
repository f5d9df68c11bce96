use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use appstore_screens::{
    CaptionJob, CandidateFonts, ComposeConfig, GlyphMetrics, PanelMetrics, PanelStyle,
    ResizeConfig, ScreensError, compose_screens, panel_geometry, resize_screens,
};
use image::{Rgb, RgbImage};
use tempfile::tempdir;

/// Monospace stand-in so layout does not depend on installed fonts.
struct Mono;

impl GlyphMetrics for Mono {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size
    }

    fn ascent(&self, font_size: f32) -> f32 {
        font_size * 0.9
    }

    fn text_height(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() { 0.0 } else { font_size * 1.1 }
    }
}

fn mono() -> Result<Arc<dyn GlyphMetrics>> {
    Ok(Arc::new(Mono))
}

fn write_source(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([20, 40, 60]))
        .save(path)
        .expect("write source");
}

fn job(source: &Path, title: &str, bullets: &[&str], output: &str) -> CaptionJob {
    CaptionJob {
        source: source.to_path_buf(),
        title: title.to_string(),
        bullets: bullets.iter().map(|b| b.to_string()).collect(),
        output: output.to_string(),
    }
}

#[test]
fn captions_every_job_and_writes_manifest() {
    let dir = tempdir().expect("tempdir");
    let first = dir.path().join("raw_1.png");
    let second = dir.path().join("raw_2.png");
    write_source(&first, 600, 1300);
    write_source(&second, 640, 1386);

    let config = ComposeConfig {
        jobs: vec![
            job(&first, "買い物メモを管理", &["メモを追加・チェック", "日時リマインド"], "01_memo.png"),
            job(&second, "店舗を地図で登録", &["現在地を取得してすぐ登録"], "02_add_store.png"),
        ],
        out_dir: dir.path().join("out").join("ja"),
        label: "JA".to_string(),
        style: PanelStyle::default(),
    };
    let report = compose_screens(&config, &mono).expect("compose");

    assert_eq!(
        image::image_dimensions(config.out_dir.join("01_memo.png")).expect("dims"),
        (600, 1300)
    );
    assert_eq!(
        image::image_dimensions(config.out_dir.join("02_add_store.png")).expect("dims"),
        (640, 1386)
    );
    let manifest = fs::read_to_string(&report.manifest_path).expect("manifest");
    insta::assert_snapshot!(manifest, @r"
    Generated App Store screenshots (JA):
    - 01_memo.png: 600x1300
    - 02_add_store.png: 640x1386
    ");
    assert_eq!(report.manifest_path, config.out_dir.join("manifest.txt"));
}

#[test]
fn zero_bullet_panel_holds_only_the_title() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("raw.png");
    write_source(&source, 600, 1300);

    let metrics = PanelMetrics::for_width(600);
    let geometry = panel_geometry(&Mono, &metrics, "現在地の向きも表示", 0, 1300, 0.34);
    assert_eq!(
        geometry.height,
        geometry.top_padding + geometry.title_height + geometry.bottom_padding
    );

    let config = ComposeConfig {
        jobs: vec![job(&source, "現在地の向きも表示", &[], "03_location_heading.png")],
        out_dir: dir.path().join("ja"),
        label: "JA".to_string(),
        style: PanelStyle::default(),
    };
    compose_screens(&config, &mono).expect("compose");

    let out = image::open(config.out_dir.join("03_location_heading.png"))
        .expect("open")
        .to_rgb8();
    let background = [20, 40, 60];
    // Right column inside the panel, clear of the title text.
    let x = metrics.pad + metrics.panel_width - metrics.radius - 4;
    let inside_y = metrics.pad + geometry.height / 2;
    let below_y = metrics.pad + geometry.height + 4;
    assert_ne!(out.get_pixel(x, inside_y).0, background);
    assert_eq!(out.get_pixel(x, below_y).0, background);
}

#[test]
fn missing_source_aborts_but_keeps_earlier_outputs() {
    let dir = tempdir().expect("tempdir");
    let present = dir.path().join("present.png");
    write_source(&present, 300, 650);
    let absent = dir.path().join("absent.png");

    let config = ComposeConfig {
        jobs: vec![
            job(&present, "A", &["b"], "01.png"),
            job(&absent, "C", &["d"], "02.png"),
        ],
        out_dir: dir.path().join("ja"),
        label: "JA".to_string(),
        style: PanelStyle::default(),
    };
    let err = compose_screens(&config, &mono).unwrap_err();
    match err.downcast_ref::<ScreensError>() {
        Some(ScreensError::MissingInput(path)) => assert_eq!(path, &absent),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(config.out_dir.join("01.png").exists());
    assert!(!config.out_dir.join("02.png").exists());
    assert!(!config.out_dir.join("manifest.txt").exists());
}

#[test]
fn missing_font_stops_before_any_output() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("raw.png");
    write_source(&source, 300, 650);
    let fonts = CandidateFonts::new(vec![dir.path().join("no-such-font.ttc")]);

    let config = ComposeConfig {
        jobs: vec![job(&source, "A", &[], "01.png")],
        out_dir: dir.path().join("ja"),
        label: "JA".to_string(),
        style: PanelStyle::default(),
    };
    let err = compose_screens(&config, &fonts).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScreensError>(),
        Some(ScreensError::MissingFont { .. })
    ));
    assert!(!config.out_dir.exists());
}

#[test]
fn resizer_consumes_what_the_compositor_produced() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("raw.png");
    write_source(&source, 600, 1300);

    let compose = ComposeConfig {
        jobs: vec![job(&source, "買い物メモを管理", &["メモを追加"], "01_memo.png")],
        out_dir: dir.path().join("ja"),
        label: "JA".to_string(),
        style: PanelStyle::default(),
    };
    compose_screens(&compose, &mono).expect("compose");

    let resize = ResizeConfig {
        names: compose.jobs.iter().map(|job| job.output.clone()).collect(),
        input_dir: compose.out_dir.clone(),
        output_dir: dir.path().join("ja_iphone_65"),
        width: 1242,
        height: 2688,
        readme: "readme\n".to_string(),
    };
    let report = resize_screens(&resize).expect("resize");
    assert_eq!(report.written, vec![resize.output_dir.join("01_memo.png")]);
    assert_eq!(
        image::image_dimensions(&report.written[0]).expect("dims"),
        (1242, 2688)
    );
}
