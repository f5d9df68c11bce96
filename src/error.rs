use std::path::PathBuf;

/// Fatal conditions that stop a run before any further output is written.
#[derive(thiserror::Error, Debug)]
pub enum ScreensError {
    #[error("input image not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("no usable font found (checked: {})", format_candidates(.candidates))]
    MissingFont { candidates: Vec<PathBuf> },
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }
    candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
