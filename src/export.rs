//! Poster export: SVG → PNG files, and sharing a result.
//!
//! Rasterization goes through resvg at the configured pixel ratio (2× by
//! default, so a 500×500 poster becomes a 1000×1000 PNG). The pixmap is
//! demultiplied and encoded with the `image` crate.
//!
//! Files are written atomically: bytes go to a `.part` file beside the
//! target, which is renamed into place only after a complete write. A failed
//! export never leaves a partial PNG behind.
//!
//! Sharing prefers a native share target and falls back to putting the page
//! URL on the clipboard. In a terminal there is no native target, so the CLI
//! always takes the fallback through [`Osc52Clipboard`].

use crate::naming::poster_file_on_disk;
use crate::types::Program;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SVG error: {0}")]
    Svg(#[from] usvg::Error),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("Sharing failed: {0}")]
    Share(String),
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
}

// =============================================================================
// Rasterization
// =============================================================================

/// SVG → PNG converter holding a loaded font database.
///
/// Loading system fonts is the slow part, so one rasterizer is built per run
/// and shared across worker threads.
pub struct Rasterizer {
    fonts: Arc<fontdb::Database>,
}

impl Rasterizer {
    /// System fonts plus every font file under `font_dirs`.
    pub fn new(font_dirs: &[PathBuf]) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            db.load_fonts_dir(dir);
        }
        tracing::debug!(faces = db.len(), "font database loaded");
        Self { fonts: Arc::new(db) }
    }

    /// No fonts at all. Text is dropped but shapes still render.
    #[cfg(test)]
    pub(crate) fn bare() -> Self {
        Self {
            fonts: Arc::new(fontdb::Database::new()),
        }
    }

    /// Render `svg` at `pixel_ratio` and return PNG bytes.
    pub fn rasterize(&self, svg: &str, pixel_ratio: u32) -> Result<Vec<u8>, ExportError> {
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fonts),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(svg, &options)?;

        let scale = pixel_ratio as f32;
        let size = tree.size();
        let width = (size.width() * scale).round() as u32;
        let height = (size.height() * scale).round() as u32;
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(ExportError::Canvas { width, height })?;
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale, scale),
            &mut pixmap.as_mut(),
        );

        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let img = RgbaImage::from_raw(width, height, rgba)
            .ok_or(ExportError::Canvas { width, height })?;
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

/// Write `bytes` to `path` via a sibling `.part` file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let written = std::fs::write(&part, bytes).and_then(|()| std::fs::rename(&part, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&part);
        return Err(e.into());
    }
    Ok(())
}

/// Rasterize and save a poster as `<dir>/muhimmath-result-<event>.png`.
///
/// Slashes in the event name become dashes; the file always lands directly
/// in `dir`.
pub fn export_png(
    rasterizer: &Rasterizer,
    svg: &str,
    dir: &Path,
    event: &str,
    pixel_ratio: u32,
) -> Result<PathBuf, ExportError> {
    let bytes = rasterizer.rasterize(svg, pixel_ratio)?;
    let path = dir.join(poster_file_on_disk(event));
    write_atomic(&path, &bytes)?;
    Ok(path)
}

// =============================================================================
// Sharing
// =============================================================================

/// What gets shared for one program's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    pub fn for_program(program: &Program, url: &str) -> Self {
        Self {
            title: format!("Result: {}", program.event),
            text: format!(
                "Check out the results for {} - {} from Muhimmath!",
                program.event, program.category
            ),
            url: url.to_string(),
        }
    }
}

/// A platform share sheet.
pub trait ShareTarget {
    fn share(&self, payload: &SharePayload) -> Result<(), ExportError>;
}

pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed to the native share target.
    Shared,
    /// No native target; the page URL is on the clipboard.
    LinkCopied,
}

/// Share through `native` when present, otherwise copy the payload URL.
///
/// A failing native share is reported, not retried through the clipboard.
pub fn share_with_fallback(
    native: Option<&dyn ShareTarget>,
    clipboard: &dyn Clipboard,
    payload: &SharePayload,
) -> Result<ShareOutcome, ExportError> {
    match native {
        Some(target) => {
            target.share(payload)?;
            Ok(ShareOutcome::Shared)
        }
        None => {
            clipboard.copy(&payload.url)?;
            Ok(ShareOutcome::LinkCopied)
        }
    }
}

/// Terminal clipboard via the OSC 52 escape sequence.
///
/// Most modern terminals (and tmux with `set-clipboard on`) forward the
/// sequence to the system clipboard, including over SSH.
pub struct Osc52Clipboard;

/// `ESC ] 52 ; c ; <base64> BEL`
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

impl Clipboard for Osc52Clipboard {
    fn copy(&self, text: &str) -> Result<(), ExportError> {
        let mut out = std::io::stdout().lock();
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect x="0" y="0" width="10" height="10" fill="#ff0000"></rect></svg>"##;

    #[derive(Default)]
    struct RecordingClipboard {
        copied: RefCell<Vec<String>>,
    }

    impl Clipboard for RecordingClipboard {
        fn copy(&self, text: &str) -> Result<(), ExportError> {
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct FailingShare;

    impl ShareTarget for FailingShare {
        fn share(&self, _: &SharePayload) -> Result<(), ExportError> {
            Err(ExportError::Share("AbortError".into()))
        }
    }

    #[derive(Default)]
    struct RecordingShare {
        shared: RefCell<Vec<SharePayload>>,
    }

    impl ShareTarget for RecordingShare {
        fn share(&self, payload: &SharePayload) -> Result<(), ExportError> {
            self.shared.borrow_mut().push(payload.clone());
            Ok(())
        }
    }

    fn rasterizer() -> Rasterizer {
        Rasterizer::bare()
    }

    #[test]
    fn rasterize_doubles_dimensions() {
        let png = rasterizer().rasterize(SQUARE, 2).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (20, 20));
        let px = img.to_rgba8().get_pixel(5, 5).0;
        assert_eq!(px, [255, 0, 0, 255]);
    }

    #[test]
    fn rasterize_poster_is_1000_square() {
        use crate::config::PosterConfig;
        use crate::poster::{PosterStyle, render_svg};
        use crate::test_helpers::result_row;
        use crate::types::PosterData;

        let data = PosterData {
            program: Program::new("Qawali", "General"),
            winners: vec![result_row("Qawali", "General", 1, "Adil")],
        };
        let svg = render_svg(PosterStyle::Spotlight, &data, &PosterConfig::default());
        let png = rasterizer().rasterize(&svg, 2).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (1000, 1000));
    }

    #[test]
    fn invalid_svg_is_error() {
        assert!(matches!(
            rasterizer().rasterize("<svg", 2),
            Err(ExportError::Svg(_))
        ));
    }

    #[test]
    fn export_png_uses_event_filename() {
        let tmp = TempDir::new().unwrap();
        let path = export_png(&rasterizer(), SQUARE, tmp.path(), "Qawali Competition", 1).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "muhimmath-result-qawali-competition.png"
        );
        assert!(path.exists());
    }

    #[test]
    fn export_png_stays_inside_target_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let path = export_png(&rasterizer(), SQUARE, &out, "Song/../../Escape", 1).unwrap();

        assert_eq!(path.parent(), Some(out.as_path()));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "muhimmath-result-song-..-..-escape.png"
        );
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn failed_export_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let result = export_png(&rasterizer(), "not svg", tmp.path(), "Quiz", 2);
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_atomic_cleans_up_on_rename_failure() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("poster.png");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("occupant"), "x").unwrap();

        assert!(write_atomic(&target, b"png").is_err());
        assert!(!tmp.path().join("poster.png.part").exists());
    }

    #[test]
    fn share_payload_wording() {
        let p = SharePayload::for_program(&Program::new("Qawali", "General"), "https://m.org/r");
        assert_eq!(p.title, "Result: Qawali");
        assert_eq!(
            p.text,
            "Check out the results for Qawali - General from Muhimmath!"
        );
        assert_eq!(p.url, "https://m.org/r");
    }

    #[test]
    fn falls_back_to_copying_url() {
        let clip = RecordingClipboard::default();
        let payload = SharePayload::for_program(&Program::new("Quiz", "Junior"), "https://x/y");
        let outcome = share_with_fallback(None, &clip, &payload).unwrap();
        assert_eq!(outcome, ShareOutcome::LinkCopied);
        assert_eq!(*clip.copied.borrow(), vec!["https://x/y".to_string()]);
    }

    #[test]
    fn native_share_used_when_available() {
        let clip = RecordingClipboard::default();
        let native = RecordingShare::default();
        let payload = SharePayload::for_program(&Program::new("Quiz", "Junior"), "https://x/y");
        let outcome = share_with_fallback(Some(&native), &clip, &payload).unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);
        assert_eq!(native.shared.borrow().len(), 1);
        assert!(clip.copied.borrow().is_empty());
    }

    #[test]
    fn native_share_failure_is_reported_without_fallback() {
        let clip = RecordingClipboard::default();
        let payload = SharePayload::for_program(&Program::new("Quiz", "Junior"), "https://x/y");
        let err = share_with_fallback(Some(&FailingShare), &clip, &payload).unwrap_err();
        assert!(err.to_string().contains("AbortError"));
        assert!(clip.copied.borrow().is_empty());
    }

    #[test]
    fn osc52_wraps_base64() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }
}
