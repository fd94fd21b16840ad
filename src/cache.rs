//! Poster raster cache for incremental builds.
//!
//! Rasterizing five styles for every program of every year is the slow part
//! of a build, and almost every rebuild changes only a handful of results.
//! This module lets the poster stage skip rasterization when neither the
//! poster's SVG nor the raster parameters changed since the last build.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups go by the pair
//! (`svg_hash`, `params_hash`), not by output path. Program directories are
//! numbered by sort position, so adding one program renumbers every program
//! after it; content addressing turns those renames into file copies instead
//! of re-renders.
//!
//! - **`svg_hash`**: SHA-256 of the SVG text. Any change to a name, team,
//!   style or layout changes the SVG and therefore the hash.
//! - **`params_hash`**: SHA-256 of pixel ratio and the font directories.
//!   Adding fonts can change how text renders, so it invalidates too.
//!
//! A hit requires a matching entry **and** the previously written PNG still
//! on disk. When the hit lives at a different path, the file is copied.
//!
//! ## Storage
//!
//! `<processed>/.cache-manifest.json`, beside the PNGs it describes.
//! `--no-cache` starts from an empty manifest.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing cache when key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub svg_hash: String,
    pub params_hash: String,
}

/// Output path → cache entry, plus a runtime reverse index by content.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{svg_hash}:{params_hash}"` → output path. Rebuilt on load.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

fn content_key(svg_hash: &str, params_hash: &str) -> String {
    format!("{svg_hash}:{params_hash}")
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from `dir`. Missing, corrupt or outdated manifests load empty.
    pub fn load(dir: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(dir.join(MANIFEST_FILENAME)) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "discarding unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = manifest
            .entries
            .iter()
            .map(|(path, e)| (content_key(&e.svg_hash, &e.params_hash), path.clone()))
            .collect();
        manifest
    }

    pub fn save(&self, dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILENAME), json)
    }

    /// Stored path of a PNG rendered from this content, if it still exists.
    ///
    /// The path may differ from where the caller wants the file; copying it
    /// over is the caller's job.
    pub fn find_cached(&self, svg_hash: &str, params_hash: &str, dir: &Path) -> Option<String> {
        let stored = self.content_index.get(&content_key(svg_hash, params_hash))?;
        dir.join(stored).exists().then(|| stored.clone())
    }

    /// Record that `output_path` holds the render of this content.
    ///
    /// An older entry for the same content under another path is dropped.
    pub fn insert(&mut self, output_path: String, svg_hash: String, params_hash: String) {
        let key = content_key(&svg_hash, &params_hash);
        if let Some(old) = self.content_index.get(&key)
            && *old != output_path
        {
            self.entries.remove(old.as_str());
        }
        self.content_index.insert(key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                svg_hash,
                params_hash,
            },
        );
    }
}

pub fn hash_svg(svg: &str) -> String {
    format!("{:x}", Sha256::digest(svg.as_bytes()))
}

/// Hash of everything besides the SVG that affects the PNG.
pub fn hash_raster_params(pixel_ratio: u32, font_dirs: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"poster\0");
    hasher.update(pixel_ratio.to_le_bytes());
    for dir in font_dirs {
        hasher.update(dir.to_string_lossy().as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

/// Cache outcome counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits + self.copies, self.copies) {
            (0, _) => write!(f, "{} rendered", self.misses),
            (_, 0) => write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            ),
            _ => write!(
                f,
                "{} cached, {} copied, {} rendered ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn hit_requires_file_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("2025/001-quiz--junior/style-1.png".into(), "svg".into(), "prm".into());
        assert_eq!(m.find_cached("svg", "prm", tmp.path()), None);

        let dir = tmp.path().join("2025/001-quiz--junior");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("style-1.png"), "png").unwrap();
        assert_eq!(
            m.find_cached("svg", "prm", tmp.path()),
            Some("2025/001-quiz--junior/style-1.png".to_string())
        );
    }

    #[test]
    fn miss_on_changed_svg_or_params() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("p.png".into(), "svg_a".into(), "prm_a".into());
        fs::write(tmp.path().join("p.png"), "png").unwrap();

        assert_eq!(m.find_cached("svg_b", "prm_a", tmp.path()), None);
        assert_eq!(m.find_cached("svg_a", "prm_b", tmp.path()), None);
    }

    #[test]
    fn renumbered_program_replaces_old_entry() {
        let mut m = CacheManifest::empty();
        m.insert("2025/001-quiz--junior/style-1.png".into(), "s".into(), "p".into());
        m.insert("2025/002-quiz--junior/style-1.png".into(), "s".into(), "p".into());

        assert_eq!(m.entries.len(), 1);
        assert!(m.entries.contains_key("2025/002-quiz--junior/style-1.png"));
    }

    #[test]
    fn save_and_load_rebuilds_index() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("a.png".into(), "s1".into(), "p1".into());
        m.save(tmp.path()).unwrap();

        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.content_index.get("s1:p1"), Some(&"a.png".to_string()));
    }

    #[test]
    fn corrupt_or_outdated_manifest_loads_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"svg_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(tmp.path().join(MANIFEST_FILENAME), json).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    #[test]
    fn svg_hash_tracks_content() {
        assert_eq!(hash_svg("<svg/>"), hash_svg("<svg/>"));
        assert_ne!(hash_svg("<svg/>"), hash_svg("<svg></svg>"));
        assert_eq!(hash_svg("").len(), 64);
    }

    #[test]
    fn params_hash_varies_with_ratio_and_fonts() {
        let none: Vec<PathBuf> = vec![];
        assert_ne!(hash_raster_params(1, &none), hash_raster_params(2, &none));
        assert_ne!(
            hash_raster_params(2, &none),
            hash_raster_params(2, &[PathBuf::from("fonts")])
        );
    }

    #[test]
    fn stats_display() {
        let mut s = CacheStats::default();
        s.misses = 3;
        assert_eq!(s.to_string(), "3 rendered");
        s.hits = 5;
        assert_eq!(s.to_string(), "5 cached, 3 rendered (8 total)");
        s.copies = 2;
        assert_eq!(s.to_string(), "5 cached, 2 copied, 3 rendered (10 total)");
    }
}
