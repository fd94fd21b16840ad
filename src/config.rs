//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. A user config file
//! is sparse: it is merged on top of the stock defaults, so it only needs the
//! keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml              # Site config (overrides stock defaults)
//! └── assets/                  # Logo, favicon, fonts → copied to output root
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "Muhimmath"
//! tagline = "SSF Daawa Sector"
//! event_name = "Meem Fest"
//! event_date = "2025 July 02"
//! venue = "Muhimmathul Muslimeen Education Centre"
//! base_url = "https://muhimmath.org"
//!
//! [gateway]
//! url = "http://localhost:54321"
//! timeout_secs = 15
//! activation = "two-step"       # or "atomic"
//! activation_function = "set_active_background"
//!
//! [results]
//! years = ["2025", "2024", "2023"]
//! default_year = "2025"
//!
//! [posters]
//! size = 500                    # Poster edge in CSS pixels
//! pixel_ratio = 2               # Raster density multiplier
//! default_style = 0
//! handle = "@muhimmath"
//! font_dirs = []
//!
//! [home]
//! gallery_limit = 6
//! news_limit = 3
//!
//! [colors.light]
//! background = "#f9fafb"
//! ...
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! The gateway API key is deliberately not a config key. It is read from the
//! `MUHIMMATH_GATEWAY_KEY` environment variable so `config.toml` can be
//! committed. Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Event identity and public URL.
    pub site: SiteInfo,
    /// Where the hosted data service lives and how writes are issued.
    pub gateway: GatewayConfig,
    /// Which result years are published.
    pub results: ResultsConfig,
    /// Poster canvas and raster settings.
    pub posters: PosterConfig,
    /// Home page section sizes.
    pub home: HomeConfig,
    /// Color schemes for light and dark modes.
    pub colors: ColorConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.results.years.is_empty() {
            return Err(ConfigError::Validation(
                "results.years must not be empty".into(),
            ));
        }
        if !self.results.years.contains(&self.results.default_year) {
            return Err(ConfigError::Validation(format!(
                "results.default_year '{}' is not listed in results.years",
                self.results.default_year
            )));
        }
        if self.posters.size == 0 {
            return Err(ConfigError::Validation(
                "posters.size must be non-zero".into(),
            ));
        }
        if !(1..=4).contains(&self.posters.pixel_ratio) {
            return Err(ConfigError::Validation(
                "posters.pixel_ratio must be 1-4".into(),
            ));
        }
        if self.posters.default_style >= crate::poster::PosterStyle::ALL.len() {
            return Err(ConfigError::Validation(format!(
                "posters.default_style must be 0-{}",
                crate::poster::PosterStyle::ALL.len() - 1
            )));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gateway.timeout_secs must be non-zero".into(),
            ));
        }
        if self.gateway.activation_function.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gateway.activation_function must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Event identity shown in page headers, posters and share text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    pub title: String,
    pub tagline: String,
    pub event_name: String,
    pub event_date: String,
    pub venue: String,
    /// Public address of the deployed site, used for share links.
    pub base_url: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: "Muhimmath".to_string(),
            tagline: "SSF Daawa Sector".to_string(),
            event_name: "Meem Fest".to_string(),
            event_date: "2025 July 02".to_string(),
            venue: "Muhimmathul Muslimeen Education Centre".to_string(),
            base_url: "https://muhimmath.org".to_string(),
        }
    }
}

impl SiteInfo {
    /// Absolute URL for a site-relative path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// How the "set active background" transition is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationMode {
    /// Deactivate all, then activate one. A failure in between leaves no
    /// active background.
    #[default]
    TwoStep,
    /// One gateway function call performing the swap in a transaction.
    Atomic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the hosted project (without `/rest/v1`).
    pub url: String,
    pub timeout_secs: u64,
    pub activation: ActivationMode,
    /// Stored function used by [`ActivationMode::Atomic`].
    pub activation_function: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            timeout_secs: 15,
            activation: ActivationMode::default(),
            activation_function: "set_active_background".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResultsConfig {
    /// Published years, newest first. Each gets its own results page.
    pub years: Vec<String>,
    /// Year the results link points to.
    pub default_year: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            years: vec!["2025".to_string(), "2024".to_string(), "2023".to_string()],
            default_year: "2025".to_string(),
        }
    }
}

/// Poster canvas and rasterization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PosterConfig {
    /// Edge length of the square poster canvas, in CSS pixels.
    pub size: u32,
    /// Density multiplier applied when rasterizing.
    pub pixel_ratio: u32,
    /// Style shown first in the poster viewer (index into the style list).
    pub default_style: usize,
    /// Social handle printed on styles that carry one.
    pub handle: String,
    /// Extra directories searched for fonts (relative to the site directory).
    pub font_dirs: Vec<String>,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            size: 500,
            pixel_ratio: 2,
            default_style: 0,
            handle: "@muhimmath".to_string(),
            font_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HomeConfig {
    /// Latest gallery items shown on the home page.
    pub gallery_limit: usize,
    /// Latest published news items shown on the home page.
    pub news_limit: usize,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            gallery_limit: 6,
            news_limit: 3,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel poster rasterization workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Color configuration for light and dark modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub light: ColorScheme,
    pub dark: ColorScheme,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            light: ColorScheme::default_light(),
            dark: ColorScheme::default_dark(),
        }
    }
}

/// Individual color scheme (light or dark).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorScheme {
    pub background: String,
    /// Card and panel surfaces.
    pub surface: String,
    pub text: String,
    /// Secondary text (categories, dates, captions).
    pub text_muted: String,
    pub border: String,
    /// Brand color: header, banners, buttons.
    pub accent: String,
    /// Highlight for active tabs and the hero title.
    pub highlight: String,
}

impl ColorScheme {
    pub fn default_light() -> Self {
        Self {
            background: "#f9fafb".to_string(),
            surface: "#ffffff".to_string(),
            text: "#111827".to_string(),
            text_muted: "#4b5563".to_string(),
            border: "#d1d5db".to_string(),
            accent: "#991b1b".to_string(),
            highlight: "#facc15".to_string(),
        }
    }

    pub fn default_dark() -> Self {
        Self {
            background: "#0b0b0f".to_string(),
            surface: "#1f2937".to_string(),
            text: "#f3f4f6".to_string(),
            text_muted: "#9ca3af".to_string(),
            border: "#374151".to_string(),
            accent: "#dc2626".to_string(),
            highlight: "#fde047".to_string(),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_light()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Muhimmath Site Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# The gateway API key is NOT configured here: export MUHIMMATH_GATEWAY_KEY.

# ---------------------------------------------------------------------------
# Event identity
# ---------------------------------------------------------------------------
[site]
title = "Muhimmath"
tagline = "SSF Daawa Sector"
event_name = "Meem Fest"
event_date = "2025 July 02"
venue = "Muhimmathul Muslimeen Education Centre"
# Public address of the deployed site; share links are built from it.
base_url = "https://muhimmath.org"

# ---------------------------------------------------------------------------
# Hosted data service
# ---------------------------------------------------------------------------
[gateway]
# Project URL, without the /rest/v1 suffix.
url = "http://localhost:54321"
timeout_secs = 15
# "two-step": deactivate all backgrounds, then activate one (two writes).
# "atomic":   call activation_function, which swaps in one transaction.
activation = "two-step"
activation_function = "set_active_background"

# ---------------------------------------------------------------------------
# Results
# ---------------------------------------------------------------------------
[results]
# Published years, newest first. Each gets results/<year>/index.html.
years = ["2025", "2024", "2023"]
default_year = "2025"

# ---------------------------------------------------------------------------
# Posters
# ---------------------------------------------------------------------------
[posters]
# Square canvas edge in CSS pixels.
size = 500
# Raster density multiplier: 2 produces 1000x1000 PNGs.
pixel_ratio = 2
# Style shown first in the poster viewer (0-4).
default_style = 0
handle = "@muhimmath"
# Extra font directories, relative to the site directory.
font_dirs = []

# ---------------------------------------------------------------------------
# Home page
# ---------------------------------------------------------------------------
[home]
gallery_limit = 6
news_limit = 3

# ---------------------------------------------------------------------------
# Colors - Light mode (prefers-color-scheme: light)
# ---------------------------------------------------------------------------
[colors.light]
background = "#f9fafb"
surface = "#ffffff"
text = "#111827"
text_muted = "#4b5563"
border = "#d1d5db"
accent = "#991b1b"
highlight = "#facc15"

# ---------------------------------------------------------------------------
# Colors - Dark mode (prefers-color-scheme: dark)
# ---------------------------------------------------------------------------
[colors.dark]
background = "#0b0b0f"
surface = "#1f2937"
text = "#f3f4f6"
text_muted = "#9ca3af"
border = "#374151"
accent = "#dc2626"
highlight = "#fde047"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel poster-rendering workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

/// Generate CSS custom properties from color config.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    fn block(scheme: &ColorScheme) -> String {
        format!(
            "--color-bg: {};\n    --color-surface: {};\n    --color-text: {};\n    --color-text-muted: {};\n    --color-border: {};\n    --color-accent: {};\n    --color-highlight: {};",
            scheme.background,
            scheme.surface,
            scheme.text,
            scheme.text_muted,
            scheme.border,
            scheme.accent,
            scheme.highlight,
        )
    }
    format!(
        ":root {{\n    {}\n}}\n\n@media (prefers-color-scheme: dark) {{\n    :root {{\n    {}\n    }}\n}}",
        block(&colors.light),
        block(&colors.dark),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn default_poster_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.posters.size, 500);
        assert_eq!(config.posters.pixel_ratio, 2);
        assert_eq!(config.posters.default_style, 0);
    }

    #[test]
    fn default_activation_is_two_step() {
        assert_eq!(
            SiteConfig::default().gateway.activation,
            ActivationMode::TwoStep
        );
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[colors.light]
accent = "#123456"
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.colors.light.accent, "#123456");
        assert_eq!(config.colors.light.highlight, "#facc15");
        assert_eq!(config.results.default_year, "2025");
    }

    #[test]
    fn parse_atomic_activation() {
        let toml = r#"
[gateway]
activation = "atomic"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.gateway.activation, ActivationMode::Atomic);
        assert_eq!(config.gateway.activation_function, "set_active_background");
    }

    #[test]
    fn url_for_joins_without_double_slash() {
        let mut site = SiteInfo::default();
        site.base_url = "https://example.org/".to_string();
        assert_eq!(
            site.url_for("/results/2025/"),
            "https://example.org/results/2025/"
        );
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.title, "Muhimmath");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[results]
years = ["2024"]
default_year = "2024"
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.results.years, vec!["2024"]);
        assert_eq!(config.posters.size, 500);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[posters]
pixel_raito = 2
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml_str);
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn api_key_is_not_a_config_key() {
        let toml_str = r#"
[gateway]
anon_key = "secret"
"#;
        assert!(toml::from_str::<SiteConfig>(toml_str).is_err());
    }

    #[test]
    fn validate_default_year_must_be_listed() {
        let mut config = SiteConfig::default();
        config.results.default_year = "1999".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_year"));
    }

    #[test]
    fn validate_pixel_ratio_range() {
        let mut config = SiteConfig::default();
        config.posters.pixel_ratio = 0;
        assert!(config.validate().is_err());
        config.posters.pixel_ratio = 5;
        assert!(config.validate().is_err());
        config.posters.pixel_ratio = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_default_style_range() {
        let mut config = SiteConfig::default();
        config.posters.default_style = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[results]
years = []
"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str(
            r##"
[colors.light]
background = "#fff"
text = "#000"
"##,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r##"
[colors.light]
background = "#fafafa"
"##,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let light = merged.get("colors").unwrap().get("light").unwrap();
        assert_eq!(light.get("background").unwrap().as_str(), Some("#fafafa"));
        assert_eq!(light.get("text").unwrap().as_str(), Some("#000"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"years = ["2025", "2024"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"years = ["2023"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("years").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.posters.pixel_ratio, 2);
        assert_eq!(config.results.years, vec!["2025", "2024", "2023"]);
        assert_eq!(config.colors.dark.accent, "#dc2626");
        assert_eq!(config.gateway.activation, ActivationMode::TwoStep);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[site]",
            "[gateway]",
            "[results]",
            "[posters]",
            "[home]",
            "[colors.light]",
            "[colors.dark]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn generate_css_includes_dark_mode_media_query() {
        let css = generate_color_css(&ColorConfig::default());
        assert!(css.contains("--color-accent: #991b1b"));
        assert!(css.contains("@media (prefers-color-scheme: dark)"));
        assert!(css.contains("--color-accent: #dc2626"));
    }
}
