//! Result posters.
//!
//! A poster is a square SVG announcing the winners of one program. Five
//! interchangeable styles share the same input ([`PosterData`]) and the same
//! rules:
//!
//! - The layout is drawn on a fixed 500×500 coordinate space; the configured
//!   size only scales the outer `width`/`height`.
//! - Only the first three places appear. A missing place leaves its slot out
//!   entirely; it is never drawn as blank or as an error.
//! - First place always gets the strongest emphasis.
//!
//! SVG is produced with maud, so every participant name is escaped.
//! Rasterizing to PNG happens in [`crate::export`].

mod styles;

use crate::aggregate::Podium;
use crate::config::PosterConfig;
use crate::types::{PosterData, ResultRow};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Edge length of the layout coordinate space.
pub const CANVAS: f32 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterStyle {
    /// Dark card with a ruled list of placings.
    Ledger,
    /// Large ordinal numerals beside each name.
    Ordinal,
    /// Gradient backdrop with the winner centered.
    Spotlight,
    /// Beige serif certificate with the event year.
    Parchment,
    /// Three podium blocks, tallest in the middle.
    Podium,
}

impl PosterStyle {
    /// Every style, in viewer order.
    pub const ALL: [PosterStyle; 5] = [
        PosterStyle::Ledger,
        PosterStyle::Ordinal,
        PosterStyle::Spotlight,
        PosterStyle::Parchment,
        PosterStyle::Podium,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PosterStyle::Ledger => "ledger",
            PosterStyle::Ordinal => "ordinal",
            PosterStyle::Spotlight => "spotlight",
            PosterStyle::Parchment => "parchment",
            PosterStyle::Podium => "podium",
        }
    }

    /// Position in [`PosterStyle::ALL`].
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

impl fmt::Display for PosterStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PosterStyle {
    type Err = String;

    /// Accepts a style name or its 1-based number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| format!("poster style number must be 1-{}", Self::ALL.len()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|style| style.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|st| st.name()).collect();
                format!("unknown poster style '{s}' (expected {})", names.join(", "))
            })
    }
}

/// Which style the poster viewer shows.
///
/// Lives only as long as one viewing session. `next` past the last style
/// returns to the first and `prev` before the first goes to the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StyleCursor {
    index: usize,
}

impl StyleCursor {
    /// Start at `index`, reduced modulo the number of styles.
    pub fn new(index: usize) -> Self {
        Self {
            index: index % PosterStyle::ALL.len(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> PosterStyle {
        PosterStyle::ALL[self.index]
    }

    pub fn next(&mut self) -> PosterStyle {
        self.index = (self.index + 1) % PosterStyle::ALL.len();
        self.current()
    }

    pub fn prev(&mut self) -> PosterStyle {
        let len = PosterStyle::ALL.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }
}

/// Render `data` as an SVG document in the given style.
pub fn render_svg(style: PosterStyle, data: &PosterData, config: &PosterConfig) -> String {
    let podium = Podium::from_winners(&data.winners);
    let ctx = Layout {
        event: &data.program.event,
        category: &data.program.category,
        year: data.winners.first().map(|w| w.year.as_str()).unwrap_or(""),
        handle: &config.handle,
        podium,
    };
    let body = match style {
        PosterStyle::Ledger => styles::ledger(&ctx),
        PosterStyle::Ordinal => styles::ordinal(&ctx),
        PosterStyle::Spotlight => styles::spotlight(&ctx),
        PosterStyle::Parchment => styles::parchment(&ctx),
        PosterStyle::Podium => styles::podium(&ctx),
    };
    let size = config.size;
    html! {
        svg xmlns="http://www.w3.org/2000/svg"
            width=(size) height=(size)
            viewBox={ "0 0 " (CANVAS) " " (CANVAS) } {
            (body)
        }
    }
    .into_string()
}

/// Everything a style needs to draw.
pub(crate) struct Layout<'a> {
    pub event: &'a str,
    pub category: &'a str,
    pub year: &'a str,
    pub handle: &'a str,
    pub podium: Podium<'a>,
}

/// `"1st"`, `"2nd"`, `"3rd"`.
pub(crate) fn place_name(position: u8) -> &'static str {
    match position {
        1 => "1st",
        2 => "2nd",
        3 => "3rd",
        _ => "",
    }
}

/// Secondary line under a name: team and school, whichever exist.
pub(crate) fn detail(row: &ResultRow) -> String {
    [row.team.as_deref(), row.school.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Font size that keeps `text` within `max_width`, never above `base`.
///
/// Uses an average glyph width of 0.6em, close enough for the sans and serif
/// faces the posters use.
pub(crate) fn fitted_size(text: &str, base: f32, max_width: f32) -> f32 {
    let chars = text.chars().count().max(1) as f32;
    (max_width / (chars * 0.6)).min(base).max(8.0)
}

/// A `text` element; `anchor` is `start`, `middle` or `end`.
pub(crate) fn label(
    x: f32,
    y: f32,
    size: f32,
    weight: u16,
    fill: &str,
    anchor: &str,
    text: &str,
) -> Markup {
    html! {
        text x=(x) y=(y) font-size=(size) font-weight=(weight) fill=(fill)
            text-anchor=(anchor) font-family="sans-serif" { (text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::result_row;
    use crate::types::Program;

    fn data(positions: &[u8]) -> PosterData {
        PosterData {
            program: Program::new("Qawali Competition", "General"),
            winners: positions
                .iter()
                .map(|p| result_row("Qawali Competition", "General", *p, &format!("Winner {p}")))
                .collect(),
        }
    }

    #[test]
    fn cursor_wraps_forward() {
        let mut cursor = StyleCursor::new(4);
        assert_eq!(cursor.current(), PosterStyle::Podium);
        assert_eq!(cursor.next(), PosterStyle::Ledger);
    }

    #[test]
    fn cursor_wraps_backward() {
        let mut cursor = StyleCursor::default();
        assert_eq!(cursor.prev(), PosterStyle::Podium);
        assert_eq!(cursor.index(), 4);
    }

    #[test]
    fn cursor_full_cycle_returns_to_start() {
        let mut cursor = StyleCursor::new(2);
        for _ in 0..PosterStyle::ALL.len() {
            cursor.next();
        }
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn cursor_start_reduced_modulo() {
        assert_eq!(StyleCursor::new(7).index(), 2);
    }

    #[test]
    fn style_parses_name_or_number() {
        assert_eq!("spotlight".parse::<PosterStyle>(), Ok(PosterStyle::Spotlight));
        assert_eq!("PODIUM".parse::<PosterStyle>(), Ok(PosterStyle::Podium));
        assert_eq!("1".parse::<PosterStyle>(), Ok(PosterStyle::Ledger));
        assert!("0".parse::<PosterStyle>().is_err());
        assert!("6".parse::<PosterStyle>().is_err());
        assert!("neon".parse::<PosterStyle>().is_err());
    }

    #[test]
    fn style_index_matches_all_order() {
        for (i, style) in PosterStyle::ALL.iter().enumerate() {
            assert_eq!(style.index(), i);
        }
    }

    #[test]
    fn every_style_renders_all_three_places() {
        let d = data(&[1, 2, 3]);
        for style in PosterStyle::ALL {
            let svg = render_svg(style, &d, &PosterConfig::default());
            assert!(svg.starts_with("<svg"), "{style}");
            for p in 1..=3 {
                assert!(svg.contains(&format!("Winner {p}")), "{style} missing place {p}");
            }
        }
    }

    #[test]
    fn missing_second_place_is_omitted() {
        let d = data(&[1, 3]);
        for style in PosterStyle::ALL {
            let svg = render_svg(style, &d, &PosterConfig::default());
            assert!(svg.contains("Winner 1"), "{style}");
            assert!(svg.contains("Winner 3"), "{style}");
            assert!(!svg.contains("2nd"), "{style} drew an empty second slot");
            assert!(!svg.contains("data-place=\"2\""), "{style}");
        }
    }

    #[test]
    fn no_winners_still_renders_header() {
        let d = data(&[]);
        for style in PosterStyle::ALL {
            let svg = render_svg(style, &d, &PosterConfig::default());
            assert!(svg.to_uppercase().contains("QAWALI COMPETITION"), "{style}");
            assert!(!svg.contains("data-place"), "{style}");
        }
    }

    #[test]
    fn names_are_escaped() {
        let mut d = data(&[1]);
        d.winners[0].participant = "Ali & <Sons>".into();
        let svg = render_svg(PosterStyle::Ledger, &d, &PosterConfig::default());
        assert!(svg.contains("Ali &amp; &lt;Sons&gt;"));
    }

    #[test]
    fn configured_size_scales_outer_box_only() {
        let mut config = PosterConfig::default();
        config.size = 250;
        let svg = render_svg(PosterStyle::Ordinal, &data(&[1]), &config);
        assert!(svg.contains("width=\"250\""));
        assert!(svg.contains("viewBox=\"0 0 500 500\""));
    }

    #[test]
    fn detail_joins_team_and_school() {
        let mut row = result_row("Quiz", "Junior", 1, "Adil");
        assert_eq!(detail(&row), "");
        row.team = Some("Blue".into());
        row.school = Some("HSS".into());
        assert_eq!(detail(&row), "Blue · HSS");
    }

    #[test]
    fn fitted_size_shrinks_long_text() {
        assert_eq!(fitted_size("Adil", 40.0, 400.0), 40.0);
        assert!(fitted_size(&"x".repeat(60), 40.0, 400.0) < 40.0);
    }
}
