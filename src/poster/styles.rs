//! The five poster layouts. Each draws on the 500×500 canvas and returns the
//! children of the root `svg` element.

use super::{Layout, detail, fitted_size, label, place_name};
use maud::{Markup, html};

fn upper(s: &str) -> String {
    s.to_uppercase()
}

fn serif(x: f32, y: f32, size: f32, weight: u16, fill: &str, text: &str) -> Markup {
    html! {
        text x=(x) y=(y) font-size=(size) font-weight=(weight) fill=(fill)
            text-anchor="middle" font-family="serif" { (text) }
    }
}

pub(super) fn ledger(ctx: &Layout) -> Markup {
    let event = upper(ctx.event);
    html! {
        rect x="0" y="0" width="500" height="500" fill="#111827" {}
        rect x="24" y="24" width="452" height="452" rx="18" fill="none"
            stroke="#facc15" stroke-width="2" {}
        (label(250.0, 78.0, 14.0, 600, "#facc15", "middle", "MUHIMMATH RESULTS"))
        (label(250.0, 120.0, fitted_size(&event, 30.0, 420.0), 800, "#ffffff", "middle", &event))
        (label(250.0, 150.0, 16.0, 500, "#9ca3af", "middle", ctx.category))
        @for (pos, row) in ctx.podium.placed() {
            @let y = 200.0 + f32::from(pos - 1) * 90.0;
            @let base = if pos == 1 { 28.0 } else { 22.0 };
            @let extra = detail(row);
            g data-place=(pos) {
                line x1="48" x2="452" y1=(y - 30.0) y2=(y - 30.0) stroke="#374151" {}
                (label(56.0, y + 10.0, 18.0, 700, "#facc15", "start", place_name(pos)))
                (label(120.0, y + 10.0, fitted_size(&row.participant, base, 330.0), 700, "#ffffff", "start", &row.participant))
                @if !extra.is_empty() {
                    (label(120.0, y + 34.0, 13.0, 400, "#9ca3af", "start", &extra))
                }
            }
        }
        (label(250.0, 462.0, 12.0, 500, "#6b7280", "middle", ctx.handle))
    }
}

pub(super) fn ordinal(ctx: &Layout) -> Markup {
    html! {
        rect x="0" y="0" width="500" height="500" fill="#ffffff" {}
        rect x="0" y="0" width="500" height="110" fill="#991b1b" {}
        (label(32.0, 60.0, fitted_size(ctx.event, 30.0, 436.0), 800, "#ffffff", "start", ctx.event))
        (label(32.0, 88.0, 15.0, 500, "#fecaca", "start", ctx.category))
        @for (pos, row) in ctx.podium.placed() {
            @let y = 170.0 + f32::from(pos - 1) * 105.0;
            @let numeral_fill = if pos == 1 { "#991b1b" } else { "#d1d5db" };
            @let base = if pos == 1 { 26.0 } else { 22.0 };
            @let extra = detail(row);
            g data-place=(pos) {
                (label(32.0, y + 40.0, 64.0, 900, numeral_fill, "start", &format!("{pos:02}")))
                (label(130.0, y + 18.0, fitted_size(&row.participant, base, 340.0), 700, "#111827", "start", &row.participant))
                @if !extra.is_empty() {
                    (label(130.0, y + 42.0, 14.0, 400, "#6b7280", "start", &extra))
                }
            }
        }
        (label(468.0, 480.0, 12.0, 600, "#991b1b", "end", ctx.handle))
    }
}

pub(super) fn spotlight(ctx: &Layout) -> Markup {
    html! {
        defs {
            linearGradient id="spot-bg" x1="0" y1="0" x2="1" y2="1" {
                stop offset="0" stop-color="#7c3aed" {}
                stop offset="1" stop-color="#db2777" {}
            }
            radialGradient id="spot-glow" {
                stop offset="0" stop-color="#ffffff" stop-opacity="0.35" {}
                stop offset="1" stop-color="#ffffff" stop-opacity="0" {}
            }
        }
        rect x="0" y="0" width="500" height="500" fill="url(#spot-bg)" {}
        circle cx="250" cy="225" r="150" fill="url(#spot-glow)" {}
        (label(250.0, 60.0, 14.0, 600, "#fde68a", "middle", "MUHIMMATH"))
        (label(250.0, 95.0, fitted_size(ctx.event, 28.0, 440.0), 800, "#ffffff", "middle", ctx.event))
        (label(250.0, 120.0, 15.0, 500, "#fbcfe8", "middle", ctx.category))
        @if let Some(first) = ctx.podium.first() {
            @let extra = detail(first);
            g data-place="1" {
                (label(250.0, 200.0, 14.0, 700, "#fde68a", "middle", "WINNER"))
                (label(250.0, 245.0, fitted_size(&first.participant, 40.0, 440.0), 800, "#ffffff", "middle", &first.participant))
                @if !extra.is_empty() {
                    (label(250.0, 275.0, 14.0, 400, "#fce7f3", "middle", &extra))
                }
            }
        }
        @for (pos, x) in [(2u8, 125.0), (3u8, 375.0)] {
            @if let Some(row) = ctx.podium.get(pos) {
                @let extra = detail(row);
                g data-place=(pos) {
                    (label(x, 380.0, 13.0, 700, "#fde68a", "middle", place_name(pos)))
                    (label(x, 410.0, fitted_size(&row.participant, 20.0, 220.0), 700, "#ffffff", "middle", &row.participant))
                    @if !extra.is_empty() {
                        (label(x, 432.0, 11.0, 400, "#fce7f3", "middle", &extra))
                    }
                }
            }
        }
        (label(250.0, 480.0, 12.0, 500, "#fce7f3", "middle", ctx.handle))
    }
}

pub(super) fn parchment(ctx: &Layout) -> Markup {
    let subtitle = if ctx.year.is_empty() {
        "Results".to_string()
    } else {
        format!("Results of {}", ctx.year)
    };
    html! {
        rect x="0" y="0" width="500" height="500" fill="#f5ecd7" {}
        rect x="18" y="18" width="464" height="464" fill="none" stroke="#8b5e34" stroke-width="3" {}
        rect x="28" y="28" width="444" height="444" fill="none" stroke="#8b5e34" stroke-width="1" {}
        (serif(250.0, 80.0, 30.0, 700, "#5b3a1a", "MUHIMMATH"))
        (serif(250.0, 108.0, 15.0, 400, "#8b5e34", &subtitle))
        line x1="150" x2="350" y1="126" y2="126" stroke="#8b5e34" {}
        (serif(250.0, 165.0, fitted_size(ctx.event, 26.0, 400.0), 700, "#3f2a14", ctx.event))
        (serif(250.0, 190.0, 15.0, 400, "#8b5e34", ctx.category))
        @for (pos, row) in ctx.podium.placed() {
            @let y = 250.0 + f32::from(pos - 1) * 70.0;
            @let base = if pos == 1 { 24.0 } else { 20.0 };
            @let extra = detail(row);
            g data-place=(pos) {
                (serif(250.0, y, 13.0, 600, "#8b5e34", &format!("{} Place", place_name(pos))))
                (serif(250.0, y + 26.0, fitted_size(&row.participant, base, 380.0), 700, "#3f2a14", &row.participant))
                @if !extra.is_empty() {
                    (serif(250.0, y + 46.0, 12.0, 400, "#8b5e34", &extra))
                }
            }
        }
        (serif(250.0, 462.0, 12.0, 400, "#8b5e34", ctx.handle))
    }
}

/// Block center, height and fill per place.
const PODIUM_BLOCKS: [(u8, f32, f32, &str); 3] = [
    (1, 250.0, 170.0, "#facc15"),
    (2, 110.0, 120.0, "#cbd5e1"),
    (3, 390.0, 90.0, "#d97706"),
];

const GROUND: f32 = 440.0;

pub(super) fn podium(ctx: &Layout) -> Markup {
    html! {
        rect x="0" y="0" width="500" height="500" fill="#0f172a" {}
        (label(250.0, 56.0, 14.0, 600, "#facc15", "middle", "MUHIMMATH"))
        (label(250.0, 92.0, fitted_size(ctx.event, 28.0, 440.0), 800, "#ffffff", "middle", ctx.event))
        (label(250.0, 118.0, 15.0, 500, "#94a3b8", "middle", ctx.category))
        @for (pos, cx, h, fill) in PODIUM_BLOCKS {
            @if let Some(row) = ctx.podium.get(pos) {
                @let top = GROUND - h;
                @let extra = detail(row);
                g data-place=(pos) {
                    rect x=(cx - 65.0) y=(top) width="130" height=(h) rx="6" fill=(fill) {}
                    (label(cx, top + 45.0, 36.0, 900, "#0f172a", "middle", &pos.to_string()))
                    (label(cx, top - 36.0, fitted_size(&row.participant, 20.0, 150.0), 700, "#ffffff", "middle", &row.participant))
                    @if !extra.is_empty() {
                        (label(cx, top - 16.0, 11.0, 400, "#94a3b8", "middle", &extra))
                    }
                }
            }
        }
        rect x="30" y=(GROUND) width="440" height="6" fill="#334155" {}
        (label(250.0, 480.0, 12.0, 500, "#64748b", "middle", ctx.handle))
    }
}
