//! # Muhimmath
//!
//! Results site, poster renderer and admin tool for the Muhimmath arts fest.
//! The hosted data service is the data source: results, teams, news, gallery
//! and about content are read from it, and every result becomes a set of
//! shareable winner posters.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! The site is built in three independent stages, each producing a JSON file
//! that the next stage consumes:
//!
//! ```text
//! 1. Fetch     gateway   →  snapshot.json          (service → structured data)
//! 2. Posters   snapshot  →  processed/             (SVG posters → PNG)
//! 3. Generate  manifest  →  dist/                  (final HTML site)
//! ```
//!
//! A failed query never stops the build. The snapshot records the failure
//! per collection and the affected page shows a connection-error banner.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | Stage 1: pulls every collection into a snapshot |
//! | [`process`] | Stage 2: renders every poster style of every program to PNG |
//! | [`generate`] | Stage 3: renders the HTML site from the processed manifest using Maud |
//! | [`gateway`] | Data service access: the `Gateway` trait, REST and in-memory gateways, auth |
//! | [`aggregate`] | Programs from result rows, podiums, team ranking |
//! | [`poster`] | The five poster layouts as SVG |
//! | [`export`] | SVG → PNG rasterization, atomic writes, sharing with clipboard fallback |
//! | [`view`] | Per-screen results state: year, tab, search, poster viewer |
//! | [`admin`] | Admin write operations over any gateway |
//! | [`cache`] | Content-addressed poster cache for incremental builds |
//! | [`config`] | `config.toml` loading, validation, merging and CSS generation |
//! | [`types`] | Rows and shared types serialized between stages |
//! | [`naming`] | Download filenames and URL-safe path segments |
//! | [`output`] | CLI output formatting for every stage and command |
//!
//! # Design Decisions
//!
//! ## Static Output
//!
//! The public site is plain HTML with one small script. Results change a few
//! times a day during the fest; rebuilding on change is cheaper than serving
//! every visitor from the data service, and a rebuilt site keeps working when
//! the service is down.
//!
//! ## Posters as SVG
//!
//! Posters are generated as SVG with Maud and rasterized with resvg. The
//! layout is testable as text, and the PNG is identical on every machine
//! given the same fonts.
//!
//! ## Background Activation
//!
//! Exactly one homepage background should be active. The stock behavior
//! issues two writes (deactivate all, activate one), which can leave zero
//! active rows if the second fails. `[gateway] activation = "atomic"` moves
//! the swap into a single stored function call instead.

pub mod admin;
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod export;
pub mod fetch;
pub mod gateway;
pub mod generate;
pub mod naming;
pub mod output;
pub mod poster;
pub mod process;
pub mod types;
pub mod view;

#[cfg(test)]
pub(crate) mod test_helpers;
