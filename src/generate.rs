//! HTML site generation.
//!
//! Stage 3 of the build pipeline. Takes the processed manifest (snapshot plus
//! poster index) and writes the final static site.
//!
//! ## Generated Pages
//!
//! - **Home** (`/index.html`): active background hero, latest gallery items
//!   and latest published news
//! - **Results** (`/results/{year}/index.html`): programs and teams tabs,
//!   search, year selector and the poster viewer
//! - **News** (`/news.html`, `/news/{id}.html`): featured and regular
//!   articles, each article rendered from markdown
//! - **Gallery** (`/gallery.html`): category filter and search
//! - **About** (`/about.html`): about sections and team members
//!
//! A collection whose query failed renders a "Connection Error" banner in
//! place of its content; the rest of the page is still produced.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── about.html
//! ├── gallery.html
//! ├── news.html
//! ├── news/{id}.html
//! ├── results/2025/index.html
//! ├── posters/2025/001-arabic-song--junior/style-1.png
//! └── assets/                      # Copied from the site directory
//! ```
//!
//! ## CSS and JavaScript
//!
//! Static assets are embedded at compile time:
//! - `static/style.css`: Base styles (colors injected from config)
//! - `static/site.js`: Results tabs, search, poster viewer, sharing and the
//!   news/gallery filters

use crate::aggregate::{Podium, RankedTeam};
use crate::config::{self, SiteConfig};
use crate::export::SharePayload;
use crate::naming::{path_segment, poster_filename};
use crate::poster::PosterStyle;
use crate::process::{ProcessedManifest, ProgramPosters};
use crate::types::{
    BackgroundKind, GalleryItem, HomepageBackground, Loaded, NewsItem, Program, TeamMember,
};
use crate::view::{ResultsView, Tab, ViewState};
use chrono::{DateTime, Utc};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot copy site assets: {0}")]
    Walk(#[from] walkdir::Error),
}

/// What stage 3 wrote.
#[derive(Debug, Default)]
pub struct GeneratedSite {
    /// Pages relative to the output directory, in write order.
    pub pages: Vec<String>,
    pub posters: usize,
    pub assets: usize,
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/site.js");

/// News filter choices after "all".
pub const NEWS_CATEGORIES: [&str; 4] = ["Announcement", "Update", "Event", "Result"];

/// Gallery filter choices after "all".
pub const GALLERY_CATEGORIES: [&str; 5] = [
    "Competitions",
    "Cultural Events",
    "Ceremonies",
    "Workshops",
    "Exhibitions",
];

pub fn generate(
    manifest_path: &Path,
    processed_dir: &Path,
    site_dir: &Path,
    output_dir: &Path,
) -> Result<GeneratedSite, GenerateError> {
    let manifest_content = fs::read_to_string(manifest_path)?;
    let manifest: ProcessedManifest = serde_json::from_str(&manifest_content)?;
    generate_site(&manifest, processed_dir, site_dir, output_dir)
}

/// Write the site for an already loaded manifest.
pub fn generate_site(
    manifest: &ProcessedManifest,
    processed_dir: &Path,
    site_dir: &Path,
    output_dir: &Path,
) -> Result<GeneratedSite, GenerateError> {
    let config = manifest.config();
    let snapshot = &manifest.snapshot;
    let color_css = config::generate_color_css(&config.colors);
    let css = format!("{}\n\n{}", color_css, CSS_STATIC);

    fs::create_dir_all(output_dir)?;
    let mut site = GeneratedSite {
        posters: copy_posters(manifest, processed_dir, output_dir)?,
        assets: copy_assets(&site_dir.join("assets"), &output_dir.join("assets"))?,
        ..GeneratedSite::default()
    };

    let mut write_page = |rel: String, markup: Markup| -> Result<(), GenerateError> {
        let path = output_dir.join(&rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, markup.into_string())?;
        tracing::debug!(page = %rel, "page written");
        site.pages.push(rel);
        Ok(())
    };

    write_page(
        "index.html".into(),
        render_home(
            config,
            &snapshot.active_background,
            &snapshot.gallery,
            &snapshot.news,
            &css,
        ),
    )?;

    for year in &snapshot.years {
        let markup = render_results_page(
            config,
            &year.year,
            results_view(config, &year.year, manifest),
            manifest.posters_for(&year.year),
            &css,
        );
        write_page(format!("results/{}/index.html", year.year), markup)?;
    }

    write_page("news.html".into(), render_news_index(config, &snapshot.news, &css))?;
    if let Some(items) = snapshot.news.ready() {
        for item in items {
            write_page(
                format!("news/{}.html", path_segment(&item.id)),
                render_news_article(config, item, &css),
            )?;
        }
    }

    write_page(
        "gallery.html".into(),
        render_gallery(config, &snapshot.gallery, &css),
    )?;
    write_page(
        "about.html".into(),
        render_about(config, &snapshot.about, &snapshot.team_members, &css),
    )?;

    Ok(site)
}

/// A results view loaded with one year's snapshot data.
fn results_view(config: &SiteConfig, year: &str, manifest: &ProcessedManifest) -> ResultsView {
    let snapshot = &manifest.snapshot;
    let mut view = ResultsView::new(
        config.results.years.clone(),
        year,
        config.posters.default_style,
    );
    let ticket = view.begin_fetch();
    let results = snapshot
        .year(year)
        .map(|y| y.results.clone())
        .unwrap_or_default();
    view.apply(ticket, results, snapshot.teams.clone());
    view
}

/// Copy every listed poster PNG into `posters/`. Returns the count.
fn copy_posters(
    manifest: &ProcessedManifest,
    processed_dir: &Path,
    output_dir: &Path,
) -> std::io::Result<usize> {
    let mut copied = 0;
    for program in manifest.posters.values().flatten() {
        let dest_dir = output_dir.join("posters").join(&program.dir);
        fs::create_dir_all(&dest_dir)?;
        for file in &program.files {
            fs::copy(processed_dir.join(&program.dir).join(file), dest_dir.join(file))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy the site's `assets/` directory verbatim. Missing directory is fine.
fn copy_assets(src: &Path, dst: &Path) -> Result<usize, GenerateError> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn markdown_to_html(text: &str) -> String {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(text));
    out
}

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%d %b %Y").to_string()
}

// ============================================================================
// HTML Components
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Home,
    Results,
    News,
    Gallery,
    About,
}

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body class=[body_class] {
                (content)
                script { (PreEscaped(JS)) }
            }
        }
    }
}

/// Renders the site header with the section links
fn site_header(config: &SiteConfig, current: Section) -> Markup {
    let results_href = format!("/results/{}/", config.results.default_year);
    let links = [
        (Section::Home, "/", "Home"),
        (Section::Results, results_href.as_str(), "Results"),
        (Section::News, "/news.html", "News"),
        (Section::Gallery, "/gallery.html", "Gallery"),
        (Section::About, "/about.html", "About"),
    ];
    html! {
        header.site-header {
            a.site-title href="/" { (config.site.title) }
            input.nav-toggle type="checkbox" id="nav-toggle";
            label.nav-hamburger for="nav-toggle" {
                span.hamburger-line {}
                span.hamburger-line {}
                span.hamburger-line {}
            }
            nav.site-nav {
                ul {
                    @for (section, href, label) in links {
                        li class=[(section == current).then_some("current")] {
                            a href=(href) { (label) }
                        }
                    }
                }
            }
        }
    }
}

fn site_footer(config: &SiteConfig) -> Markup {
    html! {
        footer.site-footer {
            p { (config.site.event_name) " · " (config.site.venue) }
            p.footer-handle { (config.posters.handle) }
        }
    }
}

fn page(config: &SiteConfig, current: Section, title: &str, css: &str, main: Markup) -> Markup {
    let full_title = if title.is_empty() {
        config.site.title.clone()
    } else {
        format!("{} · {}", title, config.site.title)
    };
    let content = html! {
        (site_header(config, current))
        (main)
        (site_footer(config))
    };
    base_document(&full_title, css, None, content)
}

/// Inline banner for a failed query; the raw message is shown as-is.
fn connection_error(message: &str) -> Markup {
    html! {
        div.connection-error role="alert" {
            h3 { "Connection Error" }
            p { (message) }
        }
    }
}

fn empty_state(title: &str, detail: &str, search_only: bool) -> Markup {
    html! {
        div.empty-state.search-empty[search_only] hidden[search_only] {
            h3 { (title) }
            p { (detail) }
        }
    }
}

/// All-plus-categories filter buttons for news and gallery listings.
fn category_filter(categories: &[&str]) -> Markup {
    html! {
        div.category-filter role="tablist" {
            button.filter-button.active type="button" data-filter="all" { "All" }
            @for category in categories {
                button.filter-button type="button" data-filter=(category) { (category) }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

fn render_hero(config: &SiteConfig, background: Option<&HomepageBackground>) -> Markup {
    let copy = html! {
        div.hero-copy {
            h1 { (config.site.title) }
            p.hero-tagline { (config.site.tagline) }
            p.hero-meta { (config.site.event_date) " · " (config.site.venue) }
            a.button href={ "/results/" (config.results.default_year) "/" } { "View Results" }
        }
    };
    match background {
        Some(bg) if bg.kind == BackgroundKind::Video => html! {
            section.hero.hero-video {
                video.hero-media autoplay muted loop playsinline src=(bg.url) {}
                (copy)
            }
        },
        Some(bg) => html! {
            section.hero.hero-image style={ "background-image: url('" (bg.url) "')" } {
                (copy)
            }
        },
        None => html! {
            section.hero.hero-fallback { (copy) }
        },
    }
}

fn gallery_card(item: &GalleryItem) -> Markup {
    html! {
        figure.gallery-card
            data-category=(item.category)
            data-search={ (item.title.to_lowercase()) " " (item.description.as_deref().unwrap_or("").to_lowercase()) } {
            img src=(item.image_url) alt=(item.title) loading="lazy";
            figcaption {
                span.gallery-category { (item.category) }
                strong { (item.title) }
                @if let Some(desc) = &item.description {
                    p { (desc) }
                }
                @if let Some(by) = &item.photographer {
                    p.gallery-credit { "Photo: " (by) }
                }
            }
        }
    }
}

fn news_card(item: &NewsItem) -> Markup {
    html! {
        article.news-card
            .featured[item.is_featured]
            data-category=(item.category)
            data-search={ (item.title.to_lowercase()) " " (item.excerpt.as_deref().unwrap_or("").to_lowercase()) } {
            @if let Some(image) = &item.image_url {
                img src=(image) alt=(item.title) loading="lazy";
            }
            div.news-card-body {
                span.news-category { (item.category) }
                h3 {
                    a href={ "/news/" (path_segment(&item.id)) ".html" } { (item.title) }
                }
                @if let Some(excerpt) = &item.excerpt {
                    p.news-excerpt { (excerpt) }
                }
                p.news-meta {
                    (format_date(&item.created_at))
                    @if let Some(author) = &item.author {
                        " · " (author)
                    }
                }
            }
        }
    }
}

/// Renders the home page
fn render_home(
    config: &SiteConfig,
    background: &Loaded<Option<HomepageBackground>>,
    gallery: &Loaded<Vec<GalleryItem>>,
    news: &Loaded<Vec<NewsItem>>,
    css: &str,
) -> Markup {
    let active = background.ready().and_then(Option::as_ref);
    let main = html! {
        main.home-page {
            (render_hero(config, active))
            section.home-section {
                h2 { "Latest News" }
                @match news {
                    Loaded::Failed { message } => { (connection_error(message)) }
                    Loaded::Ready(items) if items.is_empty() => { p.muted { "No news yet." } }
                    Loaded::Ready(items) => {
                        div.news-grid {
                            @for item in items.iter().take(config.home.news_limit) {
                                (news_card(item))
                            }
                        }
                    }
                }
                a.more-link href="/news.html" { "All news" }
            }
            section.home-section {
                h2 { "Gallery" }
                @match gallery {
                    Loaded::Failed { message } => { (connection_error(message)) }
                    Loaded::Ready(items) if items.is_empty() => { p.muted { "No photos yet." } }
                    Loaded::Ready(items) => {
                        div.gallery-grid {
                            @for item in items.iter().take(config.home.gallery_limit) {
                                (gallery_card(item))
                            }
                        }
                    }
                }
                a.more-link href="/gallery.html" { "Full gallery" }
            }
        }
    };
    page(config, Section::Home, "", css, main)
}

fn program_card(
    config: &SiteConfig,
    view: &ResultsView,
    number: usize,
    program: &Program,
    posters: Option<&ProgramPosters>,
) -> Markup {
    let data = view.poster_data(program);
    let podium = Podium::from_winners(&data.winners);
    let page_url = config.site.url_for(&format!("results/{}/", view.year()));
    let share = SharePayload::for_program(program, &page_url);
    let search = format!(
        "{} {}",
        program.event.to_lowercase(),
        program.category.to_lowercase()
    );
    html! {
        article.program-card data-search=(search) {
            span.program-number { (number) }
            div.program-heading {
                h3 { (program.event) }
                p.program-category { (program.category) }
            }
            ol.winners {
                @for (position, row) in podium.placed() {
                    li class={ "place-" (position) } value=(position) {
                        span.winner-name { (row.participant) }
                        @if let Some(team) = &row.team {
                            span.winner-team { (team) }
                        }
                    }
                }
            }
            @if let Some(p) = posters {
                button.poster-open type="button"
                    data-title={ (program.event) " - " (program.category) }
                    data-posters=(p.files.iter().map(|f| format!("/posters/{}/{}", p.dir, f)).collect::<Vec<_>>().join(" "))
                    data-download=(poster_filename(&program.event))
                    data-share-title=(share.title)
                    data-share-text=(share.text)
                    data-share-url=(share.url) {
                    "View Poster"
                }
            }
        }
    }
}

fn team_row(ranked: &RankedTeam) -> Markup {
    let style = format!(
        "--rank-solid: {}; --rank-from: {}; --rank-to: {};",
        ranked.style.solid, ranked.style.gradient_from, ranked.style.gradient_to
    );
    html! {
        div class={ "team-row rank-" (ranked.style.name) } style=(style)
            data-search=(ranked.team.name.to_lowercase()) {
            span.team-rank { (ranked.label()) }
            span.team-name { (ranked.team.name) }
            span.team-points { (ranked.team.points) " pts" }
        }
    }
}

fn render_panel(config: &SiteConfig, view: &ResultsView, posters: &[ProgramPosters]) -> Markup {
    match view.state() {
        ViewState::Loading => html! {},
        ViewState::Error(message) => connection_error(&message),
        ViewState::NoPrograms => empty_state(
            "No Programs Found",
            "No results have been published for this year yet.",
            false,
        ),
        ViewState::NoTeams => empty_state("No Teams Found", "No teams are listed yet.", false),
        ViewState::Programs(cards) => html! {
            div.program-grid {
                @for card in &cards {
                    (program_card(
                        config,
                        view,
                        card.number,
                        &card.program,
                        posters.iter().find(|p| p.program == card.program),
                    ))
                }
            }
            (empty_state("No Programs Found", "Try a different search.", true))
        },
        ViewState::Teams(teams) => html! {
            div.team-list {
                @for ranked in &teams {
                    (team_row(ranked))
                }
            }
            (empty_state("No Teams Found", "Try a different search.", true))
        },
    }
}

fn poster_modal() -> Markup {
    html! {
        div #poster-modal .modal hidden role="dialog" aria-modal="true" {
            div.modal-body {
                header.modal-header {
                    h2 #poster-title {}
                    button.modal-close type="button" aria-label="Close" { "×" }
                }
                figure.poster-frame {
                    button.style-prev type="button" aria-label="Previous style" { "‹" }
                    img #poster-image alt="Result poster";
                    button.style-next type="button" aria-label="Next style" { "›" }
                }
                p #poster-style-label {}
                div.modal-actions {
                    a #poster-download .button href="#" download { "Download" }
                    button #poster-share .button type="button" { "Share" }
                }
            }
        }
    }
}

/// Renders one year's results page
fn render_results_page(
    config: &SiteConfig,
    year: &str,
    mut view: ResultsView,
    posters: &[ProgramPosters],
    css: &str,
) -> Markup {
    view.set_tab(Tab::Programs);
    let programs = render_panel(config, &view, posters);
    view.set_tab(Tab::Teams);
    let teams = render_panel(config, &view, posters);

    let main = html! {
        main.results-page
            data-default-style=(config.posters.default_style)
            data-style-count=(PosterStyle::ALL.len()) {
            header.page-header {
                h1 { "Results " (year) }
                nav.year-selector {
                    @for y in view.years() {
                        a.year-link.current[y == year] href={ "/results/" (y) "/" } { (y) }
                    }
                }
            }
            div.results-controls {
                input #results-search type="search" placeholder="Search programs or teams" autocomplete="off";
                div.tabs role="tablist" {
                    button.tab.active type="button" data-tab="programs" { "Programs" }
                    button.tab type="button" data-tab="teams" { "Teams" }
                }
            }
            section.tab-panel data-panel="programs" { (programs) }
            section.tab-panel data-panel="teams" hidden { (teams) }
            (poster_modal())
        }
    };
    page(config, Section::Results, &format!("Results {year}"), css, main)
}

/// Renders the news listing: featured first, then the rest
fn render_news_index(config: &SiteConfig, news: &Loaded<Vec<NewsItem>>, css: &str) -> Markup {
    let main = html! {
        main.news-page.filterable {
            header.page-header {
                h1 { "News" }
                input.filter-search type="search" placeholder="Search news" autocomplete="off";
                (category_filter(&NEWS_CATEGORIES))
            }
            @match news {
                Loaded::Failed { message } => { (connection_error(message)) }
                Loaded::Ready(items) => {
                    @let (featured, regular): (Vec<&NewsItem>, Vec<&NewsItem>) =
                        items.iter().partition(|n| n.is_featured);
                    @if !featured.is_empty() {
                        section.news-featured {
                            h2 { "Featured" }
                            div.news-grid {
                                @for item in &featured { (news_card(item)) }
                            }
                        }
                    }
                    section.news-latest {
                        div.news-grid {
                            @for item in &regular { (news_card(item)) }
                        }
                    }
                    (empty_state("No News Found", "Nothing matches this filter.", !items.is_empty()))
                }
            }
        }
    };
    page(config, Section::News, "News", css, main)
}

/// Renders one article from its markdown body
fn render_news_article(config: &SiteConfig, item: &NewsItem, css: &str) -> Markup {
    let body = item
        .content
        .as_deref()
        .or(item.excerpt.as_deref())
        .unwrap_or_default();
    let main = html! {
        main.article-page {
            article.news-article {
                a.back-link href="/news.html" { "← All news" }
                span.news-category { (item.category) }
                h1 { (item.title) }
                p.news-meta {
                    (format_date(&item.created_at))
                    @if let Some(author) = &item.author {
                        " · " (author)
                    }
                }
                @if let Some(image) = &item.image_url {
                    img.article-image src=(image) alt=(item.title);
                }
                div.article-body { (PreEscaped(markdown_to_html(body))) }
            }
        }
    };
    page(config, Section::News, &item.title, css, main)
}

/// Renders the gallery page
fn render_gallery(config: &SiteConfig, gallery: &Loaded<Vec<GalleryItem>>, css: &str) -> Markup {
    let main = html! {
        main.gallery-page.filterable {
            header.page-header {
                h1 { "Gallery" }
                input.filter-search type="search" placeholder="Search photos" autocomplete="off";
                (category_filter(&GALLERY_CATEGORIES))
            }
            @match gallery {
                Loaded::Failed { message } => { (connection_error(message)) }
                Loaded::Ready(items) => {
                    div.gallery-grid {
                        @for item in items { (gallery_card(item)) }
                    }
                    (empty_state("No Photos Found", "Nothing matches this filter.", !items.is_empty()))
                }
            }
        }
    };
    page(config, Section::Gallery, "Gallery", css, main)
}

fn section_title(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

/// Renders the about page: sections then team members
fn render_about(
    config: &SiteConfig,
    about: &Loaded<BTreeMap<String, String>>,
    members: &Loaded<Vec<TeamMember>>,
    css: &str,
) -> Markup {
    let main = html! {
        main.about-page {
            header.page-header { h1 { "About " (config.site.event_name) } }
            @match about {
                Loaded::Failed { message } => { (connection_error(message)) }
                Loaded::Ready(sections) => {
                    @for (key, content) in sections {
                        section.about-section id=(path_segment(key)) {
                            h2 { (section_title(key)) }
                            div.about-content { (PreEscaped(markdown_to_html(content))) }
                        }
                    }
                }
            }
            section.team-members {
                h2 { "Our Team" }
                @match members {
                    Loaded::Failed { message } => { (connection_error(message)) }
                    Loaded::Ready(list) => {
                        div.member-grid {
                            @for member in list {
                                div.member-card {
                                    @if let Some(image) = &member.image_url {
                                        img src=(image) alt=(member.name) loading="lazy";
                                    }
                                    h3 { (member.name) }
                                    p.member-position { (member.position) }
                                    @if let Some(bio) = &member.bio {
                                        p.member-bio { (bio) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };
    page(config, Section::About, "About", css, main)
}

// ============================================================================
// Tests
// ============================================================================
